use crate::caption::{CaptionEntry, CaptionTable};
use crate::error::{Result, SerenataError};
use crate::srt::Subtitle;

use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

pub const LINE_BREAK: &str = "<br>";

#[derive(Debug, Clone, Default)]
pub struct ProcessOpts {
    /// Text shown from 0 until the first subtitle. `Some("")` inserts a
    /// blank caption, which keeps the caption area empty instead of
    /// leaving the synchronizer without an active entry.
    pub leader: Option<String>,
    /// Insert a blank caption wherever a subtitle is hidden before the
    /// next one is shown.
    pub clear_gaps: bool,
}

/// Turns parsed SRT blocks into a caption table.
pub fn process(subs: Vec<Subtitle>, opts: &ProcessOpts) -> Result<CaptionTable> {
    let subs = match &opts.leader {
        Some(text) => insert_leader(subs, text),
        None => subs,
    };

    let mut entries = Vec::with_capacity(subs.len());
    let mut iter = subs.iter().peekable();
    while let Some(sub) = iter.next() {
        entries.push(CaptionEntry::new(
            sub.show_at.as_secs_f64(),
            sub.text.join(LINE_BREAK),
        ));
        if !opts.clear_gaps {
            continue;
        }
        let gap = match iter.peek() {
            Some(next) => sub.hide_at < next.show_at,
            None => true,
        };
        if gap && sub.hide_at > sub.show_at {
            debug!(
                "Clearing caption at {:.3}s after '{}'",
                sub.hide_at.as_secs_f64(),
                sub.text.join(" ")
            );
            entries.push(CaptionEntry::new(sub.hide_at.as_secs_f64(), ""));
        }
    }

    CaptionTable::new(entries)
}

fn insert_leader(mut subs: Vec<Subtitle>, text: &str) -> Vec<Subtitle> {
    if let Some(first_sub) = subs.first() {
        let hide_at = first_sub.show_at;
        if hide_at > Duration::ZERO {
            let text = if text.is_empty() {
                Vec::new()
            } else {
                vec![text.to_string()]
            };
            subs.insert(
                0,
                Subtitle {
                    sequence_number: None,
                    show_at: Duration::ZERO,
                    hide_at,
                    text,
                },
            )
        }
    }
    subs
}

/// Converts a caption table back into SRT blocks. Blank captions end the
/// previous block and are not written themselves; the last caption stays
/// visible for `tail`.
pub fn to_subtitles(table: &CaptionTable, tail: Duration) -> Result<Vec<Subtitle>> {
    let entries = table.entries();
    let mut subs = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if entry.is_blank() {
            continue;
        }
        let show_at = timestamp(index, entry.time)?;
        let hide_at = match entries[index + 1..].iter().find(|next| next.time > entry.time) {
            Some(next) => timestamp(index + 1, next.time)?,
            None => show_at.checked_add(tail).ok_or_else(|| SerenataError::InvalidCaption {
                index,
                reason: format!("{}s plus a {:?} tail does not fit a timestamp", entry.time, tail),
            })?,
        };
        subs.push(Subtitle {
            sequence_number: None,
            show_at,
            hide_at,
            text: entry.text.split(LINE_BREAK).map(String::from).collect(),
        });
    }
    Ok(generate_seqnum(subs))
}

fn timestamp(index: usize, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|err| SerenataError::InvalidCaption {
        index,
        reason: format!("{}s cannot be written as a timestamp: {}", seconds, err),
    })
}

fn generate_seqnum(subs: Vec<Subtitle>) -> Vec<Subtitle> {
    let mut seqnum = 0;
    subs.into_iter()
        .map(|mut s| {
            seqnum += 1;
            s.sequence_number = Some(seqnum);
            s
        })
        .collect()
}

fn break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("static regex"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

/// Renders a caption's markup as plain text: line breaks become newlines
/// and every other tag is dropped.
pub fn plain_text(html: &str) -> Cow<'_, str> {
    if !html.contains('<') {
        return Cow::Borrowed(html);
    }
    let with_breaks = break_regex().replace_all(html, "\n");
    let stripped = tag_regex().replace_all(&with_breaks, "");
    Cow::Owned(stripped.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(show: u64, hide: u64, text: &[&str]) -> Subtitle {
        Subtitle {
            sequence_number: None,
            show_at: Duration::from_secs(show),
            hide_at: Duration::from_secs(hide),
            text: text.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn joins_lines_with_breaks() {
        let subs = vec![sub(27, 35, &["The world was on fire...", "O mundo estava um caos..."])];

        let table = process(subs, &ProcessOpts::default()).unwrap();

        assert_eq!(
            table.entries(),
            &[CaptionEntry::new(
                27.0,
                "The world was on fire...<br>O mundo estava um caos..."
            )]
        );
    }

    #[test]
    fn inserts_blank_leader() {
        let opts = ProcessOpts {
            leader: Some(String::new()),
            clear_gaps: false,
        };

        let table = process(vec![sub(27, 35, &["x"])], &opts).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0], CaptionEntry::new(0.0, ""));
        assert_eq!(table.locate(3.0), Some(0));
    }

    #[test]
    fn no_leader_when_first_subtitle_starts_at_zero() {
        let opts = ProcessOpts {
            leader: Some("Tuning in...".to_string()),
            clear_gaps: false,
        };

        let table = process(vec![sub(0, 5, &["x"])], &opts).unwrap();

        assert_eq!(table.len(), 1);
    }

    #[test]
    fn clears_gaps_between_subtitles() {
        let opts = ProcessOpts {
            leader: None,
            clear_gaps: true,
        };
        let subs = vec![
            sub(58, 70, &["And I wanna fall in love"]),
            sub(72, 80, &["With you..."]),
            sub(80, 88, &["What a wicked game"]),
        ];

        let table = process(subs, &opts).unwrap();
        let times: Vec<f64> = table.entries().iter().map(|e| e.time).collect();

        assert_eq!(times, vec![58.0, 70.0, 72.0, 80.0, 88.0]);
        assert!(table.entries()[1].is_blank());
        assert!(table.entries()[4].is_blank());
    }

    #[test]
    fn round_trips_back_to_subtitles() {
        let table = CaptionTable::new(vec![
            CaptionEntry::new(0.0, ""),
            CaptionEntry::new(27.0, "a<br>b"),
            CaptionEntry::new(35.0, "c"),
            CaptionEntry::new(43.0, ""),
        ])
        .unwrap();

        let subs = to_subtitles(&table, Duration::from_secs(4)).unwrap();

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].sequence_number, Some(1));
        assert_eq!(subs[0].text, vec!["a", "b"]);
        assert_eq!(subs[0].hide_at, Duration::from_secs(35));
        assert_eq!(subs[1].hide_at, Duration::from_secs(43));
    }

    #[test]
    fn last_caption_uses_tail() {
        let table = CaptionTable::new(vec![CaptionEntry::new(10.0, "end")]).unwrap();

        let subs = to_subtitles(&table, Duration::from_secs(4)).unwrap();

        assert_eq!(subs[0].hide_at, Duration::from_secs(14));
    }

    #[test]
    fn strips_markup() {
        let html = "Eu nunca imaginei<br><span style='font-size: 0.65em; color: #D4AF37;'>alguém como você</span>";

        assert_eq!(plain_text(html), "Eu nunca imaginei\nalguém como você");
        assert_eq!(plain_text("With you..."), "With you...");
        assert_eq!(plain_text("a<BR/>b"), "a\nb");
    }

    #[test]
    fn huge_times_are_an_error_not_a_panic() {
        let table = CaptionTable::new(vec![CaptionEntry::new(1e20, "late")]).unwrap();

        let err = to_subtitles(&table, Duration::from_secs(4)).unwrap_err();

        assert!(matches!(err, SerenataError::InvalidCaption { index: 0, .. }));
    }

    #[test]
    fn tail_overflow_is_an_error() {
        let table = CaptionTable::new(vec![CaptionEntry::new(10.0, "end")]).unwrap();

        let err = to_subtitles(&table, Duration::MAX).unwrap_err();

        assert!(matches!(err, SerenataError::InvalidCaption { index: 0, .. }));
    }
}
