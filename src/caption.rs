//! Timestamped captions and the predecessor lookup over them.

use crate::error::{Result, SerenataError};

use serde::Deserialize;
use tracing::warn;

/// A caption that becomes active at `time` seconds into the song.
///
/// `text` is an HTML fragment; it may contain `<br>` and inline `<span>`s.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptionEntry {
    pub time: f64,
    #[serde(default)]
    pub text: String,
}

impl CaptionEntry {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// An immutable caption sequence, sorted ascending by time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionTable {
    entries: Vec<CaptionEntry>,
}

impl CaptionTable {
    /// Validates and orders `entries`. Entries sharing a timestamp keep
    /// their relative order, so the later one wins at that time.
    pub fn new(mut entries: Vec<CaptionEntry>) -> Result<Self> {
        for (index, entry) in entries.iter().enumerate() {
            if !entry.time.is_finite() {
                return Err(SerenataError::InvalidCaption {
                    index,
                    reason: format!("time {} is not a finite number", entry.time),
                });
            }
            if entry.time < 0.0 {
                return Err(SerenataError::InvalidCaption {
                    index,
                    reason: format!("time {} is negative", entry.time),
                });
            }
        }

        let sorted = entries.windows(2).all(|w| w[0].time <= w[1].time);
        if !sorted {
            warn!("Caption table is not ordered by time; sorting it");
            entries.sort_by(|a, b| a.time.total_cmp(&b.time));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CaptionEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&CaptionEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the caption active at `time`, see [`locate`].
    pub fn locate(&self, time: f64) -> Option<usize> {
        locate(time, &self.entries)
    }
}

/// Returns the greatest index `i` with `table[i].time <= time`, or `None`
/// when `time` precedes every entry. `table` must be sorted by time.
pub fn locate(time: f64, table: &[CaptionEntry]) -> Option<usize> {
    // Number of entries at or before `time`; the predecessor is the last of them.
    let count = table.partition_point(|entry| entry.time <= time);
    count.checked_sub(1)
}
