//! Follows the player's clock and turns it into caption and phase changes.

use crate::caption::CaptionTable;
use crate::phase::{Phase, PhaseTable, PhaseTracker};

use tracing::{debug, trace};

/// Anything that can report the current playback position in seconds.
/// `None` means the source is not ready yet; sampling is skipped.
pub trait TimeSource {
    fn current_time(&self) -> Option<f64>;
}

impl<F> TimeSource for F
where
    F: Fn() -> Option<f64>,
{
    fn current_time(&self) -> Option<f64> {
        self()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptionChange {
    Show { index: usize, text: String },
    /// Time moved back before the first caption.
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Caption(CaptionChange),
    Phase(Phase),
}

/// The active caption and phase as last observed by the sampler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub caption: Option<usize>,
    pub phase: Option<Phase>,
}

/// Caption side of the synchronizer: owns the table and the last index.
#[derive(Debug, Clone)]
pub struct CaptionSync {
    table: CaptionTable,
    current: Option<usize>,
}

impl CaptionSync {
    pub fn new(table: CaptionTable) -> Self {
        Self {
            table,
            current: None,
        }
    }

    pub fn table(&self) -> &CaptionTable {
        &self.table
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Locates `time` and reports a change only when the active index differs
    /// from the previous sample.
    pub fn update(&mut self, time: f64) -> Option<CaptionChange> {
        let index = self.table.locate(time);
        if index == self.current {
            return None;
        }
        self.current = index;
        Some(match index.and_then(|i| self.table.get(i).map(|e| (i, e))) {
            Some((index, entry)) => CaptionChange::Show {
                index,
                text: entry.text.clone(),
            },
            None => CaptionChange::Clear,
        })
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Drives both the caption and the phase trackers from one time sample.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    captions: CaptionSync,
    phases: PhaseTable,
    tracker: PhaseTracker,
}

impl Synchronizer {
    pub fn new(captions: CaptionTable, phases: PhaseTable) -> Self {
        Self {
            captions: CaptionSync::new(captions),
            phases,
            tracker: PhaseTracker::default(),
        }
    }

    pub fn captions(&self) -> &CaptionTable {
        self.captions.table()
    }

    pub fn phases(&self) -> &PhaseTable {
        &self.phases
    }

    pub fn state(&self) -> SyncState {
        SyncState {
            caption: self.captions.current(),
            phase: self.tracker.current(),
        }
    }

    /// Reads the source once. Nothing happens if it has no time to report.
    pub fn sample(&mut self, source: &dyn TimeSource) -> Vec<SyncEvent> {
        match source.current_time() {
            Some(time) => self.sample_at(time),
            None => {
                trace!("Time source not ready; skipping sample");
                Vec::new()
            }
        }
    }

    pub fn sample_at(&mut self, time: f64) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        if let Some(change) = self.captions.update(time) {
            debug!("Caption change at {:.2}s: {:?}", time, change);
            events.push(SyncEvent::Caption(change));
        }
        if let Some(phase) = self.tracker.update(&self.phases, time) {
            debug!("Phase change at {:.2}s: {}", time, phase);
            events.push(SyncEvent::Phase(phase));
        }
        events
    }

    /// Forgets what has been shown, e.g. when the song restarts.
    pub fn reset(&mut self) {
        self.captions.reset();
        self.tracker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::CaptionEntry;

    use std::cell::Cell;

    fn abc() -> CaptionTable {
        CaptionTable::new(vec![
            CaptionEntry::new(0.0, "A"),
            CaptionEntry::new(10.0, "B"),
            CaptionEntry::new(20.0, "C"),
        ])
        .unwrap()
    }

    fn shown(events: &[SyncEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                SyncEvent::Caption(CaptionChange::Show { index, .. }) => Some(*index),
                _ => None,
            })
            .collect()
    }

    fn replay(sync: &mut Synchronizer, times: &[f64]) -> Vec<SyncEvent> {
        times.iter().flat_map(|&t| sync.sample_at(t)).collect()
    }

    #[test]
    fn fires_once_per_index_change() {
        let mut sync = Synchronizer::new(abc(), PhaseTable::default());

        let events = replay(&mut sync, &[0.0, 5.0, 5.0, 11.0, 25.0]);

        assert_eq!(shown(&events), vec![0, 1, 2]);
        assert_eq!(
            events[0],
            SyncEvent::Caption(CaptionChange::Show {
                index: 0,
                text: "A".into()
            })
        );
    }

    #[test]
    fn no_event_before_first_caption() {
        let table = CaptionTable::new(vec![CaptionEntry::new(27.0, "x")]).unwrap();
        let mut sync = CaptionSync::new(table);

        assert_eq!(sync.update(1.0), None);
        assert_eq!(sync.update(2.0), None);
        assert_eq!(sync.current(), None);
    }

    #[test]
    fn backward_seek_rescans() {
        let mut sync = CaptionSync::new(abc());
        sync.update(25.0);

        assert_eq!(
            sync.update(12.0),
            Some(CaptionChange::Show {
                index: 1,
                text: "B".into()
            })
        );
        assert_eq!(sync.update(-1.0), Some(CaptionChange::Clear));
        assert_eq!(sync.update(-0.5), None);
    }

    #[test]
    fn reset_replays_identically() {
        let times = [0.0, 3.0, 10.0, 84.0, 85.0, 120.0, 171.0];
        let mut sync = Synchronizer::new(abc(), PhaseTable::default());

        let first = replay(&mut sync, &times);
        sync.reset();
        let second = replay(&mut sync, &times);

        assert_eq!(first, second);
        assert_eq!(sync.state(), SyncState {
            caption: Some(2),
            phase: Some(Phase::Final),
        });
    }

    #[test]
    fn phase_and_caption_events_interleave_in_sample_order() {
        let mut sync = Synchronizer::new(abc(), PhaseTable::default());

        let events = replay(&mut sync, &[0.0, 90.0]);

        assert_eq!(
            events,
            vec![
                SyncEvent::Caption(CaptionChange::Show {
                    index: 0,
                    text: "A".into()
                }),
                SyncEvent::Phase(Phase::Initial),
                SyncEvent::Caption(CaptionChange::Show {
                    index: 2,
                    text: "C".into()
                }),
                SyncEvent::Phase(Phase::Middle),
            ]
        );
    }

    #[test]
    fn unready_source_is_skipped() {
        let mut sync = Synchronizer::new(abc(), PhaseTable::default());
        let time = Cell::new(None);
        let source = || time.get();

        assert!(sync.sample(&source).is_empty());
        assert_eq!(sync.state(), SyncState::default());

        time.set(Some(10.0));
        assert_eq!(shown(&sync.sample(&source)), vec![1]);
    }
}
