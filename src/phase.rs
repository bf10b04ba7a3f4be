//! Maps playback time onto the three visual phases of the song.

use crate::error::{Result, SerenataError};

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Initial,
    Middle,
    Final,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initial => "initial",
            Phase::Middle => "middle",
            Phase::Final => "final",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look of a phase, handed to the renderer on every phase change.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseVisual {
    /// Background gradient, inner and outer color.
    pub ambient: (String, String),
    /// Where the ambient light is centred, in percent of the viewport.
    pub light_origin: (f32, f32),
    pub transition: Duration,
}

impl PhaseVisual {
    pub fn new(inner: &str, outer: &str, light_origin: (f32, f32), transition: Duration) -> Self {
        Self {
            ambient: (inner.to_string(), outer.to_string()),
            light_origin,
            transition,
        }
    }

    pub fn default_for(phase: Phase) -> Self {
        let transition = Duration::from_secs(4);
        match phase {
            Phase::Initial => Self::new("#1a1033", "#05030a", (50.0, 40.0), transition),
            Phase::Middle => Self::new("#3b1030", "#0a0308", (30.0, 60.0), transition),
            Phase::Final => Self::new("#4a3a10", "#0a0803", (50.0, 20.0), transition),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseThreshold {
    pub min_time: f64,
    pub phase: Phase,
    pub visual: PhaseVisual,
}

/// Thresholds ordered highest first; the first one at or below the
/// sampled time decides the phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTable {
    thresholds: Vec<PhaseThreshold>,
    initial: PhaseVisual,
}

impl Default for PhaseTable {
    fn default() -> Self {
        let threshold = |min_time, phase| PhaseThreshold {
            min_time,
            phase,
            visual: PhaseVisual::default_for(phase),
        };
        Self {
            thresholds: vec![threshold(170.0, Phase::Final), threshold(85.0, Phase::Middle)],
            initial: PhaseVisual::default_for(Phase::Initial),
        }
    }
}

impl PhaseTable {
    /// Builds a table from thresholds in any order. Phases must not go
    /// backwards as time increases, so the mapping stays monotonic.
    pub fn new(mut thresholds: Vec<PhaseThreshold>, initial: PhaseVisual) -> Result<Self> {
        if let Some(bad) = thresholds.iter().find(|t| !t.min_time.is_finite()) {
            return Err(SerenataError::Config(format!(
                "phase '{}' has a non-finite threshold",
                bad.phase
            )));
        }
        thresholds.sort_by(|a, b| b.min_time.total_cmp(&a.min_time));
        for pair in thresholds.windows(2) {
            if pair[0].phase < pair[1].phase {
                return Err(SerenataError::Config(format!(
                    "phase '{}' at {}s comes after phase '{}' at {}s",
                    pair[1].phase, pair[1].min_time, pair[0].phase, pair[0].min_time
                )));
            }
        }
        Ok(Self {
            thresholds,
            initial,
        })
    }

    pub fn map_phase(&self, time: f64) -> Phase {
        self.thresholds
            .iter()
            .find(|t| time >= t.min_time)
            .map_or(Phase::Initial, |t| t.phase)
    }

    pub fn visual(&self, phase: Phase) -> &PhaseVisual {
        self.thresholds
            .iter()
            .find(|t| t.phase == phase)
            .map_or(&self.initial, |t| &t.visual)
    }

    pub fn thresholds(&self) -> &[PhaseThreshold] {
        &self.thresholds
    }
}

/// Remembers the last phase and reports only transitions.
#[derive(Debug, Default, Clone)]
pub struct PhaseTracker {
    current: Option<Phase>,
}

impl PhaseTracker {
    pub fn current(&self) -> Option<Phase> {
        self.current
    }

    pub fn update(&mut self, table: &PhaseTable, time: f64) -> Option<Phase> {
        let phase = table.map_phase(time);
        if self.current == Some(phase) {
            return None;
        }
        self.current = Some(phase);
        Some(phase)
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_map_phase {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (time, expected) = $value;

                assert_eq!(PhaseTable::default().map_phase(time), expected);
            }
        )*
        }
    }

    test_map_phase! {
        test_map_phase_start: (0.0, Phase::Initial),
        test_map_phase_before_middle: (84.999, Phase::Initial),
        test_map_phase_middle: (85.0, Phase::Middle),
        test_map_phase_before_final: (169.999, Phase::Middle),
        test_map_phase_final: (170.0, Phase::Final),
        test_map_phase_negative: (-3.0, Phase::Initial),
    }

    #[test]
    fn phase_never_decreases_with_time() {
        let table = PhaseTable::default();
        let mut last = Phase::Initial;
        for step in 0..2400 {
            let phase = table.map_phase(step as f64 * 0.1);
            assert!(phase >= last);
            last = phase;
        }
        assert_eq!(last, Phase::Final);
    }

    #[test]
    fn tracker_reports_transitions_once() {
        let table = PhaseTable::default();
        let mut tracker = PhaseTracker::default();

        let events: Vec<Phase> = [0.0, 10.0, 85.0, 90.0, 170.0, 200.0]
            .iter()
            .filter_map(|&t| tracker.update(&table, t))
            .collect();

        assert_eq!(events, vec![Phase::Initial, Phase::Middle, Phase::Final]);
    }

    #[test]
    fn tracker_reset_reports_again() {
        let table = PhaseTable::default();
        let mut tracker = PhaseTracker::default();
        tracker.update(&table, 100.0);

        tracker.reset();

        assert_eq!(tracker.update(&table, 100.0), Some(Phase::Middle));
    }

    #[test]
    fn custom_thresholds_in_any_order() {
        let t = |min_time, phase| PhaseThreshold {
            min_time,
            phase,
            visual: PhaseVisual::default_for(phase),
        };
        let table = PhaseTable::new(
            vec![t(30.0, Phase::Middle), t(60.0, Phase::Final)],
            PhaseVisual::default_for(Phase::Initial),
        )
        .unwrap();

        assert_eq!(table.map_phase(45.0), Phase::Middle);
        assert_eq!(table.map_phase(60.0), Phase::Final);
        assert_eq!(table.visual(Phase::Final).light_origin, (50.0, 20.0));
    }

    #[test]
    fn rejects_phases_out_of_order() {
        let t = |min_time, phase| PhaseThreshold {
            min_time,
            phase,
            visual: PhaseVisual::default_for(phase),
        };

        let err = PhaseTable::new(
            vec![t(30.0, Phase::Final), t(60.0, Phase::Middle)],
            PhaseVisual::default_for(Phase::Initial),
        )
        .unwrap_err();

        assert!(matches!(err, SerenataError::Config(_)));
    }
}
