//! Press-and-hold gesture that unlocks the final message.
//!
//! The gesture is sampled once per rendered frame while the press lasts.
//! Letting go early cancels it; holding for the full duration unlocks it
//! for the rest of the session.

use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPhase {
    Idle,
    Holding,
    Unlocked,
}

/// Shape of the progress ring and the heart it surrounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldVisuals {
    pub ring_radius: f64,
    pub max_scale: f64,
}

impl Default for HoldVisuals {
    fn default() -> Self {
        Self {
            ring_radius: 45.0,
            max_scale: 1.3,
        }
    }
}

impl HoldVisuals {
    pub fn circumference(&self) -> f64 {
        TAU * self.ring_radius
    }
}

/// Everything the renderer needs for one frame of the gesture. All values
/// derive from `progress`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldFrame {
    pub progress: f64,
    /// Stroke dash offset of the ring: the full circumference at rest,
    /// zero when the ring is closed.
    pub ring_offset: f64,
    pub scale: f64,
    /// Glow strength in `[0, 1]`, eased so it builds up towards the end.
    pub intensity: f64,
}

impl HoldFrame {
    pub fn at(progress: f64, visuals: &HoldVisuals) -> Self {
        let progress = progress.clamp(0.0, 1.0);
        Self {
            progress,
            ring_offset: visuals.circumference() * (1.0 - progress),
            scale: 1.0 + (visuals.max_scale - 1.0) * progress,
            intensity: progress * progress,
        }
    }

    pub fn rest(visuals: &HoldVisuals) -> Self {
        Self::at(0.0, visuals)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoldEvent {
    Started,
    Progress(HoldFrame),
    Cancelled,
    Unlocked,
}

#[derive(Debug, Clone)]
pub struct HoldGesture {
    duration: Duration,
    visuals: HoldVisuals,
    phase: HoldPhase,
    started_at: Option<Instant>,
    progress: f64,
}

impl HoldGesture {
    pub fn new(duration: Duration, visuals: HoldVisuals) -> Self {
        Self {
            duration,
            visuals,
            phase: HoldPhase::Idle,
            started_at: None,
            progress: 0.0,
        }
    }

    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn visuals(&self) -> &HoldVisuals {
        &self.visuals
    }

    pub fn frame(&self) -> HoldFrame {
        HoldFrame::at(self.progress, &self.visuals)
    }

    fn progress_at(&self, now: Instant) -> f64 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// Mouse and touch may both report the same press; only the first one
    /// while idle starts the gesture.
    pub fn press(&mut self, now: Instant) -> Option<HoldEvent> {
        if self.phase != HoldPhase::Idle {
            return None;
        }
        debug!("Hold started");
        self.phase = HoldPhase::Holding;
        self.started_at = Some(now);
        self.progress = 0.0;
        Some(HoldEvent::Started)
    }

    /// Ends the press. If the full duration has already passed, the
    /// gesture completes instead of being cancelled.
    pub fn release(&mut self, now: Instant) -> Option<HoldEvent> {
        if self.phase != HoldPhase::Holding {
            return None;
        }
        if self.progress_at(now) >= 1.0 {
            return Some(self.unlock());
        }
        debug!("Hold released at {:.0}%", self.progress_at(now) * 100.0);
        self.phase = HoldPhase::Idle;
        self.started_at = None;
        self.progress = 0.0;
        Some(HoldEvent::Cancelled)
    }

    /// Samples the gesture for one frame.
    pub fn tick(&mut self, now: Instant) -> Option<HoldEvent> {
        if self.phase != HoldPhase::Holding {
            return None;
        }
        self.progress = self.progress_at(now);
        if self.progress >= 1.0 {
            return Some(self.unlock());
        }
        Some(HoldEvent::Progress(self.frame()))
    }

    fn unlock(&mut self) -> HoldEvent {
        info!("Hold complete; unlocked");
        self.phase = HoldPhase::Unlocked;
        self.progress = 1.0;
        HoldEvent::Unlocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn gesture() -> HoldGesture {
        HoldGesture::new(ms(3000), HoldVisuals::default())
    }

    #[test]
    fn early_release_resets() {
        let t0 = Instant::now();
        let mut hold = gesture();

        assert_eq!(hold.press(t0), Some(HoldEvent::Started));
        hold.tick(t0 + ms(1500));
        assert!((hold.progress() - 0.5).abs() < 1e-9);

        assert_eq!(hold.release(t0 + ms(1600)), Some(HoldEvent::Cancelled));
        assert_eq!(hold.phase(), HoldPhase::Idle);
        assert_eq!(hold.progress(), 0.0);
        assert_eq!(hold.started_at(), None);
    }

    #[test]
    fn full_hold_unlocks_once() {
        let t0 = Instant::now();
        let mut hold = gesture();
        hold.press(t0);

        let events: Vec<HoldEvent> = (1..=40)
            .filter_map(|i| hold.tick(t0 + ms(i * 100)))
            .collect();

        let unlocks = events
            .iter()
            .filter(|e| **e == HoldEvent::Unlocked)
            .count();
        assert_eq!(unlocks, 1);
        assert_eq!(events.len(), 30);
        assert_eq!(hold.phase(), HoldPhase::Unlocked);
        assert_eq!(hold.progress(), 1.0);

        assert_eq!(hold.press(t0 + ms(5000)), None);
        assert_eq!(hold.release(t0 + ms(5100)), None);
        assert_eq!(hold.phase(), HoldPhase::Unlocked);
    }

    #[test]
    fn second_press_does_not_restart() {
        let t0 = Instant::now();
        let mut hold = gesture();
        hold.press(t0);

        assert_eq!(hold.press(t0 + ms(200)), None);
        assert_eq!(hold.started_at(), Some(t0));
    }

    #[test]
    fn release_while_idle_is_ignored() {
        let mut hold = gesture();

        assert_eq!(hold.release(Instant::now()), None);
        assert_eq!(hold.phase(), HoldPhase::Idle);
    }

    #[test]
    fn release_after_full_duration_unlocks() {
        let t0 = Instant::now();
        let mut hold = gesture();
        hold.press(t0);

        assert_eq!(hold.release(t0 + ms(3000)), Some(HoldEvent::Unlocked));
        assert_eq!(hold.phase(), HoldPhase::Unlocked);
    }

    #[test]
    fn frames_derive_from_progress() {
        let visuals = HoldVisuals::default();

        let rest = HoldFrame::rest(&visuals);
        assert_eq!(rest.ring_offset, visuals.circumference());
        assert_eq!(rest.scale, 1.0);
        assert_eq!(rest.intensity, 0.0);

        let half = HoldFrame::at(0.5, &visuals);
        assert!((half.ring_offset - visuals.circumference() / 2.0).abs() < 1e-9);
        assert!((half.scale - 1.15).abs() < 1e-9);
        assert!((half.intensity - 0.25).abs() < 1e-9);

        let done = HoldFrame::at(1.7, &visuals);
        assert_eq!(done.progress, 1.0);
        assert_eq!(done.ring_offset, 0.0);
    }

    #[test]
    fn progress_frames_track_elapsed_time() {
        let t0 = Instant::now();
        let mut hold = gesture();
        hold.press(t0);

        match hold.tick(t0 + ms(750)) {
            Some(HoldEvent::Progress(frame)) => assert!((frame.progress - 0.25).abs() < 1e-9),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
