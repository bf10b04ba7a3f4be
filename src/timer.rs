//! Recurring wake-ups for the stage: the player poll and the frame loops.

use std::time::{Duration, Instant};

use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{trace, warn};

/// Shortest period a cadence runs at; tokio rejects a zero period.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug)]
enum Slot {
    Stopped,
    /// Started, but the interval is only created on the first tick so
    /// that starting and stopping work outside a runtime.
    Armed,
    Running(Interval),
}

/// A periodic timer that is either running or not. Starting a running
/// cadence or stopping a stopped one does nothing. Stopping drops the
/// underlying interval, so no tick is delivered after `stop` returns.
#[derive(Debug)]
pub struct Cadence {
    name: &'static str,
    period: Duration,
    slot: Slot,
}

impl Cadence {
    pub fn new(name: &'static str, period: Duration) -> Self {
        let period = if period < MIN_PERIOD {
            warn!("{} period {:?} is too short; using {:?}", name, period, MIN_PERIOD);
            MIN_PERIOD
        } else {
            period
        };
        Self {
            name,
            period,
            slot: Slot::Stopped,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.slot, Slot::Stopped)
    }

    /// Returns whether the cadence was started by this call. The first
    /// tick fires immediately.
    pub fn start(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        trace!("Starting {} every {:?}", self.name, self.period);
        self.slot = Slot::Armed;
        true
    }

    /// Returns whether a running cadence was stopped.
    pub fn stop(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.slot = Slot::Stopped;
        trace!("Stopped {}", self.name);
        true
    }

    /// Waits for the next tick. Never resolves while the cadence is stopped.
    pub async fn tick(&mut self) -> Instant {
        if let Slot::Armed = self.slot {
            let mut ticks = interval(self.period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            self.slot = Slot::Running(ticks);
        }
        match &mut self.slot {
            Slot::Running(ticks) => ticks.tick().await.into_std(),
            _ => std::future::pending().await,
        }
    }
}
