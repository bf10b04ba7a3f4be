//! The song player the captions follow.

use crate::sync::TimeSource;

use std::cell::Cell;
use std::fmt;

use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Playing,
    Paused,
    Buffering,
    Ended,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::Unstarted => "unstarted",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Buffering => "buffering",
            PlayerState::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Playback controls of an embedded video player. State changes are
/// reported asynchronously through whatever channel the player was
/// created with.
pub trait VideoPlayer: TimeSource {
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, seconds: f64);
    fn state(&self) -> PlayerState;
}

type Notify = Box<dyn Fn(PlayerState)>;

/// A player without media: its position is derived from the runtime clock.
pub struct SimulatedPlayer {
    length: f64,
    speed: f64,
    state: Cell<PlayerState>,
    /// Position at `anchor`, in seconds.
    position: Cell<f64>,
    anchor: Cell<Instant>,
    notify: Notify,
}

impl SimulatedPlayer {
    pub fn new(length: f64, speed: f64, notify: impl Fn(PlayerState) + 'static) -> Self {
        Self {
            length,
            speed,
            state: Cell::new(PlayerState::Unstarted),
            position: Cell::new(0.0),
            anchor: Cell::new(Instant::now()),
            notify: Box::new(notify),
        }
    }

    fn set_state(&self, state: PlayerState) {
        if self.state.replace(state) != state {
            debug!("Player is {}", state);
            (self.notify)(state);
        }
    }

    fn position_now(&self) -> f64 {
        let position = self.position.get();
        if self.state.get() != PlayerState::Playing {
            return position;
        }
        let elapsed = Instant::now().duration_since(self.anchor.get());
        (position + elapsed.as_secs_f64() * self.speed).min(self.length)
    }
}

impl TimeSource for SimulatedPlayer {
    fn current_time(&self) -> Option<f64> {
        let position = self.position_now();
        if self.state.get() == PlayerState::Playing && position >= self.length {
            self.position.set(self.length);
            self.set_state(PlayerState::Ended);
        }
        Some(position)
    }
}

impl VideoPlayer for SimulatedPlayer {
    fn play(&self) {
        if self.state.get() == PlayerState::Playing {
            return;
        }
        if self.state.get() == PlayerState::Ended {
            self.position.set(0.0);
        }
        self.anchor.set(Instant::now());
        info!("Playing from {:.1}s", self.position.get());
        self.set_state(PlayerState::Playing);
    }

    fn pause(&self) {
        if self.state.get() != PlayerState::Playing {
            return;
        }
        self.position.set(self.position_now());
        self.set_state(PlayerState::Paused);
    }

    fn seek_to(&self, seconds: f64) {
        let seconds = seconds.clamp(0.0, self.length);
        info!("Seeking to {:.1}s", seconds);
        self.position.set(seconds);
        self.anchor.set(Instant::now());
    }

    fn state(&self) -> PlayerState {
        self.state.get()
    }
}
