//! Cross-fade between two captions: fade the old text out, swap the
//! content, fade the new text in.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStage {
    Idle,
    FadingOut,
    Swapping,
    FadingIn,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    FadingOut {
        started: Instant,
        from: f32,
        pending: String,
    },
    Swapping {
        pending: String,
    },
    FadingIn {
        started: Instant,
    },
}

#[derive(Debug, Clone)]
pub struct CaptionTransition {
    fade_out: Duration,
    fade_in: Duration,
    state: State,
}

fn fraction(started: Instant, now: Instant, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(started);
    (elapsed.as_secs_f32() / duration.as_secs_f32()).min(1.0)
}

impl CaptionTransition {
    pub fn new(fade_out: Duration, fade_in: Duration) -> Self {
        Self {
            fade_out,
            fade_in,
            state: State::Idle,
        }
    }

    pub fn stage(&self) -> TransitionStage {
        match self.state {
            State::Idle => TransitionStage::Idle,
            State::FadingOut { .. } => TransitionStage::FadingOut,
            State::Swapping { .. } => TransitionStage::Swapping,
            State::FadingIn { .. } => TransitionStage::FadingIn,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Opacity of the caption element at `now`.
    pub fn opacity(&self, now: Instant) -> f32 {
        match &self.state {
            State::Idle => 1.0,
            State::FadingOut { started, from, .. } => {
                from * (1.0 - fraction(*started, now, self.fade_out))
            }
            State::Swapping { .. } => 0.0,
            State::FadingIn { started } => fraction(*started, now, self.fade_in),
        }
    }

    /// Starts showing `text`. A transition already under way keeps going
    /// but ends on the newest text.
    pub fn begin(&mut self, text: String, now: Instant) {
        let from = self.opacity(now);
        self.state = match std::mem::replace(&mut self.state, State::Idle) {
            State::FadingOut { started, from, .. } => State::FadingOut {
                started,
                from,
                pending: text,
            },
            State::Swapping { .. } => State::Swapping { pending: text },
            State::Idle | State::FadingIn { .. } => State::FadingOut {
                started: now,
                from,
                pending: text,
            },
        };
    }

    /// Advances the sequence. Returns the text to put in place once the
    /// old caption has faded out; call [`CaptionTransition::swapped`] after
    /// the content has been replaced.
    pub fn tick(&mut self, now: Instant) -> Option<String> {
        match &self.state {
            State::FadingOut {
                started, pending, ..
            } if fraction(*started, now, self.fade_out) >= 1.0 => {
                let pending = pending.clone();
                self.state = State::Swapping {
                    pending: pending.clone(),
                };
                Some(pending)
            }
            State::FadingIn { started } if fraction(*started, now, self.fade_in) >= 1.0 => {
                self.state = State::Idle;
                None
            }
            _ => None,
        }
    }

    pub fn swapped(&mut self, now: Instant) {
        if let State::Swapping { .. } = self.state {
            self.state = State::FadingIn { started: now };
        }
    }
}
