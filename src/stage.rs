//! The single-threaded event loop behind the page.
//!
//! The stage owns every piece of mutable state: the synchronizer, the
//! caption fade, the hold gesture and the three cadences that wake it up.
//! Inputs arrive over a channel; each wake-up is handled to completion
//! before the next one is looked at.

use crate::effects::{Haptics, Renderer, ScrollLock, PRESS_PULSE, UNLOCK_PATTERN};
use crate::hold::{HoldEvent, HoldFrame, HoldGesture, HoldPhase};
use crate::player::{PlayerState, VideoPlayer};
use crate::sync::{CaptionChange, SyncEvent, SyncState, Synchronizer};
use crate::timer::Cadence;
use crate::transition::CaptionTransition;

use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub poll_interval: Duration,
    pub frame_interval: Duration,
    pub fade_out: Duration,
    pub fade_in: Duration,
    /// Shown when the hold gesture completes.
    pub message: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            frame_interval: Duration::from_millis(16),
            fade_out: Duration::from_millis(500),
            fade_in: Duration::from_millis(800),
            message: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageInput {
    Press,
    Release,
    /// The play/pause button.
    TogglePlayback,
    Seek(f64),
    Player(PlayerState),
    Quit,
}

enum Wake {
    Input(Option<StageInput>),
    Poll(Instant),
    HoldFrame(Instant),
    FadeFrame(Instant),
}

pub struct Stage<P, R, H, S> {
    player: P,
    renderer: R,
    haptics: H,
    scroll: S,
    sync: Synchronizer,
    transition: CaptionTransition,
    hold: HoldGesture,
    poll: Cadence,
    hold_frames: Cadence,
    fade_frames: Cadence,
    message: String,
}

impl<P, R, H, S> Stage<P, R, H, S>
where
    P: VideoPlayer,
    R: Renderer,
    H: Haptics,
    S: ScrollLock,
{
    pub fn new(
        config: StageConfig,
        sync: Synchronizer,
        hold: HoldGesture,
        player: P,
        renderer: R,
        haptics: H,
        scroll: S,
    ) -> Self {
        Self {
            player,
            renderer,
            haptics,
            scroll,
            sync,
            transition: CaptionTransition::new(config.fade_out, config.fade_in),
            hold,
            poll: Cadence::new("player poll", config.poll_interval),
            hold_frames: Cadence::new("hold frames", config.frame_interval),
            fade_frames: Cadence::new("caption fade", config.frame_interval),
            message: config.message,
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn scroll(&self) -> &S {
        &self.scroll
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn hold(&self) -> &HoldGesture {
        &self.hold
    }

    pub fn transition(&self) -> &CaptionTransition {
        &self.transition
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_active()
    }

    pub fn is_animating_hold(&self) -> bool {
        self.hold_frames.is_active()
    }

    /// Runs until `Quit` arrives or every sender is gone.
    pub async fn run(&mut self, mut inputs: UnboundedReceiver<StageInput>) {
        info!("Stage running");
        loop {
            let wake = tokio::select! {
                input = inputs.recv() => Wake::Input(input),
                at = self.poll.tick() => Wake::Poll(at),
                at = self.hold_frames.tick() => Wake::HoldFrame(at),
                at = self.fade_frames.tick() => Wake::FadeFrame(at),
            };
            match wake {
                Wake::Input(None) | Wake::Input(Some(StageInput::Quit)) => break,
                Wake::Input(Some(input)) => self.handle(input, clock_now()),
                Wake::Poll(at) => self.on_poll(at),
                Wake::HoldFrame(at) => self.on_hold_frame(at),
                Wake::FadeFrame(at) => self.on_fade_frame(at),
            }
        }
        self.poll.stop();
        self.hold_frames.stop();
        self.fade_frames.stop();
        info!("Stage stopped");
    }

    pub fn handle(&mut self, input: StageInput, now: Instant) {
        match input {
            StageInput::Press => self.on_press(now),
            StageInput::Release => self.on_release(now),
            StageInput::TogglePlayback => {
                if self.player.state() == PlayerState::Playing {
                    self.player.pause();
                } else {
                    self.player.play();
                }
            }
            StageInput::Seek(seconds) => self.player.seek_to(seconds),
            StageInput::Player(state) => self.on_player_state(state),
            StageInput::Quit => {}
        }
    }

    pub fn on_player_state(&mut self, state: PlayerState) {
        debug!("Player state {}", state);
        if state == PlayerState::Playing {
            self.poll.start();
        } else {
            self.poll.stop();
        }
    }

    pub fn on_poll(&mut self, now: Instant) {
        for event in self.sync.sample(&self.player) {
            match event {
                SyncEvent::Caption(CaptionChange::Show { text, .. }) => self.begin_caption(text, now),
                SyncEvent::Caption(CaptionChange::Clear) => self.begin_caption(String::new(), now),
                SyncEvent::Phase(phase) => {
                    let visual = self.sync.phases().visual(phase).clone();
                    self.renderer.apply_phase(phase, &visual);
                }
            }
        }
    }

    fn begin_caption(&mut self, text: String, now: Instant) {
        self.transition.begin(text, now);
        self.fade_frames.start();
    }

    pub fn on_fade_frame(&mut self, now: Instant) {
        if let Some(text) = self.transition.tick(now) {
            self.renderer.show_caption(&text);
            self.transition.swapped(now);
        }
        self.renderer.caption_opacity(self.transition.opacity(now));
        if self.transition.is_idle() {
            self.fade_frames.stop();
        }
    }

    pub fn on_press(&mut self, now: Instant) {
        if self.hold.press(now).is_some() {
            self.scroll.set_locked(true);
            self.haptics.vibrate(PRESS_PULSE);
            self.hold_frames.start();
        }
    }

    pub fn on_release(&mut self, now: Instant) {
        match self.hold.release(now) {
            Some(HoldEvent::Cancelled) => {
                self.hold_frames.stop();
                self.renderer.hold_reset(&HoldFrame::rest(self.hold.visuals()));
                self.scroll.set_locked(false);
            }
            Some(HoldEvent::Unlocked) => self.unlocked(),
            _ => {}
        }
    }

    pub fn on_hold_frame(&mut self, now: Instant) {
        match self.hold.tick(now) {
            Some(HoldEvent::Progress(frame)) => self.renderer.hold_frame(&frame),
            Some(HoldEvent::Unlocked) => self.unlocked(),
            _ => {
                self.hold_frames.stop();
            }
        }
    }

    fn unlocked(&mut self) {
        debug_assert_eq!(self.hold.phase(), HoldPhase::Unlocked);
        self.hold_frames.stop();
        self.renderer.hold_frame(&self.hold.frame());
        self.haptics.vibrate(UNLOCK_PATTERN);
        self.scroll.set_locked(false);
        self.renderer.reveal(&self.message);
    }
}

/// The runtime's clock, which tests may pause and advance.
fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}
