//! Outputs of the stage: what gets drawn, felt and locked.

use crate::hold::HoldFrame;
use crate::phase::{Phase, PhaseVisual};
use crate::processor::plain_text;

use std::io::Write;

use tracing::{debug, info, trace};

/// Short tick when the finger goes down.
pub const PRESS_PULSE: &[u32] = &[15];
/// Heartbeat when the message unlocks.
pub const UNLOCK_PATTERN: &[u32] = &[60, 80, 60, 300, 120];

pub trait Renderer {
    /// Replaces the caption content. Called once the old caption has faded out.
    fn show_caption(&mut self, html: &str);
    fn caption_opacity(&mut self, opacity: f32);
    fn apply_phase(&mut self, phase: Phase, visual: &PhaseVisual);
    fn hold_frame(&mut self, frame: &HoldFrame);
    /// Puts the ring, heart and glow back to their rest state.
    fn hold_reset(&mut self, rest: &HoldFrame);
    fn reveal(&mut self, message: &str);
}

/// A missing element is skipped, not an error.
impl<R: Renderer> Renderer for Option<R> {
    fn show_caption(&mut self, html: &str) {
        if let Some(r) = self {
            r.show_caption(html)
        }
    }

    fn caption_opacity(&mut self, opacity: f32) {
        if let Some(r) = self {
            r.caption_opacity(opacity)
        }
    }

    fn apply_phase(&mut self, phase: Phase, visual: &PhaseVisual) {
        if let Some(r) = self {
            r.apply_phase(phase, visual)
        }
    }

    fn hold_frame(&mut self, frame: &HoldFrame) {
        if let Some(r) = self {
            r.hold_frame(frame)
        }
    }

    fn hold_reset(&mut self, rest: &HoldFrame) {
        if let Some(r) = self {
            r.hold_reset(rest)
        }
    }

    fn reveal(&mut self, message: &str) {
        if let Some(r) = self {
            r.reveal(message)
        }
    }
}

/// Vibration, fire and forget. Devices without a motor do nothing.
pub trait Haptics {
    fn vibrate(&mut self, pattern: &[u32]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn vibrate(&mut self, _pattern: &[u32]) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogHaptics;

impl Haptics for LogHaptics {
    fn vibrate(&mut self, pattern: &[u32]) {
        debug!("Vibrate {:?}", pattern);
    }
}

/// Page scrolling is frozen while the gesture is held.
pub trait ScrollLock {
    fn set_locked(&mut self, locked: bool);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogScrollLock {
    locked: bool,
}

impl LogScrollLock {
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl ScrollLock for LogScrollLock {
    fn set_locked(&mut self, locked: bool) {
        if self.locked != locked {
            debug!("Scrolling {}", if locked { "locked" } else { "unlocked" });
        }
        self.locked = locked;
    }
}

/// Prints captions and the unlock message to a terminal.
pub struct TerminalRenderer<W: Write> {
    out: W,
    last_decile: Option<u8>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_decile: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, line: &str) {
        // Terminal output is best effort; a closed pipe must not stop the song.
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn show_caption(&mut self, html: &str) {
        let text = plain_text(html);
        if text.trim().is_empty() {
            self.print("~");
        } else {
            for line in text.lines() {
                self.print(&format!("♪ {}", line.trim()));
            }
        }
    }

    fn caption_opacity(&mut self, opacity: f32) {
        trace!("Caption opacity {:.2}", opacity);
    }

    fn apply_phase(&mut self, phase: Phase, visual: &PhaseVisual) {
        info!(
            "Phase {} ({} -> {}, light at {:?}, over {:?})",
            phase, visual.ambient.0, visual.ambient.1, visual.light_origin, visual.transition
        );
    }

    fn hold_frame(&mut self, frame: &HoldFrame) {
        let decile = (frame.progress * 10.0).floor() as u8;
        if self.last_decile == Some(decile) {
            return;
        }
        self.last_decile = Some(decile);
        let bar = format!(
            "[{}{}] {:>3}%",
            "#".repeat(decile as usize),
            " ".repeat(10 - decile.min(10) as usize),
            decile.min(10) * 10
        );
        self.print(&bar);
    }

    fn hold_reset(&mut self, rest: &HoldFrame) {
        self.last_decile = None;
        debug!("Hold visuals reset (ring offset {:.1})", rest.ring_offset);
        self.print("(let go)");
    }

    fn reveal(&mut self, message: &str) {
        self.print("");
        for line in plain_text(message).lines() {
            self.print(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hold::HoldVisuals;

    fn output(renderer: TerminalRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn prints_caption_lines_without_markup() {
        let mut renderer = TerminalRenderer::new(Vec::new());

        renderer.show_caption("What a wicked game you play...<br><span style='opacity: 0.7;'>Que jogo é esse</span>");
        renderer.show_caption("");

        assert_eq!(
            output(renderer),
            "♪ What a wicked game you play...\n♪ Que jogo é esse\n~\n"
        );
    }

    #[test]
    fn prints_each_progress_step_once() {
        let visuals = HoldVisuals::default();
        let mut renderer = TerminalRenderer::new(Vec::new());

        for p in [0.01, 0.02, 0.55, 0.56, 1.0] {
            renderer.hold_frame(&HoldFrame::at(p, &visuals));
        }

        let out = output(renderer);
        assert_eq!(out.lines().count(), 3);
        assert!(out.ends_with("[##########] 100%\n"));
    }

    #[test]
    fn missing_renderer_is_skipped() {
        let mut renderer: Option<TerminalRenderer<Vec<u8>>> = None;

        renderer.show_caption("nobody is listening");
        renderer.reveal("still nobody");
    }
}
