//! Logic behind a song-synchronised love letter: captions that follow the
//! player's clock, visual phases tied to the song, and a press-and-hold
//! gesture that unlocks the final message.

pub mod caption;
pub mod config;
pub mod effects;
pub mod error;
pub mod hold;
pub mod parser;
pub mod phase;
pub mod player;
pub mod processor;
pub mod serialiser;
pub mod srt;
pub mod stage;
pub mod sync;
pub mod timer;
pub mod transition;

pub use caption::{locate, CaptionEntry, CaptionTable};
pub use config::Config;
pub use error::{Result, SerenataError};
pub use hold::{HoldEvent, HoldFrame, HoldGesture, HoldPhase, HoldVisuals};
pub use phase::{Phase, PhaseTable, PhaseTracker, PhaseVisual};
pub use stage::{Stage, StageConfig, StageInput};
pub use sync::{CaptionChange, SyncEvent, SyncState, Synchronizer, TimeSource};
