//! Playback state machine, its backend seam and the position/seek coordinator.

mod backend;
mod machine;
mod position;
mod types;

pub use backend::{Backend, BackendEvent, StampedEvent};
pub use machine::{Player, PlayerOptions};
pub use types::{LoopMode, PlayerEvent, PlayerState};
