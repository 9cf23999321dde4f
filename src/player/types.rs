//! Small value types shared by the state machine, the backends and the front-ends.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::queue::TrackRef;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Stopped,
    Paused,
    Playing,
}

/// What happens when the current track is about to end.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopMode {
    /// Play through the queue once and stop.
    #[default]
    #[serde(alias = "no-loop", alias = "off")]
    None,
    /// Repeat the current track.
    #[serde(alias = "repeat-one", alias = "loop-one")]
    Track,
    /// Wrap around to the start of the queue.
    #[serde(alias = "loop-all", alias = "repeat-all")]
    Playlist,
}

impl LoopMode {
    /// None → Track → Playlist → None.
    pub fn cycle(self) -> Self {
        match self {
            LoopMode::None => LoopMode::Track,
            LoopMode::Track => LoopMode::Playlist,
            LoopMode::Playlist => LoopMode::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LoopMode::None => "no loop",
            LoopMode::Track => "loop track",
            LoopMode::Playlist => "loop queue",
        }
    }
}

/// Notifications published by the player for the UI and MPRIS.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StateChanged(PlayerState),
    /// A new track started (or playback ended with `None`).
    NowPlaying(Option<TrackRef>),
    LoopModeChanged(LoopMode),
    StopAfterCurrentChanged(bool),
    /// The backend jumped to a new position.
    Seeked(Duration),
    Error(String),
}
