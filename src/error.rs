//! Error types shared across the player core.

use std::path::PathBuf;

/// Failures reported by an audio backend.
///
/// None of these are fatal: the player stops, keeps its queue position and
/// can be restarted with a fresh `play`.
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("no audio output device: {0}")]
    OutputDevice(String),
    #[error("unsupported uri: {0}")]
    UnsupportedUri(String),
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path:?}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("audio worker is not running")]
    Disconnected,
}

/// Failures while saving or restoring a session snapshot.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode session: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to decode session: {0}")]
    Decode(#[from] toml::de::Error),
}
