use std::time::Duration;

use crate::error::BackendError;

use super::types::PlayerState;

/// An audio output the state machine can drive.
///
/// `load` replaces what is playing when the backend is stopped or paused; while
/// playing it queues the uri to follow the current stream without a gap, which
/// is how about-to-finish handoffs are expressed.
///
/// Every `stop` starts a new generation. Events are stamped with the
/// generation they were produced in, so ones sent for a stream that was
/// stopped can be told apart from events about the stream that replaced it.
pub trait Backend {
    fn load(&mut self, uri: &str) -> Result<(), BackendError>;
    fn play(&mut self) -> Result<(), BackendError>;
    fn pause(&mut self) -> Result<(), BackendError>;
    fn stop(&mut self) -> Result<(), BackendError>;
    fn seek(&mut self, position: Duration) -> Result<(), BackendError>;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn state(&self) -> PlayerState;
    /// Generation of the stream currently loaded.
    fn generation(&self) -> u64;
}

/// Asynchronous notifications coming back from a backend.
#[derive(Debug)]
pub enum BackendEvent {
    /// The current stream will end soon; queue the next uri now.
    AboutToFinish,
    /// A newly loaded or queued stream started producing audio.
    StreamStart,
    EndOfStream,
    SeekDone,
    Error(BackendError),
}

/// A [`BackendEvent`] tagged with the generation that produced it.
#[derive(Debug)]
pub struct StampedEvent {
    pub generation: u64,
    pub event: BackendEvent,
}
