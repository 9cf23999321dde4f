use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::warn;

use crate::config::AudioSettings;
use crate::error::BackendError;
use crate::player::{Backend, PlayerState, StampedEvent};

use super::sink::uri_to_path;
use super::thread::spawn_audio_thread;
use super::types::{Status, StatusHandle, WorkerCmd};

/// [`Backend`] driving a rodio sink on a dedicated worker thread.
///
/// Commands are fire-and-forget; failures inside the worker come back as
/// [`crate::player::BackendEvent::Error`] on the event channel given to
/// [`RodioBackend::new`].
pub struct RodioBackend {
    tx: Sender<WorkerCmd>,
    status: StatusHandle,
    join: Mutex<Option<JoinHandle<()>>>,
    fade_out: Duration,
    generation: u64,
}

impl RodioBackend {
    pub fn new(settings: &AudioSettings, events: Sender<StampedEvent>) -> Result<Self, BackendError> {
        let (tx, rx) = mpsc::channel::<WorkerCmd>();
        let status: StatusHandle = Arc::new(Mutex::new(Status::default()));

        let join = spawn_audio_thread(rx, events, status.clone(), settings.clone())
            .map_err(|e| BackendError::OutputDevice(e.to_string()))?;

        Ok(Self {
            tx,
            status,
            join: Mutex::new(Some(join)),
            fade_out: Duration::from_millis(settings.quit_fade_out_ms),
            generation: 0,
        })
    }

    fn send(&self, cmd: WorkerCmd) -> Result<(), BackendError> {
        self.tx.send(cmd).map_err(|_| BackendError::Disconnected)
    }

    fn update(&self, f: impl FnOnce(&mut Status)) {
        if let Ok(mut s) = self.status.lock() {
            f(&mut s);
        }
    }

    /// Fade out, stop the worker and wait for it to exit.
    pub fn quit_softly(&self) {
        let quit = WorkerCmd::Quit {
            fade_out_ms: self.fade_out.as_millis() as u64,
        };
        if self.send(quit).is_err() {
            warn!("audio: worker already gone");
        }

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Backend for RodioBackend {
    fn load(&mut self, uri: &str) -> Result<(), BackendError> {
        // Reject malformed uris here; open and decode failures arrive as events.
        uri_to_path(uri)?;
        self.send(WorkerCmd::Load(uri.to_string()))
    }

    fn play(&mut self) -> Result<(), BackendError> {
        self.send(WorkerCmd::Play)?;
        self.update(|s| s.state = PlayerState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.send(WorkerCmd::Pause)?;
        self.update(|s| s.state = PlayerState::Paused);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        let generation = self.generation.wrapping_add(1);
        self.send(WorkerCmd::Stop { generation })?;
        self.generation = generation;
        self.update(|s| {
            s.state = PlayerState::Stopped;
            s.position = Duration::ZERO;
            s.duration = None;
        });
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<(), BackendError> {
        self.send(WorkerCmd::Seek(position))
    }

    fn position(&self) -> Option<Duration> {
        self.status.lock().ok().map(|s| s.position)
    }

    fn duration(&self) -> Option<Duration> {
        self.status.lock().ok().and_then(|s| s.duration)
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn state(&self) -> PlayerState {
        self.status
            .lock()
            .map(|s| s.state)
            .unwrap_or(PlayerState::Stopped)
    }
}
