use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::BackendError;
use crate::queue::PlayQueue;

use super::backend::{Backend, BackendEvent, StampedEvent};
use super::position::PositionMonitor;
use super::types::{LoopMode, PlayerEvent, PlayerState};

/// Knobs the state machine reads once at construction.
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub loop_mode: LoopMode,
    pub stop_after_current: bool,
    /// On a natural end of the queue, drop the queue instead of rewinding it.
    pub clear_queue_on_finish: bool,
    pub poll_interval: Duration,
    pub seek_threshold: Duration,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::None,
            stop_after_current: false,
            clear_queue_on_finish: false,
            poll_interval: Duration::from_millis(100),
            seek_threshold: Duration::from_secs(1),
        }
    }
}

impl PlayerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            loop_mode: settings.playback.loop_mode,
            stop_after_current: settings.playback.stop_after_current,
            clear_queue_on_finish: settings.playback.clear_queue_on_finish,
            poll_interval: Duration::from_millis(settings.audio.poll_interval_ms),
            seek_threshold: Duration::from_millis(settings.audio.seek_threshold_ms),
        }
    }
}

/// Playback state machine.
///
/// The player never owns the queue: every operation that needs a track takes
/// the queue by `&mut`, so both live on the runtime thread without locks.
/// Backend notifications are fed in through [`Player::handle_event`].
pub struct Player<B: Backend> {
    backend: B,
    state: PlayerState,
    loop_mode: LoopMode,
    stop_after_current: bool,
    /// Armed by about-to-finish when stop-after-current applied; consumed at end of stream.
    stopping: bool,
    /// Track loop already re-queued the current uri once since the last stream start.
    repeated: bool,
    /// Uri handed to the backend at about-to-finish, not started yet.
    pending_uri: Option<String>,
    clear_queue_on_finish: bool,
    monitor: PositionMonitor,
    events: Sender<PlayerEvent>,
}

impl<B: Backend> Player<B> {
    pub fn new(backend: B, options: PlayerOptions, events: Sender<PlayerEvent>) -> Self {
        Self {
            backend,
            state: PlayerState::Stopped,
            loop_mode: options.loop_mode,
            stop_after_current: options.stop_after_current,
            stopping: false,
            repeated: false,
            pending_uri: None,
            clear_queue_on_finish: options.clear_queue_on_finish,
            monitor: PositionMonitor::new(options.poll_interval, options.seek_threshold),
            events,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn stop_after_current(&self) -> bool {
        self.stop_after_current
    }

    pub fn pending_uri(&self) -> Option<&str> {
        self.pending_uri.as_deref()
    }

    pub fn position(&self) -> Duration {
        self.monitor.position()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.monitor.duration()
    }

    fn emit(&self, event: PlayerEvent) {
        if self.events.send(event).is_err() {
            debug!("player: no event listener");
        }
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            debug!("player: {:?} -> {state:?}", self.state);
            self.state = state;
            self.emit(PlayerEvent::StateChanged(state));
        }
    }

    /// Start the current track from the beginning.
    pub fn play(&mut self, queue: &mut PlayQueue) -> bool {
        let Some(track) = queue.get_current_track() else {
            debug!("player: nothing to play");
            return false;
        };
        let result = self
            .backend
            .stop()
            .and_then(|()| self.backend.load(&track.uri()))
            .and_then(|()| self.backend.play());
        if let Err(e) = result {
            self.fail(e);
            return false;
        }
        info!("player: playing {}", track.path.display());
        self.pending_uri = None;
        self.stopping = false;
        self.repeated = false;
        self.monitor.stop();
        self.monitor.start();
        self.set_state(PlayerState::Playing);
        true
    }

    /// Load the current track paused so a later toggle starts it.
    ///
    /// Only acts while stopped; used when tracks are queued with nothing playing.
    pub fn ready(&mut self, queue: &mut PlayQueue) -> bool {
        if self.state != PlayerState::Stopped {
            return false;
        }
        let Some(track) = queue.get_current_track() else {
            return false;
        };
        let result = self
            .backend
            .stop()
            .and_then(|()| self.backend.load(&track.uri()))
            .and_then(|()| self.backend.pause());
        if let Err(e) = result {
            self.fail(e);
            return false;
        }
        self.monitor.start();
        self.set_state(PlayerState::Paused);
        self.emit(PlayerEvent::NowPlaying(Some(track)));
        true
    }

    /// Pause or resume, trusting the backend's view of its own state.
    pub fn toggle(&mut self, queue: &mut PlayQueue) -> bool {
        let result = match self.backend.state() {
            PlayerState::Playing => self
                .backend
                .pause()
                .map(|()| PlayerState::Paused),
            PlayerState::Paused => self.backend.play().map(|()| PlayerState::Playing),
            PlayerState::Stopped => return self.play(queue),
        };
        match result {
            Ok(state) => {
                if state == PlayerState::Playing {
                    self.monitor.start();
                }
                self.set_state(state);
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    fn halt(&mut self) {
        if let Err(e) = self.backend.stop() {
            warn!("player: backend stop failed: {e}");
        }
        self.pending_uri = None;
        self.monitor.stop();
        self.set_state(PlayerState::Stopped);
    }

    pub fn stop(&mut self) {
        self.stopping = false;
        self.halt();
    }

    /// Stop and forget the current track.
    pub fn exit(&mut self, queue: &mut PlayQueue) {
        self.stop();
        queue.forget_current();
        self.emit(PlayerEvent::NowPlaying(None));
    }

    pub fn skip_forward(&mut self, queue: &mut PlayQueue) -> bool {
        queue.next() && self.play(queue)
    }

    pub fn skip_backward(&mut self, queue: &mut PlayQueue) -> bool {
        queue.previous() && self.play(queue)
    }

    /// Move to `index` and start it immediately.
    pub fn jump_to_track(&mut self, queue: &mut PlayQueue, index: usize) -> bool {
        queue.set_index(index, true);
        self.play(queue)
    }

    /// Scrub to an absolute position; the seek goes out on the next tick.
    pub fn seek(&mut self, position: Duration) -> bool {
        if self.state == PlayerState::Stopped {
            return false;
        }
        self.monitor.request(position)
    }

    /// Scrub relative to the current position, clamping at zero.
    pub fn seek_by(&mut self, delta_secs: i64) -> bool {
        let current = self.monitor.position();
        let delta = Duration::from_secs(delta_secs.unsigned_abs());
        let target = if delta_secs >= 0 {
            current + delta
        } else {
            current.saturating_sub(delta)
        };
        let target = match self.monitor.duration() {
            Some(d) => target.min(d),
            None => target,
        };
        self.seek(target)
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        if self.loop_mode != mode {
            self.loop_mode = mode;
            self.emit(PlayerEvent::LoopModeChanged(mode));
        }
    }

    pub fn cycle_loop_mode(&mut self) -> LoopMode {
        self.set_loop_mode(self.loop_mode.cycle());
        self.loop_mode
    }

    pub fn set_stop_after_current(&mut self, enabled: bool) {
        if self.stop_after_current != enabled {
            self.stop_after_current = enabled;
            self.emit(PlayerEvent::StopAfterCurrentChanged(enabled));
        }
    }

    /// Drive the position monitor. Call once per runtime iteration.
    pub fn tick(&mut self, now: Instant) {
        if let Some(target) = self.monitor.tick(&mut self.backend, now) {
            debug!("player: seeking to {target:?}");
        }
    }

    /// Feed an event from the backend channel. Events stamped before the
    /// latest stop belong to a stream that no longer plays and are dropped.
    /// Returns whether the event was applied.
    pub fn receive(&mut self, queue: &mut PlayQueue, stamped: StampedEvent) -> bool {
        let current = self.backend.generation();
        if stamped.generation != current {
            debug!(
                "player: dropping {:?} from generation {} (now {current})",
                stamped.event, stamped.generation
            );
            return false;
        }
        self.handle_event(queue, stamped.event);
        true
    }

    /// Apply an event about the stream that is currently loaded.
    pub fn handle_event(&mut self, queue: &mut PlayQueue, event: BackendEvent) {
        match event {
            BackendEvent::AboutToFinish => self.on_about_to_finish(queue),
            BackendEvent::StreamStart => self.on_stream_start(queue),
            BackendEvent::EndOfStream => self.on_end_of_stream(queue),
            BackendEvent::SeekDone => {
                self.monitor.seek_done();
                self.emit(PlayerEvent::Seeked(self.monitor.position()));
            }
            BackendEvent::Error(e) => self.fail(e),
        }
    }

    fn queue_uri(&mut self, uri: String) {
        debug!("player: queueing {uri}");
        match self.backend.load(&uri) {
            Ok(()) => self.pending_uri = Some(uri),
            Err(e) => self.fail(e),
        }
    }

    fn on_about_to_finish(&mut self, queue: &mut PlayQueue) {
        if self.state == PlayerState::Stopped {
            return;
        }
        if self.stop_after_current {
            // Queue nothing, but move on so a later play continues from the next track.
            self.stopping = true;
            if !queue.next() {
                queue.restart();
            }
            return;
        }
        if self.loop_mode == LoopMode::Track && !self.repeated {
            if let Some(track) = queue.current().cloned() {
                self.repeated = true;
                self.queue_uri(track.uri());
                return;
            }
        }
        if let Some(next) = queue.next_track() {
            self.queue_uri(next.uri());
            return;
        }
        if self.loop_mode == LoopMode::Playlist {
            queue.restart();
            if let Some(first) = queue.get_current_track() {
                self.queue_uri(first.uri());
            }
        }
    }

    fn on_stream_start(&mut self, queue: &mut PlayQueue) {
        let current = queue.get_current_track();
        let duration = self
            .backend
            .duration()
            .or_else(|| current.as_ref().and_then(|t| t.duration));
        self.monitor.reset_baseline(duration);
        self.repeated = false;
        self.pending_uri = None;
        if let Some(track) = &current {
            debug!("player: stream started for {}", track.path.display());
        }
        self.emit(PlayerEvent::NowPlaying(current));
    }

    fn on_end_of_stream(&mut self, queue: &mut PlayQueue) {
        let stopping = std::mem::take(&mut self.stopping);
        self.halt();
        self.set_stop_after_current(false);

        if stopping {
            info!("player: stopped after current track");
            return;
        }
        if self.clear_queue_on_finish {
            info!("player: queue finished, clearing");
            self.exit(queue);
            queue.clear();
            return;
        }
        if !queue.is_empty() {
            queue.restart();
            let current = queue.get_current_track();
            self.emit(PlayerEvent::NowPlaying(current));
        }
    }

    fn fail(&mut self, e: BackendError) {
        error!("player: {e}");
        self.stopping = false;
        self.halt();
        self.emit(PlayerEvent::Error(e.to_string()));
    }
}
