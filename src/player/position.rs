use std::time::{Duration, Instant};

use log::{debug, warn};

use super::backend::Backend;
use super::types::PlayerState;

/// Mirrors the backend position into an observable value and turns edits of
/// that value into seeks.
///
/// The monitor is driven by [`PositionMonitor::tick`] from the runtime loop,
/// which samples at most once per `interval`. Writing a position that differs
/// from the last sample by more than `threshold` is treated as a scrub.
#[derive(Debug)]
pub struct PositionMonitor {
    interval: Duration,
    threshold: Duration,
    active: bool,
    last_tick: Option<Instant>,
    last_sample: Duration,
    position: Duration,
    duration: Option<Duration>,
    seek_in_flight: bool,
}

impl PositionMonitor {
    pub fn new(interval: Duration, threshold: Duration) -> Self {
        Self {
            interval,
            threshold,
            active: false,
            last_tick: None,
            last_sample: Duration::ZERO,
            position: Duration::ZERO,
            duration: None,
            seek_in_flight: false,
        }
    }

    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.last_tick = None;
    }

    /// Deactivate, zero the position and drop any pending seek acknowledgement.
    pub fn stop(&mut self) {
        self.active = false;
        self.last_tick = None;
        self.last_sample = Duration::ZERO;
        self.position = Duration::ZERO;
        self.duration = None;
        self.seek_in_flight = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn seek_in_flight(&self) -> bool {
        self.seek_in_flight
    }

    /// A new stream started: sampling restarts from zero.
    pub fn reset_baseline(&mut self, duration: Option<Duration>) {
        self.last_sample = Duration::ZERO;
        self.position = Duration::ZERO;
        self.duration = duration;
        self.last_tick = None;
    }

    /// Write the observable position, as a UI scrub would.
    ///
    /// Positions past the known duration are ignored.
    pub fn request(&mut self, position: Duration) -> bool {
        if self.duration.is_some_and(|d| position > d) {
            debug!("position: ignoring seek to {position:?} past {:?}", self.duration);
            return false;
        }
        self.position = position;
        true
    }

    fn needs_seek(&self) -> bool {
        self.position.abs_diff(self.last_sample) > self.threshold
    }

    /// Run one monitor step if `interval` has elapsed since the last one.
    ///
    /// Returns the target when a seek was issued to the backend.
    pub fn tick<B: Backend>(&mut self, backend: &mut B, now: Instant) -> Option<Duration> {
        if !self.active {
            return None;
        }
        if self
            .last_tick
            .is_some_and(|last| now.duration_since(last) < self.interval)
        {
            return None;
        }
        self.last_tick = Some(now);

        if backend.state() == PlayerState::Stopped {
            self.stop();
            return None;
        }
        if self.seek_in_flight {
            return None;
        }

        if self.needs_seek() {
            let target = self.position;
            self.last_sample = target;
            match backend.seek(target) {
                Ok(()) => {
                    self.seek_in_flight = true;
                    return Some(target);
                }
                Err(e) => {
                    warn!("position: seek to {target:?} failed: {e}");
                    return None;
                }
            }
        }

        if let Some(sample) = backend.position() {
            self.last_sample = sample;
            self.position = sample;
        }
        // Streams may not know their length until decoding has started.
        if let Some(d) = backend.duration() {
            self.duration = Some(d);
        }
        None
    }

    /// The backend acknowledged the last seek.
    pub fn seek_done(&mut self) {
        self.seek_in_flight = false;
    }
}

impl Default for PositionMonitor {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(1))
    }
}
