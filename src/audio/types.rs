//! Commands, shared status and source bookkeeping for the rodio worker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::player::{BackendEvent, PlayerState};

#[derive(Debug)]
pub enum WorkerCmd {
    /// Open `uri`. Starts a fresh stream when nothing is queued, otherwise
    /// appends it behind the current one.
    Load(String),
    Play,
    Pause,
    /// Drop every queued source. Events sent afterwards carry `generation`.
    Stop { generation: u64 },
    Seek(Duration),
    /// Quit the worker, fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// What the worker last observed, readable from the runtime thread.
#[derive(Debug, Clone, Default)]
pub struct Status {
    pub state: PlayerState,
    pub position: Duration,
    pub duration: Option<Duration>,
}

pub type StatusHandle = Arc<Mutex<Status>>;

/// A source appended to the sink.
#[derive(Debug, Clone)]
pub struct Slot {
    pub uri: String,
    pub duration: Option<Duration>,
}

/// Mirrors the sources queued in the sink and derives stream events from
/// how many of them the sink still holds.
#[derive(Debug, Default)]
pub struct SlotTracker {
    slots: VecDeque<Slot>,
    lead: Duration,
    /// StreamStart was reported for the front slot.
    announced: bool,
    /// AboutToFinish was reported for the front slot.
    about_sent: bool,
}

impl SlotTracker {
    pub fn new(lead: Duration) -> Self {
        Self {
            lead,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        self.slots.clear();
        self.announced = false;
        self.about_sent = false;
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn front(&self) -> Option<&Slot> {
        self.slots.front()
    }

    pub fn push(&mut self, slot: Slot) {
        self.slots.push_back(slot);
    }

    /// Report the front slot as started, once.
    pub fn announce(&mut self) -> Option<BackendEvent> {
        if self.slots.is_empty() || self.announced {
            return None;
        }
        self.announced = true;
        Some(BackendEvent::StreamStart)
    }

    /// Reconcile with a playing sink that holds `queued` sources and is
    /// `pos` into the front one.
    pub fn observe(&mut self, queued: usize, pos: Duration) -> Vec<BackendEvent> {
        let mut out = Vec::new();
        if self.slots.is_empty() {
            return out;
        }

        // Length unknown: the drained sink is the only hint, so give the
        // player one tick to queue something before calling it the end.
        if queued == 0 && self.slots.len() == 1 && !self.about_sent {
            self.about_sent = true;
            out.push(BackendEvent::AboutToFinish);
            return out;
        }

        while self.slots.len() > queued {
            self.slots.pop_front();
            self.about_sent = false;
            if self.slots.is_empty() {
                self.announced = false;
                out.push(BackendEvent::EndOfStream);
                return out;
            }
            self.announced = true;
            out.push(BackendEvent::StreamStart);
        }

        if !self.about_sent && self.slots.len() == 1 {
            let near_end = self
                .slots
                .front()
                .and_then(|s| s.duration)
                .is_some_and(|d| d.saturating_sub(pos) <= self.lead);
            if near_end {
                self.about_sent = true;
                out.push(BackendEvent::AboutToFinish);
            }
        }
        out
    }
}
