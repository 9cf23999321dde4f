//! The play queue: grouped storage, its flat view, and undo/redo history.

mod engine;
mod entry;
mod flat;
mod history;

pub use engine::{PlayQueue, Removal};
pub use entry::{AlbumGroup, QueueEntry, TrackRef};
pub use flat::{QueueRow, flatten};
