//! Music library: scanning files on disk into tracks and grouping them by album.
//!
//! The library only produces values; it never owns or mutates the play queue.

mod display;
mod model;
mod scan;

pub use display::display_from_fields;
pub use model::*;
pub use scan::spawn_scan;
