//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the library, the play
//! queue, pane cursors and the last known player state.

mod model;

pub use model::*;

#[cfg(test)]
mod tests;
