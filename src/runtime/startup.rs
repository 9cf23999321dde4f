use std::path::Path;
use std::time::Duration;

use log::{info, warn};

use crate::app::App;
use crate::config;
use crate::player::{Backend, Player};
use crate::session;

/// Mirror the configured playback defaults into the app model.
pub fn apply_playback_defaults<B: Backend>(
    app: &mut App,
    player: &Player<B>,
    settings: &config::Settings,
) {
    app.follow_playback = settings.ui.follow_playback;
    app.loop_mode = player.loop_mode();
    app.stop_after_current = player.stop_after_current();
}

/// Put the last saved queue back, readied at the saved position.
pub fn restore_session<B: Backend>(app: &mut App, player: &mut Player<B>, path: &Path) {
    let snapshot = match session::load(path) {
        Ok(Some(s)) => s,
        Ok(None) => return,
        Err(e) => {
            warn!("session: could not restore {}: {e}", path.display());
            return;
        }
    };

    let position = session::import_state(&mut app.queue, snapshot);
    if app.queue.is_empty() {
        return;
    }
    info!("session: restored {} queued tracks", app.queue.len());
    if let Some(index) = app.queue.index() {
        app.queue_cursor = index.min(app.queue.len() - 1);
    }
    if let Some(position) = position {
        if player.ready(&mut app.queue) && position > Duration::ZERO {
            player.seek(position);
        }
    }
}

pub fn save_session<B: Backend>(app: &App, player: &Player<B>, path: &Path) {
    let snapshot = session::export(&app.queue, player.position());
    match session::save(path, &snapshot) {
        Ok(()) => info!("session: saved to {}", path.display()),
        Err(e) => warn!("session: could not save {}: {e}", path.display()),
    }
}
