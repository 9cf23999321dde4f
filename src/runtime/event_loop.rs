use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, warn};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::{App, Focus};
use crate::config;
use crate::library::Library;
use crate::mpris::{ControlCmd, MprisHandle, track_object_path};
use crate::player::{Backend, Player, PlayerEvent, PlayerState, StampedEvent};
use crate::runtime::mpris_sync::publish_event;
use crate::ui;

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Same for `zz` (return to playing).
    pending_zz: bool,
}

/// Every channel the loop drains.
pub struct Channels {
    pub control_tx: Sender<ControlCmd>,
    pub control_rx: Receiver<ControlCmd>,
    pub backend_rx: Receiver<StampedEvent>,
    pub player_rx: Receiver<PlayerEvent>,
    /// Pending library scan; dropped once the result arrived.
    pub library_rx: Option<Receiver<Library>>,
}

fn poll_library(app: &mut App, chans: &mut Channels) {
    let Some(rx) = &chans.library_rx else {
        return;
    };
    match rx.try_recv() {
        Ok(library) => {
            app.set_library(library);
            chans.library_rx = None;
        }
        Err(TryRecvError::Empty) => {}
        Err(TryRecvError::Disconnected) => {
            warn!("library scan ended without a result");
            app.scanning = false;
            chans.library_rx = None;
        }
    }
}

/// Main terminal event loop: handles input, UI drawing, backend events and
/// MPRIS commands. Returns `Ok(())` when shutdown is requested.
pub fn run<B: Backend>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    player: &mut Player<B>,
    mpris: &MprisHandle,
    chans: &mut Channels,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        poll_library(app, chans);

        // Backend notifications are marshaled here so queue and player stay on one thread.
        while let Ok(ev) = chans.backend_rx.try_recv() {
            debug!("runtime: backend event {ev:?}");
            player.receive(&mut app.queue, ev);
        }
        player.tick(Instant::now());

        while let Ok(ev) = chans.player_rx.try_recv() {
            app.apply_player_event(&ev);
            publish_event(mpris, app, &ev);
        }
        app.sync_position(player);
        mpris.set_position(app.position);

        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;

        while let Ok(cmd) = chans.control_rx.try_recv() {
            if handle_control_cmd(cmd, app, player) {
                return Ok(());
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, player, &chans.control_tx, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn micros_to_duration(micros: i64) -> Duration {
    Duration::from_micros(micros.max(0) as u64)
}

fn handle_control_cmd<B: Backend>(cmd: ControlCmd, app: &mut App, player: &mut Player<B>) -> bool {
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => {
            if player.state() != PlayerState::Playing {
                app.follow_playback = true;
                player.toggle(&mut app.queue);
            }
        }
        ControlCmd::Pause => {
            if player.state() == PlayerState::Playing {
                player.toggle(&mut app.queue);
            }
        }
        ControlCmd::PlayPause => {
            app.follow_playback = true;
            player.toggle(&mut app.queue);
        }
        ControlCmd::Stop => player.stop(),
        ControlCmd::Next => {
            app.follow_playback = true;
            player.skip_forward(&mut app.queue);
        }
        ControlCmd::Prev => {
            app.follow_playback = true;
            player.skip_backward(&mut app.queue);
        }
        ControlCmd::SeekBy(offset) => {
            let now = player.position().as_micros().min(i64::MAX as u128) as i64;
            let mut target = micros_to_duration(now.saturating_add(offset));
            if let Some(d) = player.duration() {
                target = target.min(d);
            }
            player.seek(target);
        }
        ControlCmd::SetPosition { track_id, micros } => {
            // Stale requests for a track that is no longer current are ignored.
            let current = app.queue.index().map(track_object_path);
            if micros >= 0 && current.as_deref() == Some(track_id.as_str()) {
                player.seek(micros_to_duration(micros));
            }
        }
        ControlCmd::SetLoop(mode) => player.set_loop_mode(mode),
    }
    false
}

fn handle_key_event<B: Backend>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    player: &mut Player<B>,
    control_tx: &Sender<ControlCmd>,
    state: &mut EventLoopState,
) -> bool {
    app.status_message = None;

    // g and z pending should clear on any other key
    let pending_gg = std::mem::take(&mut state.pending_gg);
    let pending_zz = std::mem::take(&mut state.pending_zz);

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.redo();
        }
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Char('g') => {
            if pending_gg {
                app.first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.last(),
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Char('z') => {
            if pending_zz {
                app.return_to_playing();
            } else {
                state.pending_zz = true;
            }
        }
        KeyCode::Char('o') => {
            if app.focus == Focus::Library {
                app.toggle_expanded();
            }
        }
        KeyCode::Enter => match app.focus {
            Focus::Library => {
                app.play_selection(player);
            }
            Focus::Queue => {
                app.jump_to_cursor(player);
            }
        },
        KeyCode::Char('a') => {
            app.append_selection(player);
        }
        KeyCode::Char('i') => {
            app.insert_selection(player);
        }
        KeyCode::Char('v') if app.focus == Focus::Queue => {
            app.toggle_selection();
            app.next();
        }
        KeyCode::Char('V') if app.focus == Focus::Queue => app.select_all(),
        KeyCode::Esc => {
            if app.metadata_window {
                app.toggle_metadata_window();
            } else {
                app.clear_selection();
            }
        }
        KeyCode::Char('d') | KeyCode::Delete if app.focus == Focus::Queue => {
            app.remove_selected();
        }
        KeyCode::Char('u') => {
            app.undo();
        }
        KeyCode::Char('C') => app.clear_queue(player),
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('s') => {
            let _ = control_tx.send(ControlCmd::Stop);
        }
        KeyCode::Char('l') => {
            let _ = control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') => {
            let secs = settings.controls.scrub_seconds.min(i64::MAX as u64) as i64;
            player.seek_by(secs);
        }
        KeyCode::Char('H') => {
            let secs = settings.controls.scrub_seconds.min(i64::MAX as u64) as i64;
            player.seek_by(-secs);
        }
        KeyCode::Char('R') | KeyCode::Char('r') => {
            player.cycle_loop_mode();
        }
        KeyCode::Char('S') => {
            player.set_stop_after_current(!player.stop_after_current());
        }
        KeyCode::Char('K') => app.toggle_metadata_window(),
        _ => {}
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::library::Track;
    use crate::player::PlayerOptions;
    use crate::queue::TrackRef;
    use std::path::PathBuf;
    use std::sync::{Arc, mpsc};

    #[derive(Default)]
    struct NullBackend {
        state: PlayerState,
    }

    impl Backend for NullBackend {
        fn load(&mut self, _uri: &str) -> Result<(), BackendError> {
            Ok(())
        }
        fn play(&mut self) -> Result<(), BackendError> {
            self.state = PlayerState::Playing;
            Ok(())
        }
        fn pause(&mut self) -> Result<(), BackendError> {
            self.state = PlayerState::Paused;
            Ok(())
        }
        fn stop(&mut self) -> Result<(), BackendError> {
            self.state = PlayerState::Stopped;
            Ok(())
        }
        fn seek(&mut self, _position: Duration) -> Result<(), BackendError> {
            Ok(())
        }
        fn position(&self) -> Option<Duration> {
            None
        }
        fn duration(&self) -> Option<Duration> {
            None
        }
        fn state(&self) -> PlayerState {
            self.state
        }
        fn generation(&self) -> u64 {
            0
        }
    }

    fn track(n: u32) -> TrackRef {
        Arc::new(Track {
            title: format!("T{n}"),
            track_number: Some(n),
            disc_number: None,
            disc_subtitle: None,
            duration: Some(Duration::from_secs(100)),
            path: PathBuf::from(format!("/music/{n}.flac")),
            album_title: String::new(),
            album_artist: String::new(),
            artists: Vec::new(),
            cover_thumb: None,
            display: String::new(),
        })
    }

    fn setup() -> (App, Player<NullBackend>, mpsc::Receiver<PlayerEvent>) {
        let (tx, rx) = mpsc::channel();
        let player = Player::new(NullBackend::default(), PlayerOptions::default(), tx);
        let mut app = App::new(Library::default());
        app.queue.overwrite(vec![track(0), track(1), track(2)], 0);
        (app, player, rx)
    }

    #[test]
    fn control_commands_drive_the_player() {
        let (mut app, mut player, _rx) = setup();

        assert!(!handle_control_cmd(ControlCmd::Play, &mut app, &mut player));
        assert_eq!(player.state(), PlayerState::Playing);

        handle_control_cmd(ControlCmd::Next, &mut app, &mut player);
        assert_eq!(app.queue.index(), Some(1));

        handle_control_cmd(ControlCmd::Pause, &mut app, &mut player);
        assert_eq!(player.state(), PlayerState::Paused);

        handle_control_cmd(
            ControlCmd::SetLoop(crate::player::LoopMode::Playlist),
            &mut app,
            &mut player,
        );
        assert_eq!(player.loop_mode(), crate::player::LoopMode::Playlist);

        handle_control_cmd(ControlCmd::Stop, &mut app, &mut player);
        assert_eq!(player.state(), PlayerState::Stopped);

        assert!(handle_control_cmd(ControlCmd::Quit, &mut app, &mut player));
    }

    #[test]
    fn set_position_for_another_track_is_ignored() {
        let (mut app, mut player, _rx) = setup();
        handle_control_cmd(ControlCmd::Play, &mut app, &mut player);

        handle_control_cmd(
            ControlCmd::SetPosition {
                track_id: track_object_path(2),
                micros: 5_000_000,
            },
            &mut app,
            &mut player,
        );
        assert_eq!(player.position(), Duration::ZERO);

        handle_control_cmd(
            ControlCmd::SetPosition {
                track_id: track_object_path(0),
                micros: 5_000_000,
            },
            &mut app,
            &mut player,
        );
        assert_eq!(player.position(), Duration::from_secs(5));
    }

    #[test]
    fn relative_seek_clamps_at_zero() {
        let (mut app, mut player, _rx) = setup();
        handle_control_cmd(ControlCmd::Play, &mut app, &mut player);

        handle_control_cmd(ControlCmd::SeekBy(-3_000_000), &mut app, &mut player);
        assert_eq!(player.position(), Duration::ZERO);
    }
}
