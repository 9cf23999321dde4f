use std::env;
use std::path::PathBuf;
use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use log::info;
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::RodioBackend;
use crate::config;
use crate::library::{Library, spawn_scan};
use crate::mpris::ControlCmd;
use crate::player::{Player, PlayerEvent, PlayerOptions, StampedEvent};

mod event_loop;
mod logging;
mod mpris_sync;
mod settings;
mod startup;

pub use logging::init_logging;
pub use settings::load_settings;

pub fn run(settings: config::Settings) -> Result<(), Box<dyn std::error::Error>> {
    let dir = env::args().nth(1).unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "Music".to_string())
    });

    let (backend_tx, backend_rx) = mpsc::channel::<StampedEvent>();
    let (player_tx, player_rx) = mpsc::channel::<PlayerEvent>();
    let backend = RodioBackend::new(&settings.audio, backend_tx)?;
    let mut player = Player::new(backend, PlayerOptions::from_settings(&settings), player_tx);

    let mut app = App::new(Library::default());
    app.set_current_dir(dir.clone());
    app.scanning = true;
    let library_rx = spawn_scan(PathBuf::from(&dir), settings.library.clone());

    startup::apply_playback_defaults(&mut app, &player, &settings);
    let session_path = settings
        .session
        .restore
        .then(|| settings.session.resolved_path())
        .flatten();
    if let Some(path) = &session_path {
        startup::restore_session(&mut app, &mut player, path);
    }

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());
    mpris_sync::update_mpris(&mpris, &app);

    let mut chans = event_loop::Channels {
        control_tx,
        control_rx,
        backend_rx,
        player_rx,
        library_rx: Some(library_rx),
    };

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::default();
        event_loop::run(
            &mut terminal,
            &settings,
            &mut app,
            &mut player,
            &mpris,
            &mut chans,
            &mut state,
        )
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(path) = &session_path {
        startup::save_session(&app, &player, path);
    }
    player.backend().quit_softly();
    info!("shutdown complete");

    run_result
}
