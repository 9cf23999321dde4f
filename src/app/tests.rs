use super::*;
use crate::config::AlbumSort;
use crate::error::BackendError;
use crate::library::{Library, Track};
use crate::player::{Backend, Player, PlayerEvent, PlayerOptions, PlayerState};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

/// Backend that accepts everything and remembers only its state.
#[derive(Default)]
struct QuietBackend {
    state: PlayerState,
    loads: Vec<String>,
}

impl Backend for QuietBackend {
    fn load(&mut self, uri: &str) -> Result<(), BackendError> {
        self.loads.push(uri.to_string());
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

fn t(album: &str, n: u32) -> Track {
    Track {
        title: format!("{album} {n}"),
        track_number: Some(n),
        disc_number: None,
        disc_subtitle: None,
        duration: Some(Duration::from_secs(60)),
        path: PathBuf::from(format!("/music/{album}/{n:02}.flac")),
        album_title: album.to_string(),
        album_artist: "Band".to_string(),
        artists: vec!["Band".to_string()],
        cover_thumb: None,
        display: format!("{n}. {album}"),
    }
}

fn app() -> App {
    let tracks = vec![t("Alpha", 1), t("Alpha", 2), t("Alpha", 3), t("Beta", 1)];
    App::new(Library::from_tracks(tracks, AlbumSort::Title))
}

fn player() -> (Player<QuietBackend>, Receiver<PlayerEvent>) {
    let (tx, rx) = mpsc::channel();
    (
        Player::new(QuietBackend::default(), PlayerOptions::default(), tx),
        rx,
    )
}

#[test]
fn play_selection_replaces_queue_from_highlighted_track() {
    let mut app = app();
    let (mut player, _rx) = player();

    app.toggle_expanded();
    app.next();
    assert!(app.play_selection(&mut player));

    assert_eq!(app.queue.len(), 3);
    assert_eq!(app.queue.index(), Some(1));
    assert_eq!(app.queue.current().unwrap().title, "Alpha 2");
    assert!(!app.queue.can_undo());
    assert_eq!(player.state(), PlayerState::Playing);
}

#[test]
fn append_while_stopped_readies_first_track() {
    let mut app = app();
    let (mut player, rx) = player();

    assert!(app.append_selection(&mut player));
    assert_eq!(app.queue.len(), 3);
    assert_eq!(player.state(), PlayerState::Paused);
    assert_eq!(player.backend().loads.len(), 1);

    let events: Vec<PlayerEvent> = rx.try_iter().collect();
    assert!(events.contains(&PlayerEvent::StateChanged(PlayerState::Paused)));
}

#[test]
fn expanded_album_appends_single_track() {
    let mut app = app();
    let (mut player, _rx) = player();

    app.toggle_expanded();
    app.last();
    assert!(app.append_selection(&mut player));
    assert_eq!(app.queue.len(), 1);
    assert_eq!(app.queue.track_at(0).unwrap().title, "Alpha 3");
    assert!(!app.queue.entries()[0].is_group());
}

#[test]
fn insert_lands_after_playing_track() {
    let mut app = app();
    let (mut player, _rx) = player();

    app.play_selection(&mut player);
    app.last();
    assert!(app.insert_selection(&mut player));

    let titles: Vec<String> = app.queue.tracks().iter().map(|t| t.title.clone()).collect();
    assert_eq!(titles, ["Alpha 1", "Beta 1", "Alpha 2", "Alpha 3"]);
}

#[test]
fn remove_uses_marks_or_cursor() {
    let mut app = app();
    let (mut player, _rx) = player();
    app.append_selection(&mut player);

    app.focus = Focus::Queue;
    app.queue_cursor = 2;
    assert_eq!(app.remove_selected(), 1);
    assert_eq!(app.queue.len(), 2);
    assert_eq!(app.queue_cursor, 1);

    app.select_all();
    assert_eq!(app.remove_selected(), 2);
    assert!(app.queue.is_empty());
    assert!(app.selection.is_empty());

    assert!(app.undo());
    assert_eq!(app.queue.len(), 2);
    assert!(app.redo());
    assert!(app.queue.is_empty());
}

#[test]
fn toggle_selection_ignores_rows_past_end() {
    let mut app = app();
    app.focus = Focus::Queue;
    app.toggle_selection();
    assert!(app.selection.is_empty());
    assert!(app.effective_selection().is_empty());
}

#[test]
fn now_playing_moves_queue_cursor_when_following() {
    let mut app = app();
    let (mut player, _rx) = player();
    app.play_selection(&mut player);
    app.queue.next();
    let current = app.queue.get_current_track();

    app.apply_player_event(&PlayerEvent::NowPlaying(current.clone()));
    assert_eq!(app.queue_cursor, 1);
    assert_eq!(app.now_playing, current);

    app.focus = Focus::Queue;
    app.first();
    assert!(!app.follow_playback);
    app.queue.next();
    let current = app.queue.get_current_track();
    app.apply_player_event(&PlayerEvent::NowPlaying(current));
    assert_eq!(app.queue_cursor, 0);
}

#[test]
fn player_events_update_mirrored_state() {
    let mut app = app();
    app.apply_player_event(&PlayerEvent::StateChanged(PlayerState::Playing));
    app.apply_player_event(&PlayerEvent::LoopModeChanged(crate::player::LoopMode::Track));
    app.apply_player_event(&PlayerEvent::StopAfterCurrentChanged(true));
    app.apply_player_event(&PlayerEvent::Seeked(Duration::from_secs(7)));
    app.apply_player_event(&PlayerEvent::Error("no device".into()));

    assert_eq!(app.playback, PlayerState::Playing);
    assert_eq!(app.loop_mode, crate::player::LoopMode::Track);
    assert!(app.stop_after_current);
    assert_eq!(app.position, Duration::from_secs(7));
    assert_eq!(app.status_message.as_deref(), Some("no device"));
}

#[test]
fn return_to_playing_finds_album_and_track() {
    let mut app = app();
    let (mut player, _rx) = player();
    app.album_cursor = 1;
    app.toggle_expanded();
    app.play_selection(&mut player);
    let current = app.queue.get_current_track();
    app.apply_player_event(&PlayerEvent::NowPlaying(current));

    app.album_cursor = 0;
    app.expanded = false;
    assert!(app.return_to_playing());
    assert_eq!(app.album_cursor, 1);
    assert!(app.expanded);
    assert_eq!(app.track_cursor, Some(0));
}

#[test]
fn clear_queue_stops_and_can_be_undone() {
    let mut app = app();
    let (mut player, _rx) = player();
    app.play_selection(&mut player);

    app.clear_queue(&mut player);
    assert!(app.queue.is_empty());
    assert_eq!(player.state(), PlayerState::Stopped);
    assert!(app.undo());
    assert_eq!(app.queue.len(), 3);
}

#[test]
fn set_library_clamps_cursor() {
    let mut app = app();
    app.album_cursor = 1;
    app.scanning = true;
    app.set_library(Library::default());
    assert_eq!(app.album_cursor, 0);
    assert!(!app.scanning);
    assert!(app.selected_album().is_none());
}
