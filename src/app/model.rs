//! Application model types: `App` and `Focus`.
//!
//! The `App` struct holds the scanned library, the play queue, the cursors of
//! both panes and a mirror of the player state used for drawing.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::library::{Album, Library};
use crate::player::{Backend, LoopMode, Player, PlayerEvent, PlayerState};
use crate::queue::{AlbumGroup, PlayQueue, TrackRef};

/// Which pane receives navigation keys.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Library,
    Queue,
}

/// The main application model.
pub struct App {
    pub library: Library,
    pub queue: PlayQueue,
    pub focus: Focus,

    /// Highlighted album in the library pane.
    pub album_cursor: usize,
    /// Highlighted track inside the expanded album, if any.
    pub track_cursor: Option<usize>,
    pub expanded: bool,

    /// Highlighted flat position in the queue pane.
    pub queue_cursor: usize,
    /// Marked flat positions in the queue pane.
    pub selection: BTreeSet<usize>,

    pub playback: PlayerState,
    pub loop_mode: LoopMode,
    pub stop_after_current: bool,
    pub now_playing: Option<TrackRef>,
    pub position: Duration,
    pub duration: Option<Duration>,

    pub follow_playback: bool,
    pub metadata_window: bool,
    pub current_dir: Option<String>,
    pub status_message: Option<String>,
    pub scanning: bool,
}

impl App {
    /// Create a new `App` with the provided `library` and an empty queue.
    pub fn new(library: Library) -> Self {
        Self {
            library,
            queue: PlayQueue::new(),
            focus: Focus::Library,
            album_cursor: 0,
            track_cursor: None,
            expanded: false,
            queue_cursor: 0,
            selection: BTreeSet::new(),
            playback: PlayerState::Stopped,
            loop_mode: LoopMode::None,
            stop_after_current: false,
            now_playing: None,
            position: Duration::ZERO,
            duration: None,
            follow_playback: true,
            metadata_window: false,
            current_dir: None,
            status_message: None,
            scanning: false,
        }
    }

    /// Swap in a freshly scanned library, keeping the cursor in range.
    pub fn set_library(&mut self, library: Library) {
        self.library = library;
        self.scanning = false;
        self.track_cursor = None;
        self.expanded = false;
        self.album_cursor = self
            .album_cursor
            .min(self.library.albums.len().saturating_sub(1));
    }

    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Library => Focus::Queue,
            Focus::Queue => Focus::Library,
        };
    }

    pub fn selected_album(&self) -> Option<&Album> {
        self.library.albums.get(self.album_cursor)
    }

    /// Move the cursor of the focused pane down one row.
    pub fn next(&mut self) {
        match self.focus {
            Focus::Library => match (self.expanded, self.track_cursor) {
                (true, Some(t)) => {
                    let len = self.selected_album().map_or(0, |a| a.tracks.len());
                    if t + 1 < len {
                        self.track_cursor = Some(t + 1);
                    }
                }
                _ => {
                    if self.album_cursor + 1 < self.library.albums.len() {
                        self.album_cursor += 1;
                    }
                }
            },
            Focus::Queue => {
                self.follow_playback = false;
                if self.queue_cursor + 1 < self.queue.len() {
                    self.queue_cursor += 1;
                }
            }
        }
    }

    /// Move the cursor of the focused pane up one row.
    pub fn prev(&mut self) {
        match self.focus {
            Focus::Library => match (self.expanded, self.track_cursor) {
                (true, Some(t)) => self.track_cursor = Some(t.saturating_sub(1)),
                _ => self.album_cursor = self.album_cursor.saturating_sub(1),
            },
            Focus::Queue => {
                self.follow_playback = false;
                self.queue_cursor = self.queue_cursor.saturating_sub(1);
            }
        }
    }

    pub fn first(&mut self) {
        match self.focus {
            Focus::Library if self.expanded => self.track_cursor = Some(0),
            Focus::Library => self.album_cursor = 0,
            Focus::Queue => {
                self.follow_playback = false;
                self.queue_cursor = 0;
            }
        }
    }

    pub fn last(&mut self) {
        match self.focus {
            Focus::Library if self.expanded => {
                let len = self.selected_album().map_or(0, |a| a.tracks.len());
                self.track_cursor = Some(len.saturating_sub(1));
            }
            Focus::Library => self.album_cursor = self.library.albums.len().saturating_sub(1),
            Focus::Queue => {
                self.follow_playback = false;
                self.queue_cursor = self.queue.len().saturating_sub(1);
            }
        }
    }

    /// Open the highlighted album to pick single tracks, or close it again.
    pub fn toggle_expanded(&mut self) {
        if self.selected_album().is_none() {
            return;
        }
        self.expanded = !self.expanded;
        self.track_cursor = self.expanded.then_some(0);
    }

    /// Mark or unmark the queue row under the cursor.
    pub fn toggle_selection(&mut self) {
        if self.queue_cursor >= self.queue.len() {
            return;
        }
        if !self.selection.remove(&self.queue_cursor) {
            self.selection.insert(self.queue_cursor);
        }
    }

    pub fn select_all(&mut self) {
        self.selection = (0..self.queue.len()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// The marked rows, or the row under the cursor when nothing is marked.
    pub fn effective_selection(&self) -> Vec<usize> {
        if self.selection.is_empty() {
            (self.queue_cursor < self.queue.len())
                .then_some(self.queue_cursor)
                .into_iter()
                .collect()
        } else {
            self.selection.iter().copied().collect()
        }
    }

    /// Keep the queue cursor and marks valid after the queue changed shape.
    fn queue_changed(&mut self) {
        let len = self.queue.len();
        self.selection.clear();
        self.queue_cursor = self.queue_cursor.min(len.saturating_sub(1));
    }

    /// Point the library cursor at the album of the playing track.
    pub fn return_to_playing(&mut self) -> bool {
        let Some(track) = self.now_playing.clone() else {
            return false;
        };
        let Some(album) = self.library.find_album(&track) else {
            return false;
        };
        self.album_cursor = album;
        self.expanded = true;
        self.track_cursor = self.library.albums[album]
            .tracks
            .iter()
            .position(|t| t.path == track.path);
        if let Some(index) = self.queue.index() {
            self.queue_cursor = index.min(self.queue.len().saturating_sub(1));
        }
        self.follow_playback = true;
        true
    }

    /// Mirror a player notification into the drawable state.
    pub fn apply_player_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::StateChanged(state) => {
                self.playback = *state;
                if *state == PlayerState::Stopped {
                    self.position = Duration::ZERO;
                }
            }
            PlayerEvent::NowPlaying(track) => {
                self.now_playing = track.clone();
                self.duration = track.as_ref().and_then(|t| t.duration);
                self.position = Duration::ZERO;
                if self.follow_playback {
                    if let Some(index) = self.queue.index() {
                        if index < self.queue.len() {
                            self.queue_cursor = index;
                        }
                    }
                }
            }
            PlayerEvent::LoopModeChanged(mode) => self.loop_mode = *mode,
            PlayerEvent::StopAfterCurrentChanged(on) => self.stop_after_current = *on,
            PlayerEvent::Seeked(position) => self.position = *position,
            PlayerEvent::Error(message) => self.status_message = Some(message.clone()),
        }
    }

    /// Copy the monitor's sampled position and duration.
    pub fn sync_position<B: Backend>(&mut self, player: &Player<B>) {
        self.position = player.position();
        if let Some(d) = player.duration() {
            self.duration = Some(d);
        }
    }

    /// What the library cursor points at: the album from the highlighted
    /// track on, and the index of that track within it.
    fn library_pick(&self) -> Option<(AlbumGroup, usize)> {
        let album = self.selected_album()?;
        let start = if self.expanded {
            self.track_cursor.unwrap_or(0)
        } else {
            0
        };
        Some((AlbumGroup::from_album(album)?, start))
    }

    /// Track under the library cursor: the highlighted one, or the album's first.
    pub fn picked_track(&self) -> Option<TrackRef> {
        let album = self.selected_album()?;
        let t = if self.expanded {
            self.track_cursor.unwrap_or(0)
        } else {
            0
        };
        album.tracks.get(t).cloned()
    }

    /// Track under the cursor of the focused pane.
    pub fn focused_track(&self) -> Option<TrackRef> {
        match self.focus {
            Focus::Library => self.picked_track(),
            Focus::Queue => self.queue.track_at(self.queue_cursor).cloned(),
        }
    }

    /// Replace the queue with the highlighted album and play it from the
    /// highlighted track.
    pub fn play_selection<B: Backend>(&mut self, player: &mut Player<B>) -> bool {
        let Some((group, start)) = self.library_pick() else {
            return false;
        };
        self.queue.overwrite_album(group, start);
        self.queue.remove_backups();
        self.queue_changed();
        self.follow_playback = true;
        player.play(&mut self.queue)
    }

    /// Append the highlighted album, or only the highlighted track when the
    /// album is expanded.
    pub fn append_selection<B: Backend>(&mut self, player: &mut Player<B>) -> bool {
        let added = if self.expanded {
            match self.picked_track() {
                Some(track) => self.queue.append([track]) > 0,
                None => false,
            }
        } else {
            match self.library_pick() {
                Some((group, _)) => {
                    self.queue.append_album(group);
                    true
                }
                None => false,
            }
        };
        if added {
            self.queue_changed();
            self.ready_if_stopped(player);
        }
        added
    }

    /// Queue the highlighted track to play right after the current one.
    pub fn insert_selection<B: Backend>(&mut self, player: &mut Player<B>) -> bool {
        let Some(track) = self.picked_track() else {
            return false;
        };
        self.queue.insert_after_current(track);
        self.queue_changed();
        self.ready_if_stopped(player);
        true
    }

    fn ready_if_stopped<B: Backend>(&mut self, player: &mut Player<B>) {
        if player.state() == PlayerState::Stopped {
            player.ready(&mut self.queue);
        }
    }

    /// Remove the marked queue rows (or the row under the cursor).
    pub fn remove_selected(&mut self) -> usize {
        let removal = self.queue.remove_selected(self.effective_selection());
        self.queue_changed();
        removal.removed
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.queue.undo();
        if changed {
            self.queue_changed();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.queue.redo();
        if changed {
            self.queue_changed();
        }
        changed
    }

    /// Play the queue row under the cursor.
    pub fn jump_to_cursor<B: Backend>(&mut self, player: &mut Player<B>) -> bool {
        if self.queue_cursor >= self.queue.len() {
            return false;
        }
        self.follow_playback = true;
        player.jump_to_track(&mut self.queue, self.queue_cursor)
    }

    /// Stop playback and empty the queue; the clear itself can be undone.
    pub fn clear_queue<B: Backend>(&mut self, player: &mut Player<B>) {
        player.exit(&mut self.queue);
        self.queue.clear();
        self.queue_changed();
        self.queue_cursor = 0;
    }
}
