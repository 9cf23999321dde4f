//! Saving the play queue and position on exit and restoring them on start.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::library::Track;
use crate::queue::{AlbumGroup, PlayQueue, QueueEntry, flatten};

/// Structured snapshot of the queue, as written to `session.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub queue: Vec<SessionEntry>,
    #[serde(default)]
    pub current: Option<CurrentSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEntry {
    Lone {
        track: Track,
    },
    Group {
        album_title: String,
        album_artist: String,
        tracks: Vec<Track>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSnapshot {
    pub index: usize,
    #[serde(default)]
    pub track: Option<Track>,
    #[serde(default)]
    pub position_ms: u64,
}

/// Capture the queue and the playback position.
pub fn export(queue: &PlayQueue, position: Duration) -> SessionSnapshot {
    let entries = queue
        .entries()
        .iter()
        .map(|entry| match entry {
            QueueEntry::Lone(track) => SessionEntry::Lone {
                track: Track::clone(track),
            },
            QueueEntry::Group(g) => SessionEntry::Group {
                album_title: g.album_title.clone(),
                album_artist: g.album_artist.clone(),
                tracks: g.children().iter().map(|t| Track::clone(t)).collect(),
            },
        })
        .collect();

    let current = queue.index().map(|index| CurrentSnapshot {
        index,
        track: queue.track_at(index).map(|t| Track::clone(t)),
        position_ms: position.as_millis() as u64,
    });

    SessionSnapshot {
        queue: entries,
        current,
    }
}

fn present(track: &Track) -> bool {
    let exists = track.path.is_file();
    if !exists {
        warn!("session: dropping missing file {}", track.path.display());
    }
    exists
}

/// Replace `queue` with the snapshot's contents.
///
/// An empty snapshot leaves the queue alone. Tracks whose files disappeared
/// are dropped. Returns the position to resume from when a current track
/// was restored.
pub fn import_state(queue: &mut PlayQueue, snapshot: SessionSnapshot) -> Option<Duration> {
    let entries: Vec<QueueEntry> = snapshot
        .queue
        .into_iter()
        .filter_map(|entry| match entry {
            SessionEntry::Lone { track } => {
                present(&track).then(|| QueueEntry::Lone(Arc::new(track)))
            }
            SessionEntry::Group {
                album_title,
                album_artist,
                tracks,
            } => {
                let children = tracks.into_iter().filter(present).map(Arc::new).collect();
                AlbumGroup::new(album_title, album_artist, children).map(QueueEntry::Group)
            }
        })
        .collect();

    if entries.is_empty() {
        debug!("session: nothing to restore");
        return None;
    }

    let flat = flatten(&entries);
    let current = snapshot.current;
    let index = current.as_ref().map(|c| {
        c.track
            .as_ref()
            .and_then(|saved| {
                // Prefer the saved slot, then any slot holding the same file.
                if flat.get(c.index).is_some_and(|t| **t == *saved) {
                    Some(c.index)
                } else {
                    flat.iter().position(|t| **t == *saved)
                }
            })
            .unwrap_or(c.index)
    });
    let resumed = index.is_some_and(|i| i < flat.len());
    let position = current.map(|c| Duration::from_millis(c.position_ms));

    queue.replace_state(entries, index);
    info!("session: restored {} tracks at {:?}", queue.len(), queue.index());

    if resumed { position } else { None }
}

pub fn save(path: &Path, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string(snapshot)?;
    fs::write(path, text)?;
    debug!("session: saved to {}", path.display());
    Ok(())
}

/// Read a snapshot; a missing file is not an error.
pub fn load(path: &Path) -> Result<Option<SessionSnapshot>, SessionError> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&text)?))
}
