use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AlbumSort;

/// A single audio file and the tags the player cares about.
///
/// Tracks are compared by `path` only: two values pointing at the same file
/// are the same track even if their tags were read at different times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub disc_number: Option<u32>,
    #[serde(default)]
    pub disc_subtitle: Option<String>,
    #[serde(default)]
    pub duration: Option<Duration>,
    pub path: PathBuf,
    #[serde(default)]
    pub album_title: String,
    #[serde(default)]
    pub album_artist: String,
    /// Contributing artists, in tag order.
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub cover_thumb: Option<PathBuf>,
    /// One-line label built by the scanner from the configured fields.
    #[serde(default)]
    pub display: String,
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl Track {
    /// Percent-encoded `file://` URI for the backend.
    pub fn uri(&self) -> String {
        let raw = self.path.to_string_lossy();
        let encoded: Vec<String> = raw
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let joined = encoded.join("/");
        if joined.starts_with('/') {
            format!("file://{joined}")
        } else {
            format!("file:///{joined}")
        }
    }

    /// Label used when no display string was produced.
    pub fn label(&self) -> &str {
        if self.display.trim().is_empty() {
            &self.title
        } else {
            &self.display
        }
    }

    /// Primary artist: the first contributing artist, else the album artist.
    pub fn artist(&self) -> Option<&str> {
        self.artists
            .first()
            .map(String::as_str)
            .or_else(|| Some(self.album_artist.as_str()).filter(|a| !a.is_empty()))
    }

    fn album_order(&self) -> (u32, u32) {
        (
            self.disc_number.unwrap_or(0),
            self.track_number.unwrap_or(0),
        )
    }
}

/// An album as found on disk: its tracks in disc/track order.
#[derive(Debug, Clone)]
pub struct Album {
    pub title: String,
    pub artist: String,
    pub tracks: Vec<Arc<Track>>,
}

impl Album {
    pub fn duration(&self) -> Duration {
        self.tracks.iter().filter_map(|t| t.duration).sum()
    }
}

/// Albums built from a scan, in the configured sort order.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub albums: Vec<Album>,
}

impl Library {
    /// Group `tracks` into albums keyed by `(album_title, album_artist)`.
    pub fn from_tracks(tracks: Vec<Track>, sort: AlbumSort) -> Self {
        let mut slots: HashMap<(String, String), usize> = HashMap::new();
        let mut albums: Vec<Album> = Vec::new();

        for track in tracks {
            let key = (track.album_title.clone(), track.album_artist.clone());
            let slot = *slots.entry(key).or_insert_with(|| {
                albums.push(Album {
                    title: track.album_title.clone(),
                    artist: track.album_artist.clone(),
                    tracks: Vec::new(),
                });
                albums.len() - 1
            });
            albums[slot].tracks.push(Arc::new(track));
        }

        for album in &mut albums {
            album.tracks.sort_by(|a, b| {
                a.album_order()
                    .cmp(&b.album_order())
                    .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            });
        }

        match sort {
            AlbumSort::Artist => albums.sort_by(|a, b| {
                a.artist
                    .to_lowercase()
                    .cmp(&b.artist.to_lowercase())
                    .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            }),
            AlbumSort::Title => {
                albums.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            }
        }

        Self { albums }
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    pub fn track_count(&self) -> usize {
        self.albums.iter().map(|a| a.tracks.len()).sum()
    }

    /// Index of the album a track belongs to.
    pub fn find_album(&self, track: &Track) -> Option<usize> {
        self.albums.iter().position(|a| {
            a.title == track.album_title && a.artist == track.album_artist
        })
    }
}
