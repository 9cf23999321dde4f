use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use crate::library::{Album, Track};

/// Shared handle to an immutable track. Queue snapshots clone handles, not tags.
pub type TrackRef = Arc<Track>;

/// An album's tracks queued together. Never empty.
#[derive(Debug, Clone)]
pub struct AlbumGroup {
    pub album_title: String,
    pub album_artist: String,
    duration: Duration,
    children: Vec<TrackRef>,
}

impl AlbumGroup {
    /// Build a group, or `None` when there are no tracks.
    pub fn new(
        album_title: impl Into<String>,
        album_artist: impl Into<String>,
        children: Vec<TrackRef>,
    ) -> Option<Self> {
        if children.is_empty() {
            return None;
        }
        let mut group = Self {
            album_title: album_title.into(),
            album_artist: album_artist.into(),
            duration: Duration::ZERO,
            children,
        };
        group.recompute_duration();
        Some(group)
    }

    /// Group `tracks` under the album tags of the first one.
    pub fn from_tracks(children: Vec<TrackRef>) -> Option<Self> {
        let first = children.first()?;
        let (title, artist) = (first.album_title.clone(), first.album_artist.clone());
        Self::new(title, artist, children)
    }

    pub fn from_album(album: &Album) -> Option<Self> {
        Self::new(album.title.clone(), album.artist.clone(), album.tracks.clone())
    }

    pub fn children(&self) -> &[TrackRef] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Sum of the known child durations.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Remove a contiguous run of children. Returns true when the group is now empty.
    pub(super) fn drain_children(&mut self, range: Range<usize>) -> bool {
        self.children.drain(range);
        self.recompute_duration();
        self.children.is_empty()
    }

    /// Split off the children from `at` onwards into a sibling group with the same tags.
    pub(super) fn split_off(&mut self, at: usize) -> Option<AlbumGroup> {
        if at == 0 || at >= self.children.len() {
            return None;
        }
        let tail = self.children.split_off(at);
        self.recompute_duration();
        AlbumGroup::new(self.album_title.clone(), self.album_artist.clone(), tail)
    }

    fn recompute_duration(&mut self) {
        self.duration = self.children.iter().filter_map(|t| t.duration).sum();
    }
}

/// One root element of the queue.
#[derive(Debug, Clone)]
pub enum QueueEntry {
    Lone(TrackRef),
    Group(AlbumGroup),
}

impl QueueEntry {
    /// Number of flat slots this entry occupies.
    pub fn len(&self) -> usize {
        match self {
            QueueEntry::Lone(_) => 1,
            QueueEntry::Group(g) => g.len(),
        }
    }

    pub fn tracks(&self) -> &[TrackRef] {
        match self {
            QueueEntry::Lone(t) => std::slice::from_ref(t),
            QueueEntry::Group(g) => g.children(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, QueueEntry::Group(_))
    }
}
