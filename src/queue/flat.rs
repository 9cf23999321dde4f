//! Linear view over grouped queue storage.
//!
//! Every helper here is derived from `&[QueueEntry]`; nothing in this module
//! mutates the queue. Lone entries take one flat slot, groups one per child.

use std::time::Duration;

use super::entry::{QueueEntry, TrackRef};

/// Expand groups into their children, in root order.
pub fn flatten(entries: &[QueueEntry]) -> Vec<TrackRef> {
    entries
        .iter()
        .flat_map(|e| e.tracks().iter().cloned())
        .collect()
}

pub fn flat_len(entries: &[QueueEntry]) -> usize {
    entries.iter().map(QueueEntry::len).sum()
}

/// Track at a flat position without building the whole flattening.
pub fn track_at(entries: &[QueueEntry], pos: usize) -> Option<&TrackRef> {
    let (root, child) = group_index_of(entries, pos);
    let entry = entries.get(root)?;
    entry.tracks().get(child.unwrap_or(0))
}

/// Map a flat position back to `(root_index, child_index)`.
///
/// `child_index` is `None` for lone entries. Positions at or after the end
/// clamp to `(entries.len(), None)`.
pub fn group_index_of(entries: &[QueueEntry], pos: usize) -> (usize, Option<usize>) {
    let mut offset = 0;
    for (root, entry) in entries.iter().enumerate() {
        let len = entry.len();
        if pos < offset + len {
            return match entry {
                QueueEntry::Lone(_) => (root, None),
                QueueEntry::Group(_) => (root, Some(pos - offset)),
            };
        }
        offset += len;
    }
    (entries.len(), None)
}

/// Flat position of the first slot of `root`.
pub fn flat_offset_of(entries: &[QueueEntry], root: usize) -> usize {
    entries.iter().take(root).map(QueueEntry::len).sum()
}

/// A display row of the queue projection.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueRow {
    /// Album header preceding a group's children.
    Header {
        album_title: String,
        album_artist: String,
        duration: Duration,
        tracks: usize,
    },
    Track {
        flat_index: usize,
        track: TrackRef,
        grouped: bool,
        is_current: bool,
    },
}

/// Regenerate the row projection used by the front-end.
pub fn rows(entries: &[QueueEntry], current: Option<usize>) -> Vec<QueueRow> {
    let mut out = Vec::with_capacity(flat_len(entries) + entries.len());
    let mut flat_index = 0;
    for entry in entries {
        if let QueueEntry::Group(g) = entry {
            out.push(QueueRow::Header {
                album_title: g.album_title.clone(),
                album_artist: g.album_artist.clone(),
                duration: g.duration(),
                tracks: g.len(),
            });
        }
        for track in entry.tracks() {
            out.push(QueueRow::Track {
                flat_index,
                track: track.clone(),
                grouped: entry.is_group(),
                is_current: current == Some(flat_index),
            });
            flat_index += 1;
        }
    }
    out
}
