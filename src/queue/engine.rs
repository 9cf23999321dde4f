use std::collections::BTreeSet;
use std::ops::Range;

use log::debug;

use super::entry::{AlbumGroup, QueueEntry, TrackRef};
use super::flat::{self, QueueRow};
use super::history::{Backup, History};

/// Outcome of a bulk removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    /// Flat slots removed.
    pub removed: usize,
    /// Contiguous range deletions performed on the underlying vectors.
    pub splices: usize,
}

/// The play queue: grouped storage plus the flat playback position.
///
/// `index` is the authoritative position. `current` caches the track that was
/// at `index` the last time [`PlayQueue::get_current_track`] ran, so the two
/// can drift apart after an edit (see [`PlayQueue::index_synced`]).
/// Removing the slot at `index` marks the position desynced until the next
/// resync, whatever track slid into it.
///
/// `index` may equal `len()`: that is the "no current track" slot reached
/// after advancing past the last track.
#[derive(Debug, Default)]
pub struct PlayQueue {
    entries: Vec<QueueEntry>,
    index: Option<usize>,
    current: Option<TrackRef>,
    /// The slot at `index` was removed since the last resync.
    desynced: bool,
    history: History,
    revision: u64,
}

/// Merge sorted positions into half-open runs of consecutive values.
fn contiguous_runs(sorted: &[usize]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut iter = sorted.iter().copied();
    let Some(first) = iter.next() else {
        return runs;
    };
    let mut run = first..first + 1;
    for i in iter {
        if i == run.end {
            run.end += 1;
        } else {
            runs.push(run);
            run = i..i + 1;
        }
    }
    runs.push(run);
    runs
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Number of flat slots (tracks).
    pub fn len(&self) -> usize {
        flat::flat_len(&self.entries)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The cached current track, without resyncing.
    pub fn current(&self) -> Option<&TrackRef> {
        self.current.as_ref()
    }

    pub fn tracks(&self) -> Vec<TrackRef> {
        flat::flatten(&self.entries)
    }

    pub fn track_at(&self, pos: usize) -> Option<&TrackRef> {
        flat::track_at(&self.entries, pos)
    }

    pub fn group_index_of(&self, pos: usize) -> (usize, Option<usize>) {
        flat::group_index_of(&self.entries, pos)
    }

    pub fn rows(&self) -> Vec<QueueRow> {
        flat::rows(&self.entries, self.index)
    }

    /// Bumped on every change; lets views regenerate lazily.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.undo_depth() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history.redo_depth() > 0
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Snapshot the queue onto the undo stack. Empty queues are never saved.
    fn backup(&mut self, save_index: bool) {
        if self.entries.is_empty() {
            return;
        }
        self.history.record(Backup {
            entries: self.entries.clone(),
            saved_index: save_index.then_some(self.index),
        });
    }

    fn snapshot(&self) -> Backup {
        Backup {
            entries: self.entries.clone(),
            saved_index: Some(self.index),
        }
    }

    /// Keep `index` within `[0, len]`, or unset when the queue is empty.
    fn clamp_index(&mut self) {
        let len = self.len();
        self.index = match self.index {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len)),
            None => None,
        };
    }

    /// Append tracks as lone entries. The position is left alone.
    pub fn append(&mut self, tracks: impl IntoIterator<Item = TrackRef>) -> usize {
        let tracks: Vec<TrackRef> = tracks.into_iter().collect();
        if tracks.is_empty() {
            return 0;
        }
        self.backup(false);
        let added = tracks.len();
        self.entries.extend(tracks.into_iter().map(QueueEntry::Lone));
        self.touch();
        debug!("queue: appended {added} tracks ({} total)", self.len());
        added
    }

    pub fn append_album(&mut self, group: AlbumGroup) {
        self.backup(false);
        debug!(
            "queue: appended album {:?} ({} tracks)",
            group.album_title,
            group.len()
        );
        self.entries.push(QueueEntry::Group(group));
        self.touch();
    }

    /// Replace the whole queue with lone tracks and move to `start`.
    pub fn overwrite(&mut self, tracks: Vec<TrackRef>, start: usize) {
        let entries = tracks.into_iter().map(QueueEntry::Lone).collect();
        self.replace_all(entries, start);
    }

    /// Replace the whole queue with one album and move to `start`.
    pub fn overwrite_album(&mut self, group: AlbumGroup, start: usize) {
        self.replace_all(vec![QueueEntry::Group(group)], start);
    }

    fn replace_all(&mut self, entries: Vec<QueueEntry>, start: usize) {
        self.backup(true);
        self.entries = entries;
        let len = self.len();
        self.index = (len > 0).then(|| start.min(len - 1));
        self.touch();
        debug!("queue: overwritten with {len} tracks, starting at {:?}", self.index);
    }

    /// Insert `track` right after the current one.
    ///
    /// When the current track sits inside a group, the group is split so the
    /// new track lands between the current track and the rest of the album.
    pub fn insert_after_current(&mut self, track: TrackRef) {
        self.backup(false);
        let len = self.len();
        let lone = QueueEntry::Lone(track);

        match self.index {
            Some(i) if i < len => {
                let (root, child) = flat::group_index_of(&self.entries, i);
                let tail = match (child, &mut self.entries[root]) {
                    (Some(c), QueueEntry::Group(g)) => g.split_off(c + 1),
                    _ => None,
                };
                if let Some(tail) = tail {
                    self.entries.insert(root + 1, QueueEntry::Group(tail));
                }
                self.entries.insert(root + 1, lone);
            }
            Some(_) => self.entries.push(lone),
            None => self.entries.insert(0, lone),
        }
        self.touch();
        debug!("queue: inserted after {:?}", self.index);
    }

    /// Remove the tracks at the given flat positions.
    ///
    /// Groups whose children are all selected are dropped whole; otherwise
    /// only the selected children go. Consecutive positions are removed with
    /// one range deletion per list they touch: a run inside a group costs one
    /// splice on its children, and a run of whole entries one splice on the
    /// root list, so a run crossing a group boundary counts in
    /// [`Removal::splices`] once for each list.
    ///
    /// The position moves back by the number of removed slots before it, so
    /// it keeps pointing at the same track. When the current track itself is
    /// removed, the position stays desynced until the next
    /// [`PlayQueue::get_current_track`].
    pub fn remove_selected(&mut self, indices: impl IntoIterator<Item = usize>) -> Removal {
        let len = self.len();
        let selected: BTreeSet<usize> = indices.into_iter().filter(|&i| i < len).collect();
        if selected.is_empty() {
            return Removal::default();
        }
        self.backup(false);

        let shift = self.index.map_or(0, |cur| selected.range(..cur).count());
        if self.index.is_some_and(|cur| selected.contains(&cur)) {
            self.desynced = true;
        }

        let mut doomed_roots: Vec<usize> = Vec::new();
        let mut splices = 0;
        let mut offset = 0;
        for (root, entry) in self.entries.iter_mut().enumerate() {
            let n = entry.len();
            let local: Vec<usize> = selected
                .range(offset..offset + n)
                .map(|p| p - offset)
                .collect();
            offset += n;

            if local.is_empty() {
                continue;
            }
            if local.len() == n {
                doomed_roots.push(root);
                continue;
            }
            if let QueueEntry::Group(g) = entry {
                let mut emptied = false;
                // Back to front so earlier child indices stay valid.
                for run in contiguous_runs(&local).into_iter().rev() {
                    emptied = g.drain_children(run);
                    splices += 1;
                }
                if emptied {
                    doomed_roots.push(root);
                }
            }
        }
        for run in contiguous_runs(&doomed_roots).into_iter().rev() {
            self.entries.drain(run);
            splices += 1;
        }

        self.index = self.index.map(|i| i - shift);
        self.clamp_index();
        self.touch();
        debug!(
            "queue: removed {} tracks in {splices} splices, index now {:?}",
            selected.len(),
            self.index
        );
        Removal {
            removed: selected.len(),
            splices,
        }
    }

    /// Move the position to `pos` (clamped). Returns true when observers
    /// should refresh: the position changed, or `force` was given.
    pub fn set_index(&mut self, pos: usize, force: bool) -> bool {
        let len = self.len();
        if len == 0 {
            return false;
        }
        let pos = pos.min(len);
        let previous = self.index.replace(pos);
        let changed = previous != Some(pos);
        if changed || force {
            self.touch();
            debug!("queue: current index {previous:?} -> {pos}");
        }
        changed || force
    }

    /// True when the cached current track is the one at the position.
    ///
    /// A removed current slot is never synced, even when a copy of the same
    /// file took its place. Otherwise the cached track is compared with the
    /// track found at the position, not searched for, so a duplicate
    /// elsewhere in the queue cannot make a stale position look synced.
    pub fn index_synced(&self) -> bool {
        if self.desynced {
            return false;
        }
        match (
            self.current.as_ref(),
            self.index.and_then(|i| flat::track_at(&self.entries, i)),
        ) {
            (Some(current), Some(at)) => current == at,
            _ => false,
        }
    }

    /// Resync the cached current track from the position and return it.
    ///
    /// An unset position on a non-empty queue starts at the first track.
    pub fn get_current_track(&mut self) -> Option<TrackRef> {
        if self.index.is_none() && !self.entries.is_empty() {
            self.index = Some(0);
        }
        self.desynced = false;
        self.current = self
            .index
            .and_then(|i| flat::track_at(&self.entries, i))
            .cloned();
        self.current.clone()
    }

    fn has_track_at_index(&self) -> bool {
        self.index.is_some_and(|i| i < self.len())
    }

    /// Advance by one if synced; a desynced position already points at
    /// the track that replaced the current one.
    pub fn next(&mut self) -> bool {
        if self.index_synced() {
            if let Some(i) = self.index {
                self.index = Some((i + 1).min(self.len()));
                self.touch();
            }
        }
        self.has_track_at_index()
    }

    /// Step back by one if synced. From the past-the-end slot, jump to the
    /// last-but-one track. Returns false when there is nothing before.
    pub fn previous(&mut self) -> bool {
        let len = self.len();
        match self.index {
            Some(i) if i >= len => match len.checked_sub(2) {
                Some(target) => {
                    self.index = Some(target);
                    self.touch();
                    true
                }
                None => false,
            },
            Some(i) if i > 0 && self.index_synced() => {
                self.index = Some(i - 1);
                self.touch();
                true
            }
            Some(_) if !self.index_synced() => self.has_track_at_index(),
            _ => false,
        }
    }

    /// Advance (when synced) and return the track now at the position.
    pub fn next_track(&mut self) -> Option<TrackRef> {
        self.next();
        self.get_current_track()
    }

    /// Go back to the first track.
    pub fn restart(&mut self) {
        if !self.entries.is_empty() {
            self.index = Some(0);
            self.touch();
        }
    }

    /// Drop the cached current track; the position is kept.
    pub fn forget_current(&mut self) {
        self.current = None;
    }

    pub fn clear(&mut self) {
        self.backup(false);
        self.entries.clear();
        self.index = None;
        self.desynced = false;
        self.touch();
        debug!("queue: cleared");
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        let current = self.snapshot();
        match self.history.undo(current) {
            Some(backup) => {
                self.apply(backup);
                debug!("queue: undo, index {:?}", self.index);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        let current = self.snapshot();
        match self.history.redo(current) {
            Some(backup) => {
                self.apply(backup);
                debug!("queue: redo, index {:?}", self.index);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, backup: Backup) {
        self.entries = backup.entries;
        self.desynced = false;
        if let Some(saved) = backup.saved_index {
            self.index = saved;
        }
        self.clamp_index();
        self.touch();
    }

    /// Forget undo/redo history, e.g. when starting unrelated playback.
    pub fn remove_backups(&mut self) {
        self.history.clear();
    }

    /// Replace everything without recording history (session restore).
    pub fn replace_state(&mut self, entries: Vec<QueueEntry>, index: Option<usize>) {
        self.entries = entries;
        self.index = index;
        self.history.clear();
        self.clamp_index();
        self.get_current_track();
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::contiguous_runs;

    #[test]
    fn contiguous_runs_merges_neighbours() {
        assert_eq!(contiguous_runs(&[]), Vec::<std::ops::Range<usize>>::new());
        assert_eq!(contiguous_runs(&[4]), vec![4..5]);
        assert_eq!(contiguous_runs(&[0, 1, 2, 5, 6, 9]), vec![0..3, 5..7, 9..10]);
    }
}
