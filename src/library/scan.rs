use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::{Accessor, ItemKey};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::display::display_from_fields;
use super::model::{Library, Track};

const UNKNOWN_ALBUM: &str = "Unknown Album";
const UNKNOWN_ARTIST: &str = "Unknown Artist";
const COVER_NAMES: [&str; 6] = [
    "cover.jpg",
    "cover.png",
    "folder.jpg",
    "folder.png",
    "front.jpg",
    "front.png",
];

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Parse tag numbers like `3` or `3/12`.
fn leading_number(raw: &str) -> Option<u32> {
    raw.split('/').next().and_then(|n| n.trim().parse().ok())
}

fn non_empty(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn find_cover(dir: &Path, cache: &mut HashMap<PathBuf, Option<PathBuf>>) -> Option<PathBuf> {
    cache
        .entry(dir.to_path_buf())
        .or_insert_with(|| {
            COVER_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
        .clone()
}

fn read_track(path: &Path, settings: &LibrarySettings) -> Track {
    let mut track = Track {
        title: path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string(),
        track_number: None,
        disc_number: None,
        disc_subtitle: None,
        duration: None,
        path: path.to_path_buf(),
        album_title: String::new(),
        album_artist: String::new(),
        artists: Vec::new(),
        cover_thumb: None,
        display: String::new(),
    };

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            track.duration = Some(tagged.properties().duration()).filter(|d| !d.is_zero());

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = non_empty(tag.title().as_deref()) {
                    track.title = v;
                }
                track.track_number = tag
                    .track()
                    .or_else(|| tag.get_string(&ItemKey::TrackNumber).and_then(leading_number));
                track.disc_number = tag
                    .disk()
                    .or_else(|| tag.get_string(&ItemKey::DiscNumber).and_then(leading_number));
                track.disc_subtitle = non_empty(tag.get_string(&ItemKey::SetSubtitle));
                track.artists = tag
                    .get_strings(&ItemKey::TrackArtist)
                    .filter_map(|a| non_empty(Some(a)))
                    .collect();
                if let Some(v) = non_empty(tag.album().as_deref()) {
                    track.album_title = v;
                }
                if let Some(v) = non_empty(tag.get_string(&ItemKey::AlbumArtist)) {
                    track.album_artist = v;
                }
            }
        }
        Err(e) => debug!("no readable tags in {}: {e}", path.display()),
    }

    // The album artist is never empty: fall back to the first track artist.
    if track.album_artist.is_empty() {
        track.album_artist = track
            .artists
            .first()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    }
    if track.album_title.is_empty() {
        track.album_title = UNKNOWN_ALBUM.to_string();
    }

    track.display =
        display_from_fields(&track, &settings.display_fields, &settings.display_separator);
    track
}

/// Walk `dir` and read every audio file into a `Track`.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();
    let mut covers: HashMap<PathBuf, Option<PathBuf>> = HashMap::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable library entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if path.is_file()
            && (settings.include_hidden || !is_hidden(path))
            && is_audio_file(path, settings)
        {
            let mut track = read_track(path, settings);
            if let Some(parent) = path.parent() {
                track.cover_thumb = find_cover(parent, &mut covers);
            }
            tracks.push(track);
        }
    }

    tracks.sort_by(|a, b| a.display.to_lowercase().cmp(&b.display.to_lowercase()));
    tracks
}

/// Scan on a background thread and hand the grouped library back over a channel.
///
/// The worker never touches the play queue; the runtime picks the result up
/// on its own thread.
pub fn spawn_scan(dir: PathBuf, settings: LibrarySettings) -> Receiver<Library> {
    let (tx, rx) = mpsc::channel::<Library>();
    let spawned = thread::Builder::new()
        .name("library-scan".into())
        .spawn(move || {
            let started = std::time::Instant::now();
            let tracks = scan(&dir, &settings);
            let library = Library::from_tracks(tracks, settings.album_sort);
            info!(
                "scanned {} tracks in {} albums from {} ({:?})",
                library.track_count(),
                library.albums.len(),
                dir.display(),
                started.elapsed()
            );
            let _ = tx.send(library);
        });
    if let Err(e) = spawned {
        warn!("failed to start library scan: {e}");
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackDisplayField;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn is_audio_file_matches_configured_extensions_case_insensitive() {
        let settings = LibrarySettings::default();
        assert!(is_audio_file(Path::new("/tmp/a.mp3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.MP3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.flac"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.ogg"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a.txt"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a"), &settings));
    }

    #[test]
    fn leading_number_accepts_slash_totals() {
        assert_eq!(leading_number("3"), Some(3));
        assert_eq!(leading_number(" 4/12"), Some(4));
        assert_eq!(leading_number("x"), None);
    }

    #[test]
    fn untagged_files_fall_back_to_unknown_album() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Song.mp3"), b"not a real mp3").unwrap();

        let tracks = scan(dir.path(), &LibrarySettings::default());
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Song");
        assert_eq!(tracks[0].album_title, UNKNOWN_ALBUM);
        assert_eq!(tracks[0].album_artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn scan_picks_up_folder_cover() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"jpeg").unwrap();

        let tracks = scan(dir.path(), &LibrarySettings::default());
        assert_eq!(
            tracks[0].cover_thumb.as_deref(),
            Some(dir.path().join("cover.jpg").as_path())
        );
    }

    #[test]
    fn scan_respects_include_hidden_false() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hidden.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("visible.mp3"), b"not real").unwrap();

        let settings = LibrarySettings {
            include_hidden: false,
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].display, "visible");
    }

    #[test]
    fn scan_respects_max_depth() {
        let dir = tempdir().unwrap();
        let d1 = dir.path().join("d1");
        let d2 = d1.join("d2");
        fs::create_dir_all(&d2).unwrap();
        fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
        fs::write(d1.join("one.mp3"), b"not real").unwrap();
        fs::write(d2.join("two.mp3"), b"not real").unwrap();

        // WalkDir depth counts root as 0, children as 1, grandchildren as 2...
        let settings = LibrarySettings {
            max_depth: Some(2),
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings);

        let names: Vec<String> = tracks.iter().map(|t| t.display.clone()).collect();
        assert!(names.contains(&"root".to_string()));
        assert!(names.contains(&"one".to_string()));
        assert!(!names.contains(&"two".to_string()));
    }

    #[test]
    fn spawn_scan_delivers_grouped_library() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp3"), b"not real").unwrap();
        fs::write(dir.path().join("b.mp3"), b"not real").unwrap();

        let rx = spawn_scan(dir.path().to_path_buf(), LibrarySettings::default());
        let library = rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .unwrap();
        assert_eq!(library.albums.len(), 1);
        assert_eq!(library.track_count(), 2);
    }
}
