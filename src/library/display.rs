use crate::config::TrackDisplayField;

use super::model::Track;

/// Build a display string for a track according to the provided `fields` and separator.
///
/// This composes metadata fields (artist, title, album, filename, path) in the
/// configured order and falls back to `title` when no parts were produced.
pub fn display_from_fields(track: &Track, fields: &[TrackDisplayField], sep: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let title = track.title.trim();
    let artist = track.artist().map(str::trim).filter(|s| !s.is_empty());

    for f in fields {
        match f {
            TrackDisplayField::Display => {
                if !track.display.trim().is_empty() {
                    parts.push(track.display.trim().to_string());
                } else {
                    parts.extend(artist.map(str::to_string));
                    if !title.is_empty() {
                        parts.push(title.to_string());
                    }
                }
            }
            TrackDisplayField::Title => {
                if !title.is_empty() {
                    parts.push(title.to_string());
                }
            }
            TrackDisplayField::Artist => {
                parts.extend(artist.map(str::to_string));
            }
            TrackDisplayField::Album => {
                let album = track.album_title.trim();
                if !album.is_empty() {
                    parts.push(album.to_string());
                }
            }
            TrackDisplayField::TrackNumber => {
                if let Some(n) = track.track_number {
                    parts.push(format!("{n:02}"));
                }
            }
            TrackDisplayField::Filename => {
                if let Some(stem) = track.path.file_stem().and_then(|s| s.to_str()) {
                    if !stem.trim().is_empty() {
                        parts.push(stem.to_string());
                    }
                }
            }
            TrackDisplayField::Path => {
                parts.push(track.path.display().to_string());
            }
        }
    }

    if parts.is_empty() {
        track.title.clone()
    } else {
        parts.join(sep)
    }
}
