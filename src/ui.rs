//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`: a
//! library pane of albums on the left and the grouped play queue on the right.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::time::Duration;

use crate::app::{App, Focus};
use crate::config::{ControlsSettings, TimeField, UiSettings};
use crate::library::display_from_fields;
use crate::player::PlayerState;
use crate::queue::QueueRow;

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    [
        "[tab] pane".to_string(),
        "[j/k] up/down".to_string(),
        "[gg/G] top/bottom".to_string(),
        "[o] open album".to_string(),
        "[enter] play".to_string(),
        "[a/i] append/insert".to_string(),
        "[v/V/esc] mark/all/none".to_string(),
        "[d] remove".to_string(),
        "[u/ctrl-r] undo/redo".to_string(),
        "[C] clear".to_string(),
        "[space/p] play/pause".to_string(),
        "[s] stop".to_string(),
        "[h/l] prev/next".to_string(),
        format!("[H/L] scrub -/+{scrub_seconds}s"),
        "[r] loop".to_string(),
        "[S] stop after current".to_string(),
        "[zz] playing".to_string(),
        "[K] metadata".to_string(),
        "[q] quit".to_string(),
    ]
    .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(
    elapsed: Duration,
    total: Option<Duration>,
    ui: &UiSettings,
) -> Option<String> {
    let parts: Vec<String> = ui
        .now_playing_time_fields
        .iter()
        .filter_map(|f| match f {
            TimeField::Elapsed => Some(format_mmss(elapsed)),
            TimeField::Total => total.map(format_mmss),
            TimeField::Remaining => {
                total.map(|t| format!("-{}", format_mmss(t.saturating_sub(elapsed))))
            }
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

fn status_text(app: &App, ui: &UiSettings) -> String {
    let mut parts: Vec<String> = Vec::new();

    if app.follow_playback {
        parts.push(" CURSOR: Follow".to_string());
    } else {
        parts.push(" CURSOR: Free-roam".to_string());
    }
    parts.push(format!("LOOP: {}", app.loop_mode.label()));
    if app.stop_after_current {
        parts.push("STOP AFTER CURRENT".to_string());
    }

    let state = match app.playback {
        PlayerState::Stopped => "Stopped",
        PlayerState::Paused => "Paused",
        PlayerState::Playing => "Playing",
    };
    match &app.now_playing {
        Some(track) if app.playback != PlayerState::Stopped => {
            let song = display_from_fields(
                track,
                &ui.now_playing_track_fields,
                &ui.now_playing_track_separator,
            );
            match now_playing_time_text(app.position, app.duration, ui) {
                Some(time) => parts.push(format!("Song: {song} [{time}]")),
                None => parts.push(format!("Song: {song}")),
            }
            parts.push(state.to_string());
        }
        _ => parts.push(state.to_string()),
    }

    let mut queue_part = format!("Queue: {}", app.queue.len());
    if !app.selection.is_empty() {
        queue_part.push_str(&format!(" ({} marked)", app.selection.len()));
    }
    parts.push(queue_part);

    if app.scanning {
        parts.push("Scanning...".to_string());
    }
    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {dir}"));
    }
    if let Some(msg) = &app.status_message {
        parts.push(format!("! {msg}"));
    }

    parts.join(" • ")
}

/// Window `total` rows into `height`, keeping `selected` centered when possible.
/// Returns `(start, end, selected_in_window)`.
fn visible_window(total: usize, height: usize, selected: usize) -> (usize, usize, usize) {
    if total <= height || height == 0 {
        return (0, total, selected);
    }
    let half = height / 2;
    let mut start = selected.saturating_sub(half);
    if start + height > total {
        start = total - height;
    }
    (start, start + height, selected - start)
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let block = Block::default().borders(Borders::ALL).title(title);
    if focused {
        block.border_style(Style::default().add_modifier(Modifier::BOLD))
    } else {
        block
    }
}

fn render_list(frame: &mut Frame, area: Rect, items: Vec<ListItem>, selected: usize, block: Block) {
    let height = area.height.saturating_sub(2) as usize;
    let total = items.len();
    let (start, end, sel) = visible_window(total, height, selected);
    let visible: Vec<ListItem> = items.into_iter().skip(start).take(end - start).collect();

    let list = List::new(visible)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if total > 0 {
        state.select(Some(sel));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_library(frame: &mut Frame, app: &App, area: Rect) {
    let mut items: Vec<ListItem> = Vec::new();
    let mut selected = 0;
    let playing_path = app.now_playing.as_ref().map(|t| t.path.clone());

    for (ai, album) in app.library.albums.iter().enumerate() {
        if ai == app.album_cursor && !(app.expanded && app.track_cursor.is_some()) {
            selected = items.len();
        }
        items.push(ListItem::new(Line::from(vec![
            Span::raw(album.title.clone()).bold(),
            Span::raw(format!(" · {}", album.artist)),
        ])));

        if app.expanded && ai == app.album_cursor {
            for (ti, track) in album.tracks.iter().enumerate() {
                if Some(ti) == app.track_cursor {
                    selected = items.len();
                }
                let marker = if playing_path.as_ref() == Some(&track.path) {
                    "▶ "
                } else {
                    "  "
                };
                items.push(ListItem::new(format!("  {marker}{}", track.label())));
            }
        }
    }

    let title = if app.scanning && app.library.is_empty() {
        " library (scanning) ".to_string()
    } else {
        format!(" library ({} tracks) ", app.library.track_count())
    };
    let block = pane_block(&title, app.focus == Focus::Library);
    render_list(frame, area, items, selected, block);
}

fn draw_queue(frame: &mut Frame, app: &App, area: Rect) {
    let mut items: Vec<ListItem> = Vec::new();
    let mut selected = 0;

    for row in app.queue.rows() {
        match row {
            QueueRow::Header {
                album_title,
                album_artist,
                duration,
                tracks,
            } => {
                items.push(ListItem::new(Line::from(vec![
                    Span::raw(album_title).bold(),
                    Span::raw(format!(
                        " · {album_artist} ({tracks} tracks, {})",
                        format_mmss(duration)
                    )),
                ])));
            }
            QueueRow::Track {
                flat_index,
                track,
                grouped,
                is_current,
            } => {
                if flat_index == app.queue_cursor {
                    selected = items.len();
                }
                let mark = if app.selection.contains(&flat_index) {
                    "*"
                } else {
                    " "
                };
                let current = if is_current { "▶ " } else { "  " };
                let indent = if grouped { "  " } else { "" };
                let mut line = format!("{mark}{current}{indent}{}", track.label());
                if !grouped {
                    if let Some(artist) = track.artist() {
                        line.push_str(&format!(" · {artist}"));
                    }
                }
                let item = ListItem::new(line);
                items.push(if is_current {
                    item.style(Style::default().add_modifier(Modifier::BOLD))
                } else {
                    item
                });
            }
        }
    }

    let mut title = format!(" queue ({}) ", app.queue.len());
    if app.queue.can_undo() || app.queue.can_redo() {
        title = format!(
            " queue ({}) undo:{} redo:{} ",
            app.queue.len(),
            if app.queue.can_undo() { "yes" } else { "no" },
            if app.queue.can_redo() { "yes" } else { "no" },
        );
    }
    let block = pane_block(&title, app.focus == Focus::Queue);
    render_list(frame, area, items, selected, block);
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Format an optional duration, rounding up partial seconds, showing total seconds.
fn format_duration_mmss_ceil(d: Option<Duration>) -> String {
    let Some(d) = d else {
        return "-".to_string();
    };

    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }
    format!("{}:{:02} ({}s)", total_secs / 60, total_secs % 60, total_secs)
}

fn draw_metadata(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_sized(72, 10, area);
    frame.render_widget(Clear, popup_area);

    let meta = match app.focused_track() {
        Some(track) => {
            let number = match (track.disc_number, track.track_number) {
                (Some(d), Some(n)) => format!("{d}-{n}"),
                (None, Some(n)) => n.to_string(),
                _ => "-".to_string(),
            };
            format!(
                "Title: {}\nArtist: {}\nAlbum: {} ({})\nTrack: {}\nDuration: {}\nPath: {}",
                track.title,
                track.artist().unwrap_or("-"),
                track.album_title,
                track.album_artist,
                number,
                format_duration_mmss_ceil(track.duration),
                track.path.display()
            )
        }
        None => "No track selected".to_string(),
    };
    let meta_paragraph = Paragraph::new(meta)
        .block(
            Block::default()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .borders(Borders::ALL)
                .title(" metadata (K closes) "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(meta_paragraph, popup_area);
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(5),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" spindle ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status_par = Paragraph::new(status_text(app, ui_settings))
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[2]);
    draw_library(frame, app, panes[0]);
    draw_queue(frame, app, panes[1]);

    // Keep the popup inside the list area so it doesn't cover header/status/footer.
    if app.metadata_window {
        draw_metadata(frame, app, chunks[2]);
    }

    let footer = Paragraph::new(controls_text(controls_settings.scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}
