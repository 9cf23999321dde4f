use super::sink::{open_source, uri_to_path};
use super::types::{Slot, SlotTracker};
use crate::error::BackendError;
use crate::player::BackendEvent;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

fn slot(name: &str, secs: Option<u64>) -> Slot {
    Slot {
        uri: format!("file:///music/{name}.flac"),
        duration: secs.map(Duration::from_secs),
    }
}

fn kinds(events: &[BackendEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|e| match e {
            BackendEvent::AboutToFinish => "about-to-finish",
            BackendEvent::StreamStart => "stream-start",
            BackendEvent::EndOfStream => "eos",
            BackendEvent::SeekDone => "seek-done",
            BackendEvent::Error(_) => "error",
        })
        .collect()
}

#[test]
fn uri_to_path_decodes_percent_escapes() {
    let path = uri_to_path("file:///music/My%20Album/01%20%231.flac").unwrap();
    assert_eq!(path, PathBuf::from("/music/My Album/01 #1.flac"));
}

#[test]
fn uri_to_path_rejects_other_schemes() {
    assert!(matches!(
        uri_to_path("http://example.com/a.mp3"),
        Err(BackendError::UnsupportedUri(_))
    ));
}

#[test]
fn open_source_reports_missing_files() {
    let dir = tempdir().unwrap();
    let uri = format!("file://{}/missing.flac", dir.path().display());
    assert!(matches!(open_source(&uri), Err(BackendError::Open { .. })));
}

#[test]
fn open_source_reports_undecodable_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("noise.mp3");
    std::fs::write(&path, b"definitely not audio").unwrap();
    let uri = format!("file://{}", path.display());
    assert!(matches!(open_source(&uri), Err(BackendError::Decode { .. })));
}

#[test]
fn first_play_announces_the_stream_once() {
    let mut slots = SlotTracker::new(Duration::from_secs(2));
    assert!(slots.announce().is_none());

    slots.push(slot("a", Some(60)));
    assert!(matches!(slots.announce(), Some(BackendEvent::StreamStart)));
    assert!(slots.announce().is_none());
}

#[test]
fn about_to_finish_fires_inside_the_lead_window() {
    let mut slots = SlotTracker::new(Duration::from_secs(2));
    slots.push(slot("a", Some(60)));
    slots.announce();

    assert!(slots.observe(1, Duration::from_secs(30)).is_empty());
    assert_eq!(
        kinds(&slots.observe(1, Duration::from_millis(58_500))),
        ["about-to-finish"]
    );
    // Only once per stream.
    assert!(slots.observe(1, Duration::from_millis(59_000)).is_empty());
}

#[test]
fn queued_source_becomes_a_stream_start() {
    let mut slots = SlotTracker::new(Duration::from_secs(2));
    slots.push(slot("a", Some(60)));
    slots.announce();
    slots.observe(1, Duration::from_secs(59));
    slots.push(slot("b", Some(60)));

    // The sink moved on to the second source.
    assert_eq!(kinds(&slots.observe(1, Duration::ZERO)), ["stream-start"]);
    assert_eq!(slots.len(), 1);
    assert_eq!(slots.front().unwrap().uri, "file:///music/b.flac");

    // The new stream gets its own about-to-finish.
    assert_eq!(
        kinds(&slots.observe(1, Duration::from_secs(59))),
        ["about-to-finish"]
    );
}

#[test]
fn drained_sink_with_nothing_queued_ends_the_stream() {
    let mut slots = SlotTracker::new(Duration::from_secs(2));
    slots.push(slot("a", Some(60)));
    slots.announce();
    slots.observe(1, Duration::from_secs(59));

    assert_eq!(kinds(&slots.observe(0, Duration::ZERO)), ["eos"]);
    assert!(slots.is_empty());
}

#[test]
fn unknown_length_gets_one_tick_of_grace() {
    let mut slots = SlotTracker::new(Duration::from_secs(2));
    slots.push(slot("a", None));
    slots.announce();

    assert!(slots.observe(1, Duration::from_secs(600)).is_empty());
    assert_eq!(kinds(&slots.observe(0, Duration::ZERO)), ["about-to-finish"]);
    assert_eq!(kinds(&slots.observe(0, Duration::ZERO)), ["eos"]);
}

#[test]
fn reset_forgets_queued_sources() {
    let mut slots = SlotTracker::new(Duration::from_secs(2));
    slots.push(slot("a", Some(60)));
    slots.push(slot("b", Some(60)));
    slots.reset();
    assert!(slots.is_empty());
    assert!(slots.observe(0, Duration::ZERO).is_empty());
}
