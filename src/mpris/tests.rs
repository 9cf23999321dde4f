use super::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use crate::library::Track;

fn make_track() -> TrackRef {
    Arc::new(Track {
        title: "Test Title".to_string(),
        track_number: Some(3),
        disc_number: None,
        disc_subtitle: None,
        duration: Some(Duration::from_micros(1_234_567)),
        path: PathBuf::from("/tmp/music/test.mp3"),
        album_title: "Test Album".to_string(),
        album_artist: "Album Artist".to_string(),
        artists: vec!["Test Artist".to_string()],
        cover_thumb: None,
        display: "3. Test Title".to_string(),
    })
}

fn handle() -> (MprisHandle, Arc<Mutex<SharedState>>, Receiver<Notify>) {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<Notify>();
    let handle = MprisHandle {
        state: state.clone(),
        notify: notify_tx,
    };
    (handle, state, notify_rx)
}

fn iface() -> (PlayerIface, Arc<Mutex<SharedState>>, Receiver<ControlCmd>) {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (tx, rx) = mpsc::channel::<ControlCmd>();
    let iface = PlayerIface {
        tx,
        state: state.clone(),
    };
    (iface, state, rx)
}

#[test]
fn set_track_metadata_sets_and_clears_shared_state() {
    let (handle, state, notify_rx) = handle();

    let track = make_track();
    handle.set_track_metadata(Some(7), Some(&track));

    {
        let s = state.lock().unwrap();
        assert_eq!(s.title.as_deref(), Some("Test Title"));
        assert_eq!(s.artist, vec!["Test Artist".to_string()]);
        assert_eq!(s.album.as_deref(), Some("Test Album"));
        assert_eq!(s.album_artist.as_deref(), Some("Album Artist"));
        assert_eq!(s.url.as_deref(), Some("file:///tmp/music/test.mp3"));
        assert_eq!(s.length_micros, Some(1_234_567));
        assert_eq!(
            s.track_id.as_ref().map(|p| p.as_str()),
            Some("/org/mpris/MediaPlayer2/track/7")
        );
    }
    assert!(matches!(notify_rx.try_recv(), Ok(Notify::Changed)));

    handle.set_track_metadata(None, None);
    {
        let s = state.lock().unwrap();
        assert_eq!(s.title, None);
        assert!(s.artist.is_empty());
        assert_eq!(s.album, None);
        assert_eq!(s.url, None);
        assert_eq!(s.length_micros, None);
        assert!(s.track_id.is_none());
    }
}

#[test]
fn artist_falls_back_to_album_artist() {
    let (handle, state, _rx) = handle();
    let mut track = (*make_track()).clone();
    track.artists.clear();
    handle.set_track_metadata(Some(0), Some(&Arc::new(track)));

    assert_eq!(
        state.lock().unwrap().artist,
        vec!["Album Artist".to_string()]
    );
}

#[test]
fn position_updates_quietly_and_seeks_are_announced() {
    let (handle, state, notify_rx) = handle();

    handle.set_position(Duration::from_secs(2));
    assert_eq!(state.lock().unwrap().position_micros, 2_000_000);
    assert!(notify_rx.try_recv().is_err());

    handle.seeked(Duration::from_millis(1500));
    assert_eq!(state.lock().unwrap().position_micros, 1_500_000);
    assert!(matches!(notify_rx.try_recv(), Ok(Notify::Seeked(1_500_000))));
}

#[test]
fn playback_status_maps_player_state() {
    let (iface, state, _rx) = iface();

    state.lock().unwrap().playback = PlayerState::Stopped;
    assert_eq!(iface.playback_status(), "Stopped");

    state.lock().unwrap().playback = PlayerState::Playing;
    assert_eq!(iface.playback_status(), "Playing");

    state.lock().unwrap().playback = PlayerState::Paused;
    assert_eq!(iface.playback_status(), "Paused");
}

#[test]
fn loop_status_reads_and_requests_modes() {
    let (mut iface, state, rx) = iface();

    state.lock().unwrap().loop_mode = LoopMode::Playlist;
    assert_eq!(iface.loop_status(), "Playlist");

    iface.set_loop_status("Track".to_string()).unwrap();
    assert_eq!(rx.try_recv().unwrap(), ControlCmd::SetLoop(LoopMode::Track));

    assert!(iface.set_loop_status("Sometimes".to_string()).is_err());
    assert!(rx.try_recv().is_err());
}

#[test]
fn seek_methods_forward_microseconds() {
    let (iface, _state, rx) = iface();

    iface.seek(-5_000_000);
    assert_eq!(rx.try_recv().unwrap(), ControlCmd::SeekBy(-5_000_000));

    let id = ObjectPath::try_from("/org/mpris/MediaPlayer2/track/2").unwrap();
    iface.set_position(OwnedObjectPath::from(id), 42);
    assert_eq!(
        rx.try_recv().unwrap(),
        ControlCmd::SetPosition {
            track_id: track_object_path(2),
            micros: 42,
        }
    );
}

#[test]
fn metadata_includes_expected_keys_when_present() {
    let (iface, state, _rx) = iface();

    {
        let mut s = state.lock().unwrap();
        s.title = Some("Title".to_string());
        s.artist = vec!["Artist".to_string()];
        s.album = Some("Album".to_string());
        s.url = Some("file:///tmp/test.mp3".to_string());
        s.length_micros = Some(42);
        s.track_id = ObjectPath::try_from("/org/mpris/MediaPlayer2/track/1")
            .ok()
            .map(OwnedObjectPath::from);
    }

    let map = iface.metadata();
    for k in [
        "mpris:trackid",
        "xesam:title",
        "xesam:artist",
        "xesam:album",
        "xesam:url",
        "mpris:length",
    ] {
        assert!(map.contains_key(k), "missing key: {k}");
    }
}

#[test]
fn empty_metadata_still_names_a_track_id() {
    let (iface, _state, _rx) = iface();
    let map = iface.metadata();
    assert!(map.contains_key("mpris:trackid"));
    assert!(!map.contains_key("xesam:title"));
}
