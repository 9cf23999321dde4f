use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use log::{debug, warn};
use zbus::object_server::SignalEmitter;
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::player::{LoopMode, PlayerState};
use crate::queue::TrackRef;

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.spindle";

/// Requests coming in over D-Bus, handled on the runtime thread.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative seek in microseconds.
    SeekBy(i64),
    /// Absolute seek in microseconds, valid only for the named track.
    SetPosition { track_id: String, micros: i64 },
    SetLoop(LoopMode),
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlayerState,
    loop_mode: LoopMode,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    album_artist: Option<String>,
    url: Option<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    track_id: Option<OwnedObjectPath>,
    position_micros: i64,
}

/// What the D-Bus thread should announce.
#[derive(Debug)]
enum Notify {
    Changed,
    Seeked(i64),
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<Notify>,
}

fn micros(d: Duration) -> i64 {
    d.as_micros().min(i64::MAX as u128) as i64
}

/// D-Bus object path naming a queue slot.
pub fn track_object_path(index: usize) -> String {
    format!("{OBJECT_PATH}/track/{index}")
}

fn loop_status(mode: LoopMode) -> &'static str {
    match mode {
        LoopMode::None => "None",
        LoopMode::Track => "Track",
        LoopMode::Playlist => "Playlist",
    }
}

fn parse_loop_status(s: &str) -> Option<LoopMode> {
    match s {
        "None" => Some(LoopMode::None),
        "Track" => Some(LoopMode::Track),
        "Playlist" => Some(LoopMode::Playlist),
        _ => None,
    }
}

impl MprisHandle {
    fn update(&self, f: impl FnOnce(&mut SharedState)) {
        if let Ok(mut s) = self.state.lock() {
            f(&mut s);
        }
        let _ = self.notify.send(Notify::Changed);
    }

    pub fn set_playback(&self, playback: PlayerState) {
        self.update(|s| s.playback = playback);
    }

    pub fn set_loop_mode(&self, mode: LoopMode) {
        self.update(|s| s.loop_mode = mode);
    }

    /// Publish the track at queue slot `index`, or clear the metadata.
    pub fn set_track_metadata(&self, index: Option<usize>, track: Option<&TrackRef>) {
        self.update(|s| match (index, track) {
            (Some(i), Some(t)) => {
                s.title = Some(t.title.clone());
                s.artist = if t.artists.is_empty() {
                    vec![t.album_artist.clone()]
                } else {
                    t.artists.clone()
                };
                s.album = Some(t.album_title.clone());
                s.album_artist = Some(t.album_artist.clone());
                s.url = Some(t.uri());
                s.art_url = t
                    .cover_thumb
                    .as_ref()
                    .map(|p| format!("file://{}", p.display()));
                s.length_micros = t.duration.map(micros);
                s.track_id = ObjectPath::try_from(track_object_path(i))
                    .ok()
                    .map(OwnedObjectPath::from);
                s.position_micros = 0;
            }
            _ => {
                s.title = None;
                s.artist.clear();
                s.album = None;
                s.album_artist = None;
                s.url = None;
                s.art_url = None;
                s.length_micros = None;
                s.track_id = None;
                s.position_micros = 0;
            }
        });
    }

    /// Track the position without announcing it; clients poll `Position`.
    pub fn set_position(&self, position: Duration) {
        if let Ok(mut s) = self.state.lock() {
            s.position_micros = micros(position);
        }
    }

    pub fn seeked(&self, position: Duration) {
        self.set_position(position);
        let _ = self.notify.send(Notify::Seeked(micros(position)));
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "spindle"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

fn insert(map: &mut HashMap<String, OwnedValue>, key: &str, value: Value<'_>) {
    if let Ok(v) = OwnedValue::try_from(value) {
        map.insert(key.to_string(), v);
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::SeekBy(offset));
    }

    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        let _ = self.tx.send(ControlCmd::SetPosition {
            track_id: track_id.as_str().to_string(),
            micros: position,
        });
    }

    #[zbus(signal)]
    async fn seeked(emitter: &SignalEmitter<'_>, position: i64) -> zbus::Result<()>;

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.playback {
            PlayerState::Stopped => "Stopped",
            PlayerState::Playing => "Playing",
            PlayerState::Paused => "Paused",
        }
    }

    #[zbus(property)]
    fn loop_status(&self) -> &str {
        self.state
            .lock()
            .map(|s| loop_status(s.loop_mode))
            .unwrap_or("None")
    }

    #[zbus(property)]
    fn set_loop_status(&mut self, value: String) -> zbus::fdo::Result<()> {
        let mode = parse_loop_status(&value)
            .ok_or_else(|| zbus::fdo::Error::InvalidArgs(format!("unknown loop status {value}")))?;
        let _ = self.tx.send(ControlCmd::SetLoop(mode));
        Ok(())
    }

    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn minimum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn maximum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let track_id = s
            .track_id
            .clone()
            .or_else(|| {
                ObjectPath::try_from("/org/mpris/MediaPlayer2/TrackList/NoTrack")
                    .ok()
                    .map(OwnedObjectPath::from)
            });
        if let Some(id) = track_id {
            insert(&mut map, "mpris:trackid", Value::from(id.into_inner()));
        }
        if let Some(title) = &s.title {
            insert(&mut map, "xesam:title", Value::from(title.clone()));
        }
        if !s.artist.is_empty() {
            insert(&mut map, "xesam:artist", Value::from(s.artist.clone()));
        }
        if let Some(album) = &s.album {
            insert(&mut map, "xesam:album", Value::from(album.clone()));
        }
        if let Some(album_artist) = &s.album_artist {
            insert(
                &mut map,
                "xesam:albumArtist",
                Value::from(vec![album_artist.clone()]),
            );
        }
        if let Some(url) = &s.url {
            insert(&mut map, "xesam:url", Value::from(url.clone()));
        }
        if let Some(art) = &s.art_url {
            insert(&mut map, "mpris:artUrl", Value::from(art.clone()));
        }
        if let Some(len) = s.length_micros {
            insert(&mut map, "mpris:length", Value::from(len));
        }
        map
    }
}

async fn announce(connection: &Connection, notify: Notify) -> zbus::Result<()> {
    let iface_ref = connection
        .object_server()
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    let emitter = iface_ref.signal_emitter();
    match notify {
        Notify::Changed => {
            let iface = iface_ref.get().await;
            iface.playback_status_changed(emitter).await?;
            iface.loop_status_changed(emitter).await?;
            iface.metadata_changed(emitter).await?;
        }
        Notify::Seeked(position) => PlayerIface::seeked(emitter, position).await?,
    }
    Ok(())
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify: Receiver<Notify>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server
        .at(OBJECT_PATH, RootIface { tx: tx.clone() })
        .await?;
    object_server.at(OBJECT_PATH, PlayerIface { tx, state }).await?;
    debug!("mpris: serving {BUS_NAME}");

    loop {
        match notify.try_recv() {
            Ok(n) => {
                if let Err(e) = announce(&connection, n).await {
                    debug!("mpris: failed to emit change: {e}");
                }
            }
            Err(TryRecvError::Empty) => {
                Timer::after(Duration::from_millis(100)).await;
            }
            Err(TryRecvError::Disconnected) => return Ok(()),
        }
    }
}

pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<Notify>();

    let state_for_thread = state.clone();
    let spawned = std::thread::Builder::new()
        .name("mpris".into())
        .spawn(move || {
            if let Err(e) = block_on(serve(tx, state_for_thread, notify_rx)) {
                warn!("mpris: unavailable: {e}");
            }
        });
    if let Err(e) = spawned {
        warn!("mpris: failed to start thread: {e}");
    }

    MprisHandle {
        state,
        notify: notify_tx,
    }
}

#[cfg(test)]
mod tests;
