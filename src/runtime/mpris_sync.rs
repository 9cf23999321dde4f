use crate::app::App;
use crate::mpris::MprisHandle;
use crate::player::PlayerEvent;

/// Publish everything MPRIS shows, e.g. after startup.
pub fn update_mpris(mpris: &MprisHandle, app: &App) {
    mpris.set_track_metadata(app.queue.index(), app.now_playing.as_ref());
    mpris.set_playback(app.playback);
    mpris.set_loop_mode(app.loop_mode);
}

/// Forward one player notification.
pub fn publish_event(mpris: &MprisHandle, app: &App, event: &PlayerEvent) {
    match event {
        PlayerEvent::StateChanged(state) => mpris.set_playback(*state),
        PlayerEvent::NowPlaying(track) => {
            mpris.set_track_metadata(app.queue.index(), track.as_ref())
        }
        PlayerEvent::LoopModeChanged(mode) => mpris.set_loop_mode(*mode),
        PlayerEvent::Seeked(position) => mpris.seeked(*position),
        PlayerEvent::StopAfterCurrentChanged(_) | PlayerEvent::Error(_) => {}
    }
}
