use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};
use rodio::{OutputStreamBuilder, Sink};

use crate::config::AudioSettings;
use crate::error::BackendError;
use crate::player::{BackendEvent, PlayerState, StampedEvent};

use super::sink::open_source;
use super::types::{Slot, SlotTracker, Status, StatusHandle, WorkerCmd};

fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    let start = sink.volume();
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(start * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}

fn set_status(status: &StatusHandle, f: impl FnOnce(&mut Status)) {
    if let Ok(mut s) = status.lock() {
        f(&mut s);
    }
}

fn send(events: &Sender<StampedEvent>, generation: u64, event: BackendEvent) {
    if events.send(StampedEvent { generation, event }).is_err() {
        debug!("audio: event receiver gone");
    }
}

/// Spawn the worker that owns the output stream and the sink.
///
/// Sources are appended to a single sink, so a uri loaded while another one
/// plays follows it without a gap. The playback state in `status` belongs to
/// the handle; the worker only publishes position and duration.
pub(super) fn spawn_audio_thread(
    rx: Receiver<WorkerCmd>,
    events: Sender<StampedEvent>,
    status: StatusHandle,
    settings: AudioSettings,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("audio".into())
        .spawn(move || {
            let mut stream = match OutputStreamBuilder::open_default_stream() {
                Ok(s) => s,
                Err(e) => {
                    send(
                        &events,
                        0,
                        BackendEvent::Error(BackendError::OutputDevice(e.to_string())),
                    );
                    return;
                }
            };
            // rodio logs to stderr when the stream is dropped, which corrupts the TUI.
            stream.log_on_drop(false);

            let sink = Sink::connect_new(stream.mixer());
            sink.pause();
            let mut slots =
                SlotTracker::new(Duration::from_millis(settings.about_to_finish_ms));
            let tick = Duration::from_millis(settings.worker_tick_ms.max(1));
            let mut generation = 0;

            loop {
                match rx.recv_timeout(tick) {
                    Ok(WorkerCmd::Load(uri)) => match open_source(&uri) {
                        Ok((source, duration)) => {
                            if slots.is_empty() {
                                sink.clear();
                                slots.reset();
                                set_status(&status, |s| {
                                    s.position = Duration::ZERO;
                                    s.duration = duration;
                                });
                            }
                            debug!("audio: appended {uri} ({duration:?})");
                            sink.append(source);
                            slots.push(Slot { uri, duration });
                        }
                        Err(e) => send(&events, generation, BackendEvent::Error(e)),
                    },
                    Ok(WorkerCmd::Play) => {
                        sink.play();
                        if let Some(ev) = slots.announce() {
                            send(&events, generation, ev);
                        }
                    }
                    Ok(WorkerCmd::Pause) => {
                        sink.pause();
                    }
                    Ok(WorkerCmd::Stop { generation: next }) => {
                        // `clear` also pauses the sink.
                        sink.clear();
                        generation = next;
                        slots.reset();
                        set_status(&status, |s| {
                            s.position = Duration::ZERO;
                            s.duration = None;
                        });
                    }
                    Ok(WorkerCmd::Seek(target)) => {
                        if let Err(e) = sink.try_seek(target) {
                            warn!("audio: {}", BackendError::Seek(e.to_string()));
                        } else {
                            set_status(&status, |s| s.position = target);
                        }
                        send(&events, generation, BackendEvent::SeekDone);
                    }
                    Ok(WorkerCmd::Quit { fade_out_ms }) => {
                        if !sink.is_paused() && !sink.empty() {
                            fade_out_sink(&sink, fade_out_ms);
                        }
                        sink.stop();
                        set_status(&status, |s| s.state = PlayerState::Stopped);
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if sink.is_paused() || slots.is_empty() {
                            continue;
                        }
                        let pos = sink.get_pos();
                        for ev in slots.observe(sink.len(), pos) {
                            match ev {
                                BackendEvent::StreamStart => {
                                    if let Some(front) = slots.front() {
                                        debug!("audio: now playing {}", front.uri);
                                    }
                                }
                                BackendEvent::EndOfStream => sink.pause(),
                                _ => {}
                            }
                            send(&events, generation, ev);
                        }
                        let duration = slots.front().and_then(|s| s.duration);
                        if !slots.is_empty() {
                            set_status(&status, |s| {
                                s.position = sink.get_pos();
                                s.duration = duration;
                            });
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })
}
