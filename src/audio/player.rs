use std::fs::File;
use std::io::BufReader;
use std::sync::{
    mpsc::{self, Sender},
    Mutex,
};
use std::thread;

use rodio::{Decoder, OutputStream, Sink};

use super::{tones::CueTone, CueAsset, CuePlayer};
use crate::models::{CueRequest, SoundType};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_warn};

enum CueCommand {
    Play(CueRequest),
    SetVolume(f32),
}

/// Plays cues on a dedicated audio thread that owns the non-`Send` output
/// stream. The thread is spawned on first use.
pub struct RodioCuePlayer {
    tx: Mutex<Option<Sender<CueCommand>>>,
    volume: f32,
}

impl RodioCuePlayer {
    pub fn new(volume: f32) -> Self {
        Self {
            tx: Mutex::new(None),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<CueCommand>, String> {
        let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<CueCommand>();
        let initial_volume = self.volume;

        thread::Builder::new()
            .name("cue-player".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        log_error!("Failed to open audio output: {}", e);
                        return;
                    }
                };
                let sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        log_error!("Failed to create audio sink: {}", e);
                        return;
                    }
                };
                sink.set_volume(initial_volume);

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        CueCommand::Play(cue) => {
                            if let Some(path) = custom_path(&cue) {
                                match File::open(path)
                                    .map_err(|e| e.to_string())
                                    .and_then(|f| {
                                        Decoder::new(BufReader::new(f)).map_err(|e| e.to_string())
                                    }) {
                                    Ok(decoded) => {
                                        sink.append(decoded);
                                        continue;
                                    }
                                    Err(e) => {
                                        log_warn!("Custom cue {} unusable ({}); using bell", path, e)
                                    }
                                }
                            }
                            sink.append(CueTone::new(CueAsset::for_sound(cue.sound)));
                        }
                        CueCommand::SetVolume(v) => sink.set_volume(v.clamp(0.0, 1.0)),
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    fn send(&self, command: CueCommand) {
        let result = self
            .ensure_thread()
            .and_then(|tx| tx.send(command).map_err(|e| e.to_string()));
        if let Err(e) = result {
            log_error!("Cue playback unavailable: {}", e);
            // Drop the dead sender so the next cue retries the thread.
            if let Ok(mut guard) = self.tx.lock() {
                guard.take();
            }
        }
    }
}

fn custom_path(cue: &CueRequest) -> Option<&str> {
    match cue.sound {
        SoundType::Custom => cue.sound_url.as_deref().filter(|p| !p.is_empty()),
        _ => None,
    }
}

impl CuePlayer for RodioCuePlayer {
    fn play_cue(&self, cue: &CueRequest) {
        self.send(CueCommand::Play(cue.clone()));
    }

    fn set_volume(&self, volume: f32) {
        self.send(CueCommand::SetVolume(volume));
    }
}
