//! Cue playback collaborator.
//!
//! The timer only ever asks for a cue by identifier and never waits on the
//! result. Implementations swallow and log their own failures.

#[cfg(feature = "audio")]
pub mod player;
#[cfg(feature = "audio")]
pub mod tones;

use std::sync::Mutex;

use crate::models::{CueRequest, SoundType};

#[cfg(feature = "audio")]
pub use player::RodioCuePlayer;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Playable asset a cue identifier resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueAsset {
    Bell,
    Chime,
    ServiceBell,
}

impl CueAsset {
    pub fn for_sound(sound: SoundType) -> Self {
        match sound {
            SoundType::Chime => CueAsset::Chime,
            SoundType::Beep | SoundType::Alarm => CueAsset::ServiceBell,
            SoundType::Bell | SoundType::Default | SoundType::Custom => CueAsset::Bell,
        }
    }
}

pub trait CuePlayer: Send + Sync {
    /// Fire and forget. Must not block and must not panic.
    fn play_cue(&self, cue: &CueRequest);

    fn set_volume(&self, _volume: f32) {}
}

/// Writes cue requests to the log instead of playing them.
#[derive(Debug, Default)]
pub struct LogCuePlayer;

impl CuePlayer for LogCuePlayer {
    fn play_cue(&self, cue: &CueRequest) {
        log_info!(
            "cue requested: {} ({:?})",
            cue.sound.as_str(),
            CueAsset::for_sound(cue.sound)
        );
    }
}

/// Keeps every request; handy for hosts that render cues themselves.
#[derive(Debug, Default)]
pub struct RecordingCuePlayer {
    played: Mutex<Vec<CueRequest>>,
}

impl RecordingCuePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<CueRequest> {
        match self.played.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn sounds(&self) -> Vec<SoundType> {
        self.played().into_iter().map(|cue| cue.sound).collect()
    }
}

impl CuePlayer for RecordingCuePlayer {
    fn play_cue(&self, cue: &CueRequest) {
        let mut guard = match self.played.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(cue.clone());
    }
}
