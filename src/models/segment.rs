use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Symbolic cue identifier fired when a segment is exited.
///
/// Unknown identifiers coming from storage deserialize as [`SoundType::Default`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SoundType {
    Bell,
    Chime,
    Beep,
    Alarm,
    Custom,
    #[default]
    #[serde(other)]
    Default,
}

impl SoundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundType::Default => "default",
            SoundType::Bell => "bell",
            SoundType::Chime => "chime",
            SoundType::Beep => "beep",
            SoundType::Alarm => "alarm",
            SoundType::Custom => "custom",
        }
    }

    /// Lenient lookup; anything unrecognised resolves to `Default`.
    pub fn from_id(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "bell" => SoundType::Bell,
            "chime" => SoundType::Chime,
            "beep" => SoundType::Beep,
            "alarm" => SoundType::Alarm,
            "custom" => SoundType::Custom,
            _ => SoundType::Default,
        }
    }
}

/// One phase of a combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimingSegment {
    pub id: String,
    pub name: String,
    /// Whole seconds. Zero is tolerated and skipped over by the engine.
    pub duration: u64,
    pub color: String,
    pub show_time: bool,
    /// Fire `sound_type` when this segment ends.
    pub play_sound: bool,
    #[serde(default)]
    pub sound_type: SoundType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_url: Option<String>,
}

impl TimingSegment {
    pub fn new(name: impl Into<String>, duration: u64, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            duration,
            color: color.into(),
            show_time: true,
            play_sound: true,
            sound_type: SoundType::Default,
            sound_url: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_sound(mut self, play_sound: bool, sound_type: SoundType) -> Self {
        self.play_sound = play_sound;
        self.sound_type = sound_type;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.show_time = false;
        self
    }

    /// Cue to fire when this segment is left, if it asks for one.
    pub fn exit_cue(&self) -> Option<CueRequest> {
        self.play_sound.then(|| CueRequest {
            sound: self.sound_type,
            sound_url: self.sound_url.clone(),
        })
    }
}

/// Fire-and-forget request handed to the cue player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CueRequest {
    pub sound: SoundType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_url: Option<String>,
}
