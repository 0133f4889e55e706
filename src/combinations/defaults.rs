use chrono::{DateTime, Utc};

use crate::models::{SoundType, TimingCombination, TimingSegment};

pub const GREEN: &str = "#4ade80";
pub const YELLOW: &str = "#facc15";
pub const RED: &str = "#f87171";

pub const TABLE_TOPICS_ID: &str = "table_topics";
pub const PREPARED_SPEECH_ID: &str = "prepared_speech";
pub const EVALUATION_ID: &str = "evaluation";
pub const SELF_INTRO_ID: &str = "self_intro";

fn segment(id: &str, name: &str, duration: u64, color: &str, play_sound: bool) -> TimingSegment {
    TimingSegment::new(name, duration, color)
        .with_id(id)
        .with_sound(play_sound, SoundType::Default)
}

fn builtin(id: &str, name: &str, segments: Vec<TimingSegment>) -> TimingCombination {
    let shipped = DateTime::<Utc>::default();
    TimingCombination {
        id: id.to_string(),
        name: name.to_string(),
        segments,
        created_at: shipped,
        updated_at: shipped,
    }
}

/// Built-in combinations. Always selectable, never persisted or deleted.
pub fn default_combinations() -> Vec<TimingCombination> {
    vec![
        builtin(
            TABLE_TOPICS_ID,
            "Impromptu Speech",
            vec![
                segment("tt_green", "Normal", 60, GREEN, false),
                segment("tt_yellow", "Caution", 60, YELLOW, true),
                segment("tt_red", "Warning", 30, RED, true),
            ],
        ),
        builtin(
            PREPARED_SPEECH_ID,
            "Prepared Speech",
            vec![
                segment("ps_green", "Normal", 300, GREEN, false),
                segment("ps_yellow", "Caution", 120, YELLOW, true),
                segment("ps_red", "Warning", 30, RED, true),
            ],
        ),
        builtin(
            EVALUATION_ID,
            "Evaluation",
            vec![
                segment("eval_green", "Normal", 120, GREEN, false),
                segment("eval_yellow", "Caution", 60, YELLOW, true),
                segment("eval_red", "Warning", 30, RED, true),
            ],
        ),
        builtin(
            SELF_INTRO_ID,
            "Self-Introduction",
            vec![
                segment("intro_green", "Normal", 30, GREEN, true),
                segment("intro_red", "Warning", 30, RED, true),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_totals() {
        let totals: Vec<(String, u64)> = default_combinations()
            .iter()
            .map(|c| (c.id.clone(), c.total_duration()))
            .collect();
        assert_eq!(
            totals,
            vec![
                (TABLE_TOPICS_ID.to_string(), 150),
                (PREPARED_SPEECH_ID.to_string(), 450),
                (EVALUATION_ID.to_string(), 210),
                (SELF_INTRO_ID.to_string(), 60),
            ]
        );
    }

    #[test]
    fn every_default_is_playable() {
        assert!(default_combinations().iter().all(|c| c.is_playable()));
    }
}
