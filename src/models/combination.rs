//! Timing combinations and the pure derivations the timer and history views
//! compute over them.
//!
//! Nothing here is cached: offsets, remaining time and progress are derived
//! from the segment list and an elapsed-seconds value every time they are
//! asked for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::segment::TimingSegment;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimingCombination {
    pub id: String,
    pub name: String,
    /// Playback order.
    pub segments: Vec<TimingSegment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimingCombination {
    pub fn new(name: impl Into<String>, segments: Vec<TimingSegment>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            segments,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_playable(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.segments.len().checked_sub(1)
    }

    /// Sum of the durations of segments `[0, index)`.
    ///
    /// Indices past the end saturate at the total duration.
    pub fn cumulative_offset(&self, index: usize) -> u64 {
        self.segments
            .iter()
            .take(index)
            .map(|segment| segment.duration)
            .sum()
    }

    pub fn total_duration(&self) -> u64 {
        self.segments.iter().map(|segment| segment.duration).sum()
    }

    /// Index of the segment covering `elapsed`.
    ///
    /// Zero-length segments never cover any instant and are skipped. Once
    /// `elapsed` reaches the total duration the last index is returned.
    /// `None` only for a combination without segments.
    pub fn segment_at(&self, elapsed: u64) -> Option<usize> {
        let last = self.last_index()?;
        let mut end = 0u64;
        for (index, segment) in self.segments.iter().enumerate() {
            end = end.saturating_add(segment.duration);
            if elapsed < end {
                return Some(index);
            }
        }
        Some(last)
    }

    /// Seconds left in segment `index` at `elapsed`, clamped at zero.
    pub fn remaining_in_segment(&self, index: usize, elapsed: u64) -> u64 {
        let Some(segment) = self.segments.get(index) else {
            return 0;
        };
        let end = self.cumulative_offset(index).saturating_add(segment.duration);
        end.saturating_sub(elapsed)
    }

    /// Fraction of segment `index` that has been consumed, in `0.0..=1.0`.
    pub fn segment_progress(&self, index: usize, elapsed: u64) -> f64 {
        let Some(segment) = self.segments.get(index) else {
            return 0.0;
        };
        if segment.duration == 0 {
            return 1.0;
        }
        let into = elapsed.saturating_sub(self.cumulative_offset(index));
        (into as f64 / segment.duration as f64).min(1.0)
    }

    pub fn overall_progress(&self, elapsed: u64) -> f64 {
        let total = self.total_duration();
        if total == 0 {
            return 1.0;
        }
        (elapsed as f64 / total as f64).min(1.0)
    }

    /// Seconds counted past the nominal total, if any.
    pub fn overtime(&self, elapsed: u64) -> Option<u64> {
        let over = elapsed.saturating_sub(self.total_duration());
        (over > 0).then_some(over)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(durations: &[u64]) -> TimingCombination {
        let segments = durations
            .iter()
            .enumerate()
            .map(|(i, d)| TimingSegment::new(format!("s{i}"), *d, "#fff").with_id(format!("s{i}")))
            .collect();
        TimingCombination::new("test", segments, Utc::now())
    }

    #[test]
    fn offsets_and_total() {
        let c = combo(&[60, 60, 30]);
        assert_eq!(c.cumulative_offset(0), 0);
        assert_eq!(c.cumulative_offset(1), 60);
        assert_eq!(c.cumulative_offset(2), 120);
        assert_eq!(c.cumulative_offset(3), 150);
        assert_eq!(c.cumulative_offset(10), 150);
        assert_eq!(c.total_duration(), 150);
    }

    #[test]
    fn segment_at_matches_offsets_for_every_second() {
        let c = combo(&[3, 1, 4, 2]);
        for t in 0..c.total_duration() {
            let i = c.segment_at(t).unwrap();
            assert!(c.cumulative_offset(i) <= t, "t={t}");
            assert!(t < c.cumulative_offset(i + 1), "t={t}");
        }
    }

    #[test]
    fn segment_at_clamps_to_last_segment() {
        let c = combo(&[2, 3]);
        assert_eq!(c.segment_at(5), Some(1));
        assert_eq!(c.segment_at(500), Some(1));
        assert_eq!(c.remaining_in_segment(1, 500), 0);
    }

    #[test]
    fn segment_at_skips_zero_length_segments() {
        let c = combo(&[2, 0, 0, 3]);
        assert_eq!(c.segment_at(1), Some(0));
        assert_eq!(c.segment_at(2), Some(3));

        let trailing = combo(&[2, 0]);
        assert_eq!(trailing.segment_at(2), Some(1));
    }

    #[test]
    fn empty_combination_has_no_segment() {
        let c = combo(&[]);
        assert!(!c.is_playable());
        assert_eq!(c.segment_at(0), None);
        assert_eq!(c.total_duration(), 0);
    }

    #[test]
    fn remaining_and_progress() {
        let c = combo(&[60, 30]);
        assert_eq!(c.remaining_in_segment(0, 15), 45);
        assert_eq!(c.remaining_in_segment(1, 70), 20);
        assert!((c.segment_progress(1, 75) - 0.5).abs() < f64::EPSILON);
        assert!((c.overall_progress(900) - 1.0).abs() < f64::EPSILON);
        assert_eq!(c.overtime(90), None);
        assert_eq!(c.overtime(95), Some(5));
    }
}
