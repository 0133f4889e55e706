use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CueRequest, SoundType, TimingCombination, TimingSegment};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    /// Run finalized; combination and index kept for display until reset.
    Stopped,
}

/// One boundary crossed during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentTransition {
    pub from_index: usize,
    pub to_index: usize,
    /// Exit cue of the segment being left, if it asks for one.
    pub cue: Option<CueRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickOutcome {
    pub elapsed_secs: u64,
    /// In crossing order; usually empty or one entry.
    pub transitions: Vec<SegmentTransition>,
    /// First tick at or past the nominal end of the combination.
    pub reached_end: bool,
}

impl TickOutcome {
    pub fn cues(&self) -> impl Iterator<Item = &CueRequest> + '_ {
        self.transitions.iter().filter_map(|t| t.cue.as_ref())
    }

    pub fn cue_sounds(&self) -> Vec<SoundType> {
        self.cues().map(|cue| cue.sound).collect()
    }
}

/// Counted state of a stopped run, handed back for finalizing the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedRun {
    pub session_id: String,
    pub elapsed_secs: u64,
    pub segment_index: usize,
}

/// Timer engine. Synchronous, no I/O; the controller drives it.
///
/// Rejected operations return `false`/`None` and leave the state untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub session_id: Option<String>,
    pub combination: Option<TimingCombination>,
    pub elapsed_secs: u64,
    pub current_segment_index: usize,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    end_reported: bool,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, TimerStatus::Running | TimerStatus::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    /// Ticks only count in this state.
    pub fn is_counting(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn can_start(&self) -> bool {
        matches!(self.status, TimerStatus::Idle | TimerStatus::Stopped)
    }

    pub fn current_segment(&self) -> Option<&TimingSegment> {
        self.combination
            .as_ref()?
            .segments
            .get(self.current_segment_index)
    }

    pub fn remaining_in_segment(&self) -> u64 {
        self.combination
            .as_ref()
            .map(|c| c.remaining_in_segment(self.current_segment_index, self.elapsed_secs))
            .unwrap_or(0)
    }

    pub fn overtime_secs(&self) -> Option<u64> {
        self.combination.as_ref()?.overtime(self.elapsed_secs)
    }

    /// Binds a fresh run to a snapshot of `combination`.
    pub fn begin_session(
        &mut self,
        session_id: String,
        combination: TimingCombination,
        started_at: DateTime<Utc>,
    ) -> bool {
        if !self.can_start() || !combination.is_playable() {
            return false;
        }

        *self = Self {
            status: TimerStatus::Running,
            session_id: Some(session_id),
            combination: Some(combination),
            elapsed_secs: 0,
            current_segment_index: 0,
            started_at: Some(started_at),
            end_reported: false,
        };
        true
    }

    /// Advances one second. Only forward transitions happen; every boundary
    /// crossed emits the exiting segment's cue before the index moves.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if !self.is_counting() {
            return None;
        }
        let combination = self.combination.as_ref()?;

        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        // A segment stays current through the second its countdown reaches
        // zero; the boundary is crossed on the following tick.
        let target = if self.elapsed_secs >= combination.total_duration() {
            combination.last_index()
        } else {
            combination.segment_at(self.elapsed_secs - 1)
        }
        .unwrap_or(self.current_segment_index);

        let mut transitions = Vec::new();
        while self.current_segment_index < target {
            let from_index = self.current_segment_index;
            let exiting = &combination.segments[from_index];
            transitions.push(SegmentTransition {
                from_index,
                to_index: from_index + 1,
                cue: exiting.exit_cue(),
            });
            self.current_segment_index += 1;
        }

        let reached_end = !self.end_reported && self.elapsed_secs >= combination.total_duration();
        self.end_reported |= reached_end;

        Some(TickOutcome {
            elapsed_secs: self.elapsed_secs,
            transitions,
            reached_end,
        })
    }

    pub fn pause(&mut self) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.status = TimerStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != TimerStatus::Paused {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    /// Ends the run. Combination and segment index stay for display.
    pub fn stop(&mut self) -> Option<StoppedRun> {
        if !self.is_running() {
            return None;
        }
        let session_id = self.session_id.clone()?;
        self.status = TimerStatus::Stopped;
        Some(StoppedRun {
            session_id,
            elapsed_secs: self.elapsed_secs,
            segment_index: self.current_segment_index,
        })
    }

    /// Drops all runtime state. The selected combination survives so the
    /// same exercise can be started again.
    pub fn reset(&mut self) {
        self.status = TimerStatus::Idle;
        self.session_id = None;
        self.elapsed_secs = 0;
        self.current_segment_index = 0;
        self.started_at = None;
        self.end_reported = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn segment(name: &str, duration: u64, play_sound: bool) -> TimingSegment {
        TimingSegment::new(name, duration, "#000")
            .with_id(name)
            .with_sound(play_sound, SoundType::Bell)
    }

    fn combo(segments: Vec<TimingSegment>) -> TimingCombination {
        TimingCombination::new("test", segments, Utc::now())
    }

    fn started(segments: Vec<TimingSegment>) -> TimerState {
        let mut state = TimerState::new();
        assert!(state.begin_session("s1".into(), combo(segments), Utc::now()));
        state
    }

    fn tick_n(state: &mut TimerState, n: usize) -> Vec<TickOutcome> {
        (0..n).filter_map(|_| state.tick()).collect()
    }

    #[test]
    fn refuses_empty_combination() {
        let mut state = TimerState::new();
        assert!(!state.begin_session("s1".into(), combo(Vec::new()), Utc::now()));
        assert_eq!(state.status, TimerStatus::Idle);
        assert!(state.session_id.is_none());
    }

    #[test]
    fn refuses_start_while_running() {
        let mut state = started(vec![segment("A", 5, false)]);
        assert!(!state.begin_session("s2".into(), combo(vec![segment("B", 1, false)]), Utc::now()));
        assert_eq!(state.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn exit_cue_uses_the_exiting_segment_flag() {
        let mut state = started(vec![segment("A", 2, false), segment("B", 3, true)]);

        let first_two = tick_n(&mut state, 2);
        assert!(first_two.iter().all(|o| o.transitions.is_empty()));
        assert_eq!(state.current_segment_index, 0);
        assert_eq!(state.elapsed_secs, 2);

        let third = state.tick().unwrap();
        assert_eq!(state.current_segment_index, 1);
        assert_eq!(
            third.transitions,
            vec![SegmentTransition { from_index: 0, to_index: 1, cue: None }]
        );

        let rest = tick_n(&mut state, 2);
        assert_eq!(state.elapsed_secs, 5);
        assert_eq!(state.current_segment_index, 1);
        assert!(rest.last().unwrap().reached_end);

        let overtime = state.tick().unwrap();
        assert_eq!(state.elapsed_secs, 6);
        assert_eq!(state.current_segment_index, 1);
        assert!(overtime.transitions.is_empty());
        assert_eq!(state.overtime_secs(), Some(1));
        assert_eq!(state.remaining_in_segment(), 0);
    }

    #[test]
    fn cue_fires_when_exiting_a_sounding_segment() {
        let mut state = started(vec![segment("A", 1, true), segment("B", 1, false)]);
        assert!(state.tick().unwrap().transitions.is_empty());
        let outcome = state.tick().unwrap();
        assert_eq!(outcome.cue_sounds(), vec![SoundType::Bell]);
    }

    #[test]
    fn zero_length_segments_are_crossed_in_one_tick() {
        let mut state = started(vec![
            segment("A", 1, true),
            segment("Z1", 0, true),
            segment("Z2", 0, false),
            segment("B", 2, false),
        ]);
        assert!(state.tick().unwrap().transitions.is_empty());
        let outcome = state.tick().unwrap();
        assert_eq!(state.current_segment_index, 3);
        assert_eq!(outcome.transitions.len(), 3);
        assert_eq!(outcome.cues().count(), 2);
    }

    #[test]
    fn trailing_zero_length_segment_is_reached_at_the_end() {
        let mut state = started(vec![segment("A", 2, true), segment("Z", 0, false)]);
        state.tick();
        assert_eq!(state.current_segment_index, 0);
        let outcome = state.tick().unwrap();
        assert_eq!(state.current_segment_index, 1);
        assert_eq!(outcome.cue_sounds(), vec![SoundType::Bell]);
        assert!(outcome.reached_end);
    }

    #[test]
    fn end_is_reported_once_even_for_zero_length_combinations() {
        let mut state = started(vec![segment("Z", 0, true)]);
        let first = state.tick().unwrap();
        assert!(first.reached_end);
        assert!(first.transitions.is_empty());
        assert!(!state.tick().unwrap().reached_end);

        let mut state = started(vec![segment("A", 2, false)]);
        let outcomes = tick_n(&mut state, 4);
        let ends: Vec<bool> = outcomes.iter().map(|o| o.reached_end).collect();
        assert_eq!(ends, vec![false, true, false, false]);
    }

    #[test]
    fn full_run_lands_on_last_segment() {
        let segments = vec![segment("A", 3, false), segment("B", 4, true), segment("C", 2, true)];
        let total = combo(segments.clone()).total_duration();
        let mut state = started(segments);
        tick_n(&mut state, total as usize);
        assert_eq!(state.current_segment_index, 2);
        assert_eq!(state.elapsed_secs, total);
    }

    #[test]
    fn ticks_while_paused_do_not_count() {
        let mut state = started(vec![segment("A", 10, false)]);
        tick_n(&mut state, 3);
        assert!(state.pause());
        assert!(tick_n(&mut state, 5).is_empty());
        assert_eq!(state.elapsed_secs, 3);
        assert!(state.is_running());
        assert!(state.is_paused());

        assert!(!state.pause());
        assert!(state.resume());
        assert!(!state.resume());
        state.tick();
        assert_eq!(state.elapsed_secs, 4);
    }

    #[test]
    fn stop_reports_counted_time_and_keeps_display_state() {
        let mut state = started(vec![segment("A", 2, false), segment("B", 2, false)]);
        tick_n(&mut state, 3);
        state.pause();

        let stopped = state.stop().unwrap();
        assert_eq!(stopped, StoppedRun { session_id: "s1".into(), elapsed_secs: 3, segment_index: 1 });
        assert_eq!(state.status, TimerStatus::Stopped);
        assert!(!state.is_running());
        assert!(!state.is_paused());
        assert_eq!(state.current_segment_index, 1);
        assert!(state.combination.is_some());

        assert_matches!(state.stop(), None);
        assert_matches!(state.tick(), None);
        assert_eq!(state.elapsed_secs, 3);
    }

    #[test]
    fn reset_returns_to_idle_from_any_state() {
        let mut state = started(vec![segment("A", 2, false), segment("B", 2, false)]);
        tick_n(&mut state, 3);
        state.pause();
        state.reset();

        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.elapsed_secs, 0);
        assert_eq!(state.current_segment_index, 0);
        assert!(!state.is_running());
        assert!(!state.is_paused());
        assert!(state.session_id.is_none());
        assert!(state.can_start());
    }
}
