use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    audio::CuePlayer,
    db::{Database, RunCheckpoint},
    models::{CueRequest, Session, SessionMeta, TimelineItem, TimelineStatus, TimingCombination, TimingSegment},
    sessions::SessionLog,
    settings::SettingsStore,
    utils::format_clock,
};

use super::{TickOutcome, TimelineRecorder, TimerState, TimerStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const EVENT_CAPACITY: usize = 64;

/// Where ticks come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    /// A background task ticks at this period while a run is live.
    Interval(Duration),
    /// The host calls [`TimerController::tick`] itself.
    Manual,
}

impl Default for TickSource {
    fn default() -> Self {
        TickSource::Interval(Duration::from_secs(1))
    }
}

/// Derived display values, recomputed from the engine on every call.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub session_id: Option<String>,
    pub combination_id: Option<String>,
    pub elapsed_secs: u64,
    pub current_segment_index: usize,
    pub segment: Option<TimingSegment>,
    pub remaining_in_segment: u64,
    pub segment_progress: f64,
    pub overall_progress: f64,
    pub overtime_secs: Option<u64>,
    pub elapsed_clock: String,
    pub remaining_clock: String,
}

impl TimerSnapshot {
    pub fn from_state(state: &TimerState) -> Self {
        let combination = state.combination.as_ref();
        let index = state.current_segment_index;
        let elapsed = state.elapsed_secs;
        let remaining = state.remaining_in_segment();

        Self {
            status: state.status,
            session_id: state.session_id.clone(),
            combination_id: combination.map(|c| c.id.clone()),
            elapsed_secs: elapsed,
            current_segment_index: index,
            segment: state.current_segment().cloned(),
            remaining_in_segment: remaining,
            segment_progress: combination
                .map(|c| c.segment_progress(index, elapsed))
                .unwrap_or(0.0),
            overall_progress: combination
                .map(|c| c.overall_progress(elapsed))
                .unwrap_or(0.0),
            overtime_secs: state.overtime_secs(),
            elapsed_clock: format_clock(elapsed),
            remaining_clock: format_clock(remaining),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    StateChanged(TimerSnapshot),
    #[serde(rename_all = "camelCase")]
    SegmentChanged {
        session_id: String,
        from_index: usize,
        to_index: usize,
    },
    CueRequested(CueRequest),
    SessionCompleted(Session),
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Ticker {
    fn cancel(self) {
        self.cancel.cancel();
        drop(self.handle);
    }
}

/// Everything the controller mutates, behind one lock. The ticker lives
/// here too so that cancelling it is atomic with the state change.
struct ControllerState {
    timer: TimerState,
    sessions: SessionLog,
    timeline: TimelineRecorder,
    ticks_since_checkpoint: u32,
    ticker: Option<Ticker>,
}

impl ControllerState {
    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn checkpoint(&self, now: DateTime<Utc>) -> Option<RunCheckpoint> {
        let session_id = self.timer.session_id.as_deref()?;
        let session = self.sessions.get(session_id)?.clone();
        Some(RunCheckpoint {
            session,
            elapsed_secs: self.timer.elapsed_secs,
            current_segment_index: self.timer.current_segment_index,
            segment_entered_secs: self.timeline.entered_at(),
            saved_at: now,
        })
    }

    /// Stops the engine and finalizes its session with the counted time.
    fn finish(&mut self, end_time: DateTime<Utc>) -> Option<Session> {
        let stopped = self.timer.stop()?;
        self.cancel_ticker();
        self.ticks_since_checkpoint = 0;
        self.sessions
            .finalize(&stopped.session_id, end_time, stopped.elapsed_secs);
        self.timeline
            .close(&stopped.session_id, stopped.elapsed_secs, end_time);
        self.sessions.get(&stopped.session_id).cloned()
    }
}

impl Drop for ControllerState {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

/// Owns the engine, the session log and the tick source. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<ControllerState>>,
    db: Database,
    settings: Arc<SettingsStore>,
    cues: Arc<dyn CuePlayer>,
    events: broadcast::Sender<TimerEvent>,
    tick_source: TickSource,
}

impl TimerController {
    /// Builds a controller over the sessions and timeline already stored in
    /// `db`.
    pub async fn load(
        db: Database,
        settings: Arc<SettingsStore>,
        cues: Arc<dyn CuePlayer>,
        tick_source: TickSource,
    ) -> Self {
        let sessions = db.load_sessions().await;
        let timeline = db.load_timeline().await;
        info!(
            "Loaded {} sessions and {} timeline items",
            sessions.len(),
            timeline.len()
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(ControllerState {
                timer: TimerState::new(),
                sessions: SessionLog::new(sessions),
                timeline: TimelineRecorder::new(timeline),
                ticks_since_checkpoint: 0,
                ticker: None,
            })),
            db,
            settings,
            cues,
            events,
            tick_source,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> TimerState {
        self.state.lock().await.timer.clone()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::from_state(&self.state.lock().await.timer)
    }

    pub async fn sessions(&self) -> Arc<Vec<Session>> {
        self.state.lock().await.sessions.snapshot()
    }

    pub async fn timeline(&self) -> Arc<Vec<TimelineItem>> {
        self.state.lock().await.timeline.snapshot()
    }

    pub async fn timeline_for(&self, session_id: &str) -> Vec<TimelineItem> {
        self.state.lock().await.timeline.for_session(session_id)
    }

    /// Starts a run against a snapshot of `combination`. Rejected (`None`)
    /// while another run is live or when the combination has no segments.
    pub async fn start_timer(
        &self,
        combination: &TimingCombination,
        meta: SessionMeta,
    ) -> Option<Session> {
        let mut state = self.state.lock().await;
        if !state.timer.can_start() {
            warn!("Ignoring start: a run is already active");
            return None;
        }
        let Some(first_segment) = combination.segments.first() else {
            warn!("Ignoring start: combination {} has no segments", combination.id);
            return None;
        };

        let now = Utc::now();
        let fallback_name = self.settings.default_session_name();
        let session = state
            .sessions
            .create(&combination.id, meta, &fallback_name, now);
        if !state
            .timer
            .begin_session(session.id.clone(), combination.clone(), now)
        {
            return None;
        }
        state.timeline.begin(&session.id, &first_segment.id, now);
        state.ticks_since_checkpoint = 0;

        state.cancel_ticker();
        state.ticker = self.spawn_ticker();

        self.db.save_sessions(state.sessions.snapshot().to_vec()).await;
        self.db.save_timeline(state.timeline.snapshot().to_vec()).await;
        if let Some(checkpoint) = state.checkpoint(now) {
            self.db.save_checkpoint(checkpoint).await;
        }

        info!(
            "Started session {} against combination {}",
            session.id, combination.id
        );
        self.emit(TimerEvent::StateChanged(TimerSnapshot::from_state(&state.timer)));
        Some(session)
    }

    /// Counts one second. `None` when nothing is counting.
    pub async fn tick(&self) -> Option<TickOutcome> {
        self.step(None).await
    }

    async fn step(&self, token: Option<&CancellationToken>) -> Option<TickOutcome> {
        let mut state = self.state.lock().await;
        // A ticker cancelled while waiting on the lock must not count for a
        // run that started afterwards.
        if token.is_some_and(|t| t.is_cancelled()) {
            return None;
        }

        let outcome = state.timer.tick()?;
        let now = Utc::now();
        let session_id = state.timer.session_id.clone()?;

        for transition in &outcome.transitions {
            // Each segment is credited with its own share of the counted
            // seconds, measured from its nominal start.
            let next_segment = state.timer.combination.as_ref().and_then(|c| {
                let segment = c.segments.get(transition.to_index)?;
                Some((segment.id.clone(), c.cumulative_offset(transition.to_index)))
            });
            if let Some((segment_id, entered_at)) = next_segment {
                state
                    .timeline
                    .advance(&session_id, &segment_id, entered_at, now);
            }
        }
        if !outcome.transitions.is_empty() {
            self.db.save_timeline(state.timeline.snapshot().to_vec()).await;
        }

        let completed = if outcome.reached_end && self.settings.timer().stop_at_end {
            info!("Session {session_id} reached its nominal end; stopping");
            state.finish(now)
        } else {
            None
        };

        if let Some(session) = &completed {
            self.persist_finished(&state).await;
            log_info!("Auto-stopped session {} at {}s", session.id, outcome.elapsed_secs);
        } else {
            state.ticks_since_checkpoint += 1;
            let every = self.settings.timer().effective_checkpoint_every();
            // A crossed boundary moves the segment anchor; recovery needs it.
            if !outcome.transitions.is_empty() || state.ticks_since_checkpoint >= every {
                state.ticks_since_checkpoint = 0;
                if let Some(checkpoint) = state.checkpoint(now) {
                    self.db.save_checkpoint(checkpoint).await;
                }
            }
        }

        let snapshot = TimerSnapshot::from_state(&state.timer);
        drop(state);

        log_debug!(
            "tick {} segment {}",
            outcome.elapsed_secs,
            snapshot.current_segment_index
        );

        for transition in &outcome.transitions {
            self.emit(TimerEvent::SegmentChanged {
                session_id: session_id.clone(),
                from_index: transition.from_index,
                to_index: transition.to_index,
            });
        }
        self.play_cues(&outcome);
        self.emit(TimerEvent::StateChanged(snapshot));
        if let Some(session) = completed {
            self.emit(TimerEvent::SessionCompleted(session));
        }

        Some(outcome)
    }

    pub async fn pause(&self) -> bool {
        self.set_paused(true).await
    }

    pub async fn resume(&self) -> bool {
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> bool {
        let mut state = self.state.lock().await;
        let changed = if paused {
            state.timer.pause()
        } else {
            state.timer.resume()
        };
        if !changed {
            return false;
        }

        if let Some(session_id) = state.timer.session_id.clone() {
            let status = if paused {
                TimelineStatus::Paused
            } else {
                TimelineStatus::Active
            };
            state.timeline.mark(&session_id, status);
            self.db.save_timeline(state.timeline.snapshot().to_vec()).await;
        }
        if paused {
            if let Some(checkpoint) = state.checkpoint(Utc::now()) {
                self.db.save_checkpoint(checkpoint).await;
            }
        }

        self.emit(TimerEvent::StateChanged(TimerSnapshot::from_state(&state.timer)));
        true
    }

    /// Finalizes the live run with the engine's counted seconds as its
    /// duration. The combination and segment index stay visible until
    /// [`reset`](Self::reset) or the next start.
    pub async fn stop_timer(&self, end_time: DateTime<Utc>) -> Option<Session> {
        let mut state = self.state.lock().await;
        let session = state.finish(end_time)?;
        self.persist_finished(&state).await;
        let snapshot = TimerSnapshot::from_state(&state.timer);
        drop(state);

        info!(
            "Stopped session {} after {}s counted",
            session.id,
            session.duration.unwrap_or(0)
        );
        self.emit(TimerEvent::SessionCompleted(session.clone()));
        self.emit(TimerEvent::StateChanged(snapshot));
        Some(session)
    }

    /// Back to idle from any state. A run that was still live keeps its
    /// session record unfinished; its open timeline items are dropped.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.cancel_ticker();
        let abandoned = state
            .timer
            .is_running()
            .then(|| state.timer.session_id.clone())
            .flatten();
        state.timer.reset();
        state.ticks_since_checkpoint = 0;

        if let Some(session_id) = abandoned {
            warn!("Reset discarded live session {session_id}");
            state.timeline.discard_open(&session_id);
            self.db.save_timeline(state.timeline.snapshot().to_vec()).await;
            self.db.clear_checkpoint().await;
        }

        self.emit(TimerEvent::StateChanged(TimerSnapshot::from_state(&state.timer)));
    }

    pub async fn edit_session(&self, session_id: &str, name: &str, notes: Option<String>) -> bool {
        self.mutate_sessions(|log| log.edit(session_id, name, notes, Utc::now()))
            .await
    }

    pub async fn soft_delete_session(&self, session_id: &str) -> bool {
        self.mutate_sessions(|log| log.soft_delete(session_id, Utc::now()))
            .await
    }

    pub async fn restore_session(&self, session_id: &str) -> bool {
        self.mutate_sessions(|log| log.restore(session_id, Utc::now()))
            .await
    }

    /// Empties the session log and its timeline. Refused while a run is
    /// live, since that run's session would be lost.
    pub async fn clear_sessions(&self) -> usize {
        let mut state = self.state.lock().await;
        if state.timer.is_running() {
            warn!("Ignoring session clear while a run is active");
            return 0;
        }
        let removed = state.sessions.bulk_clear();
        state.timeline.clear();
        self.db.save_sessions(Vec::new()).await;
        self.db.save_timeline(Vec::new()).await;
        removed
    }

    /// Finalizes a run interrupted by a crash from its last checkpoint:
    /// end time is the checkpoint time, duration the seconds counted by then.
    pub async fn recover_interrupted(&self) -> Option<Session> {
        let checkpoint = self.db.load_checkpoint().await?;
        let session_id = checkpoint.session.id.clone();

        let mut state = self.state.lock().await;
        if state.sessions.get(&session_id).is_none() {
            warn!("Checkpoint references unknown session {session_id}; restoring it");
            let mut sessions = state.sessions.snapshot().to_vec();
            sessions.push(checkpoint.session.clone());
            state.sessions = SessionLog::new(sessions);
        }

        let recovered = if state.sessions.get(&session_id).is_some_and(Session::is_active) {
            state.sessions.finalize(
                &session_id,
                checkpoint.saved_at,
                checkpoint.elapsed_secs,
            );
            state.timeline.resume_segment(checkpoint.segment_entered_secs);
            state
                .timeline
                .close(&session_id, checkpoint.elapsed_secs, checkpoint.saved_at);
            state.timeline.resume_segment(0);
            self.db.save_sessions(state.sessions.snapshot().to_vec()).await;
            self.db.save_timeline(state.timeline.snapshot().to_vec()).await;
            state.sessions.get(&session_id).cloned()
        } else {
            None
        };
        drop(state);

        self.db.clear_checkpoint().await;
        if let Some(session) = &recovered {
            warn!(
                "Recovered interrupted session {} with {}s counted",
                session.id, checkpoint.elapsed_secs
            );
        }
        recovered
    }

    async fn mutate_sessions<F>(&self, apply: F) -> bool
    where
        F: FnOnce(&mut SessionLog) -> bool,
    {
        let mut state = self.state.lock().await;
        if !apply(&mut state.sessions) {
            return false;
        }
        self.db.save_sessions(state.sessions.snapshot().to_vec()).await;
        true
    }

    async fn persist_finished(&self, state: &ControllerState) {
        self.db.save_sessions(state.sessions.snapshot().to_vec()).await;
        self.db.save_timeline(state.timeline.snapshot().to_vec()).await;
        self.db.clear_checkpoint().await;
    }

    fn play_cues(&self, outcome: &TickOutcome) {
        if !self.settings.cues().enabled {
            return;
        }
        for cue in outcome.cues() {
            self.cues.play_cue(cue);
            self.emit(TimerEvent::CueRequested(cue.clone()));
        }
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn spawn_ticker(&self) -> Option<Ticker> {
        let TickSource::Interval(period) = self.tick_source else {
            return None;
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        // The task must not keep the controller alive once its owner is gone.
        let controller = WeakController::from(self);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let Some(live) = controller.upgrade() else {
                    break;
                };
                live.step(Some(&token)).await;
            }
            log_debug!("ticker exited");
        });

        Some(Ticker { handle, cancel })
    }
}

struct WeakController {
    state: Weak<Mutex<ControllerState>>,
    db: Database,
    settings: Arc<SettingsStore>,
    cues: Arc<dyn CuePlayer>,
    events: broadcast::Sender<TimerEvent>,
    tick_source: TickSource,
}

impl From<&TimerController> for WeakController {
    fn from(controller: &TimerController) -> Self {
        Self {
            state: Arc::downgrade(&controller.state),
            db: controller.db.clone(),
            settings: Arc::clone(&controller.settings),
            cues: Arc::clone(&controller.cues),
            events: controller.events.clone(),
            tick_source: controller.tick_source,
        }
    }
}

impl WeakController {
    fn upgrade(&self) -> Option<TimerController> {
        Some(TimerController {
            state: self.state.upgrade()?,
            db: self.db.clone(),
            settings: Arc::clone(&self.settings),
            cues: Arc::clone(&self.cues),
            events: self.events.clone(),
            tick_source: self.tick_source,
        })
    }
}
