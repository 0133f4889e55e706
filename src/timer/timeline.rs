use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{TimelineItem, TimelineStatus};

/// Keeps one timeline item per segment visited during a run.
#[derive(Debug, Clone, Default)]
pub struct TimelineRecorder {
    items: Arc<Vec<TimelineItem>>,
    entered_at_elapsed: u64,
}

impl TimelineRecorder {
    pub fn new(items: Vec<TimelineItem>) -> Self {
        Self {
            items: Arc::new(items),
            entered_at_elapsed: 0,
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<TimelineItem>> {
        Arc::clone(&self.items)
    }

    pub fn for_session(&self, session_id: &str) -> Vec<TimelineItem> {
        self.items
            .iter()
            .filter(|item| item.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Elapsed seconds at which the open segment was entered.
    pub fn entered_at(&self) -> u64 {
        self.entered_at_elapsed
    }

    /// Re-anchors the open segment after a restart.
    pub fn resume_segment(&mut self, entered_at_elapsed: u64) {
        self.entered_at_elapsed = entered_at_elapsed;
    }

    pub fn begin(&mut self, session_id: &str, segment_id: &str, now: DateTime<Utc>) {
        self.entered_at_elapsed = 0;
        let mut next = self.items.as_ref().clone();
        next.push(TimelineItem::open(session_id, segment_id, now));
        self.items = Arc::new(next);
    }

    /// Completes the open item and opens one for `segment_id`.
    pub fn advance(&mut self, session_id: &str, segment_id: &str, elapsed: u64, now: DateTime<Utc>) {
        self.close(session_id, elapsed, now);
        self.entered_at_elapsed = elapsed;
        let mut next = self.items.as_ref().clone();
        next.push(TimelineItem::open(session_id, segment_id, now));
        self.items = Arc::new(next);
    }

    pub fn mark(&mut self, session_id: &str, status: TimelineStatus) {
        self.update_open(session_id, |item| item.status = status);
    }

    pub fn close(&mut self, session_id: &str, elapsed: u64, now: DateTime<Utc>) {
        let counted = elapsed.saturating_sub(self.entered_at_elapsed);
        self.update_open(session_id, |item| {
            item.status = TimelineStatus::Completed;
            item.end_time = Some(now);
            item.duration = Some(counted);
        });
    }

    /// Drops a run that was reset before it was stopped.
    pub fn discard_open(&mut self, session_id: &str) {
        let next: Vec<TimelineItem> = self
            .items
            .iter()
            .filter(|item| !(item.session_id == session_id && item.is_open()))
            .cloned()
            .collect();
        self.items = Arc::new(next);
    }

    pub fn clear(&mut self) {
        self.items = Arc::new(Vec::new());
        self.entered_at_elapsed = 0;
    }

    fn update_open<F>(&mut self, session_id: &str, apply: F)
    where
        F: FnOnce(&mut TimelineItem),
    {
        let Some(position) = self
            .items
            .iter()
            .rposition(|item| item.session_id == session_id && item.is_open())
        else {
            return;
        };
        let mut next = self.items.as_ref().clone();
        apply(&mut next[position]);
        self.items = Arc::new(next);
    }
}
