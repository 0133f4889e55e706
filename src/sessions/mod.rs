//! Session lifecycle: create on start, finalize on stop, then edit,
//! soft-delete and restore.
//!
//! Every mutation builds a fresh collection and swaps it in, so a snapshot
//! handed out earlier never changes underneath its holder.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use uuid::Uuid;

use crate::models::{Session, SessionMeta};

pub const DEFAULT_SESSION_NAME: &str = "Untitled session";

#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    sessions: Arc<Vec<Session>>,
}

impl SessionLog {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<Session>> {
        Arc::clone(&self.sessions)
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Records a new, still-running session.
    ///
    /// A blank name falls back to `fallback_name`; blank notes are dropped.
    pub fn create(
        &mut self,
        combination_id: &str,
        meta: SessionMeta,
        fallback_name: &str,
        now: DateTime<Utc>,
    ) -> Session {
        let name = match meta.name.trim() {
            "" => fallback_name.to_string(),
            trimmed => trimmed.to_string(),
        };
        let session = Session {
            id: Uuid::new_v4().to_string(),
            name,
            notes: normalize_notes(meta.notes),
            combination_id: combination_id.to_string(),
            start_time: now,
            end_time: None,
            duration: None,
            created_at: now,
            updated_at: now,
            deleted: false,
        };

        let mut next = self.sessions.as_ref().clone();
        next.push(session.clone());
        self.sessions = Arc::new(next);
        session
    }

    pub fn finalize(&mut self, session_id: &str, end_time: DateTime<Utc>, duration: u64) -> bool {
        let done = self.replace(session_id, |session| {
            session.end_time = Some(end_time);
            session.duration = Some(duration);
            session.updated_at = end_time;
        });
        if done {
            info!("Finalized session {session_id} with {duration}s counted");
        }
        done
    }

    pub fn edit(
        &mut self,
        session_id: &str,
        name: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let name = name.trim().to_string();
        self.replace(session_id, |session| {
            if !name.is_empty() {
                session.name = name;
            }
            session.notes = normalize_notes(notes);
            session.updated_at = now;
        })
    }

    pub fn soft_delete(&mut self, session_id: &str, now: DateTime<Utc>) -> bool {
        self.replace(session_id, |session| {
            session.deleted = true;
            session.updated_at = now;
        })
    }

    pub fn restore(&mut self, session_id: &str, now: DateTime<Utc>) -> bool {
        self.replace(session_id, |session| {
            session.deleted = false;
            session.updated_at = now;
        })
    }

    /// Irreversibly empties the log. Confirmation belongs to the caller.
    pub fn bulk_clear(&mut self) -> usize {
        let removed = self.sessions.len();
        self.sessions = Arc::new(Vec::new());
        info!("Cleared {removed} sessions");
        removed
    }

    fn replace<F>(&mut self, session_id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        let Some(position) = self.sessions.iter().position(|s| s.id == session_id) else {
            warn!("Session {session_id} not found; ignoring");
            return false;
        };

        let mut next = self.sessions.as_ref().clone();
        apply(&mut next[position]);
        self.sessions = Arc::new(next);
        true
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.trim().is_empty())
}
