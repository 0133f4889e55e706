use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", from = "StoredSession")]
pub struct Session {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Weak link: the combination may have been edited or deleted since.
    pub combination_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Counted seconds reported by the timer at finalize time. Excludes pauses.
    #[serde(default)]
    pub duration: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}

/// On-disk shape. Older records carry no `updatedAt`; they are read as
/// last touched at creation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    id: String,
    name: String,
    #[serde(default)]
    notes: Option<String>,
    combination_id: String,
    start_time: DateTime<Utc>,
    #[serde(default)]
    end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    duration: Option<u64>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    deleted: bool,
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            updated_at: stored.updated_at.unwrap_or(stored.created_at),
            id: stored.id,
            name: stored.name,
            notes: stored.notes,
            combination_id: stored.combination_id,
            start_time: stored.start_time,
            end_time: stored.end_time,
            duration: stored.duration,
            created_at: stored.created_at,
            deleted: stored.deleted,
        }
    }
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Wall-clock span between start and end, pauses included.
    pub fn wall_clock_secs(&self) -> Option<u64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds().max(0) as u64)
    }

    /// Counted duration when known, else the wall-clock span of a finished
    /// session, else zero for one still running.
    pub fn actual_secs(&self) -> u64 {
        self.duration
            .or_else(|| self.wall_clock_secs())
            .unwrap_or(0)
    }
}

/// Name and notes supplied by the user when a run starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SessionMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
