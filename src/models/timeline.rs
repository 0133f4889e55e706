use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimelineStatus {
    Active,
    Completed,
    Paused,
}

/// Time spent inside one segment during a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: String,
    pub session_id: String,
    pub segment_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Counted seconds inside the segment, set on completion.
    #[serde(default)]
    pub duration: Option<u64>,
    pub status: TimelineStatus,
}

impl TimelineItem {
    pub fn open(session_id: &str, segment_id: &str, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            segment_id: segment_id.to_string(),
            start_time,
            end_time: None,
            duration: None,
            status: TimelineStatus::Active,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != TimelineStatus::Completed
    }
}
