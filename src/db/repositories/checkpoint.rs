use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{repositories::keys, Database};
use crate::models::Session;

/// Progress of the run in flight, written periodically so a crash loses at
/// most a few seconds of counted time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunCheckpoint {
    pub session: Session,
    pub elapsed_secs: u64,
    pub current_segment_index: usize,
    /// Elapsed seconds at which the current segment was entered.
    #[serde(default)]
    pub segment_entered_secs: u64,
    pub saved_at: DateTime<Utc>,
}

impl Database {
    pub async fn load_checkpoint(&self) -> Option<RunCheckpoint> {
        self.load_document(keys::CURRENT_SESSION).await
    }

    pub async fn save_checkpoint(&self, checkpoint: RunCheckpoint) {
        self.save_document(keys::CURRENT_SESSION, checkpoint).await
    }

    pub async fn clear_checkpoint(&self) {
        self.remove_document(keys::CURRENT_SESSION).await
    }
}
