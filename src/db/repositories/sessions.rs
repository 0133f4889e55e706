use crate::db::{repositories::keys, Database};
use crate::models::Session;

impl Database {
    pub async fn load_sessions(&self) -> Vec<Session> {
        self.load_document(keys::SESSIONS).await.unwrap_or_default()
    }

    pub async fn save_sessions(&self, sessions: Vec<Session>) {
        self.save_document(keys::SESSIONS, sessions).await
    }
}
