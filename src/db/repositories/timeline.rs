use crate::db::{repositories::keys, Database};
use crate::models::TimelineItem;

impl Database {
    pub async fn load_timeline(&self) -> Vec<TimelineItem> {
        self.load_document(keys::TIMELINE).await.unwrap_or_default()
    }

    pub async fn save_timeline(&self, items: Vec<TimelineItem>) {
        self.save_document(keys::TIMELINE, items).await
    }
}
