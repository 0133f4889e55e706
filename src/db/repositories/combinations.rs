use crate::db::{repositories::keys, Database};
use crate::models::TimingCombination;

impl Database {
    /// Stored custom combinations; empty when nothing is stored or the
    /// document cannot be read.
    pub async fn load_combinations(&self) -> Vec<TimingCombination> {
        self.load_document(keys::COMBINATIONS)
            .await
            .unwrap_or_default()
    }

    pub async fn save_combinations(&self, combinations: Vec<TimingCombination>) {
        self.save_document(keys::COMBINATIONS, combinations).await
    }
}
