pub mod checkpoint;
pub mod combinations;
pub mod sessions;
pub mod timeline;

use log::error;
use serde::{de::DeserializeOwned, Serialize};

use crate::db::{
    helpers::{delete_key, read_json, write_json},
    Database,
};

/// Storage keys, one JSON document each.
pub mod keys {
    pub const COMBINATIONS: &str = "combinations";
    pub const SESSIONS: &str = "sessions";
    pub const TIMELINE: &str = "timeline";
    pub const CURRENT_SESSION: &str = "current_session";

    pub const ALL: [&str; 4] = [COMBINATIONS, SESSIONS, TIMELINE, CURRENT_SESSION];
}

impl Database {
    /// Reads a document; any failure is logged and reported as absent.
    pub(crate) async fn load_document<T>(&self, key: &'static str) -> Option<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self.execute(move |conn| read_json::<T>(conn, key)).await {
            Ok(value) => value,
            Err(err) => {
                error!("Failed to load {key}: {err:#}");
                None
            }
        }
    }

    /// Overwrites a document; any failure is logged and swallowed.
    pub(crate) async fn save_document<T>(&self, key: &'static str, value: T)
    where
        T: Serialize + Send + 'static,
    {
        if let Err(err) = self.execute(move |conn| write_json(conn, key, &value)).await {
            error!("Failed to save {key}: {err:#}");
        }
    }

    pub(crate) async fn remove_document(&self, key: &'static str) {
        if let Err(err) = self.execute(move |conn| delete_key(conn, key)).await {
            error!("Failed to remove {key}: {err:#}");
        }
    }

    /// Drops every stored collection.
    pub async fn clear_all(&self) {
        for key in keys::ALL {
            self.remove_document(key).await;
        }
    }
}
