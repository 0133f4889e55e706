pub mod audio;
pub mod combinations;
pub mod db;
pub mod history;
pub mod models;
pub mod sessions;
pub mod settings;
pub mod timer;
pub mod utils;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use directories::ProjectDirs;
use log::{info, warn};
use tokio::sync::RwLock;

use audio::CuePlayer;
#[cfg(not(feature = "audio"))]
use audio::LogCuePlayer;
use combinations::CombinationCatalog;
use db::Database;
use history::HistoryEntry;
use models::{Session, SessionMeta, TimingCombination};
use settings::{Settings, SettingsStore};
use timer::{TickSource, TimerController};

const DB_FILE: &str = "speechtimer.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

/// Knobs for assembling an [`App`]; the defaults tick once per second and
/// pick the cue player from the enabled features.
#[derive(Default)]
pub struct AppOptions {
    pub tick_source: TickSource,
    pub cues: Option<Arc<dyn CuePlayer>>,
}

/// Owns every collaborator and is handed to the presentation layer by
/// reference. All mutations go through its methods.
pub struct App {
    db: Database,
    settings: Arc<SettingsStore>,
    catalog: RwLock<CombinationCatalog>,
    cues: Arc<dyn CuePlayer>,
    timer: TimerController,
}

impl App {
    /// Opens the app in the platform data directory.
    pub async fn open_default() -> Result<Self> {
        utils::init_logging();
        info!("Speech timer starting up...");
        Self::open(default_data_dir()?).await
    }

    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(data_dir, AppOptions::default()).await
    }

    pub async fn open_with(data_dir: impl AsRef<Path>, options: AppOptions) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::open(data_dir.join(DB_FILE))?;
        let settings = Arc::new(SettingsStore::new(data_dir.join(SETTINGS_FILE))?);
        Ok(Self::with_database(db, settings, options).await)
    }

    /// Assembles the app over already-open collaborators. Finalizes a run
    /// left behind by a crash before returning.
    pub async fn with_database(
        db: Database,
        settings: Arc<SettingsStore>,
        options: AppOptions,
    ) -> Self {
        let cues = options
            .cues
            .unwrap_or_else(|| default_cue_player(&settings));
        let catalog = CombinationCatalog::new(db.load_combinations().await);
        let timer = TimerController::load(
            db.clone(),
            Arc::clone(&settings),
            Arc::clone(&cues),
            options.tick_source,
        )
        .await;

        if let Some(session) = timer.recover_interrupted().await {
            warn!("Finalized session {} interrupted by a previous exit", session.id);
        }

        Self {
            db,
            settings,
            catalog: RwLock::new(catalog),
            cues,
            timer,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub fn update_settings<F>(&self, apply: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let updated = self.settings.update(apply)?;
        self.cues.set_volume(updated.cues.volume);
        Ok(updated)
    }

    /// Built-ins first, then custom combinations in creation order.
    pub async fn combinations(&self) -> Vec<TimingCombination> {
        self.catalog.read().await.all().cloned().collect()
    }

    pub async fn find_combination(&self, id: &str) -> Option<TimingCombination> {
        self.catalog.read().await.find(id).cloned()
    }

    pub async fn add_combination(&self, combination: TimingCombination) -> Result<TimingCombination> {
        let mut catalog = self.catalog.write().await;
        let added = catalog.add(combination, Utc::now())?.clone();
        self.db.save_combinations(catalog.custom().to_vec()).await;
        Ok(added)
    }

    pub async fn update_combination(&self, combination: TimingCombination) -> Result<()> {
        let mut catalog = self.catalog.write().await;
        catalog.update(combination, Utc::now())?;
        self.db.save_combinations(catalog.custom().to_vec()).await;
        Ok(())
    }

    pub async fn delete_combination(&self, id: &str) -> Result<bool> {
        let mut catalog = self.catalog.write().await;
        let removed = catalog.delete(id)?;
        if removed {
            self.db.save_combinations(catalog.custom().to_vec()).await;
        }
        Ok(removed)
    }

    pub async fn delete_all_custom_combinations(&self) -> usize {
        let mut catalog = self.catalog.write().await;
        let removed = catalog.delete_all_custom();
        self.db.save_combinations(Vec::new()).await;
        removed
    }

    /// Starts a run against the combination with `combination_id`. Unknown
    /// ids and empty combinations are ignored.
    pub async fn start(&self, combination_id: &str, meta: SessionMeta) -> Option<Session> {
        let Some(combination) = self.find_combination(combination_id).await else {
            warn!("Ignoring start for unknown combination {combination_id}");
            return None;
        };
        self.timer.start_timer(&combination, meta).await
    }

    pub async fn stop(&self) -> Option<Session> {
        self.timer.stop_timer(Utc::now()).await
    }

    /// History rows for one local date (`YYYY-MM-DD`), oldest first.
    pub async fn history_for(&self, date: &str, include_deleted: bool) -> Vec<HistoryEntry> {
        let sessions = self.timer.sessions().await;
        let catalog = self.catalog.read().await;
        history::day_entries(&sessions, &catalog, date, include_deleted)
    }

    /// Every recorded day, newest first, each with its rows newest first.
    pub async fn history_overview(&self, include_deleted: bool) -> Vec<(String, Vec<HistoryEntry>)> {
        let sessions = self.timer.sessions().await;
        let catalog = self.catalog.read().await;
        history::group_all(&sessions, include_deleted)
            .into_iter()
            .map(|(date, day)| {
                let entries = day.iter().map(|s| history::entry(s, &catalog)).collect();
                (date, entries)
            })
            .collect()
    }

    pub async fn history_dates(&self) -> Vec<String> {
        history::available_dates(&self.timer.sessions().await)
    }
}

fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "speechtimer")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("could not determine a data directory"))
}

#[cfg(feature = "audio")]
fn default_cue_player(settings: &SettingsStore) -> Arc<dyn CuePlayer> {
    Arc::new(audio::RodioCuePlayer::new(settings.cues().volume))
}

#[cfg(not(feature = "audio"))]
fn default_cue_player(_settings: &SettingsStore) -> Arc<dyn CuePlayer> {
    Arc::new(LogCuePlayer)
}
