use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::sessions::DEFAULT_SESSION_NAME;

pub const DEBUG_ENV: &str = "SPEECHTIMER_DEBUG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CueSettings {
    pub enabled: bool,
    pub volume: f32,
}

impl Default for CueSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerSettings {
    /// Finalize the session automatically when the last segment runs out
    /// instead of counting overtime.
    pub stop_at_end: bool,
    pub checkpoint_every_ticks: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            stop_at_end: false,
            checkpoint_every_ticks: 10,
        }
    }
}

impl TimerSettings {
    /// Checkpoint cadence after the debug override is applied.
    pub fn effective_checkpoint_every(&self) -> u32 {
        if debug_mode() {
            1
        } else {
            self.checkpoint_every_ticks.max(1)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub cues: CueSettings,
    pub timer: TimerSettings,
    pub default_session_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cues: CueSettings::default(),
            timer: TimerSettings::default(),
            default_session_name: DEFAULT_SESSION_NAME.to_string(),
        }
    }
}

pub fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Loads `path`, falling back to defaults when the file is missing or
    /// cannot be parsed.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings at {}: {err}", path.display());
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn cues(&self) -> CueSettings {
        self.read().cues.clone()
    }

    pub fn timer(&self) -> TimerSettings {
        self.read().timer.clone()
    }

    pub fn default_session_name(&self) -> String {
        self.read().default_session_name.clone()
    }

    pub fn update<F>(&self, apply: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.write();
        apply(&mut *guard);
        self.persist(&*guard)?;
        Ok(guard.clone())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.get(), Settings::default());
        assert!(!store.timer().stop_at_end);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update(|s| {
                s.timer.stop_at_end = true;
                s.cues.volume = 0.25;
            })
            .unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert!(reopened.timer().stop_at_end);
        assert_eq!(reopened.cues().volume, 0.25);
        assert_eq!(reopened.default_session_name(), DEFAULT_SESSION_NAME);
    }

    #[test]
    fn partial_and_corrupt_files_are_tolerated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(&path, r#"{"timer": {"stopAtEnd": true}}"#).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert!(store.timer().stop_at_end);
        assert_eq!(store.timer().checkpoint_every_ticks, 10);

        fs::write(&path, "not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get(), Settings::default());
    }
}
