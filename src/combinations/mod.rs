//! Combination catalog: the built-in defaults plus whatever the user created.

pub mod defaults;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::models::{SoundType, TimingCombination, TimingSegment};

pub use defaults::default_combinations;

const NEW_SEGMENT_SECS: u64 = 60;
const NEW_SEGMENT_COLOR: &str = "#60a5fa";

#[derive(Debug, Clone)]
pub struct CombinationCatalog {
    defaults: Vec<TimingCombination>,
    custom: Vec<TimingCombination>,
}

impl Default for CombinationCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl CombinationCatalog {
    /// Builds the catalog from stored custom combinations.
    ///
    /// Stored entries that reuse a built-in id are dropped; the shipped
    /// definition wins.
    pub fn new(stored: Vec<TimingCombination>) -> Self {
        let defaults = default_combinations();
        let custom = stored
            .into_iter()
            .filter(|combination| {
                let shadowed = defaults.iter().any(|d| d.id == combination.id);
                if shadowed {
                    warn!(
                        "Ignoring stored combination {} that shadows a built-in",
                        combination.id
                    );
                }
                !shadowed
            })
            .collect();

        Self { defaults, custom }
    }

    pub fn all(&self) -> impl Iterator<Item = &TimingCombination> {
        self.defaults.iter().chain(self.custom.iter())
    }

    pub fn defaults(&self) -> &[TimingCombination] {
        &self.defaults
    }

    pub fn custom(&self) -> &[TimingCombination] {
        &self.custom
    }

    pub fn find(&self, id: &str) -> Option<&TimingCombination> {
        self.all().find(|combination| combination.id == id)
    }

    pub fn is_default(&self, id: &str) -> bool {
        self.defaults.iter().any(|combination| combination.id == id)
    }

    pub fn add(&mut self, mut combination: TimingCombination, now: DateTime<Utc>) -> Result<&TimingCombination> {
        validate(&combination)?;
        if self.find(&combination.id).is_some() {
            bail!("combination {} already exists", combination.id);
        }

        combination.created_at = now;
        combination.updated_at = now;
        info!("Added combination {} ({})", combination.name, combination.id);
        self.custom.push(combination);
        self.custom
            .last()
            .ok_or_else(|| anyhow!("combination missing after insert"))
    }

    pub fn update(&mut self, mut combination: TimingCombination, now: DateTime<Utc>) -> Result<()> {
        validate(&combination)?;
        if self.is_default(&combination.id) {
            bail!("built-in combination {} cannot be edited", combination.id);
        }

        let existing = self
            .custom
            .iter_mut()
            .find(|c| c.id == combination.id)
            .ok_or_else(|| anyhow!("combination {} not found", combination.id))?;

        combination.created_at = existing.created_at;
        combination.updated_at = now;
        *existing = combination;
        Ok(())
    }

    /// Removes a custom combination. Returns `false` when the id is unknown.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        if self.is_default(id) {
            bail!("built-in combination {id} cannot be deleted");
        }

        let before = self.custom.len();
        self.custom.retain(|c| c.id != id);
        Ok(self.custom.len() != before)
    }

    /// Drops every user-created combination. Built-ins are untouched.
    pub fn delete_all_custom(&mut self) -> usize {
        let removed = self.custom.len();
        self.custom.clear();
        removed
    }
}

/// Segment template used when a user appends a segment to a combination.
pub fn new_segment(position: usize) -> TimingSegment {
    TimingSegment::new(format!("Segment {}", position + 1), NEW_SEGMENT_SECS, NEW_SEGMENT_COLOR)
        .with_sound(true, SoundType::Default)
}

fn validate(combination: &TimingCombination) -> Result<()> {
    if combination.name.trim().is_empty() {
        bail!("combination name must not be blank");
    }
    if combination.segments.is_empty() {
        bail!("combination {} needs at least one segment", combination.name);
    }
    Ok(())
}
