// src/config.rs

//! Watch list loading and saving.
//!
//! The watch list lives in a JSON file that the user edits through the CLI.
//! `load` never fails: a missing or malformed file yields the default (empty)
//! watch list and a warning. Mutations go through `update`, which refuses to
//! touch a file it cannot parse.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::WatchConfig;
use crate::pipeline::SharedConfig;

/// File-backed provider for the watch list.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the watch list, falling back to defaults if loading fails.
    pub fn load(&self) -> WatchConfig {
        if !self.path.exists() {
            log::info!(
                "No watch list at {}, starting with an empty one",
                self.path.display()
            );
            return WatchConfig::default();
        }
        self.try_load().unwrap_or_else(|e| {
            log::warn!(
                "Failed to load watch list from {}: {}. Using defaults.",
                self.path.display(),
                e
            );
            WatchConfig::default()
        })
    }

    /// Load the watch list, surfacing read and parse errors.
    pub fn try_load(&self) -> Result<WatchConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the watch list atomically (write to temp, then rename).
    pub fn save(&self, config: &WatchConfig) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        log::info!("Watch list saved to {}", self.path.display());
        Ok(())
    }

    /// Replace the watch list held by a running loop with the file's content.
    ///
    /// Returns whether anything changed. A missing file keeps the current
    /// list; a file that does not parse or is not runnable is an error and
    /// also keeps it.
    pub fn reload_into(&self, shared: &SharedConfig) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let fresh = self.try_load()?;
        fresh.validate_for_run().map_err(AppError::validation)?;

        let mut current = shared
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *current == fresh {
            return Ok(false);
        }
        *current = fresh;
        log::info!(
            "Watch list reloaded from {}, applies from the next cycle",
            self.path.display()
        );
        Ok(true)
    }

    /// Load, apply `mutate`, and save only if the mutation succeeded.
    ///
    /// Unlike [`load`](Self::load), an unreadable or malformed file is an
    /// error here and is never overwritten.
    pub fn update<F, E>(&self, mutate: F) -> Result<WatchConfig>
    where
        F: FnOnce(&mut WatchConfig) -> std::result::Result<(), E>,
        E: Into<AppError>,
    {
        // A file that exists but does not parse is left for the user to fix.
        let mut config = if self.path.exists() {
            self.try_load()?
        } else {
            WatchConfig::default()
        };
        if let Err(e) = mutate(&mut config) {
            return Err(e.into());
        }
        self.save(&config)?;
        Ok(config)
    }
}
