//! Load/store boundary for the persisted preview settings blob

use crate::{PreviewConfig, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Storage key of the settings blob
pub const SETTINGS_KEY: &str = "makereal_settings_2";

/// Persists a [`PreviewConfig`] as JSON at `<dir>/makereal_settings_2.json`
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", SETTINGS_KEY))
    }

    /// `Ok(None)` when nothing has been stored yet.
    pub fn load(&self) -> Result<Option<PreviewConfig>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        PreviewConfig::from_file(&path).map(Some)
    }

    /// Stored settings, or the defaults when none exist.
    pub fn load_or_default(&self) -> Result<PreviewConfig> {
        Ok(self.load()?.unwrap_or_default())
    }

    pub fn store(&self, config: &PreviewConfig) -> Result<()> {
        config.validate()?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path();
        write_json(&path, config)?;
        debug!("stored settings at {}", path.display());
        Ok(())
    }
}

fn write_json(path: &Path, config: &PreviewConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}
