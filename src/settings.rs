use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::models::DEFAULT_DIMENSIONS;

pub const DEFAULT_THUMBNAIL_MAX_EDGE: u32 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Longest side of generated thumbnails, in pixels.
    pub thumbnail_max_edge: u32,
    /// Aspect ratio given to prompts created without one.
    pub default_dimensions: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            thumbnail_max_edge: DEFAULT_THUMBNAIL_MAX_EDGE,
            default_dimensions: DEFAULT_DIMENSIONS.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    library: LibrarySettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing or unreadable JSON body yields defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn library(&self) -> Result<LibrarySettings> {
        Ok(self.read()?.library.clone())
    }

    pub fn update_library(&self, settings: LibrarySettings) -> Result<()> {
        if settings.thumbnail_max_edge == 0 {
            anyhow::bail!("thumbnail size must be at least 1 pixel");
        }
        let mut guard = self.write()?;
        guard.library = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        *self.write()? = data;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, UserSettings>> {
        self.data
            .read()
            .map_err(|_| anyhow!("settings lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, UserSettings>> {
        self.data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
