use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

pub const DATA_DIR_ENV: &str = "PROMPTVAULT_DATA_DIR";
const APP_DIR_NAME: &str = "PromptVault";
const DATABASE_FILE: &str = "promptvault.db";
const SETTINGS_FILE: &str = "settings.json";

/// Where the vault keeps its database, settings and image library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub data_dir: PathBuf,
}

impl VaultConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// `$PROMPTVAULT_DATA_DIR`, else `~/Documents/PromptVault`, else the
    /// platform data directory.
    pub fn from_env() -> Result<Self> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        let base = dirs::document_dir()
            .or_else(dirs::data_dir)
            .ok_or_else(|| anyhow!("no documents or data directory for this user"))?;
        Ok(Self::new(base.join(APP_DIR_NAME)))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }
}
