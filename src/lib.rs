//! PromptVault core: a local catalog of AI image-generation prompts.
//!
//! The [`ViewCoordinator`] is what a UI drives. It keeps prompts and
//! collections in step with a [`CommandGateway`], derives the visible list
//! and resolves images for display. [`Vault::open`] wires it to the local
//! SQLite catalog and image library.

pub mod assets;
pub mod config;
pub mod db;
pub mod filter;
pub mod gateway;
pub mod models;
pub mod settings;
pub mod store;
pub mod utils;
pub mod view;

use std::sync::Arc;

use anyhow::{Context, Result};

pub use assets::{AssetResolver, AssetSlot, AssetState, EncodedAsset, ImageLibrary};
pub use config::VaultConfig;
pub use db::Database;
pub use filter::{section_title, visible_prompts, Section};
pub use gateway::{
    CommandGateway, DesktopShell, GatewayError, GatewayResult, LocalGateway, SystemShell,
};
pub use models::{Collection, ImageUpload, Model, NewPrompt, Prompt, PromptPatch, Tags};
pub use settings::{LibrarySettings, SettingsStore};
pub use store::{CollectionStore, PromptStore};
pub use utils::init_logging;
pub use view::{ViewCoordinator, ViewState};

const ENABLE_LOGS: bool = true;

/// A fully wired vault over local storage.
pub struct Vault {
    config: VaultConfig,
    settings: Arc<SettingsStore>,
    gateway: Arc<LocalGateway>,
    view: ViewCoordinator,
}

impl Vault {
    /// Open (or create) the vault described by `config` using the system
    /// clipboard and default viewer.
    pub async fn open(config: VaultConfig) -> Result<Self> {
        Self::open_with_shell(config, Arc::new(SystemShell)).await
    }

    pub async fn open_with_shell(
        config: VaultConfig,
        shell: Arc<dyn DesktopShell>,
    ) -> Result<Self> {
        std::fs::create_dir_all(config.data_dir()).with_context(|| {
            format!("failed to create data directory {}", config.data_dir().display())
        })?;

        let settings = Arc::new(SettingsStore::new(config.settings_path())?);
        let db = Database::new(config.database_path())?;
        db.seed_default_models()
            .await
            .context("failed to seed default models")?;
        let library = ImageLibrary::new(config.data_dir().to_path_buf())?;

        let gateway = Arc::new(LocalGateway::new(db, library, settings.clone(), shell));
        let view = ViewCoordinator::new(gateway.clone());
        log_info!("vault opened at {}", config.data_dir().display());

        Ok(Self {
            config,
            settings,
            gateway,
            view,
        })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn gateway(&self) -> Arc<dyn CommandGateway> {
        self.gateway.clone()
    }

    pub fn view(&self) -> &ViewCoordinator {
        &self.view
    }
}
