use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::ErrorCode;

use super::{CommandGateway, DesktopShell, GatewayError, GatewayResult};
use crate::assets::{decode_upload, ImageLibrary, StoredImage};
use crate::db::Database;
use crate::models::{
    validation, Collection, ImageUpload, Model, NewPrompt, Prompt, PromptPatch,
};
use crate::settings::SettingsStore;

const ENABLE_LOGS: bool = true;
use crate::{log_error, log_info, log_warn};

const NO_IMAGE_DATA: &str = "No image data was received. Select the file again and retry.";

/// Gateway backed by the local SQLite catalog and image library.
#[derive(Clone)]
pub struct LocalGateway {
    db: Database,
    library: ImageLibrary,
    settings: Arc<SettingsStore>,
    shell: Arc<dyn DesktopShell>,
}

impl LocalGateway {
    pub fn new(
        db: Database,
        library: ImageLibrary,
        settings: Arc<SettingsStore>,
        shell: Arc<dyn DesktopShell>,
    ) -> Self {
        Self {
            db,
            library,
            settings,
            shell,
        }
    }

    pub fn library(&self) -> &ImageLibrary {
        &self.library
    }

    async fn store_upload(&self, upload: &ImageUpload) -> GatewayResult<StoredImage> {
        let decoded = decode_upload(upload)
            .await
            .ok_or_else(|| GatewayError::Rejected(NO_IMAGE_DATA.into()))?;
        let max_edge = self.settings.library().map_err(storage_error)?.thumbnail_max_edge;
        self.library
            .store(decoded, max_edge)
            .await
            .map_err(storage_error)
    }

    async fn discard_images(&self, image_path: Option<&str>, thumbnail_path: Option<&str>) {
        if let Some(image) = image_path {
            self.library.remove(image).await;
        }
        if let Some(thumbnail) = thumbnail_path.filter(|t| Some(*t) != image_path) {
            self.library.remove(thumbnail).await;
        }
    }
}

/// Constraint violations are the backend refusing the request; anything else
/// means storage itself failed.
fn storage_error(err: anyhow::Error) -> GatewayError {
    let constraint = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<rusqlite::Error>())
        .any(|e| e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation));
    if constraint {
        GatewayError::Rejected(err.root_cause().to_string())
    } else {
        log_error!("storage failure: {err:#}");
        GatewayError::Transport(format!("{err:#}"))
    }
}

fn rejected(err: anyhow::Error) -> GatewayError {
    GatewayError::Rejected(err.to_string())
}

fn not_found(id: i64) -> GatewayError {
    GatewayError::Rejected(format!("prompt {id} not found"))
}

#[async_trait]
impl CommandGateway for LocalGateway {
    async fn list_prompts(
        &self,
        model_filter: Option<&str>,
        collection_id: Option<i64>,
    ) -> GatewayResult<Vec<Prompt>> {
        self.db
            .list_prompts(model_filter.map(str::to_string), collection_id)
            .await
            .map_err(storage_error)
    }

    async fn get_prompt(&self, id: i64) -> GatewayResult<Prompt> {
        self.db
            .get_prompt(id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| not_found(id))
    }

    async fn search_prompts(&self, query: &str) -> GatewayResult<Vec<Prompt>> {
        self.db
            .search_prompts(query.to_string())
            .await
            .map_err(storage_error)
    }

    async fn create_prompt(
        &self,
        mut draft: NewPrompt,
        image: Option<ImageUpload>,
    ) -> GatewayResult<Prompt> {
        draft.validate().map_err(rejected)?;
        if draft.dimensions.as_deref().map_or(true, |d| d.trim().is_empty()) {
            let defaults = self.settings.library().map_err(storage_error)?;
            draft.dimensions = Some(defaults.default_dimensions);
        }

        let stored = match &image {
            Some(upload) => Some(self.store_upload(upload).await?),
            None => None,
        };
        let (image_path, thumbnail_path) = match &stored {
            Some(s) => (Some(s.image_path.clone()), Some(s.thumbnail_path.clone())),
            None => (None, None),
        };

        match self
            .db
            .insert_prompt(draft, image_path.clone(), thumbnail_path.clone())
            .await
        {
            Ok(prompt) => {
                log_info!("stored prompt {} ({})", prompt.id, prompt.title);
                Ok(prompt)
            }
            Err(err) => {
                self.discard_images(image_path.as_deref(), thumbnail_path.as_deref())
                    .await;
                Err(storage_error(err))
            }
        }
    }

    async fn update_prompt(&self, id: i64, patch: PromptPatch) -> GatewayResult<Prompt> {
        patch.validate().map_err(rejected)?;
        self.db
            .update_prompt(id, patch)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| not_found(id))
    }

    /// Deleting a prompt that is already gone succeeds.
    async fn delete_prompt(&self, id: i64) -> GatewayResult<()> {
        let removed = self.db.delete_prompt(id).await.map_err(storage_error)?;
        match removed {
            Some(prompt) => {
                self.discard_images(prompt.image_path.as_deref(), prompt.thumbnail_path.as_deref())
                    .await;
                log_info!("deleted prompt {id}");
            }
            None => log_warn!("delete of unknown prompt {id}"),
        }
        Ok(())
    }

    async fn toggle_favorite(&self, id: i64) -> GatewayResult<bool> {
        self.db
            .toggle_favorite(id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| not_found(id))
    }

    async fn list_collections(&self) -> GatewayResult<Vec<Collection>> {
        self.db.list_collections().await.map_err(storage_error)
    }

    async fn create_collection(&self, name: &str) -> GatewayResult<Collection> {
        validation::validate_collection_name(name).map_err(rejected)?;
        let name = name.trim().to_string();
        self.db
            .insert_collection(name.clone())
            .await
            .map_err(|err| match storage_error(err) {
                GatewayError::Rejected(_) => {
                    GatewayError::Rejected(format!("A collection named \"{name}\" already exists"))
                }
                other => other,
            })
    }

    async fn list_models(&self) -> GatewayResult<Vec<Model>> {
        self.db.list_active_models().await.map_err(storage_error)
    }

    async fn get_image_bytes(&self, path: &str) -> GatewayResult<String> {
        self.library
            .read_base64(path)
            .await
            .map_err(|err| GatewayError::Asset(format!("{err:#}")))
    }

    async fn copy_text(&self, text: &str) -> GatewayResult<()> {
        self.shell
            .copy_text(text.to_string())
            .await
            .map_err(|err| GatewayError::Transport(format!("{err:#}")))
    }

    async fn open_asset_externally(&self, path: &str) -> GatewayResult<()> {
        let full = self
            .library
            .resolve(path)
            .map_err(|err| GatewayError::Asset(format!("{path}: {err}")))?;
        if !full.exists() {
            return Err(GatewayError::Asset(format!("{path} does not exist")));
        }
        self.shell
            .open_path(&full)
            .await
            .map_err(|err| GatewayError::Transport(format!("{err:#}")))
    }
}
