use std::sync::Arc;

use tokio::sync::Mutex;

use super::ViewState;
use crate::assets::{AssetResolver, AssetSlot, AssetState};
use crate::filter::{section_title, visible_prompts, Section};
use crate::gateway::{CommandGateway, GatewayError, GatewayResult};
use crate::models::{Collection, ImageUpload, NewPrompt, Prompt};
use crate::store::{CollectionStore, PromptStore};

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_info};

/// Wires user intents to the stores, the filter and the asset resolver.
///
/// The view state lock is never held across a gateway call. A reload takes
/// its read number while the lock is held, so the newest filter always maps
/// to the newest read.
#[derive(Clone)]
pub struct ViewCoordinator {
    gateway: Arc<dyn CommandGateway>,
    state: Arc<Mutex<ViewState>>,
    prompts: PromptStore,
    collections: CollectionStore,
    assets: AssetResolver,
}

impl ViewCoordinator {
    pub fn new(gateway: Arc<dyn CommandGateway>) -> Self {
        Self {
            prompts: PromptStore::new(gateway.clone()),
            collections: CollectionStore::new(gateway.clone()),
            assets: AssetResolver::new(gateway.clone()),
            state: Arc::new(Mutex::new(ViewState::new())),
            gateway,
        }
    }

    pub fn prompts(&self) -> &PromptStore {
        &self.prompts
    }

    pub fn collections(&self) -> &CollectionStore {
        &self.collections
    }

    pub fn assets(&self) -> &AssetResolver {
        &self.assets
    }

    pub async fn state(&self) -> ViewState {
        self.state.lock().await.clone()
    }

    /// Initial fetch of collections and prompts.
    pub async fn start(&self) {
        let (_, prompts) = tokio::join!(self.collections.load(), self.refresh());
        log_info!("catalog ready with {} prompts", prompts.len());
    }

    /// Reload prompts for the current model filter and collection.
    pub async fn refresh(&self) -> Vec<Prompt> {
        let (key, seq) = {
            let state = self.state.lock().await;
            (state.fetch_key(), self.prompts.issue().await)
        };
        let prompts = self
            .prompts
            .load_issued(seq, key.model_filter.as_deref(), key.collection_id)
            .await;
        let ids: Vec<i64> = prompts.iter().map(|p| p.id).collect();
        self.assets.retain_cards(&ids).await;
        prompts
    }

    pub async fn select_section(&self, section: Section) {
        let reload = self.state.lock().await.select_section(section);
        self.assets.release(AssetSlot::Inspector).await;
        if reload {
            self.refresh().await;
        }
    }

    pub async fn select_collection(&self, collection_id: i64) {
        self.select_section(Section::Collection(Some(collection_id))).await;
    }

    pub async fn set_model_filter(&self, model_filter: Option<String>) {
        let reload = self.state.lock().await.set_model_filter(model_filter);
        if reload {
            self.refresh().await;
        }
    }

    pub async fn set_query(&self, query: impl Into<String>) {
        self.state.lock().await.set_query(query);
    }

    /// Prompts to display for the current section and query.
    pub async fn visible(&self) -> Vec<Prompt> {
        let (section, query) = {
            let state = self.state.lock().await;
            (state.section, state.query.clone())
        };
        visible_prompts(&self.prompts.prompts().await, section, &query)
    }

    pub async fn title(&self) -> String {
        let section = self.state.lock().await.section;
        section_title(section, &self.collections.collections().await)
    }

    /// Select a prompt and point the inspector at its preview image.
    pub async fn select_prompt(&self, id: i64) -> Option<AssetState> {
        self.state.lock().await.select_prompt(id);
        let reference = self
            .prompts
            .find(id)
            .await
            .and_then(|p| p.preview_ref().map(str::to_string));
        self.assets.assign(AssetSlot::Inspector, reference).await
    }

    pub async fn clear_selection(&self) {
        self.state.lock().await.clear_selection();
        self.assets.release(AssetSlot::Inspector).await;
    }

    pub async fn selected(&self) -> Option<Prompt> {
        let id = self.state.lock().await.selected_prompt?;
        self.prompts.find(id).await
    }

    /// Resolve the thumbnail for a gallery card.
    pub async fn card_image(&self, id: i64) -> Option<AssetState> {
        let reference = self
            .prompts
            .find(id)
            .await
            .and_then(|p| p.thumbnail_ref().map(str::to_string));
        self.assets.assign(AssetSlot::Card(id), reference).await
    }

    pub async fn create_prompt(
        &self,
        draft: NewPrompt,
        image: Option<ImageUpload>,
    ) -> GatewayResult<Prompt> {
        self.prompts.create(draft, image).await
    }

    pub async fn create_collection(&self, name: &str) -> GatewayResult<Collection> {
        self.collections.create(name).await
    }

    pub async fn toggle_favorite(&self, id: i64) -> GatewayResult<bool> {
        self.prompts.toggle_favorite(id).await
    }

    /// Delete the selected prompt. The selection is kept if the delete fails.
    pub async fn delete_selected(&self) -> GatewayResult<()> {
        let Some(id) = self.state.lock().await.selected_prompt else {
            return Ok(());
        };
        self.prompts.remove(id).await?;

        let was_selected = {
            let mut state = self.state.lock().await;
            let hit = state.selected_prompt == Some(id);
            if hit {
                state.clear_selection();
            }
            hit
        };
        if was_selected {
            self.assets.release(AssetSlot::Inspector).await;
        }
        self.assets.release(AssetSlot::Card(id)).await;
        Ok(())
    }

    pub async fn copy_prompt_text(&self, id: i64) -> GatewayResult<()> {
        let prompt = self.known_prompt(id).await?;
        self.gateway.copy_text(&prompt.prompt_text).await?;
        log_debug!("copied prompt {id} to clipboard");
        Ok(())
    }

    pub async fn open_image_externally(&self, id: i64) -> GatewayResult<()> {
        let prompt = self.known_prompt(id).await?;
        let path = prompt
            .preview_ref()
            .filter(|r| !r.starts_with("data:"))
            .ok_or_else(|| GatewayError::Rejected("This prompt has no image file".into()))?;
        self.gateway.open_asset_externally(path).await
    }

    async fn known_prompt(&self, id: i64) -> GatewayResult<Prompt> {
        self.prompts
            .find(id)
            .await
            .ok_or_else(|| GatewayError::Rejected(format!("prompt {id} not found")))
    }
}
