//! Command Gateway: the typed boundary between the catalog core and whatever
//! persists prompts and performs OS-level actions.
//!
//! The core only ever talks to `Arc<dyn CommandGateway>`. [`LocalGateway`]
//! is the in-process implementation over SQLite and the on-disk image
//! library; tests substitute scripted gateways.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Collection, ImageUpload, Model, NewPrompt, Prompt, PromptPatch};

pub mod local;
pub mod shell;
#[cfg(test)]
pub(crate) mod testing;

pub use local::LocalGateway;
pub use shell::{DesktopShell, SystemShell};

/// Failures surfaced by a gateway call. `Display` is the message shown to
/// the user next to the action that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The backend could not be reached or failed internally.
    #[error("Request failed: {0}")]
    Transport(String),
    /// The backend refused the request (validation, missing record, conflict).
    #[error("{0}")]
    Rejected(String),
    /// An image file could not be read.
    #[error("Image unavailable: {0}")]
    Asset(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Operations the core consumes. Argument shapes are the contract; how the
/// backend satisfies them is opaque.
#[async_trait]
pub trait CommandGateway: Send + Sync {
    /// Prompts matching an optional model name and collection, newest first.
    async fn list_prompts(
        &self,
        model_filter: Option<&str>,
        collection_id: Option<i64>,
    ) -> GatewayResult<Vec<Prompt>>;

    async fn get_prompt(&self, id: i64) -> GatewayResult<Prompt>;

    /// Full-text match over title, prompt text and tags.
    async fn search_prompts(&self, query: &str) -> GatewayResult<Vec<Prompt>>;

    async fn create_prompt(
        &self,
        draft: NewPrompt,
        image: Option<ImageUpload>,
    ) -> GatewayResult<Prompt>;

    async fn update_prompt(&self, id: i64, patch: PromptPatch) -> GatewayResult<Prompt>;

    async fn delete_prompt(&self, id: i64) -> GatewayResult<()>;

    /// Flips the stored favorite flag and returns the new value.
    async fn toggle_favorite(&self, id: i64) -> GatewayResult<bool>;

    async fn list_collections(&self) -> GatewayResult<Vec<Collection>>;

    async fn create_collection(&self, name: &str) -> GatewayResult<Collection>;

    async fn list_models(&self) -> GatewayResult<Vec<Model>>;

    /// Base64 of the file at `path` (relative to the image library).
    async fn get_image_bytes(&self, path: &str) -> GatewayResult<String>;

    async fn copy_text(&self, text: &str) -> GatewayResult<()>;

    async fn open_asset_externally(&self, path: &str) -> GatewayResult<()>;
}
