//! Prompt records and the inputs that create or modify them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tags;

pub const DEFAULT_DIMENSIONS: &str = "1:1";

fn default_dimensions() -> String {
    DEFAULT_DIMENSIONS.to_string()
}

/// A saved generation request plus its metadata and optional image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub title: String,
    pub prompt_text: String,
    #[serde(default)]
    pub negative_prompt: String,
    pub model: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: String,
    pub steps: Option<i64>,
    pub cfg_scale: Option<f64>,
    pub sampler: Option<String>,
    pub seed: Option<String>,
    pub image_path: Option<String>,
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub is_favorite: bool,
    pub collection_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    /// Reference shown on a gallery card.
    pub fn thumbnail_ref(&self) -> Option<&str> {
        non_empty(self.thumbnail_path.as_deref())
    }

    /// Reference shown in the inspector: full image first, thumbnail otherwise.
    pub fn preview_ref(&self) -> Option<&str> {
        non_empty(self.image_path.as_deref()).or_else(|| self.thumbnail_ref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Draft for a new prompt. The backend assigns id and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPrompt {
    pub title: String,
    pub prompt_text: String,
    pub negative_prompt: Option<String>,
    pub model: String,
    pub dimensions: Option<String>,
    pub steps: Option<i64>,
    pub sampler: Option<String>,
    pub cfg_scale: Option<f64>,
    pub seed: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub collection_id: Option<i64>,
}

impl NewPrompt {
    pub fn new(
        title: impl Into<String>,
        prompt_text: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            prompt_text: prompt_text.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_title(&self.title)?;
        validation::validate_prompt_text(&self.prompt_text)?;
        validation::validate_model(&self.model)?;
        Ok(())
    }
}

/// Sparse update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<i64>,
}

impl PromptPatch {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(title) = &self.title {
            validation::validate_title(title)?;
        }
        if let Some(text) = &self.prompt_text {
            validation::validate_prompt_text(text)?;
        }
        if let Some(model) = &self.model {
            validation::validate_model(model)?;
        }
        Ok(())
    }
}

/// Image attached to a new prompt. Bytes win over a data URL, a data URL
/// over a filesystem path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageUpload {
    pub bytes: Option<Vec<u8>>,
    pub filename: Option<String>,
    pub path: Option<String>,
    pub data_url: Option<String>,
}

impl ImageUpload {
    pub fn from_bytes(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes: Some(bytes),
            filename: Some(filename.into()),
            ..Self::default()
        }
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        Self {
            data_url: Some(data_url.into()),
            ..Self::default()
        }
    }
}

/// Business rules the backend enforces. Failures surface as rejections.
pub mod validation {
    use anyhow::{bail, Result};

    pub fn validate_title(title: &str) -> Result<()> {
        if title.trim().is_empty() {
            bail!("Title must not be empty");
        }
        Ok(())
    }

    pub fn validate_prompt_text(text: &str) -> Result<()> {
        if text.trim().is_empty() {
            bail!("Prompt text must not be empty");
        }
        Ok(())
    }

    pub fn validate_model(model: &str) -> Result<()> {
        if model.trim().is_empty() {
            bail!("Model must not be empty");
        }
        Ok(())
    }

    pub fn validate_collection_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            bail!("Collection name must not be empty");
        }
        Ok(())
    }
}
