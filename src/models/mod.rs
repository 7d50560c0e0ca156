pub mod collection;
pub mod prompt;
pub mod tags;

pub use collection::{color_for_name, Collection, Model, DEFAULT_COLLECTION_ICON, DEFAULT_MODELS};
pub use prompt::{validation, ImageUpload, NewPrompt, Prompt, PromptPatch, DEFAULT_DIMENSIONS};
pub use tags::{Tags, WireTags};
