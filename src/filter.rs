//! Derives the visible prompt list from the loaded set. Pure; safe to run on
//! every keystroke.
//!
//! Model filtering happens when prompts are fetched, not here.

use serde::{Deserialize, Serialize};

use crate::models::{Collection, Prompt};

/// Sidebar selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "section", content = "collection_id", rename_all = "snake_case")]
pub enum Section {
    #[default]
    All,
    Favorites,
    /// Listed in the sidebar but shows everything.
    History,
    Collection(Option<i64>),
}

impl Section {
    pub fn collection_id(&self) -> Option<i64> {
        match self {
            Section::Collection(id) => *id,
            _ => None,
        }
    }
}

/// Prompts to show for `section` and `query`.
///
/// A non-empty query replaces the section narrowing entirely: a favorite-only
/// or collection-only view still lists every text match.
pub fn visible_prompts(prompts: &[Prompt], section: Section, query: &str) -> Vec<Prompt> {
    let query = query.trim().to_lowercase();
    prompts
        .iter()
        .filter(|prompt| {
            if query.is_empty() {
                in_section(prompt, section)
            } else {
                matches_query(prompt, &query)
            }
        })
        .cloned()
        .collect()
}

fn in_section(prompt: &Prompt, section: Section) -> bool {
    match section {
        Section::All | Section::History | Section::Collection(None) => true,
        Section::Favorites => prompt.is_favorite,
        Section::Collection(Some(id)) => prompt.collection_id == Some(id),
    }
}

/// `needle` must already be lowercase.
fn matches_query(prompt: &Prompt, needle: &str) -> bool {
    prompt.title.to_lowercase().contains(needle)
        || prompt.prompt_text.to_lowercase().contains(needle)
        || prompt.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
}

/// Header title for the current section.
pub fn section_title(section: Section, collections: &[Collection]) -> String {
    match section {
        Section::Collection(Some(id)) => collections
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Collection".to_string()),
        Section::Favorites => "Favorites".to_string(),
        _ => "Gallery".to_string(),
    }
}
