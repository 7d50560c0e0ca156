use serde::{Deserialize, Serialize};

use crate::filter::Section;

/// What the catalog needs to fetch: model name and collection, both optional.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchKey {
    pub model_filter: Option<String>,
    pub collection_id: Option<i64>,
}

/// UI selection. Transitions that change what must be fetched return `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub section: Section,
    pub model_filter: Option<String>,
    pub query: String,
    pub selected_prompt: Option<i64>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_key(&self) -> FetchKey {
        FetchKey {
            model_filter: self.model_filter.clone(),
            collection_id: self.section.collection_id(),
        }
    }

    /// Switch sections. Always drops the selected prompt.
    pub fn select_section(&mut self, section: Section) -> bool {
        let before = self.section.collection_id();
        self.section = section;
        self.selected_prompt = None;
        before != section.collection_id()
    }

    pub fn select_collection(&mut self, collection_id: i64) -> bool {
        self.select_section(Section::Collection(Some(collection_id)))
    }

    pub fn set_model_filter(&mut self, model_filter: Option<String>) -> bool {
        let model_filter = model_filter.filter(|m| !m.trim().is_empty());
        if self.model_filter == model_filter {
            return false;
        }
        self.model_filter = model_filter;
        true
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn select_prompt(&mut self, id: i64) {
        self.selected_prompt = Some(id);
    }

    pub fn clear_selection(&mut self) {
        self.selected_prompt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_change_clears_selection() {
        let mut state = ViewState::new();
        state.select_prompt(4);
        assert!(!state.select_section(Section::Favorites));
        assert_eq!(state.selected_prompt, None);
        assert_eq!(state.section, Section::Favorites);
    }

    #[test]
    fn selecting_a_collection_implies_collection_section() {
        let mut state = ViewState::new();
        assert!(state.select_collection(3));
        assert_eq!(state.section, Section::Collection(Some(3)));
        assert_eq!(state.fetch_key().collection_id, Some(3));

        assert!(!state.select_collection(3));
        assert!(state.select_section(Section::All));
        assert_eq!(state.fetch_key().collection_id, None);
    }

    #[test]
    fn model_filter_reports_changes_only() {
        let mut state = ViewState::new();
        assert!(state.set_model_filter(Some("Gemini".into())));
        assert!(!state.set_model_filter(Some("Gemini".into())));
        assert!(state.set_model_filter(Some(String::new())));
        assert_eq!(state.model_filter, None);
        assert!(!state.set_model_filter(None));
    }

    #[test]
    fn query_does_not_touch_selection() {
        let mut state = ViewState::new();
        state.select_prompt(1);
        state.set_query("cat");
        assert_eq!(state.selected_prompt, Some(1));
        state.clear_selection();
        assert_eq!(state.selected_prompt, None);
    }
}
