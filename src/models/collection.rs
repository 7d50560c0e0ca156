use serde::{Deserialize, Serialize};

pub const DEFAULT_COLLECTION_ICON: &str = "folder";

const COLLECTION_PALETTE: [&str; 6] = [
    "#8B5CF6", "#10B981", "#F59E0B", "#3B82F6", "#EC4899", "#EF4444",
];

/// Named grouping of prompts. Membership lives on `Prompt::collection_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    /// Advisory only; computed by the backend at read time.
    #[serde(default)]
    pub prompt_count: Option<i64>,
}

/// Display color assigned to a new collection.
pub fn color_for_name(name: &str) -> &'static str {
    COLLECTION_PALETTE[name.len() % COLLECTION_PALETTE.len()]
}

/// Entry in the generation-model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    pub is_active: bool,
}

/// Models seeded on first run as `(name, short_name)`. Any other model
/// string is still accepted on prompts.
pub const DEFAULT_MODELS: [(&str, &str); 9] = [
    ("Gemini", "Gemini"),
    ("Chat GPT", "GPT"),
    ("Stable Diffusion XL", "SDXL"),
    ("Midjourney V6", "MJ"),
    ("DALL-E 3", "DALL-E"),
    ("Flux Pro", "Flux"),
    ("Flux.1", "Flux.1"),
    ("Leonardo AI", "Leo"),
    ("Firefly", "Adobe"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_cycles_through_palette_by_name_length() {
        assert_eq!(color_for_name(""), "#8B5CF6");
        assert_eq!(color_for_name("Portraits"), "#3B82F6");
        assert_eq!(color_for_name("Landscape"), color_for_name("Portraits"));
    }

    #[test]
    fn missing_prompt_count_is_none() {
        let collection: Collection = serde_json::from_str(
            r##"{"id":1,"name":"Sci-fi","icon":"folder","color":"#3B82F6"}"##,
        )
        .unwrap();
        assert_eq!(collection.prompt_count, None);
    }
}
