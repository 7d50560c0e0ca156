//! In-memory gateway for unit tests. Calls can be gated so a test decides
//! the order in which overlapping requests complete. Reads take their result
//! when the call arrives, like a backend that answers from a snapshot.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::oneshot;

use super::{CommandGateway, GatewayError, GatewayResult};
use crate::models::{Collection, ImageUpload, Model, NewPrompt, Prompt, PromptPatch, Tags};

pub fn sample_prompt(id: i64, title: &str, tags: &[&str], is_favorite: bool) -> Prompt {
    let created =
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(id);
    Prompt {
        id,
        title: title.to_string(),
        prompt_text: format!("{title} prompt"),
        negative_prompt: String::new(),
        model: "Gemini".to_string(),
        dimensions: "1:1".to_string(),
        steps: None,
        cfg_scale: None,
        sampler: None,
        seed: None,
        image_path: None,
        thumbnail_path: None,
        tags: Tags::new(tags),
        is_favorite,
        collection_id: None,
        created_at: created,
        updated_at: created,
    }
}

const READS: [&str; 6] = [
    "list_prompts",
    "get_prompt",
    "search_prompts",
    "list_collections",
    "list_models",
    "get_image_bytes",
];

#[derive(Default)]
struct Script {
    prompts: Vec<Prompt>,
    collections: Vec<Collection>,
    images: HashMap<String, String>,
    failing: HashSet<&'static str>,
    gated: HashSet<&'static str>,
    pending: Vec<(String, oneshot::Sender<()>)>,
    calls: Vec<String>,
    copied: Vec<String>,
    opened: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub fn with_prompts(prompts: Vec<Prompt>) -> Self {
        let gateway = Self::default();
        gateway.lock().prompts = prompts;
        gateway
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Hold every read until [`release`](Self::release) is called for its label.
    pub fn gate(&self) {
        self.lock().gated.extend(READS);
    }

    /// Hold one more operation, by trait method name.
    pub fn gate_op(&self, op: &'static str) {
        self.lock().gated.insert(op);
    }

    pub fn fail(&self, op: &'static str) {
        self.lock().failing.insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.lock().failing.remove(op);
    }

    pub fn set_favorite(&self, id: i64, value: bool) {
        if let Some(p) = self.lock().prompts.iter_mut().find(|p| p.id == id) {
            p.is_favorite = value;
        }
    }

    pub fn add_image(&self, path: &str, base64: &str) {
        self.lock().images.insert(path.to_string(), base64.to_string());
    }

    pub fn add_collection(&self, collection: Collection) {
        self.lock().collections.push(collection);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn copied(&self) -> Vec<String> {
        self.lock().copied.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    pub fn is_pending(&self, label: &str) -> bool {
        self.lock().pending.iter().any(|(l, _)| l == label)
    }

    pub async fn wait_for_pending(&self, label: &str) {
        while !self.is_pending(label) {
            tokio::task::yield_now().await;
        }
    }

    pub fn release(&self, label: &str) {
        let mut script = self.lock();
        if let Some(pos) = script.pending.iter().position(|(l, _)| l == label) {
            let (_, tx) = script.pending.remove(pos);
            let _ = tx.send(());
        }
    }

    /// Record the call, take `snapshot` of the script, then wait at the
    /// gate if `op` is held.
    async fn respond<T>(
        &self,
        label: String,
        op: &'static str,
        snapshot: impl FnOnce(&Script) -> T,
    ) -> GatewayResult<T> {
        let (value, gate) = {
            let mut script = self.lock();
            script.calls.push(label.clone());
            let value = snapshot(&script);
            let gate = if script.gated.contains(op) {
                let (tx, rx) = oneshot::channel();
                script.pending.push((label, tx));
                Some(rx)
            } else {
                None
            };
            (value, gate)
        };
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        if self.lock().failing.contains(op) {
            return Err(GatewayError::Transport(format!("{op} unreachable")));
        }
        Ok(value)
    }

    async fn enter(&self, label: String, op: &'static str) -> GatewayResult<()> {
        self.respond(label, op, |_| ()).await
    }

    fn not_found(id: i64) -> GatewayError {
        GatewayError::Rejected(format!("prompt {id} not found"))
    }
}

#[async_trait]
impl CommandGateway for ScriptedGateway {
    async fn list_prompts(
        &self,
        model_filter: Option<&str>,
        collection_id: Option<i64>,
    ) -> GatewayResult<Vec<Prompt>> {
        let label = format!("list:{}", model_filter.unwrap_or("*"));
        self.respond(label, "list_prompts", |script| {
            script
                .prompts
                .iter()
                .filter(|p| model_filter.map_or(true, |m| p.model == m))
                .filter(|p| collection_id.map_or(true, |c| p.collection_id == Some(c)))
                .cloned()
                .collect()
        })
        .await
    }

    async fn get_prompt(&self, id: i64) -> GatewayResult<Prompt> {
        self.respond(format!("get:{id}"), "get_prompt", |script| {
            script.prompts.iter().find(|p| p.id == id).cloned()
        })
        .await?
        .ok_or_else(|| Self::not_found(id))
    }

    async fn search_prompts(&self, query: &str) -> GatewayResult<Vec<Prompt>> {
        let needle = query.to_lowercase();
        self.respond(format!("search:{query}"), "search_prompts", |script| {
            script
                .prompts
                .iter()
                .filter(|p| p.title.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        })
        .await
    }

    async fn create_prompt(
        &self,
        draft: NewPrompt,
        image: Option<ImageUpload>,
    ) -> GatewayResult<Prompt> {
        self.enter("create".to_string(), "create_prompt").await?;
        draft
            .validate()
            .map_err(|err| GatewayError::Rejected(err.to_string()))?;
        let mut script = self.lock();
        let id = script.prompts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let mut prompt = sample_prompt(id, &draft.title, &[], false);
        prompt.prompt_text = draft.prompt_text;
        prompt.model = draft.model;
        prompt.tags = Tags::new(&draft.tags);
        prompt.collection_id = draft.collection_id;
        if let Some(upload) = image {
            let name = upload.filename.unwrap_or_else(|| "upload.png".into());
            prompt.image_path = Some(format!("images/{name}"));
            prompt.thumbnail_path = Some(format!("thumbnails/{name}"));
        }
        script.prompts.insert(0, prompt.clone());
        Ok(prompt)
    }

    async fn update_prompt(&self, id: i64, patch: PromptPatch) -> GatewayResult<Prompt> {
        self.enter(format!("update:{id}"), "update_prompt").await?;
        patch
            .validate()
            .map_err(|err| GatewayError::Rejected(err.to_string()))?;
        let mut script = self.lock();
        let prompt = script
            .prompts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        if let Some(title) = patch.title {
            prompt.title = title;
        }
        if let Some(text) = patch.prompt_text {
            prompt.prompt_text = text;
        }
        if let Some(tags) = patch.tags {
            prompt.tags = Tags::new(&tags);
        }
        if let Some(collection_id) = patch.collection_id {
            prompt.collection_id = Some(collection_id);
        }
        Ok(prompt.clone())
    }

    async fn delete_prompt(&self, id: i64) -> GatewayResult<()> {
        self.enter(format!("delete:{id}"), "delete_prompt").await?;
        self.lock().prompts.retain(|p| p.id != id);
        Ok(())
    }

    async fn toggle_favorite(&self, id: i64) -> GatewayResult<bool> {
        self.enter(format!("favorite:{id}"), "toggle_favorite").await?;
        let mut script = self.lock();
        let prompt = script
            .prompts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        prompt.is_favorite = !prompt.is_favorite;
        Ok(prompt.is_favorite)
    }

    async fn list_collections(&self) -> GatewayResult<Vec<Collection>> {
        self.respond("collections".to_string(), "list_collections", |script| {
            script.collections.clone()
        })
        .await
    }

    async fn create_collection(&self, name: &str) -> GatewayResult<Collection> {
        self.enter(format!("create_collection:{name}"), "create_collection")
            .await?;
        let mut script = self.lock();
        if script.collections.iter().any(|c| c.name == name) {
            return Err(GatewayError::Rejected(format!(
                "collection {name} already exists"
            )));
        }
        let collection = Collection {
            id: script.collections.len() as i64 + 1,
            name: name.to_string(),
            icon: "folder".to_string(),
            color: crate::models::color_for_name(name).to_string(),
            prompt_count: Some(0),
        };
        script.collections.push(collection.clone());
        Ok(collection)
    }

    async fn list_models(&self) -> GatewayResult<Vec<Model>> {
        self.enter("models".to_string(), "list_models").await?;
        Ok(Vec::new())
    }

    async fn get_image_bytes(&self, path: &str) -> GatewayResult<String> {
        self.respond(format!("image:{path}"), "get_image_bytes", |script| {
            script.images.get(path).cloned()
        })
        .await?
        .ok_or_else(|| GatewayError::Asset(format!("{path} not found")))
    }

    async fn copy_text(&self, text: &str) -> GatewayResult<()> {
        self.enter("copy".to_string(), "copy_text").await?;
        self.lock().copied.push(text.to_string());
        Ok(())
    }

    async fn open_asset_externally(&self, path: &str) -> GatewayResult<()> {
        self.enter(format!("open:{path}"), "open_asset_externally").await?;
        self.lock().opened.push(path.to_string());
        Ok(())
    }
}
