use std::sync::Arc;

use tokio::sync::Mutex;

use super::RequestSequence;
use crate::gateway::{CommandGateway, GatewayResult};
use crate::models::{ImageUpload, NewPrompt, Prompt, PromptPatch};

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_error, log_info};

/// A confirmed mutation, kept while a read issued before it is in flight.
#[derive(Debug, Clone)]
enum LocalChange {
    Created(Prompt),
    Updated(Prompt),
    Removed(i64),
    Favorite(i64, bool),
}

impl LocalChange {
    fn apply(&self, prompts: &mut Vec<Prompt>) {
        match self {
            LocalChange::Created(prompt) => {
                if !prompts.iter().any(|p| p.id == prompt.id) {
                    prompts.insert(0, prompt.clone());
                }
            }
            LocalChange::Updated(prompt) => {
                if let Some(slot) = prompts.iter_mut().find(|p| p.id == prompt.id) {
                    *slot = prompt.clone();
                }
            }
            LocalChange::Removed(id) => prompts.retain(|p| p.id != *id),
            LocalChange::Favorite(id, is_favorite) => {
                if let Some(prompt) = prompts.iter_mut().find(|p| p.id == *id) {
                    prompt.is_favorite = *is_favorite;
                }
            }
        }
    }
}

#[derive(Default)]
struct PromptState {
    prompts: Vec<Prompt>,
    sequence: RequestSequence,
    /// Changes tagged with the newest read issued when they were confirmed.
    journal: Vec<(u64, LocalChange)>,
}

impl PromptState {
    fn record(&mut self, change: LocalChange) {
        change.apply(&mut self.prompts);
        if self.sequence.is_busy() {
            self.journal.push((self.sequence.latest(), change));
        }
    }

    /// Reads issued after a change already reflect it.
    fn prune_journal(&mut self) {
        let settled = self.sequence.settled();
        self.journal.retain(|(seq, _)| *seq > settled);
    }
}

/// In-memory prompt set kept in step with the gateway.
///
/// Reads replace the whole set and are ordered by [`RequestSequence`].
/// Mutations change the set only after the gateway confirms them; a failed
/// mutation returns the error and leaves the set untouched. A confirmed
/// mutation is replayed over any read that was already in flight when it
/// landed.
#[derive(Clone)]
pub struct PromptStore {
    gateway: Arc<dyn CommandGateway>,
    state: Arc<Mutex<PromptState>>,
}

impl PromptStore {
    pub fn new(gateway: Arc<dyn CommandGateway>) -> Self {
        Self {
            gateway,
            state: Arc::new(Mutex::new(PromptState::default())),
        }
    }

    /// Replace the set with the prompts matching the server-side filter.
    /// Returns the set as it stands once this request has settled.
    pub async fn load(
        &self,
        model_filter: Option<&str>,
        collection_id: Option<i64>,
    ) -> Vec<Prompt> {
        let seq = self.issue().await;
        self.load_issued(seq, model_filter, collection_id).await
    }

    /// Reserve the next read number. Callers that derive the filter from
    /// their own state take it while still holding that state, then pass it
    /// to [`load_issued`](Self::load_issued).
    pub async fn issue(&self) -> u64 {
        self.state.lock().await.sequence.issue()
    }

    pub async fn load_issued(
        &self,
        seq: u64,
        model_filter: Option<&str>,
        collection_id: Option<i64>,
    ) -> Vec<Prompt> {
        let result = self.gateway.list_prompts(model_filter, collection_id).await;
        self.reconcile(seq, result, "load").await
    }

    /// Replace the set with the server's full-text matches for `query`.
    pub async fn search(&self, query: &str) -> Vec<Prompt> {
        let seq = self.issue().await;
        let result = self.gateway.search_prompts(query).await;
        self.reconcile(seq, result, "search").await
    }

    async fn reconcile(
        &self,
        seq: u64,
        result: GatewayResult<Vec<Prompt>>,
        op: &str,
    ) -> Vec<Prompt> {
        let mut state = self.state.lock().await;
        let newest = state.sequence.settle(seq);
        match result {
            Ok(mut prompts) if newest => {
                let mut replayed = 0;
                for (_, change) in state.journal.iter().filter(|(at, _)| *at >= seq) {
                    change.apply(&mut prompts);
                    replayed += 1;
                }
                log_debug!(
                    "{op} #{seq} applied {} prompts, replayed {replayed} local changes",
                    prompts.len()
                );
                state.prompts = prompts;
            }
            Ok(_) => log_debug!("{op} #{seq} superseded, discarding response"),
            Err(err) => log_error!("{op} #{seq} failed: {err}"),
        }
        state.prune_journal();
        state.prompts.clone()
    }

    /// Create a prompt and put it at the front of the set.
    pub async fn create(
        &self,
        draft: NewPrompt,
        image: Option<ImageUpload>,
    ) -> GatewayResult<Prompt> {
        let prompt = self.gateway.create_prompt(draft, image).await?;
        log_info!("created prompt {}", prompt.id);
        self.state
            .lock()
            .await
            .record(LocalChange::Created(prompt.clone()));
        Ok(prompt)
    }

    /// Apply a sparse patch. The updated prompt keeps its position.
    pub async fn update(&self, id: i64, patch: PromptPatch) -> GatewayResult<Prompt> {
        let prompt = self.gateway.update_prompt(id, patch).await?;
        self.state
            .lock()
            .await
            .record(LocalChange::Updated(prompt.clone()));
        Ok(prompt)
    }

    pub async fn remove(&self, id: i64) -> GatewayResult<()> {
        self.gateway.delete_prompt(id).await?;
        log_info!("deleted prompt {id}");
        self.state.lock().await.record(LocalChange::Removed(id));
        Ok(())
    }

    /// Flip the favorite flag server-side. The local copy takes whatever
    /// value the gateway reports.
    pub async fn toggle_favorite(&self, id: i64) -> GatewayResult<bool> {
        let is_favorite = self.gateway.toggle_favorite(id).await?;
        self.state
            .lock()
            .await
            .record(LocalChange::Favorite(id, is_favorite));
        Ok(is_favorite)
    }

    /// Fetch one prompt from the gateway without touching the set.
    pub async fn get(&self, id: i64) -> GatewayResult<Prompt> {
        self.gateway.get_prompt(id).await
    }

    pub async fn find(&self, id: i64) -> Option<Prompt> {
        self.state.lock().await.prompts.iter().find(|p| p.id == id).cloned()
    }

    pub async fn prompts(&self) -> Vec<Prompt> {
        self.state.lock().await.prompts.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.sequence.is_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{sample_prompt, ScriptedGateway};
    use crate::gateway::GatewayError;

    fn with_model(id: i64, title: &str, model: &str) -> Prompt {
        let mut prompt = sample_prompt(id, title, &[], false);
        prompt.model = model.to_string();
        prompt
    }

    fn setup(prompts: Vec<Prompt>) -> (Arc<ScriptedGateway>, PromptStore) {
        let gateway = Arc::new(ScriptedGateway::with_prompts(prompts));
        let store = PromptStore::new(gateway.clone());
        (gateway, store)
    }

    #[tokio::test]
    async fn later_issued_load_wins_when_earlier_arrives_last() {
        let (gateway, store) = setup(vec![
            with_model(1, "Heavy", "A"),
            with_model(2, "Light", "B"),
        ]);
        gateway.gate();

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.load(Some("A"), None).await }
        });
        gateway.wait_for_pending("list:A").await;
        let second = tokio::spawn({
            let store = store.clone();
            async move { store.load(Some("B"), None).await }
        });
        gateway.wait_for_pending("list:B").await;
        assert!(store.is_loading().await);

        gateway.release("list:B");
        let after_b = second.await.unwrap();
        assert!(!store.is_loading().await);

        gateway.release("list:A");
        let after_a = first.await.unwrap();

        assert_eq!(after_b.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(after_a, after_b);
        assert_eq!(store.prompts().await, after_b);
    }

    fn ids(prompts: &[Prompt]) -> Vec<i64> {
        prompts.iter().map(|p| p.id).collect()
    }

    fn spawn_load(store: &PromptStore) -> tokio::task::JoinHandle<Vec<Prompt>> {
        let store = store.clone();
        tokio::spawn(async move { store.load(None, None).await })
    }

    #[tokio::test]
    async fn create_survives_a_load_that_was_already_in_flight() {
        let (gateway, store) = setup(vec![sample_prompt(1, "Sunset", &[], false)]);
        gateway.gate();

        let load = spawn_load(&store);
        gateway.wait_for_pending("list:*").await;
        let created = store.create(NewPrompt::new("T", "P", "X"), None).await.unwrap();
        assert_eq!(created.id, 2);
        assert_eq!(ids(&store.prompts().await), vec![2]);

        gateway.release("list:*");
        assert_eq!(ids(&load.await.unwrap()), vec![2, 1]);
        assert_eq!(ids(&store.prompts().await), vec![2, 1]);
        assert!(store.state.lock().await.journal.is_empty());
    }

    #[tokio::test]
    async fn delete_and_favorite_survive_a_stale_load() {
        let (gateway, store) = setup(vec![
            sample_prompt(1, "Sunset", &[], false),
            sample_prompt(2, "Robot", &[], false),
        ]);
        store.load(None, None).await;
        gateway.gate();

        let load = spawn_load(&store);
        gateway.wait_for_pending("list:*").await;
        store.remove(2).await.unwrap();
        assert!(store.toggle_favorite(1).await.unwrap());

        gateway.release("list:*");
        let prompts = load.await.unwrap();
        assert_eq!(ids(&prompts), vec![1]);
        assert!(prompts[0].is_favorite);
    }

    #[tokio::test]
    async fn changes_are_not_replayed_over_later_reads() {
        let (gateway, store) = setup(vec![sample_prompt(1, "Sunset", &[], false)]);
        gateway.gate();

        let stale = tokio::spawn({
            let store = store.clone();
            async move { store.load(Some("Gemini"), None).await }
        });
        gateway.wait_for_pending("list:Gemini").await;
        assert!(store.toggle_favorite(1).await.unwrap());

        // Another writer clears the flag before the next read.
        gateway.set_favorite(1, false);
        let fresh = spawn_load(&store);
        gateway.wait_for_pending("list:*").await;

        gateway.release("list:*");
        let prompts = fresh.await.unwrap();
        assert!(!prompts[0].is_favorite);
        assert!(store.state.lock().await.journal.is_empty());

        gateway.release("list:Gemini");
        stale.await.unwrap();
        assert!(!store.find(1).await.unwrap().is_favorite);
    }

    #[tokio::test]
    async fn confirmed_changes_outside_a_read_are_not_journaled() {
        let (_gateway, store) = setup(vec![sample_prompt(1, "Sunset", &[], false)]);
        store.load(None, None).await;
        store.toggle_favorite(1).await.unwrap();
        assert!(store.state.lock().await.journal.is_empty());
        assert!(store.find(1).await.unwrap().is_favorite);
    }

    #[tokio::test]
    async fn older_success_after_newer_failure_is_discarded() {
        let (gateway, store) = setup(vec![with_model(1, "Heavy", "A")]);
        gateway.gate();

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.load(Some("A"), None).await }
        });
        gateway.wait_for_pending("list:A").await;
        let second = tokio::spawn({
            let store = store.clone();
            async move { store.load(Some("B"), None).await }
        });
        gateway.wait_for_pending("list:B").await;

        gateway.fail("list_prompts");
        gateway.release("list:B");
        second.await.unwrap();
        gateway.heal("list_prompts");
        gateway.release("list:A");
        first.await.unwrap();

        assert!(store.prompts().await.is_empty());
        assert!(!store.is_loading().await);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_set_and_clears_loading() {
        let (gateway, store) = setup(vec![sample_prompt(1, "Sunset", &[], false)]);
        let loaded = store.load(None, None).await;
        assert_eq!(loaded.len(), 1);

        gateway.fail("list_prompts");
        let after = store.load(None, None).await;
        assert_eq!(after, loaded);
        assert!(!store.is_loading().await);
    }

    #[tokio::test]
    async fn search_replaces_rather_than_merges() {
        let (_gateway, store) = setup(vec![
            sample_prompt(1, "Cat nap", &[], false),
            sample_prompt(2, "Dog park", &[], false),
            sample_prompt(3, "Catalina", &[], false),
        ]);
        store.load(None, None).await;

        let found = store.search("cat").await;
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(store.prompts().await, found);
    }

    #[tokio::test]
    async fn created_prompt_is_listed_first() {
        let existing = (1..=6)
            .map(|id| sample_prompt(id, &format!("P{id}"), &[], false))
            .collect();
        let (_gateway, store) = setup(existing);
        store.load(None, None).await;

        let created = store.create(NewPrompt::new("T", "P", "X"), None).await.unwrap();
        assert_eq!(created.id, 7);
        let prompts = store.prompts().await;
        assert_eq!(prompts[0].id, 7);
        assert_eq!(prompts.len(), 7);
    }

    #[tokio::test]
    async fn failed_mutations_leave_the_set_untouched() {
        let (gateway, store) = setup(vec![
            sample_prompt(1, "Sunset", &["nature"], true),
            sample_prompt(2, "Robot", &["sci-fi"], false),
        ]);
        store.load(None, None).await;
        let before = store.prompts().await;

        gateway.fail("create_prompt");
        gateway.fail("update_prompt");
        gateway.fail("delete_prompt");
        gateway.fail("toggle_favorite");

        assert!(store.create(NewPrompt::new("T", "P", "X"), None).await.is_err());
        let patch = PromptPatch {
            title: Some("Renamed".into()),
            ..PromptPatch::default()
        };
        assert!(store.update(1, patch).await.is_err());
        assert!(store.remove(2).await.is_err());
        assert!(store.toggle_favorite(1).await.is_err());

        assert_eq!(store.prompts().await, before);
    }

    #[tokio::test]
    async fn rejected_create_surfaces_the_message() {
        let (_gateway, store) = setup(Vec::new());
        let err = store
            .create(NewPrompt::new("", "P", "X"), None)
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Rejected("Title must not be empty".into()));
        assert!(store.prompts().await.is_empty());
    }

    #[tokio::test]
    async fn favorite_follows_the_gateway_not_a_local_flip() {
        let (gateway, store) = setup(vec![sample_prompt(1, "Sunset", &[], false)]);
        store.load(None, None).await;
        // Another writer favorited it; the local copy is now out of date.
        gateway.set_favorite(1, true);

        let value = store.toggle_favorite(1).await.unwrap();
        assert!(!value);
        assert!(!store.find(1).await.unwrap().is_favorite);
    }

    #[tokio::test]
    async fn update_replaces_in_place() {
        let (_gateway, store) = setup(vec![
            sample_prompt(1, "One", &[], false),
            sample_prompt(2, "Two", &[], false),
            sample_prompt(3, "Three", &[], false),
        ]);
        store.load(None, None).await;

        let patch = PromptPatch {
            title: Some("Deux".into()),
            ..PromptPatch::default()
        };
        store.update(2, patch).await.unwrap();
        let titles: Vec<_> = store.prompts().await.into_iter().map(|p| p.title).collect();
        assert_eq!(titles, ["One", "Deux", "Three"]);
    }

    #[tokio::test]
    async fn remove_and_get() {
        let (_gateway, store) = setup(vec![
            sample_prompt(1, "One", &[], false),
            sample_prompt(2, "Two", &[], false),
        ]);
        store.load(None, None).await;

        assert_eq!(store.get(2).await.unwrap().title, "Two");
        store.remove(2).await.unwrap();
        assert_eq!(store.prompts().await.len(), 1);
        assert!(store.find(2).await.is_none());
        assert!(store.get(2).await.is_err());
    }
}
