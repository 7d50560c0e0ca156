use std::sync::Arc;

use tokio::sync::Mutex;

use super::RequestSequence;
use crate::gateway::{CommandGateway, GatewayResult};
use crate::models::Collection;

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_error};

#[derive(Default)]
struct CollectionState {
    collections: Vec<Collection>,
    sequence: RequestSequence,
}

#[derive(Clone)]
pub struct CollectionStore {
    gateway: Arc<dyn CommandGateway>,
    state: Arc<Mutex<CollectionState>>,
}

impl CollectionStore {
    pub fn new(gateway: Arc<dyn CommandGateway>) -> Self {
        Self {
            gateway,
            state: Arc::new(Mutex::new(CollectionState::default())),
        }
    }

    pub async fn load(&self) -> Vec<Collection> {
        let seq = self.state.lock().await.sequence.issue();
        let result = self.gateway.list_collections().await;

        let mut state = self.state.lock().await;
        let newest = state.sequence.settle(seq);
        match result {
            Ok(collections) if newest => state.collections = collections,
            Ok(_) => log_debug!("collections #{seq} superseded"),
            Err(err) => log_error!("failed to load collections: {err}"),
        }
        state.collections.clone()
    }

    /// Create a collection and append it. Nothing changes locally on failure.
    pub async fn create(&self, name: &str) -> GatewayResult<Collection> {
        let collection = self.gateway.create_collection(name).await?;
        self.state.lock().await.collections.push(collection.clone());
        Ok(collection)
    }

    pub async fn collections(&self) -> Vec<Collection> {
        self.state.lock().await.collections.clone()
    }

    pub async fn find(&self, id: i64) -> Option<Collection> {
        self.state
            .lock()
            .await
            .collections
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.sequence.is_busy()
    }
}
