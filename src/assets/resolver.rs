//! Asset Resolver: turns image references into displayable data URIs and
//! keeps each display slot pointed at the result of its *latest* request.
//!
//! Every assignment to a slot takes a fresh generation number and a fresh
//! [`CancellationToken`]. The previous fetch for that slot is cancelled, and
//! a result is only published if its generation is still the slot's current
//! one, so a slow fetch for an old reference can never overwrite a newer one.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::mime::{data_uri, mime_for_path};
use crate::gateway::CommandGateway;

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_warn};

const EVENT_CAPACITY: usize = 64;

/// A place in the UI that shows one image at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "prompt_id", rename_all = "snake_case")]
pub enum AssetSlot {
    /// Gallery card for a prompt.
    Card(i64),
    /// The single detail panel.
    Inspector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedAsset {
    pub mime: String,
    pub data_uri: String,
}

impl EncodedAsset {
    /// Wrap an inline `data:` reference without fetching anything.
    fn inline(uri: &str) -> Self {
        let mime = uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .filter(|mime| !mime.is_empty())
            .unwrap_or("application/octet-stream");
        Self {
            mime: mime.to_string(),
            data_uri: uri.to_string(),
        }
    }
}

/// Outcome of resolving a single reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Ready(EncodedAsset),
    /// Nothing to show; render a placeholder.
    NoImage,
    /// The reference exists but its bytes could not be read.
    Broken,
}

/// What a slot currently displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetState {
    Pending,
    Ready(EncodedAsset),
    Placeholder,
    Broken,
}

impl From<Resolution> for AssetState {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Ready(asset) => AssetState::Ready(asset),
            Resolution::NoImage => AssetState::Placeholder,
            Resolution::Broken => AssetState::Broken,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetEvent {
    pub slot: AssetSlot,
    pub state: AssetState,
}

enum Source<'a> {
    Missing,
    Inline(&'a str),
    Library(&'a str),
}

impl<'a> Source<'a> {
    fn classify(reference: Option<&'a str>) -> Self {
        match reference.map(str::trim) {
            None | Some("") => Source::Missing,
            Some(r) if r.starts_with("data:") => Source::Inline(r),
            Some(r) => Source::Library(r),
        }
    }
}

struct SlotEntry {
    generation: u64,
    reference: Option<String>,
    state: AssetState,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct AssetResolver {
    gateway: Arc<dyn CommandGateway>,
    slots: Arc<Mutex<HashMap<AssetSlot, SlotEntry>>>,
    generations: Arc<AtomicU64>,
    events: broadcast::Sender<AssetEvent>,
}

impl AssetResolver {
    pub fn new(gateway: Arc<dyn CommandGateway>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            slots: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    /// Published slot changes. Pending states are not broadcast.
    pub fn subscribe(&self) -> broadcast::Receiver<AssetEvent> {
        self.events.subscribe()
    }

    /// Resolve a reference without touching any slot.
    pub async fn resolve(&self, reference: Option<&str>) -> Resolution {
        match Source::classify(reference) {
            Source::Missing => Resolution::NoImage,
            Source::Inline(uri) => Resolution::Ready(EncodedAsset::inline(uri)),
            Source::Library(path) => match self.gateway.get_image_bytes(path).await {
                Ok(base64) => {
                    let mime = mime_for_path(path);
                    Resolution::Ready(EncodedAsset {
                        mime: mime.to_string(),
                        data_uri: data_uri(mime, &base64),
                    })
                }
                Err(err) => {
                    log_warn!("failed to load image {path}: {err}");
                    Resolution::Broken
                }
            },
        }
    }

    /// Point `slot` at `reference` and resolve it.
    ///
    /// Returns the published state, or `None` if a later assignment (or a
    /// [`release`](Self::release)) superseded this one before it finished.
    /// Re-assigning the reference a slot already shows does not refetch.
    pub async fn assign(&self, slot: AssetSlot, reference: Option<String>) -> Option<AssetState> {
        let (generation, cancel) = {
            let mut slots = self.slots.lock().await;
            if let Some(entry) = slots.get(&slot) {
                if entry.reference == reference && entry.state != AssetState::Broken {
                    return Some(entry.state.clone());
                }
                entry.cancel.cancel();
            }
            let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
            let cancel = CancellationToken::new();
            slots.insert(
                slot,
                SlotEntry {
                    generation,
                    reference: reference.clone(),
                    state: AssetState::Pending,
                    cancel: cancel.clone(),
                },
            );
            (generation, cancel)
        };

        let resolution = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log_debug!("{slot:?} request {generation} superseded");
                return None;
            }
            resolution = self.resolve(reference.as_deref()) => resolution,
        };

        self.publish(slot, generation, resolution).await
    }

    /// [`assign`](Self::assign) on a background task.
    pub fn spawn_assign(
        &self,
        slot: AssetSlot,
        reference: Option<String>,
    ) -> JoinHandle<Option<AssetState>> {
        let resolver = self.clone();
        tokio::spawn(async move { resolver.assign(slot, reference).await })
    }

    async fn publish(
        &self,
        slot: AssetSlot,
        generation: u64,
        resolution: Resolution,
    ) -> Option<AssetState> {
        let state = {
            let mut slots = self.slots.lock().await;
            let entry = slots.get_mut(&slot).filter(|e| e.generation == generation)?;
            entry.state = resolution.into();
            entry.state.clone()
        };
        let _ = self.events.send(AssetEvent {
            slot,
            state: state.clone(),
        });
        Some(state)
    }

    pub async fn current(&self, slot: AssetSlot) -> Option<AssetState> {
        self.slots.lock().await.get(&slot).map(|e| e.state.clone())
    }

    /// Forget a slot that left the screen. Its in-flight fetch is cancelled
    /// and will publish nothing.
    pub async fn release(&self, slot: AssetSlot) {
        if let Some(entry) = self.slots.lock().await.remove(&slot) {
            entry.cancel.cancel();
        }
    }

    /// Keep only the card slots whose prompt is still listed.
    pub async fn retain_cards(&self, visible: &[i64]) {
        let mut slots = self.slots.lock().await;
        slots.retain(|slot, entry| match slot {
            AssetSlot::Card(id) if !visible.contains(id) => {
                entry.cancel.cancel();
                false
            }
            _ => true,
        });
    }
}
