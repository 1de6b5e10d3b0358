use async_trait::async_trait;
use rally_catalog::LocationConfig;
use tokio::sync::broadcast;
use tracing::warn;

use crate::models::Session;
use crate::patch::SessionPatch;
use crate::CoreResult;

/// Repository trait for session documents
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// All sessions, most recent date first.
    async fn list_sessions(&self) -> CoreResult<Vec<Session>>;

    async fn get_session(&self, id: &str) -> CoreResult<Option<Session>>;

    async fn create_session(&self, session: &Session) -> CoreResult<()>;

    /// Merge the given fields into the stored document. Fails with
    /// `NotFoundError` when the session no longer exists.
    async fn patch_session(&self, id: &str, patch: &SessionPatch) -> CoreResult<()>;

    /// Hard delete; deleting a missing id is not an error.
    async fn delete_session(&self, id: &str) -> CoreResult<()>;

    /// Drop every stored session and write `sessions` in their place.
    async fn replace_sessions(&self, sessions: &[Session]) -> CoreResult<()>;
}

/// Repository trait for the venue registry
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn list_locations(&self) -> CoreResult<Vec<LocationConfig>>;

    /// Bulk upsert by id.
    async fn save_locations(&self, locations: &[LocationConfig]) -> CoreResult<()>;

    async fn delete_location(&self, id: &str) -> CoreResult<()>;

    async fn replace_locations(&self, locations: &[LocationConfig]) -> CoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Local,
    Remote,
}

/// Full-collection snapshots pushed to subscribers whenever the backing data changes.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Sessions(Vec<Session>),
    Locations(Vec<LocationConfig>),
    SyncError(String),
}

/// A persistence backend: both repositories plus lifecycle and a change feed.
#[async_trait]
pub trait Store: SessionRepository + LocationRepository {
    fn kind(&self) -> StoreKind;

    fn subscribe(&self) -> Subscription;

    /// Swap both collections in one step. On failure neither collection changes.
    async fn replace_all(&self, sessions: &[Session], locations: &[LocationConfig]) -> CoreResult<()>;

    /// Release connections and stop background listeners. Further calls may fail.
    async fn close(&self) -> CoreResult<()>;
}

/// Live registration on a store's change feed. Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<StoreEvent>,
}

impl Subscription {
    pub fn new(rx: broadcast::Receiver<StoreEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the store has shut its feed.
    /// A slow consumer skips to the newest snapshots rather than failing.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, skipped {} change events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll used by tests and render loops.
    pub fn try_next(&mut self) -> Option<StoreEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}
