use async_trait::async_trait;
use rally_catalog::LocationConfig;
use rally_core::repository::{LocationRepository, SessionRepository, Store, StoreEvent, StoreKind, Subscription};
use rally_core::{CoreError, CoreResult, Session, SessionPatch};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

const FEED_CAPACITY: usize = 64;

/// In-process store with a broadcast change feed.
///
/// Also the working set behind [`crate::LocalStore`]. Writes can be made to
/// fail on demand so that callers' error paths can be exercised.
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
    locations: RwLock<Vec<LocationConfig>>,
    events: broadcast::Sender<StoreEvent>,
    fail_writes: AtomicBool,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::seeded(Vec::new(), Vec::new())
    }

    pub fn seeded(sessions: Vec<Session>, locations: Vec<LocationConfig>) -> Self {
        let (events, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            sessions: RwLock::new(sessions.into_iter().map(|s| (s.id.clone(), s)).collect()),
            locations: RwLock::new(locations),
            events,
            fail_writes: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with a storage error (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Push an error onto the feed, as a remote listener would on disconnect.
    pub fn report_sync_error(&self, message: impl Into<String>) {
        let _ = self.events.send(StoreEvent::SyncError(message.into()));
    }

    /// Sorted snapshot of every session.
    pub async fn sessions_snapshot(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sort_sessions(&mut sessions);
        sessions
    }

    pub async fn locations_snapshot(&self) -> Vec<LocationConfig> {
        self.locations.read().await.clone()
    }

    pub(crate) fn check_writable(&self) -> CoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoreError::Unavailable("store is closed".into()));
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            warn!("Rejecting write: failure injected");
            return Err(CoreError::StorageError("write rejected".into()));
        }
        Ok(())
    }

    fn check_open(&self) -> CoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoreError::Unavailable("store is closed".into()));
        }
        Ok(())
    }

    async fn publish_sessions(&self) {
        if self.events.receiver_count() == 0 {
            return;
        }
        let snapshot = self.sessions_snapshot().await;
        debug!("Publishing {} sessions", snapshot.len());
        let _ = self.events.send(StoreEvent::Sessions(snapshot));
    }

    async fn publish_locations(&self) {
        if self.events.receiver_count() == 0 {
            return;
        }
        let snapshot = self.locations_snapshot().await;
        let _ = self.events.send(StoreEvent::Locations(snapshot));
    }
}

/// Most recent first; ties broken by start time, then id.
pub(crate) fn sort_sessions(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then(b.time.start.cmp(&a.time.start))
            .then(a.id.cmp(&b.id))
    });
}

/// Replace entries with a matching id, append the rest.
pub(crate) fn upsert_locations(stored: &mut Vec<LocationConfig>, locations: &[LocationConfig]) {
    for location in locations {
        match stored.iter_mut().find(|l| l.id == location.id) {
            Some(existing) => *existing = location.clone(),
            None => stored.push(location.clone()),
        }
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn list_sessions(&self) -> CoreResult<Vec<Session>> {
        self.check_open()?;
        Ok(self.sessions_snapshot().await)
    }

    async fn get_session(&self, id: &str) -> CoreResult<Option<Session>> {
        self.check_open()?;
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn create_session(&self, session: &Session) -> CoreResult<()> {
        self.check_writable()?;
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&session.id) {
                return Err(CoreError::ValidationError(format!("session {} already exists", session.id)));
            }
            sessions.insert(session.id.clone(), session.clone());
        }
        self.publish_sessions().await;
        Ok(())
    }

    async fn patch_session(&self, id: &str, patch: &SessionPatch) -> CoreResult<()> {
        self.check_writable()?;
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| CoreError::NotFoundError(format!("session {}", id)))?;
            patch.apply_to(session);
        }
        self.publish_sessions().await;
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> CoreResult<()> {
        self.check_writable()?;
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            self.publish_sessions().await;
        }
        Ok(())
    }

    async fn replace_sessions(&self, sessions: &[Session]) -> CoreResult<()> {
        self.check_writable()?;
        *self.sessions.write().await = sessions.iter().map(|s| (s.id.clone(), s.clone())).collect();
        self.publish_sessions().await;
        Ok(())
    }
}

#[async_trait]
impl LocationRepository for MemoryStore {
    async fn list_locations(&self) -> CoreResult<Vec<LocationConfig>> {
        self.check_open()?;
        Ok(self.locations_snapshot().await)
    }

    async fn save_locations(&self, locations: &[LocationConfig]) -> CoreResult<()> {
        self.check_writable()?;
        upsert_locations(&mut *self.locations.write().await, locations);
        self.publish_locations().await;
        Ok(())
    }

    async fn delete_location(&self, id: &str) -> CoreResult<()> {
        self.check_writable()?;
        self.locations.write().await.retain(|l| l.id != id);
        self.publish_locations().await;
        Ok(())
    }

    async fn replace_locations(&self, locations: &[LocationConfig]) -> CoreResult<()> {
        self.check_writable()?;
        *self.locations.write().await = locations.to_vec();
        self.publish_locations().await;
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }

    async fn replace_all(&self, sessions: &[Session], locations: &[LocationConfig]) -> CoreResult<()> {
        self.check_writable()?;
        {
            let mut stored_sessions = self.sessions.write().await;
            let mut stored_locations = self.locations.write().await;
            *stored_sessions = sessions.iter().map(|s| (s.id.clone(), s.clone())).collect();
            *stored_locations = locations.to_vec();
        }
        self.publish_sessions().await;
        self.publish_locations().await;
        Ok(())
    }

    async fn close(&self) -> CoreResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
