use async_trait::async_trait;
use rally_catalog::LocationConfig;
use rally_core::repository::{LocationRepository, SessionRepository, Store, StoreKind, Subscription};
use rally_core::{CoreError, CoreResult, Session, SessionPatch};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::memory::{sort_sessions, upsert_locations, MemoryStore};

const SESSIONS_FILE: &str = "sessions.json";
const LOCATIONS_FILE: &str = "locations.json";

/// JSON files on disk, held in memory while open.
///
/// Missing or unreadable files start out empty. Every write puts the new
/// collection on disk (temp file, then rename) before memory and the feed see
/// it, so a failed write changes nothing.
pub struct LocalStore {
    dir: PathBuf,
    inner: MemoryStore,
    flush: Mutex<()>,
}

impl LocalStore {
    pub async fn open(dir: impl AsRef<Path>) -> CoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CoreError::StorageError(format!("create {}: {}", dir.display(), e)))?;

        let sessions: Vec<Session> = read_collection(&dir.join(SESSIONS_FILE)).await;
        let locations: Vec<LocationConfig> = read_collection(&dir.join(LOCATIONS_FILE)).await;
        info!(
            "Opened local store at {} ({} sessions, {} locations)",
            dir.display(),
            sessions.len(),
            locations.len()
        );

        Ok(Self {
            dir,
            inner: MemoryStore::seeded(sessions, locations),
            flush: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_sessions(&self, mut sessions: Vec<Session>) -> CoreResult<()> {
        sort_sessions(&mut sessions);
        write_collection(&self.dir.join(SESSIONS_FILE), &sessions).await
    }

    async fn write_locations(&self, locations: &[LocationConfig]) -> CoreResult<()> {
        write_collection(&self.dir.join(LOCATIONS_FILE), locations).await
    }
}

async fn read_collection<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!("Ignoring corrupt {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

async fn write_collection<T: Serialize>(path: &Path, items: &[T]) -> CoreResult<()> {
    let json = serde_json::to_vec_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| CoreError::StorageError(format!("write {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CoreError::StorageError(format!("rename {}: {}", path.display(), e)))
}

#[async_trait]
impl SessionRepository for LocalStore {
    async fn list_sessions(&self) -> CoreResult<Vec<Session>> {
        self.inner.list_sessions().await
    }

    async fn get_session(&self, id: &str) -> CoreResult<Option<Session>> {
        self.inner.get_session(id).await
    }

    async fn create_session(&self, session: &Session) -> CoreResult<()> {
        let _guard = self.flush.lock().await;
        self.inner.check_writable()?;
        let mut sessions = self.inner.sessions_snapshot().await;
        if sessions.iter().any(|s| s.id == session.id) {
            return Err(CoreError::ValidationError(format!("session {} already exists", session.id)));
        }
        sessions.push(session.clone());
        self.write_sessions(sessions).await?;
        self.inner.create_session(session).await
    }

    async fn patch_session(&self, id: &str, patch: &SessionPatch) -> CoreResult<()> {
        let _guard = self.flush.lock().await;
        self.inner.check_writable()?;
        let mut sessions = self.inner.sessions_snapshot().await;
        let target = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::NotFoundError(format!("session {}", id)))?;
        patch.apply_to(target);
        self.write_sessions(sessions).await?;
        self.inner.patch_session(id, patch).await
    }

    async fn delete_session(&self, id: &str) -> CoreResult<()> {
        let _guard = self.flush.lock().await;
        self.inner.check_writable()?;
        let mut sessions = self.inner.sessions_snapshot().await;
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() == before {
            return Ok(());
        }
        self.write_sessions(sessions).await?;
        self.inner.delete_session(id).await
    }

    async fn replace_sessions(&self, sessions: &[Session]) -> CoreResult<()> {
        let _guard = self.flush.lock().await;
        self.inner.check_writable()?;
        self.write_sessions(sessions.to_vec()).await?;
        self.inner.replace_sessions(sessions).await
    }
}

#[async_trait]
impl LocationRepository for LocalStore {
    async fn list_locations(&self) -> CoreResult<Vec<LocationConfig>> {
        self.inner.list_locations().await
    }

    async fn save_locations(&self, locations: &[LocationConfig]) -> CoreResult<()> {
        let _guard = self.flush.lock().await;
        self.inner.check_writable()?;
        let mut stored = self.inner.locations_snapshot().await;
        upsert_locations(&mut stored, locations);
        self.write_locations(&stored).await?;
        self.inner.save_locations(locations).await
    }

    async fn delete_location(&self, id: &str) -> CoreResult<()> {
        let _guard = self.flush.lock().await;
        self.inner.check_writable()?;
        let mut stored = self.inner.locations_snapshot().await;
        stored.retain(|l| l.id != id);
        self.write_locations(&stored).await?;
        self.inner.delete_location(id).await
    }

    async fn replace_locations(&self, locations: &[LocationConfig]) -> CoreResult<()> {
        let _guard = self.flush.lock().await;
        self.inner.check_writable()?;
        self.write_locations(locations).await?;
        self.inner.replace_locations(locations).await
    }
}

#[async_trait]
impl Store for LocalStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }

    fn subscribe(&self) -> Subscription {
        self.inner.subscribe()
    }

    /// The sessions file is put back if the locations file cannot be written.
    async fn replace_all(&self, sessions: &[Session], locations: &[LocationConfig]) -> CoreResult<()> {
        let _guard = self.flush.lock().await;
        self.inner.check_writable()?;
        let previous = self.inner.sessions_snapshot().await;
        self.write_sessions(sessions.to_vec()).await?;
        if let Err(e) = self.write_locations(locations).await {
            if let Err(restore) = self.write_sessions(previous).await {
                error!("Could not restore {} after a failed replace: {}", SESSIONS_FILE, restore);
            }
            return Err(e);
        }
        self.inner.replace_all(sessions, locations).await
    }

    async fn close(&self) -> CoreResult<()> {
        let _guard = self.flush.lock().await;
        self.inner.close().await
    }
}
