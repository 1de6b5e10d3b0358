use chrono::{Local, NaiveDateTime};
use rally_catalog::{LocationConfig, LocationRegistry, RegistryError};
use rally_core::advisor::Advisor;
use rally_core::identity::Role;
use rally_core::repository::{LocationRepository, SessionRepository, Store, StoreEvent};
use rally_core::{CoreError, CoreResult, Session, SessionPatch};
use rally_store::backup::{self, Backup, BackupError};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::advice;
use crate::analytics::{AnalyticsAggregator, AnalyticsReport, Period};
use crate::changes::{ChangeHandler, CostEdit, DetailsEdit, EditError};
use crate::draft::{DraftError, SessionDraft};
use crate::lifecycle::{self, ActivityWindow, SessionView};
use crate::roster::{JoinOutcome, LeaveOutcome, RemoveOutcome, RosterError, RosterList, RosterManager};

#[derive(Debug, Clone)]
pub struct ServiceRules {
    pub grace_period_hours: i64,
    pub default_max_participants: u32,
    pub advice_sample_size: usize,
}

impl Default for ServiceRules {
    fn default() -> Self {
        Self {
            grace_period_hours: lifecycle::DEFAULT_GRACE_PERIOD_HOURS,
            default_max_participants: rally_core::DEFAULT_MAX_PARTICIPANTS,
            advice_sample_size: 3,
        }
    }
}

/// Connectivity flags for the status badge and the error banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub online: bool,
    pub syncing: bool,
    pub last_error: Option<String>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self { online: true, syncing: false, last_error: None }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Admin role required to {0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Store(#[from] CoreError),
}

/// Every session operation, backed by a [`Store`].
///
/// Mutations read the current document, repair it, apply one pure
/// transition and write back only the fields that changed.
pub struct SessionService {
    store: Arc<dyn Store>,
    advisor: Arc<dyn Advisor>,
    rules: ServiceRules,
    window: ActivityWindow,
    status: Arc<RwLock<SyncStatus>>,
}

impl SessionService {
    pub fn new(store: Arc<dyn Store>, advisor: Arc<dyn Advisor>, rules: ServiceRules) -> Self {
        Self {
            store,
            advisor,
            window: ActivityWindow::from_hours(rules.grace_period_hours),
            rules,
            status: Arc::new(RwLock::new(SyncStatus::default())),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn window(&self) -> ActivityWindow {
        self.window
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// Follow the store's change feed and keep the sync flags current.
    pub fn watch(&self) -> JoinHandle<()> {
        let mut feed = self.store.subscribe();
        let status = self.status.clone();
        tokio::spawn(async move {
            while let Some(event) = feed.next().await {
                let mut status = status.write().await;
                match event {
                    StoreEvent::SyncError(message) => {
                        warn!("Sync error: {}", message);
                        status.online = false;
                        status.last_error = Some(message);
                    }
                    StoreEvent::Sessions(_) | StoreEvent::Locations(_) => {
                        status.online = true;
                        status.last_error = None;
                    }
                }
            }
        })
    }

    // Sessions

    pub async fn list_sessions(&self, view: SessionView) -> Result<Vec<Session>, ServiceError> {
        self.list_sessions_at(view, Local::now().naive_local()).await
    }

    pub async fn list_sessions_at(&self, view: SessionView, now: NaiveDateTime) -> Result<Vec<Session>, ServiceError> {
        let sessions = self.track("list sessions", self.store.list_sessions()).await?;
        Ok(self.window.select(sessions, view, now))
    }

    pub async fn get_session(&self, id: &str) -> Result<Session, ServiceError> {
        self.track("get session", self.store.get_session(id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    pub async fn create_session(&self, draft: SessionDraft, role: Role) -> Result<Session, ServiceError> {
        Self::require_admin(role, "create sessions")?;
        let registry = self.registry().await?;
        let session = draft.into_session(&registry, self.rules.default_max_participants)?;
        self.track("create session", self.store.create_session(&session)).await?;
        info!("Created session {} at {} on {}", session.id, session.location, session.date);
        Ok(session)
    }

    pub async fn delete_session(&self, id: &str, role: Role) -> Result<(), ServiceError> {
        Self::require_admin(role, "delete sessions")?;
        self.track("delete session", self.store.delete_session(id)).await?;
        info!("Deleted session {}", id);
        Ok(())
    }

    pub async fn edit_details(&self, id: &str, edit: &DetailsEdit, role: Role) -> Result<Vec<String>, ServiceError> {
        let registry = self.registry().await?;
        self.mutate(id, |s| Ok(ChangeHandler::apply_details(s, edit, &registry, role)?)).await
    }

    pub async fn edit_costs(&self, id: &str, edit: &CostEdit, role: Role) -> Result<(), ServiceError> {
        self.mutate(id, |s| Ok(ChangeHandler::apply_costs(s, edit, role)?)).await
    }

    pub async fn complete_session(&self, id: &str, role: Role) -> Result<(), ServiceError> {
        self.mutate(id, |s| Ok(lifecycle::complete(s, role)?)).await
    }

    // Roster

    pub async fn join(&self, id: &str, name: &str) -> Result<JoinOutcome, ServiceError> {
        self.mutate(id, |s| Ok(RosterManager::join(s, name)?)).await
    }

    pub async fn request_leave(&self, id: &str, name: &str, role: Role) -> Result<LeaveOutcome, ServiceError> {
        self.mutate(id, |s| Ok(RosterManager::request_leave(s, name, role)?)).await
    }

    pub async fn approve_deletion(&self, id: &str, name: &str, role: Role) -> Result<RemoveOutcome, ServiceError> {
        self.mutate(id, |s| Ok(RosterManager::approve_deletion(s, name, role)?)).await
    }

    pub async fn reject_deletion(&self, id: &str, name: &str, role: Role) -> Result<bool, ServiceError> {
        self.mutate(id, |s| Ok(RosterManager::reject_deletion(s, name, role)?)).await
    }

    pub async fn remove(&self, id: &str, name: &str, list: RosterList, role: Role) -> Result<RemoveOutcome, ServiceError> {
        self.mutate(id, |s| Ok(RosterManager::remove(s, name, list, role)?)).await
    }

    pub async fn leave_waiting_list(&self, id: &str, name: &str) -> Result<bool, ServiceError> {
        self.mutate(id, |s| Ok(RosterManager::remove_from_waiting_list(s, name)?)).await
    }

    pub async fn frequent_participants(&self) -> Result<Vec<String>, ServiceError> {
        let sessions = self.track("list sessions", self.store.list_sessions()).await?;
        Ok(lifecycle::frequent_participants(&sessions))
    }

    // Locations

    /// Stored venues, or the built-in defaults when none are stored.
    pub async fn locations(&self) -> Result<Vec<LocationConfig>, ServiceError> {
        let stored = self.track("list locations", self.store.list_locations()).await?;
        if stored.is_empty() {
            return Ok(LocationConfig::defaults());
        }
        Ok(stored)
    }

    pub async fn registry(&self) -> Result<LocationRegistry, ServiceError> {
        Ok(LocationRegistry::new(self.locations().await?))
    }

    /// Save the full registry as edited. Entries missing from `locations`
    /// are deleted; the rest are upserted.
    pub async fn save_locations(&self, locations: Vec<LocationConfig>, role: Role) -> Result<Vec<LocationConfig>, ServiceError> {
        Self::require_admin(role, "edit locations")?;

        let mut registry = LocationRegistry::default();
        for location in locations {
            registry.upsert(location)?;
        }

        let stored = self.track("list locations", self.store.list_locations()).await?;
        for old in stored.iter().filter(|old| registry.get(&old.id).is_none()) {
            self.track("delete location", self.store.delete_location(&old.id)).await?;
        }
        self.track("save locations", self.store.save_locations(registry.all())).await?;
        info!("Saved {} locations", registry.all().len());
        Ok(registry.into_vec())
    }

    pub async fn delete_location(&self, id: &str, role: Role) -> Result<(), ServiceError> {
        Self::require_admin(role, "edit locations")?;
        self.track("delete location", self.store.delete_location(id)).await
    }

    pub async fn reset_locations(&self, role: Role) -> Result<Vec<LocationConfig>, ServiceError> {
        Self::require_admin(role, "edit locations")?;
        let defaults = LocationConfig::defaults();
        self.track("reset locations", self.store.replace_locations(&defaults)).await?;
        info!("Locations reset to defaults");
        Ok(defaults)
    }

    // Reports

    pub async fn analytics(&self, period: Period) -> Result<AnalyticsReport, ServiceError> {
        let sessions = self.track("list sessions", self.store.list_sessions()).await?;
        Ok(AnalyticsAggregator::report(&sessions, period))
    }

    pub async fn advice(&self) -> Result<String, ServiceError> {
        let sessions = self.track("list sessions", self.store.list_sessions()).await?;
        Ok(advice::fetch_advice(self.advisor.as_ref(), &sessions, self.rules.advice_sample_size).await)
    }

    // Backup

    pub async fn export_backup(&self, role: Role) -> Result<Backup, ServiceError> {
        Self::require_admin(role, "export data")?;
        Ok(backup::export(self.store.as_ref()).await?)
    }

    /// Parse fully before touching the store, so a bad file changes nothing.
    pub async fn import_backup(&self, raw: &str, confirmed: bool, role: Role) -> Result<Backup, ServiceError> {
        Self::require_admin(role, "import data")?;
        let parsed = backup::parse(raw)?;
        if let Err(e) = backup::import(self.store.as_ref(), &parsed, confirmed).await {
            if let BackupError::Store(store_error) = &e {
                self.record_failure("import backup", store_error).await;
            }
            return Err(e.into());
        }
        Ok(parsed)
    }

    // Plumbing

    async fn mutate<T, F>(&self, id: &str, op: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Session) -> Result<T, ServiceError>,
    {
        let before = self.get_session(id).await?;
        let mut after = before.clone();
        RosterManager::repair(&mut after);
        let outcome = op(&mut after)?;

        let patch = SessionPatch::diff(&before, &after);
        if !patch.is_empty() {
            info!("Session {}: writing {:?}", id, patch.touched_fields());
            self.track("update session", self.store.patch_session(id, &patch)).await?;
        }
        Ok(outcome)
    }

    /// Await a store call, keeping the sync flags in step with its outcome.
    async fn track<T, Fut>(&self, action: &'static str, call: Fut) -> Result<T, ServiceError>
    where
        Fut: Future<Output = CoreResult<T>>,
    {
        self.status.write().await.syncing = true;
        let result = call.await;
        self.status.write().await.syncing = false;

        match result {
            Ok(value) => {
                let mut status = self.status.write().await;
                status.online = true;
                status.last_error = None;
                Ok(value)
            }
            Err(CoreError::NotFoundError(what)) => Err(ServiceError::NotFound(what)),
            Err(e) => {
                self.record_failure(action, &e).await;
                Err(e.into())
            }
        }
    }

    async fn record_failure(&self, action: &str, e: &CoreError) {
        error!("Failed to {}: {}", action, e);
        let mut status = self.status.write().await;
        if matches!(e, CoreError::Unavailable(_)) {
            status.online = false;
        }
        status.last_error = Some(format!("Failed to {}: {}", action, e));
    }

    fn require_admin(role: Role, action: &'static str) -> Result<(), ServiceError> {
        if !role.is_admin() {
            return Err(ServiceError::Forbidden(action));
        }
        Ok(())
    }
}
