use chrono::{SecondsFormat, Utc};
use rally_catalog::LocationConfig;
use rally_core::repository::{LocationRepository, SessionRepository, Store};
use rally_core::{CoreError, Session};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const BACKUP_VERSION: &str = "1.0";

/// Full export of both collections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub version: String,
    pub export_date: String,
    pub locations: Vec<LocationConfig>,
    pub sessions: Vec<Session>,
}

impl Backup {
    pub fn new(locations: Vec<LocationConfig>, sessions: Vec<Session>) -> Self {
        Self {
            version: BACKUP_VERSION.to_string(),
            export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            locations,
            sessions,
        }
    }

    /// Download name, e.g. `badminton_backup_2025-06-01.json`.
    pub fn file_name(&self) -> String {
        let day = self.export_date.get(..10).unwrap_or("export");
        format!("badminton_backup_{}.json", day)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Backup is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Backup must contain both sessions and locations")]
    MissingCollections,

    #[error("Import replaces all data and must be confirmed")]
    ConfirmationRequired,

    #[error(transparent)]
    Store(#[from] CoreError),
}

pub async fn export(store: &dyn Store) -> Result<Backup, BackupError> {
    let locations = store.list_locations().await?;
    let sessions = store.list_sessions().await?;
    info!("Exported {} sessions and {} locations", sessions.len(), locations.len());
    Ok(Backup::new(locations, sessions))
}

/// Parse an uploaded backup. Both arrays must be present; every document
/// must be readable. Nothing is partially accepted.
pub fn parse(raw: &str) -> Result<Backup, BackupError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let has = |key: &str| value.get(key).is_some_and(|v| v.is_array());
    if !has("sessions") || !has("locations") {
        return Err(BackupError::MissingCollections);
    }

    let version = value
        .get("version")
        .and_then(|v| v.as_str())
        .unwrap_or(BACKUP_VERSION)
        .to_string();
    if version != BACKUP_VERSION {
        warn!("Importing backup with version {}", version);
    }
    let export_date = value
        .get("exportDate")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(Backup {
        version,
        export_date,
        locations: serde_json::from_value(value["locations"].clone())?,
        sessions: serde_json::from_value(value["sessions"].clone())?,
    })
}

/// Replace both collections with the backup's contents, or neither.
pub async fn import(store: &dyn Store, backup: &Backup, confirmed: bool) -> Result<(), BackupError> {
    if !confirmed {
        return Err(BackupError::ConfirmationRequired);
    }
    store.replace_all(&backup.sessions, &backup.locations).await?;
    info!(
        "Imported backup from {}: {} sessions, {} locations",
        backup.export_date,
        backup.sessions.len(),
        backup.locations.len()
    );
    Ok(())
}
