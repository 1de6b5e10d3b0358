use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which collection a change touched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Collection {
    Sessions,
    Locations,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Created,
    Patched,
    Deleted,
    Upserted,
    Replaced,
}

/// Published by a remote store after every successful write so that other
/// clients re-read the collection.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChangeNotice {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub document_id: Option<String>,
    pub origin: Uuid,
    pub timestamp: i64,
}

impl ChangeNotice {
    pub fn new(collection: Collection, kind: ChangeKind, document_id: Option<String>, origin: Uuid) -> Self {
        Self {
            collection,
            kind,
            document_id,
            origin,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
