use rally_shared::Money;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named venue and its reference hourly court rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocationConfig {
    pub id: String,
    pub name: String,
    /// Rate per court per hour.
    pub default_court_fee: Money,
}

impl LocationConfig {
    pub fn new(name: impl Into<String>, default_court_fee: Money) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            default_court_fee,
        }
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>, default_court_fee: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_court_fee,
        }
    }

    /// The venues a fresh installation starts with.
    pub fn defaults() -> Vec<LocationConfig> {
        vec![
            LocationConfig::with_id("1", "SRC", Money::from_cents(2000)),
            LocationConfig::with_id("2", "Perfect Win", Money::from_cents(3000)),
        ]
    }
}
