use chrono::NaiveDate;
use rally_catalog::pricing::{self, PricingError};
use rally_catalog::LocationRegistry;
use rally_core::{Session, TimeRange};
use rally_shared::Money;
use serde::Deserialize;

const DEFAULT_START: &str = "19:00";
const DEFAULT_END: &str = "21:00";
const DEFAULT_COURT_COUNT: u32 = 2;
const DEFAULT_SHUTTLE_QTY: u32 = 3;
const DEFAULT_SHUTTLE_PRICE: Money = Money::from_cents(1058);

/// Input for a new session. The court fee is never supplied; it is priced
/// from the venue's rate.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionDraft {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub court_count: u32,
    pub shuttle_qty: u32,
    pub shuttle_price: Money,
    #[serde(default)]
    pub max_participants: u32,
}

impl SessionDraft {
    /// Creation form defaults, preselecting the first registered venue.
    pub fn with_defaults(date: NaiveDate, registry: &LocationRegistry) -> Self {
        Self {
            date,
            start_time: DEFAULT_START.to_string(),
            end_time: DEFAULT_END.to_string(),
            location: registry.first().map(|l| l.name.clone()).unwrap_or_default(),
            court_count: DEFAULT_COURT_COUNT,
            shuttle_qty: DEFAULT_SHUTTLE_QTY,
            shuttle_price: DEFAULT_SHUTTLE_PRICE,
            max_participants: 0,
        }
    }

    /// Validate and price. A zero capacity takes `default_max`.
    pub fn into_session(self, registry: &LocationRegistry, default_max: u32) -> Result<Session, DraftError> {
        let location = self.location.trim();
        if location.is_empty() {
            return Err(DraftError::MissingLocation);
        }
        let rate = registry
            .resolve(location)
            .rate()
            .ok_or_else(|| DraftError::UnknownLocation(location.to_string()))?;

        let time = TimeRange::parse_pair(&self.start_time, &self.end_time)?;
        let hours = pricing::require_priceable(time.start, time.end)?;

        if self.court_count == 0 {
            return Err(DraftError::InvalidCourtCount);
        }
        if self.shuttle_price.is_negative() {
            return Err(DraftError::NegativeAmount("shuttlePrice"));
        }

        let max_participants = if self.max_participants == 0 { default_max } else { self.max_participants };

        Ok(Session::new(
            self.date,
            time,
            location.to_string(),
            self.court_count,
            pricing::total_court_fee(rate, self.court_count, hours),
            self.shuttle_qty,
            self.shuttle_price,
            max_participants,
        ))
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DraftError {
    #[error("A location is required")]
    MissingLocation,

    #[error("Location is not registered: {0}")]
    UnknownLocation(String),

    #[error(transparent)]
    InvalidTime(#[from] PricingError),

    #[error("Court count must be at least 1")]
    InvalidCourtCount,

    #[error("Amount must not be negative: {0}")]
    NegativeAmount(&'static str),
}
