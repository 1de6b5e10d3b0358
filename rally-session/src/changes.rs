use chrono::NaiveDate;
use rally_catalog::pricing::{self, PricingError};
use rally_catalog::LocationRegistry;
use rally_core::identity::Role;
use rally_core::{Session, TimeRange};
use rally_shared::Money;
use serde::Deserialize;
use tracing::info;

use crate::roster::RosterManager;

/// Admin edit of the schedule block of a session.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetailsEdit {
    pub date: NaiveDate,
    pub time: TimeRange,
    pub court_count: u32,
    pub max_participants: u32,
}

impl DetailsEdit {
    /// Prefilled from the session's current values.
    pub fn from_session(session: &Session) -> Self {
        Self {
            date: session.date,
            time: session.time,
            court_count: session.court_count,
            max_participants: session.capacity() as u32,
        }
    }
}

/// Admin edit of the stored cost fields, written verbatim.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostEdit {
    pub court_fee: Money,
    pub shuttle_qty: u32,
    pub shuttle_price: Money,
}

impl CostEdit {
    pub fn from_session(session: &Session) -> Self {
        Self {
            court_fee: session.court_fee,
            shuttle_qty: session.shuttle_qty,
            shuttle_price: session.shuttle_price,
        }
    }

    /// Total shown while the form is still open.
    pub fn preview_total(&self) -> Money {
        crate::cost::event_cost(self.court_fee, self.shuttle_qty, self.shuttle_price)
    }
}

/// Applies admin edits to a session in place.
pub struct ChangeHandler;

impl ChangeHandler {
    /// Reschedule, resize or change capacity. The court fee is repriced from
    /// the venue's current rate when the venue is still registered; otherwise
    /// the stored fee stands. Raising capacity promotes from the waiting list.
    /// Returns the promoted names.
    pub fn apply_details(
        session: &mut Session,
        edit: &DetailsEdit,
        registry: &LocationRegistry,
        role: Role,
    ) -> Result<Vec<String>, EditError> {
        Self::ensure_editable(session, role)?;
        let hours = pricing::require_priceable(edit.time.start, edit.time.end)?;
        if edit.court_count == 0 {
            return Err(EditError::InvalidCourtCount);
        }
        if edit.max_participants == 0 {
            return Err(EditError::InvalidCapacity);
        }

        session.date = edit.date;
        session.time = edit.time;
        session.court_count = edit.court_count;
        session.max_participants = edit.max_participants;

        if let Some(rate) = registry.resolve(&session.location).rate() {
            session.court_fee = pricing::total_court_fee(rate, edit.court_count, hours);
        }

        info!("Session {} details updated", session.id);
        Ok(RosterManager::fill_open_slots(session))
    }

    pub fn apply_costs(session: &mut Session, edit: &CostEdit, role: Role) -> Result<(), EditError> {
        Self::ensure_editable(session, role)?;
        if edit.court_fee.is_negative() {
            return Err(EditError::NegativeAmount("courtFee"));
        }
        if edit.shuttle_price.is_negative() {
            return Err(EditError::NegativeAmount("shuttlePrice"));
        }

        session.court_fee = edit.court_fee;
        session.shuttle_qty = edit.shuttle_qty;
        session.shuttle_price = edit.shuttle_price;

        info!("Session {} costs updated to {}", session.id, edit.preview_total());
        Ok(())
    }

    fn ensure_editable(session: &Session, role: Role) -> Result<(), EditError> {
        if !role.is_admin() {
            return Err(EditError::Forbidden);
        }
        if session.is_completed() {
            return Err(EditError::SessionCompleted(session.id.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EditError {
    #[error("Admin role required to edit sessions")]
    Forbidden,

    #[error("Session is completed: {0}")]
    SessionCompleted(String),

    #[error(transparent)]
    InvalidTime(#[from] PricingError),

    #[error("Court count must be at least 1")]
    InvalidCourtCount,

    #[error("Capacity must be at least 1")]
    InvalidCapacity,

    #[error("Amount must not be negative: {0}")]
    NegativeAmount(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally_core::SessionStatus;

    fn session(location: &str) -> Session {
        Session::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            "19:00 - 21:00".parse::<TimeRange>().unwrap(),
            location.to_string(),
            2,
            Money::from_cents(8000),
            3,
            Money::from_cents(1000),
            2,
        )
    }

    fn edit(time: &str, courts: u32, max: u32) -> DetailsEdit {
        DetailsEdit {
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            time: time.parse().unwrap(),
            court_count: courts,
            max_participants: max,
        }
    }

    #[test]
    fn test_details_reprice_registered_venue() {
        let registry = LocationRegistry::with_defaults();
        let mut s = session("Perfect Win");

        ChangeHandler::apply_details(&mut s, &edit("18:00 - 19:30", 3, 2), &registry, Role::Admin).unwrap();
        assert_eq!(s.court_fee, Money::from_cents(13500));
        assert_eq!(s.court_count, 3);
        assert_eq!(s.time.to_string(), "18:00 - 19:30");
    }

    #[test]
    fn test_details_keep_fee_for_unregistered_venue() {
        let registry = LocationRegistry::with_defaults();
        let mut s = session("Old Hall");

        ChangeHandler::apply_details(&mut s, &edit("18:00 - 21:00", 4, 2), &registry, Role::Admin).unwrap();
        assert_eq!(s.court_fee, Money::from_cents(8000));
        assert_eq!(s.court_count, 4);
    }

    #[test]
    fn test_details_reject_bad_input_without_mutation() {
        let registry = LocationRegistry::with_defaults();
        let mut s = session("SRC");
        let before = s.clone();

        assert!(matches!(
            ChangeHandler::apply_details(&mut s, &edit("21:00 - 19:00", 2, 2), &registry, Role::Admin),
            Err(EditError::InvalidTime(PricingError::NonPositiveDuration { .. }))
        ));
        assert_eq!(
            ChangeHandler::apply_details(&mut s, &edit("19:00 - 21:00", 0, 2), &registry, Role::Admin),
            Err(EditError::InvalidCourtCount)
        );
        assert_eq!(
            ChangeHandler::apply_details(&mut s, &edit("19:00 - 21:00", 2, 2), &registry, Role::Member),
            Err(EditError::Forbidden)
        );
        assert_eq!(s, before);
    }

    #[test]
    fn test_raising_capacity_promotes() {
        let registry = LocationRegistry::with_defaults();
        let mut s = session("SRC");
        s.participants = vec!["A".into(), "B".into()];
        s.waiting_list = ["C", "D"].into_iter().collect();

        let promoted = ChangeHandler::apply_details(&mut s, &edit("19:00 - 21:00", 2, 3), &registry, Role::Admin).unwrap();
        assert_eq!(promoted, vec!["C"]);
        assert_eq!(s.participants, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_cost_edit_verbatim() {
        let mut s = session("SRC");
        let costs = CostEdit {
            court_fee: Money::from_cents(9999),
            shuttle_qty: 6,
            shuttle_price: Money::from_cents(1058),
        };
        assert_eq!(costs.preview_total(), Money::from_cents(16347));
        ChangeHandler::apply_costs(&mut s, &costs, Role::Admin).unwrap();
        assert_eq!(CostEdit::from_session(&s), costs);

        let negative = CostEdit { court_fee: Money::from_cents(-1), ..costs };
        assert_eq!(
            ChangeHandler::apply_costs(&mut s, &negative, Role::Admin),
            Err(EditError::NegativeAmount("courtFee"))
        );
    }

    #[test]
    fn test_completed_rejects_edits() {
        let mut s = session("SRC");
        s.status = SessionStatus::Completed;
        let costs = CostEdit::from_session(&s);
        assert!(matches!(
            ChangeHandler::apply_costs(&mut s, &costs, Role::Admin),
            Err(EditError::SessionCompleted(_))
        ));
    }
}
