use rally_catalog::pricing;
use rally_core::Session;
use rally_shared::money::{format_amount, Money};
use serde::Serialize;

/// Everything the cost panel shows for one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub court_fee: Money,
    pub shuttle_cost: Money,
    pub total: Money,
    pub participant_count: usize,
    /// Absent while nobody is on the roster.
    pub per_person: Option<f64>,
}

impl CostBreakdown {
    pub fn of(session: &Session) -> Self {
        let shuttle_cost = total_shuttle_cost(session);
        let total = session.court_fee + shuttle_cost;
        Self {
            court_fee: session.court_fee,
            shuttle_cost,
            total,
            participant_count: session.participants.len(),
            per_person: total.share(session.participants.len()),
        }
    }
}

pub fn total_shuttle_cost(session: &Session) -> Money {
    pricing::total_shuttle_cost(session.shuttle_qty, session.shuttle_price)
}

pub fn total_event_cost(session: &Session) -> Money {
    event_cost(session.court_fee, session.shuttle_qty, session.shuttle_price)
}

/// Even split of the event cost. Members with a pending deletion request
/// still count.
pub fn cost_per_person(session: &Session) -> Option<f64> {
    total_event_cost(session).share(session.participants.len())
}

/// `courtFee + shuttleQty × shuttlePrice`, for previews before a session exists.
pub fn event_cost(court_fee: Money, shuttle_qty: u32, shuttle_price: Money) -> Money {
    court_fee + pricing::total_shuttle_cost(shuttle_qty, shuttle_price)
}

/// `"RM 65.00"`, or `"RM --"` when there is no share to show.
pub fn format_share(per_person: Option<f64>, currency: &str) -> String {
    match per_person {
        Some(amount) => format!("{} {}", currency, format_amount(amount)),
        None => format!("{} --", currency),
    }
}
