use crate::models::{Session, SessionStatus, TimeRange, WaitingList};
use chrono::NaiveDate;
use rally_shared::Money;
use serde::{Deserialize, Serialize};

/// Partial update of a session. Only the fields that are `Some` are written,
/// so concurrent edits to different fields do not clobber each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_fee: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuttle_qty: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuttle_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_list: Option<WaitingList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_requests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the fields that differ between `before` and `after`.
    pub fn diff(before: &Session, after: &Session) -> Self {
        fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            if a == b { None } else { Some(b.clone()) }
        }

        Self {
            date: changed(&before.date, &after.date),
            time: changed(&before.time, &after.time),
            location: changed(&before.location, &after.location),
            court_count: changed(&before.court_count, &after.court_count),
            court_fee: changed(&before.court_fee, &after.court_fee),
            shuttle_qty: changed(&before.shuttle_qty, &after.shuttle_qty),
            shuttle_price: changed(&before.shuttle_price, &after.shuttle_price),
            participants: changed(&before.participants, &after.participants),
            waiting_list: changed(&before.waiting_list, &after.waiting_list),
            deletion_requests: changed(&before.deletion_requests, &after.deletion_requests),
            max_participants: changed(&before.max_participants, &after.max_participants),
            status: changed(&before.status, &after.status),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }

    /// Wire names of the fields this patch writes.
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.date.is_some() { fields.push("date"); }
        if self.time.is_some() { fields.push("time"); }
        if self.location.is_some() { fields.push("location"); }
        if self.court_count.is_some() { fields.push("courtCount"); }
        if self.court_fee.is_some() { fields.push("courtFee"); }
        if self.shuttle_qty.is_some() { fields.push("shuttleQty"); }
        if self.shuttle_price.is_some() { fields.push("shuttlePrice"); }
        if self.participants.is_some() { fields.push("participants"); }
        if self.waiting_list.is_some() { fields.push("waitingList"); }
        if self.deletion_requests.is_some() { fields.push("deletionRequests"); }
        if self.max_participants.is_some() { fields.push("maxParticipants"); }
        if self.status.is_some() { fields.push("status"); }
        fields
    }

    /// Field-level last-write-wins merge into a stored session.
    pub fn apply_to(&self, session: &mut Session) {
        if let Some(v) = self.date { session.date = v; }
        if let Some(v) = self.time { session.time = v; }
        if let Some(v) = &self.location { session.location = v.clone(); }
        if let Some(v) = self.court_count { session.court_count = v; }
        if let Some(v) = self.court_fee { session.court_fee = v; }
        if let Some(v) = self.shuttle_qty { session.shuttle_qty = v; }
        if let Some(v) = self.shuttle_price { session.shuttle_price = v; }
        if let Some(v) = &self.participants { session.participants = v.clone(); }
        if let Some(v) = &self.waiting_list { session.waiting_list = v.clone(); }
        if let Some(v) = &self.deletion_requests { session.deletion_requests = v.clone(); }
        if let Some(v) = self.max_participants { session.max_participants = v; }
        if let Some(v) = self.status { session.status = v; }
    }
}
