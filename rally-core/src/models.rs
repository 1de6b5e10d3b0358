use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rally_catalog::pricing;
use rally_shared::Money;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Capacity used when a session carries no (or a zero) limit.
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 8;

/// Session status in the lifecycle
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
}

/// Start/end clock pair, stored as `"HH:MM - HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn parse_pair(start: &str, end: &str) -> Result<Self, pricing::PricingError> {
        Ok(Self {
            start: pricing::parse_clock(start)?,
            end: pricing::parse_clock(end)?,
        })
    }

    /// Fractional hours; zero when the range is empty or inverted.
    pub fn duration_hours(&self) -> f64 {
        pricing::duration_between(self.start, self.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

impl FromStr for TimeRange {
    type Err = pricing::PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| pricing::PricingError::InvalidClock(s.to_string()))?;
        Self::parse_pair(start, end)
    }
}

impl Serialize for TimeRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// FIFO queue of names waiting for a roster slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct WaitingList(VecDeque<String>);

impl WaitingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, name: String) {
        self.0.push_back(name);
    }

    /// Next in line, removed from the queue.
    pub fn dequeue_front(&mut self) -> Option<String> {
        self.0.pop_front()
    }

    pub fn front(&self) -> Option<&String> {
        self.0.front()
    }

    /// Drop every occurrence of `name`; returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|n| n != name);
        self.0.len() != before
    }

    pub fn retain<F: FnMut(&String) -> bool>(&mut self, f: F) {
        self.0.retain(f);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for WaitingList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// One scheduled court booking with its roster and costs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub date: NaiveDate,
    pub time: TimeRange,
    /// Venue name, a soft reference into the location registry.
    pub location: String,
    pub court_count: u32,
    /// Snapshot taken at creation/edit time; not tied to the venue's current rate.
    pub court_fee: Money,
    pub shuttle_qty: u32,
    pub shuttle_price: Money,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub waiting_list: WaitingList,
    #[serde(default)]
    pub deletion_requests: Vec<String>,
    #[serde(default)]
    pub max_participants: u32,
    #[serde(default)]
    pub status: SessionStatus,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: NaiveDate,
        time: TimeRange,
        location: String,
        court_count: u32,
        court_fee: Money,
        shuttle_qty: u32,
        shuttle_price: Money,
        max_participants: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            time,
            location,
            court_count,
            court_fee,
            shuttle_qty,
            shuttle_price,
            participants: Vec::new(),
            waiting_list: WaitingList::new(),
            deletion_requests: Vec::new(),
            max_participants,
            status: SessionStatus::Active,
        }
    }

    /// Effective roster capacity.
    pub fn capacity(&self) -> usize {
        if self.max_participants == 0 {
            DEFAULT_MAX_PARTICIPANTS as usize
        } else {
            self.max_participants as usize
        }
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.capacity()
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub fn is_participant(&self, name: &str) -> bool {
        self.participants.iter().any(|p| p == name)
    }

    /// Present in either the roster or the queue.
    pub fn is_listed(&self, name: &str) -> bool {
        self.is_participant(name) || self.waiting_list.contains(name)
    }

    pub fn has_deletion_request(&self, name: &str) -> bool {
        self.deletion_requests.iter().any(|n| n == name)
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time.start)
    }

    pub fn end_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"
            {
                "id": "b7c1",
                "date": "2024-12-25",
                "time": "19:00 - 21:00",
                "location": "SRC",
                "courtCount": 2,
                "courtFee": 80,
                "shuttleQty": 3,
                "shuttlePrice": 10.58,
                "participants": ["Ann", "Ben"],
                "maxParticipants": 8
            }
        "#
    }

    #[test]
    fn test_session_deserialization_defaults() {
        let session: Session = serde_json::from_str(sample_json()).expect("Failed to deserialize");
        assert_eq!(session.date, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
        assert_eq!(session.time.to_string(), "19:00 - 21:00");
        assert_eq!(session.shuttle_price, Money::from_cents(1058));
        assert!(session.waiting_list.is_empty());
        assert!(session.deletion_requests.is_empty());
        assert_eq!(session.status, SessionStatus::Active);
    }

    #[test]
    fn test_session_serialization_keys() {
        let session: Session = serde_json::from_str(sample_json()).unwrap();
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["time"], "19:00 - 21:00");
        assert_eq!(json["status"], "active");
        assert_eq!(json["waitingList"], serde_json::json!([]));
        assert_eq!(json["courtFee"], 80.0);
    }

    #[test]
    fn test_zero_capacity_falls_back_to_default() {
        let mut session: Session = serde_json::from_str(sample_json()).unwrap();
        session.max_participants = 0;
        assert_eq!(session.capacity(), 8);
    }

    #[test]
    fn test_time_range_parsing() {
        let range: TimeRange = "08:30 - 10:00".parse().unwrap();
        assert_eq!(range.duration_hours(), 1.5);
        assert!("19:00".parse::<TimeRange>().is_err());
        assert!("xx - yy".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_waiting_list_is_fifo() {
        let mut queue: WaitingList = ["C", "D"].into_iter().collect();
        queue.enqueue("E".to_string());
        assert_eq!(queue.dequeue_front().as_deref(), Some("C"));
        assert!(queue.remove("E"));
        assert!(!queue.remove("E"));
        assert_eq!(queue.iter().cloned().collect::<Vec<_>>(), vec!["D"]);
    }

    #[test]
    fn test_end_datetime() {
        let session: Session = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(session.end_datetime().to_string(), "2024-12-25 21:00:00");
    }
}
