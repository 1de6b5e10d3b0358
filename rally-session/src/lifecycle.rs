use chrono::{Duration, NaiveDateTime};
use rally_core::identity::Role;
use rally_core::{Session, SessionStatus};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::roster::RosterError;

pub const DEFAULT_GRACE_PERIOD_HOURS: i64 = 4;

/// Which slice of the collection a listing returns.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionView {
    #[default]
    Active,
    History,
    All,
}

/// How long after its end time a session stays on the active board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    grace: Duration,
}

impl Default for ActivityWindow {
    fn default() -> Self {
        Self::from_hours(DEFAULT_GRACE_PERIOD_HOURS)
    }
}

impl ActivityWindow {
    pub fn from_hours(hours: i64) -> Self {
        Self { grace: Duration::hours(hours.max(0)) }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// `now < end + grace`, in local wall-clock time.
    pub fn is_time_relevant(&self, session: &Session, now: NaiveDateTime) -> bool {
        now < session.end_datetime() + self.grace
    }

    pub fn is_active(&self, session: &Session, now: NaiveDateTime) -> bool {
        session.status == SessionStatus::Active && self.is_time_relevant(session, now)
    }

    pub fn is_history(&self, session: &Session, now: NaiveDateTime) -> bool {
        !self.is_active(session, now)
    }

    /// Filter and order a snapshot for display.
    pub fn select(&self, mut sessions: Vec<Session>, view: SessionView, now: NaiveDateTime) -> Vec<Session> {
        match view {
            SessionView::Active => sessions.retain(|s| self.is_active(s, now)),
            SessionView::History => sessions.retain(|s| self.is_history(s, now)),
            SessionView::All => {}
        }
        sort_recent_first(&mut sessions);
        sessions
    }
}

/// Date descending, later start first within a day.
pub fn sort_recent_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.date.cmp(&a.date).then(b.time.start.cmp(&a.time.start)));
}

/// Admin-only, one-way `active → completed`.
pub fn complete(session: &mut Session, role: Role) -> Result<(), RosterError> {
    if !role.is_admin() {
        return Err(RosterError::Forbidden("complete session"));
    }
    if session.is_completed() {
        return Err(RosterError::InvalidTransition {
            from: "completed".to_string(),
            to: "completed".to_string(),
        });
    }
    session.status = SessionStatus::Completed;
    info!("Session {} completed", session.id);
    Ok(())
}

/// Every name that ever played, most sessions first; ties in name order.
pub fn frequent_participants(sessions: &[Session]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in sessions.iter().flat_map(|s| s.participants.iter()) {
        *counts.entry(name.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked.into_iter().map(|(name, _)| name.to_string()).collect()
}
