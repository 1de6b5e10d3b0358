use rally_core::identity::Role;
use rally_core::Session;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where a join landed, so the caller can word its confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinOutcome {
    Joined,
    /// Queued; `position` is 1-based.
    Waitlisted { position: usize },
}

/// Result of removing a name from one of the roster lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoveOutcome {
    pub removed: bool,
    /// Waiting-list head moved into the freed slot, if any.
    pub promoted: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveOutcome {
    /// Admin leave: removed on the spot.
    Removed(RemoveOutcome),
    /// Member leave: pending admin approval.
    Requested,
    AlreadyRequested,
    /// Name is not on the participant list; nothing to request.
    NotListed,
}

/// Which list a direct removal targets.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RosterList {
    #[default]
    Participants,
    Waiting,
}

/// State machine for one session's participants, waiting list and
/// deletion requests. Every operation either fully applies or leaves the
/// session untouched.
pub struct RosterManager;

impl RosterManager {
    /// Add a name to the roster, or to the waiting list when the roster is full.
    pub fn join(session: &mut Session, name: &str) -> Result<JoinOutcome, RosterError> {
        let name = Self::normalize(name)?;
        Self::ensure_open(session)?;

        if session.is_listed(&name) {
            return Err(RosterError::DuplicateName(name));
        }

        if session.participants.len() < session.capacity() {
            info!("Session {}: '{}' joined", session.id, name);
            session.participants.push(name);
            Ok(JoinOutcome::Joined)
        } else {
            info!("Session {}: '{}' queued on waiting list", session.id, name);
            session.waiting_list.enqueue(name);
            Ok(JoinOutcome::Waitlisted { position: session.waiting_list.len() })
        }
    }

    /// Admins leave immediately; members file an idempotent deletion request.
    /// A pending request keeps the name on the roster and in the cost split.
    pub fn request_leave(session: &mut Session, name: &str, role: Role) -> Result<LeaveOutcome, RosterError> {
        if role.is_admin() {
            let outcome = Self::remove(session, name, RosterList::Participants, role)?;
            return Ok(LeaveOutcome::Removed(outcome));
        }

        let name = Self::normalize(name)?;
        Self::ensure_open(session)?;

        if !session.is_participant(&name) {
            return Ok(LeaveOutcome::NotListed);
        }
        if session.has_deletion_request(&name) {
            return Ok(LeaveOutcome::AlreadyRequested);
        }

        info!("Session {}: '{}' asked to leave", session.id, name);
        session.deletion_requests.push(name);
        Ok(LeaveOutcome::Requested)
    }

    /// Admin removal from the chosen list. Removing a participant also clears
    /// their deletion request and promotes the waiting-list head into the slot.
    pub fn remove(session: &mut Session, name: &str, list: RosterList, role: Role) -> Result<RemoveOutcome, RosterError> {
        Self::require_admin(role, "remove")?;
        let name = Self::normalize(name)?;
        Self::ensure_open(session)?;

        match list {
            RosterList::Participants => Ok(Self::remove_participant(session, &name)),
            RosterList::Waiting => Ok(RemoveOutcome {
                removed: Self::drop_from_queue(session, &name),
                promoted: None,
            }),
        }
    }

    pub fn approve_deletion(session: &mut Session, name: &str, role: Role) -> Result<RemoveOutcome, RosterError> {
        Self::require_admin(role, "approve deletion")?;
        let name = Self::normalize(name)?;
        Self::ensure_open(session)?;

        info!("Session {}: deletion request for '{}' approved", session.id, name);
        Ok(Self::remove_participant(session, &name))
    }

    /// Drop the request only; the roster is unchanged.
    pub fn reject_deletion(session: &mut Session, name: &str, role: Role) -> Result<bool, RosterError> {
        Self::require_admin(role, "reject deletion")?;
        let name = Self::normalize(name)?;
        Self::ensure_open(session)?;

        let before = session.deletion_requests.len();
        session.deletion_requests.retain(|n| *n != name);
        let rejected = session.deletion_requests.len() != before;
        if rejected {
            info!("Session {}: deletion request for '{}' rejected", session.id, name);
        }
        Ok(rejected)
    }

    /// Leave the queue (self-service or admin). No slot opens, so nobody is promoted.
    pub fn remove_from_waiting_list(session: &mut Session, name: &str) -> Result<bool, RosterError> {
        let name = Self::normalize(name)?;
        Self::ensure_open(session)?;
        Ok(Self::drop_from_queue(session, &name))
    }

    /// Promote from the queue until the roster is full or the queue is empty.
    /// Used when capacity is raised.
    pub fn fill_open_slots(session: &mut Session) -> Vec<String> {
        let mut promoted = Vec::new();
        while session.participants.len() < session.capacity() {
            match session.waiting_list.dequeue_front() {
                Some(next) => {
                    info!("Session {}: '{}' promoted from waiting list", session.id, next);
                    session.participants.push(next.clone());
                    promoted.push(next);
                }
                None => break,
            }
        }
        promoted
    }

    /// Bring stored data that violates the roster invariants back into shape:
    /// blank and duplicate names go, a name on both lists keeps its roster
    /// spot, stray deletion requests are dropped and negative amounts clamp
    /// to zero. Returns whether anything changed.
    pub fn repair(session: &mut Session) -> bool {
        let original = session.clone();

        let mut seen: Vec<String> = Vec::with_capacity(session.participants.len());
        for name in session.participants.drain(..) {
            let name = name.trim().to_string();
            if !name.is_empty() && !seen.contains(&name) {
                seen.push(name);
            }
        }
        session.participants = seen;

        let mut queued: Vec<String> = Vec::with_capacity(session.waiting_list.len());
        while let Some(name) = session.waiting_list.dequeue_front() {
            let name = name.trim().to_string();
            if !name.is_empty() && !queued.contains(&name) && !session.participants.contains(&name) {
                queued.push(name);
            }
        }
        session.waiting_list = queued.into_iter().collect();

        let mut requests: Vec<String> = Vec::with_capacity(session.deletion_requests.len());
        for name in session.deletion_requests.drain(..) {
            let name = name.trim().to_string();
            if session.participants.contains(&name) && !requests.contains(&name) {
                requests.push(name);
            }
        }
        session.deletion_requests = requests;

        session.court_fee = session.court_fee.clamp_non_negative();
        session.shuttle_price = session.shuttle_price.clamp_non_negative();

        let changed = *session != original;
        if changed {
            tracing::warn!("Session {}: repaired inconsistent roster data", session.id);
        }
        changed
    }

    fn remove_participant(session: &mut Session, name: &str) -> RemoveOutcome {
        let before = session.participants.len();
        session.participants.retain(|p| p != name);
        session.deletion_requests.retain(|p| p != name);
        let removed = session.participants.len() != before;

        let mut promoted = None;
        if removed && session.participants.len() < session.capacity() {
            if let Some(next) = session.waiting_list.dequeue_front() {
                info!("Session {}: '{}' promoted from waiting list", session.id, next);
                session.participants.push(next.clone());
                promoted = Some(next);
            }
        }

        if removed {
            info!("Session {}: '{}' removed from roster", session.id, name);
        }
        RemoveOutcome { removed, promoted }
    }

    fn drop_from_queue(session: &mut Session, name: &str) -> bool {
        let removed = session.waiting_list.remove(name);
        if removed {
            info!("Session {}: '{}' left the waiting list", session.id, name);
        }
        removed
    }

    fn normalize(name: &str) -> Result<String, RosterError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(RosterError::EmptyName);
        }
        Ok(trimmed.to_string())
    }

    fn ensure_open(session: &Session) -> Result<(), RosterError> {
        if session.is_completed() {
            return Err(RosterError::SessionCompleted(session.id.clone()));
        }
        Ok(())
    }

    fn require_admin(role: Role, action: &'static str) -> Result<(), RosterError> {
        if !role.is_admin() {
            return Err(RosterError::Forbidden(action));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Name already on the roster or waiting list: {0}")]
    DuplicateName(String),

    #[error("Session is completed: {0}")]
    SessionCompleted(String),

    #[error("Admin role required to {0}")]
    Forbidden(&'static str),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rally_core::{SessionStatus, TimeRange};
    use rally_shared::Money;

    fn session(max: u32) -> Session {
        Session::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            "19:00 - 21:00".parse::<TimeRange>().unwrap(),
            "SRC".to_string(),
            2,
            Money::from_cents(8000),
            3,
            Money::from_cents(1000),
            max,
        )
    }

    #[test]
    fn test_join_fills_roster_then_queue() {
        let mut s = session(2);
        assert_eq!(RosterManager::join(&mut s, "A").unwrap(), JoinOutcome::Joined);
        assert_eq!(RosterManager::join(&mut s, " B ").unwrap(), JoinOutcome::Joined);
        assert_eq!(
            RosterManager::join(&mut s, "C").unwrap(),
            JoinOutcome::Waitlisted { position: 1 }
        );
        assert_eq!(s.participants, vec!["A", "B"]);
        assert_eq!(s.waiting_list.iter().cloned().collect::<Vec<_>>(), vec!["C"]);
    }

    #[test]
    fn test_join_rejects_duplicates_and_blank_names() {
        let mut s = session(1);
        RosterManager::join(&mut s, "A").unwrap();
        RosterManager::join(&mut s, "B").unwrap();

        assert_eq!(RosterManager::join(&mut s, "A"), Err(RosterError::DuplicateName("A".into())));
        assert_eq!(RosterManager::join(&mut s, "B"), Err(RosterError::DuplicateName("B".into())));
        assert_eq!(RosterManager::join(&mut s, "   "), Err(RosterError::EmptyName));
        assert_eq!(s.participants.len() + s.waiting_list.len(), 2);
    }

    #[test]
    fn test_member_request_is_idempotent_and_keeps_seat() {
        let mut s = session(4);
        RosterManager::join(&mut s, "B").unwrap();

        assert_eq!(RosterManager::request_leave(&mut s, "B", Role::Member).unwrap(), LeaveOutcome::Requested);
        assert_eq!(
            RosterManager::request_leave(&mut s, "B", Role::Member).unwrap(),
            LeaveOutcome::AlreadyRequested
        );
        assert_eq!(s.deletion_requests, vec!["B"]);
        assert_eq!(s.participants, vec!["B"]);
    }

    #[test]
    fn test_member_request_for_unknown_name_is_ignored() {
        let mut s = session(4);
        assert_eq!(RosterManager::request_leave(&mut s, "Ghost", Role::Member).unwrap(), LeaveOutcome::NotListed);
        assert!(s.deletion_requests.is_empty());
    }

    #[test]
    fn test_admin_leave_removes_and_promotes() {
        let mut s = session(1);
        RosterManager::join(&mut s, "A").unwrap();
        RosterManager::join(&mut s, "B").unwrap();

        let outcome = RosterManager::request_leave(&mut s, "A", Role::Admin).unwrap();
        assert_eq!(
            outcome,
            LeaveOutcome::Removed(RemoveOutcome { removed: true, promoted: Some("B".into()) })
        );
        assert_eq!(s.participants, vec!["B"]);
        assert!(s.waiting_list.is_empty());
    }

    #[test]
    fn test_approve_clears_request_and_promotes() {
        let mut s = session(2);
        for name in ["A", "B", "C", "D"] {
            RosterManager::join(&mut s, name).unwrap();
        }
        RosterManager::request_leave(&mut s, "A", Role::Member).unwrap();

        let outcome = RosterManager::approve_deletion(&mut s, "A", Role::Admin).unwrap();
        assert_eq!(outcome.promoted.as_deref(), Some("C"));
        assert_eq!(s.participants, vec!["B", "C"]);
        assert_eq!(s.waiting_list.iter().cloned().collect::<Vec<_>>(), vec!["D"]);
        assert!(s.deletion_requests.is_empty());
    }

    #[test]
    fn test_remove_from_waiting_list_never_promotes() {
        let mut s = session(1);
        for name in ["A", "B", "C"] {
            RosterManager::join(&mut s, name).unwrap();
        }
        assert!(RosterManager::remove_from_waiting_list(&mut s, "B").unwrap());
        assert_eq!(s.participants, vec!["A"]);
        assert_eq!(s.waiting_list.iter().cloned().collect::<Vec<_>>(), vec!["C"]);

        let outcome = RosterManager::remove(&mut s, "C", RosterList::Waiting, Role::Admin).unwrap();
        assert_eq!(outcome, RemoveOutcome { removed: true, promoted: None });
        assert!(s.waiting_list.is_empty());
    }

    #[test]
    fn test_removing_absent_name_is_noop() {
        let mut s = session(2);
        RosterManager::join(&mut s, "A").unwrap();
        let before = s.clone();

        let outcome = RosterManager::remove(&mut s, "Nobody", RosterList::Participants, Role::Admin).unwrap();
        assert_eq!(outcome, RemoveOutcome::default());
        assert!(!RosterManager::remove_from_waiting_list(&mut s, "Nobody").unwrap());
        assert_eq!(s, before);
    }

    #[test]
    fn test_admin_only_operations() {
        let mut s = session(2);
        RosterManager::join(&mut s, "A").unwrap();
        let before = s.clone();

        assert_eq!(
            RosterManager::remove(&mut s, "A", RosterList::Participants, Role::Member),
            Err(RosterError::Forbidden("remove"))
        );
        assert!(RosterManager::approve_deletion(&mut s, "A", Role::Member).is_err());
        assert!(RosterManager::reject_deletion(&mut s, "A", Role::Member).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn test_completed_session_is_frozen() {
        let mut s = session(1);
        RosterManager::join(&mut s, "A").unwrap();
        RosterManager::join(&mut s, "B").unwrap();
        RosterManager::request_leave(&mut s, "A", Role::Member).unwrap();
        s.status = SessionStatus::Completed;
        let frozen = s.clone();

        assert!(matches!(RosterManager::join(&mut s, "C"), Err(RosterError::SessionCompleted(_))));
        assert!(RosterManager::request_leave(&mut s, "A", Role::Member).is_err());
        assert!(RosterManager::request_leave(&mut s, "A", Role::Admin).is_err());
        assert!(RosterManager::remove(&mut s, "A", RosterList::Participants, Role::Admin).is_err());
        assert!(RosterManager::approve_deletion(&mut s, "A", Role::Admin).is_err());
        assert!(RosterManager::reject_deletion(&mut s, "A", Role::Admin).is_err());
        assert!(RosterManager::remove_from_waiting_list(&mut s, "B").is_err());
        assert_eq!(s, frozen);
    }

    #[test]
    fn test_fill_open_slots_after_capacity_raise() {
        let mut s = session(1);
        for name in ["A", "B", "C", "D"] {
            RosterManager::join(&mut s, name).unwrap();
        }
        s.max_participants = 3;
        assert_eq!(RosterManager::fill_open_slots(&mut s), vec!["B", "C"]);
        assert_eq!(s.participants, vec!["A", "B", "C"]);
        assert_eq!(s.waiting_list.len(), 1);
    }

    #[test]
    fn test_repair_restores_invariants() {
        let mut s = session(4);
        s.participants = vec!["A".into(), " A ".into(), "".into(), "B".into()];
        s.waiting_list = ["B", "C", "C"].into_iter().collect();
        s.deletion_requests = vec!["Z".into(), "B".into(), "B".into()];
        s.court_fee = Money::from_cents(-100);

        assert!(RosterManager::repair(&mut s));
        assert_eq!(s.participants, vec!["A", "B"]);
        assert_eq!(s.waiting_list.iter().cloned().collect::<Vec<_>>(), vec!["C"]);
        assert_eq!(s.deletion_requests, vec!["B"]);
        assert_eq!(s.court_fee, Money::ZERO);
        assert!(!RosterManager::repair(&mut s));
    }
}
