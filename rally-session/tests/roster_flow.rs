use chrono::NaiveDate;
use rally_catalog::pricing;
use rally_core::identity::Role;
use rally_core::{Session, SessionStatus, TimeRange};
use rally_session::cost;
use rally_session::roster::{JoinOutcome, RosterList, RosterManager};
use rally_session::{ServiceRules, SessionDraft, SessionService};
use rally_shared::Money;
use rally_catalog::LocationRegistry;
use rally_core::advisor::DisabledAdvisor;
use rally_store::{LocalStore, MemoryStore};
use std::sync::Arc;

fn session(max: u32) -> Session {
    Session::new(
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        "19:00 - 21:00".parse::<TimeRange>().unwrap(),
        "SRC".to_string(),
        2,
        Money::from_cents(10000),
        3,
        Money::from_cents(1000),
        max,
    )
}

fn waiting(s: &Session) -> Vec<String> {
    s.waiting_list.iter().cloned().collect()
}

#[test]
fn test_capacity_never_exceeded_and_queue_keeps_call_order() {
    for max in 1..=6u32 {
        let mut s = session(max);
        let names: Vec<String> = (0..10).map(|i| format!("N{}", i)).collect();
        for name in &names {
            RosterManager::join(&mut s, name).unwrap();
            assert!(s.participants.len() <= max as usize);
        }
        assert_eq!(s.participants, names[..max as usize].to_vec());
        assert_eq!(waiting(&s), names[max as usize..].to_vec());
    }
}

#[test]
fn test_promotion_takes_queue_head_exactly_once() {
    let mut s = session(3);
    for name in ["A", "B", "C", "D", "E"] {
        RosterManager::join(&mut s, name).unwrap();
    }

    let head = s.waiting_list.front().cloned();
    let before = s.participants.len();
    let outcome = RosterManager::remove(&mut s, "B", RosterList::Participants, Role::Admin).unwrap();
    assert_eq!(outcome.promoted, head);
    assert_eq!(s.participants.len(), before);
    assert_eq!(s.participants, vec!["A", "C", "D"]);

    RosterManager::request_leave(&mut s, "A", Role::Member).unwrap();
    let head = s.waiting_list.front().cloned();
    let outcome = RosterManager::approve_deletion(&mut s, "A", Role::Admin).unwrap();
    assert_eq!(outcome.promoted, head);
    assert_eq!(s.participants, vec!["C", "D", "E"]);
    assert!(s.waiting_list.is_empty());
}

#[test]
fn test_repeated_leave_request_recorded_once() {
    let mut s = session(4);
    RosterManager::join(&mut s, "A").unwrap();
    RosterManager::request_leave(&mut s, "A", Role::Member).unwrap();
    RosterManager::request_leave(&mut s, "A", Role::Member).unwrap();
    assert_eq!(s.deletion_requests, vec!["A"]);
}

#[test]
fn test_cost_is_pure() {
    let mut s = session(4);
    s.participants = vec!["A".into(), "B".into()];
    let first = (cost::total_event_cost(&s), cost::cost_per_person(&s));
    let second = (cost::total_event_cost(&s.clone()), cost::cost_per_person(&s.clone()));
    assert_eq!(first, second);
}

#[test]
fn test_completed_session_ignores_roster_operations() {
    let mut s = session(1);
    RosterManager::join(&mut s, "A").unwrap();
    RosterManager::join(&mut s, "B").unwrap();
    s.status = SessionStatus::Completed;
    let frozen = s.clone();

    let _ = RosterManager::join(&mut s, "C");
    let _ = RosterManager::remove(&mut s, "A", RosterList::Participants, Role::Admin);
    let _ = RosterManager::request_leave(&mut s, "A", Role::Member);
    let _ = RosterManager::approve_deletion(&mut s, "A", Role::Admin);
    assert_eq!(s, frozen);
}

#[test]
fn test_scenario_full_roster_then_admin_remove() {
    let mut s = session(2);
    assert_eq!(RosterManager::join(&mut s, "A").unwrap(), JoinOutcome::Joined);
    assert_eq!(RosterManager::join(&mut s, "B").unwrap(), JoinOutcome::Joined);
    assert_eq!(
        RosterManager::join(&mut s, "C").unwrap(),
        JoinOutcome::Waitlisted { position: 1 }
    );
    assert_eq!(s.participants, vec!["A", "B"]);
    assert_eq!(waiting(&s), vec!["C"]);

    RosterManager::remove(&mut s, "A", RosterList::Participants, Role::Admin).unwrap();
    assert_eq!(s.participants, vec!["B", "C"]);
    assert!(s.waiting_list.is_empty());
}

#[test]
fn test_scenario_even_split() {
    let mut s = session(8);
    s.participants = vec!["A".into(), "B".into()];
    assert_eq!(cost::total_event_cost(&s), Money::from_cents(13000));
    assert_eq!(cost::cost_per_person(&s), Some(65.0));
    assert_eq!(cost::format_share(cost::cost_per_person(&s), "RM"), "RM 65.00");
}

#[test]
fn test_scenario_rejected_leave_request() {
    let mut s = session(4);
    RosterManager::join(&mut s, "A").unwrap();
    RosterManager::join(&mut s, "B").unwrap();

    RosterManager::request_leave(&mut s, "B", Role::Member).unwrap();
    assert!(RosterManager::reject_deletion(&mut s, "B", Role::Admin).unwrap());
    assert_eq!(s.participants, vec!["A", "B"]);
    assert!(s.deletion_requests.is_empty());
}

#[tokio::test]
async fn test_scenario_zero_length_session_is_blocked() {
    assert_eq!(pricing::duration("19:00", "19:00"), 0.0);

    let registry = LocationRegistry::with_defaults();
    let draft = SessionDraft {
        start_time: "19:00".into(),
        end_time: "19:00".into(),
        ..SessionDraft::with_defaults(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), &registry)
    };

    let store = Arc::new(MemoryStore::new());
    let service = SessionService::new(store, Arc::new(DisabledAdvisor), ServiceRules::default());
    assert!(service.create_session(draft, Role::Admin).await.is_err());
    assert!(service.list_sessions(rally_session::SessionView::All).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_member_flow_through_service() {
    let store = Arc::new(MemoryStore::new());
    let service = SessionService::new(store, Arc::new(DisabledAdvisor), ServiceRules::default());
    let registry = LocationRegistry::with_defaults();
    let draft = SessionDraft {
        max_participants: 2,
        ..SessionDraft::with_defaults(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), &registry)
    };
    let created = service.create_session(draft, Role::Admin).await.unwrap();

    for name in ["A", "B", "C"] {
        service.join(&created.id, name).await.unwrap();
    }
    service.request_leave(&created.id, "A", Role::Member).await.unwrap();
    assert_eq!(service.get_session(&created.id).await.unwrap().deletion_requests, vec!["A"]);

    let outcome = service.approve_deletion(&created.id, "A", Role::Admin).await.unwrap();
    assert_eq!(outcome.promoted.as_deref(), Some("C"));

    service.complete_session(&created.id, Role::Admin).await.unwrap();
    assert!(service.join(&created.id, "D").await.is_err());

    let stored = service.get_session(&created.id).await.unwrap();
    assert_eq!(stored.participants, vec!["B", "C"]);
    assert!(stored.is_completed());
}

#[tokio::test]
async fn test_failed_write_can_be_retried() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let store = Arc::new(LocalStore::open(&data).await.unwrap());
    let service = SessionService::new(store, Arc::new(DisabledAdvisor), ServiceRules::default());
    let registry = LocationRegistry::with_defaults();
    let draft = SessionDraft::with_defaults(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), &registry);
    let created = service.create_session(draft, Role::Admin).await.unwrap();
    let backup = service.export_backup(Role::Admin).await.unwrap();

    tokio::fs::remove_dir_all(&data).await.unwrap();
    assert!(service.join(&created.id, "Ann").await.is_err());
    assert!(service.status().await.last_error.is_some());
    assert!(service.get_session(&created.id).await.unwrap().participants.is_empty());

    let emptied = serde_json::json!({
        "version": backup.version,
        "exportDate": backup.export_date,
        "locations": [],
        "sessions": []
    });
    assert!(service.import_backup(&emptied.to_string(), true, Role::Admin).await.is_err());
    assert_eq!(service.list_sessions(rally_session::SessionView::All).await.unwrap().len(), 1);

    tokio::fs::create_dir_all(&data).await.unwrap();
    assert_eq!(service.join(&created.id, "Ann").await.unwrap(), JoinOutcome::Joined);
    assert_eq!(service.get_session(&created.id).await.unwrap().participants, vec!["Ann"]);
    assert!(service.status().await.last_error.is_none());
}
