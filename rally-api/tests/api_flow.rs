use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Local};
use rally_api::{app, state::AuthConfig, AppState};
use rally_core::advisor::StaticAdvisor;
use rally_core::identity::StaticCredentials;
use rally_session::{ServiceRules, SessionService};
use rally_shared::Masked;
use rally_store::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    let service = SessionService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StaticAdvisor::new("- Book courts early")),
        ServiceRules::default(),
    );
    app(AppState {
        service: Arc::new(service),
        credentials: Arc::new(StaticCredentials::new(
            "admin",
            Masked::new("admin123".to_string()),
            "user",
            Masked::new("user123".to_string()),
        )),
        auth: AuthConfig {
            secret: Masked::new("test-secret".to_string()),
            expiration: 3600,
        },
        currency: "RM".to_string(),
    })
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, login: &str, password: &str) -> String {
    let (status, body) = send(app, "POST", "/login", None, Some(json!({ "login": login, "password": password }))).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

fn draft() -> Value {
    let date = Local::now().date_naive() + Duration::days(7);
    json!({
        "date": date.to_string(),
        "startTime": "19:00",
        "endTime": "21:00",
        "location": "SRC",
        "courtCount": 2,
        "shuttleQty": 3,
        "shuttlePrice": 10.58,
        "maxParticipants": 2
    })
}

#[tokio::test]
async fn test_login_roles() {
    let app = test_app();

    let (status, body) = send(&app, "POST", "/login", None, Some(json!({ "login": "admin", "password": "admin123" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "ADMIN");

    let (status, body) = send(&app, "POST", "/login", None, Some(json!({ "login": "user", "password": "user123" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "MEMBER");

    let (status, _) = send(&app, "POST", "/login", None, Some(json!({ "login": "admin", "password": "nope" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_requires_token() {
    let app = test_app();
    let (status, _) = send(&app, "GET", "/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/sessions", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_cannot_create() {
    let app = test_app();
    let member = login(&app, "user", "user123").await;
    let (status, _) = send(&app, "POST", "/sessions", Some(&member), Some(draft())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_session_roster_flow() {
    let app = test_app();
    let admin = login(&app, "admin", "admin123").await;
    let member = login(&app, "user", "user123").await;

    let (status, session) = send(&app, "POST", "/sessions", Some(&admin), Some(draft())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["courtFee"], 80.0);
    let id = session["id"].as_str().unwrap().to_string();

    let (_, joined) = send(&app, "POST", &format!("/sessions/{}/join", id), Some(&member), Some(json!({ "name": "Alice" }))).await;
    assert_eq!(joined["result"], "JOINED");
    send(&app, "POST", &format!("/sessions/{}/join", id), Some(&member), Some(json!({ "name": "Bob" }))).await;
    let (_, queued) = send(&app, "POST", &format!("/sessions/{}/join", id), Some(&member), Some(json!({ "name": "Cara" }))).await;
    assert_eq!(queued["result"], "WAITLISTED");
    assert_eq!(queued["position"], 1);

    let (status, _) = send(&app, "POST", &format!("/sessions/{}/join", id), Some(&member), Some(json!({ "name": " Alice " }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, left) = send(&app, "POST", &format!("/sessions/{}/leave", id), Some(&member), Some(json!({ "name": "Alice" }))).await;
    assert_eq!(left["result"], "REQUESTED");

    let (status, _) = send(&app, "POST", &format!("/sessions/{}/approve", id), Some(&member), Some(json!({ "name": "Alice" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, approved) = send(&app, "POST", &format!("/sessions/{}/approve", id), Some(&admin), Some(json!({ "name": "Alice" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["promoted"], "Cara");

    let (_, session) = send(&app, "GET", &format!("/sessions/{}", id), Some(&member), None).await;
    assert_eq!(session["participants"], json!(["Bob", "Cara"]));
    assert_eq!(session["waitingList"], json!([]));
    assert_eq!(session["deletionRequests"], json!([]));

    let (_, cost) = send(&app, "GET", &format!("/sessions/{}/cost", id), Some(&member), None).await;
    assert_eq!(cost["perPersonLabel"], "RM 55.87");

    let (status, _) = send(&app, "POST", &format!("/sessions/{}/complete", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", &format!("/sessions/{}/join", id), Some(&member), Some(json!({ "name": "Dan" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, history) = send(&app, "GET", "/sessions?view=history", Some(&member), None).await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = test_app();
    let member = login(&app, "user", "user123").await;
    let (status, _) = send(&app, "POST", "/sessions/missing/join", Some(&member), Some(json!({ "name": "Alice" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analytics_and_advice() {
    let app = test_app();
    let admin = login(&app, "admin", "admin123").await;
    send(&app, "POST", "/sessions", Some(&admin), Some(draft())).await;

    let (status, report) = send(&app, "GET", "/analytics?period=year", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["summary"]["sessionCount"], 1);
    assert_eq!(report["groups"].as_array().map(Vec::len), Some(1));

    let (status, advice) = send(&app, "GET", "/advice", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advice["advice"], "- Book courts early");
}

#[tokio::test]
async fn test_backup_requires_confirmation() {
    let app = test_app();
    let admin = login(&app, "admin", "admin123").await;
    send(&app, "POST", "/sessions", Some(&admin), Some(draft())).await;

    let (status, backup) = send(&app, "GET", "/backup", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(backup["sessions"].as_array().map(Vec::len), Some(1));

    let mut emptied = backup.clone();
    emptied["sessions"] = json!([]);

    let (status, _) = send(&app, "POST", "/backup", Some(&admin), Some(emptied.clone())).await;
    assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
    let (_, listed) = send(&app, "GET", "/sessions?view=all", Some(&admin), None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, imported) = send(&app, "POST", "/backup?confirm=true", Some(&admin), Some(emptied)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(imported["sessions"], 0);
    let (_, listed) = send(&app, "GET", "/sessions?view=all", Some(&admin), None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_status_reports_online() {
    let app = test_app();
    let member = login(&app, "user", "user123").await;
    let (status, body) = send(&app, "GET", "/status", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online"], true);
    assert_eq!(body["lastError"], Value::Null);
}
