use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use rally_core::Session;
use rally_session::cost::{self, CostBreakdown};
use rally_session::{
    CostEdit, DetailsEdit, JoinOutcome, LeaveOutcome, RemoveOutcome, RosterList, SessionDraft, SessionView,
};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, middleware::auth::Claims, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub view: SessionView,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub name: String,
    #[serde(default)]
    pub list: RosterList,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectResponse {
    pub rejected: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsResponse {
    pub session: Session,
    pub promoted: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostResponse {
    #[serde(flatten)]
    pub breakdown: CostBreakdown,
    /// e.g. `RM 65.00` or `RM --`
    pub per_person_label: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/details", put(edit_details))
        .route("/sessions/{id}/costs", put(edit_costs))
        .route("/sessions/{id}/cost", get(session_cost))
        .route("/sessions/{id}/complete", post(complete_session))
        .route("/sessions/{id}/join", post(join))
        .route("/sessions/{id}/leave", post(leave))
        .route("/sessions/{id}/approve", post(approve))
        .route("/sessions/{id}/reject", post(reject))
        .route("/sessions/{id}/remove", post(remove))
        .route("/participants", get(participants))
}

// ============================================================================
// Session CRUD
// ============================================================================

async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Session>>, AppError> {
    Ok(Json(state.service.list_sessions(query.view).await?))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(state.service.get_session(&id).await?))
}

async fn create_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<SessionDraft>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    let session = state.service.create_session(draft, claims.role).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn delete_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.service.delete_session(&id, claims.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn edit_details(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(edit): Json<DetailsEdit>,
) -> Result<Json<DetailsResponse>, AppError> {
    let promoted = state.service.edit_details(&id, &edit, claims.role).await?;
    let session = state.service.get_session(&id).await?;
    Ok(Json(DetailsResponse { session, promoted }))
}

async fn edit_costs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(edit): Json<CostEdit>,
) -> Result<Json<Session>, AppError> {
    state.service.edit_costs(&id, &edit, claims.role).await?;
    Ok(Json(state.service.get_session(&id).await?))
}

async fn session_cost(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CostResponse>, AppError> {
    let session = state.service.get_session(&id).await?;
    let breakdown = CostBreakdown::of(&session);
    Ok(Json(CostResponse {
        per_person_label: cost::format_share(breakdown.per_person, &state.currency),
        breakdown,
    }))
}

async fn complete_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Session>, AppError> {
    state.service.complete_session(&id, claims.role).await?;
    Ok(Json(state.service.get_session(&id).await?))
}

// ============================================================================
// Roster
// ============================================================================

async fn join(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NameRequest>,
) -> Result<Json<JoinOutcome>, AppError> {
    Ok(Json(state.service.join(&id, &req.name).await?))
}

async fn leave(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(req): Json<NameRequest>,
) -> Result<Json<LeaveOutcome>, AppError> {
    Ok(Json(state.service.request_leave(&id, &req.name, claims.role).await?))
}

async fn approve(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(req): Json<NameRequest>,
) -> Result<Json<RemoveOutcome>, AppError> {
    Ok(Json(state.service.approve_deletion(&id, &req.name, claims.role).await?))
}

async fn reject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(req): Json<NameRequest>,
) -> Result<Json<RejectResponse>, AppError> {
    let rejected = state.service.reject_deletion(&id, &req.name, claims.role).await?;
    Ok(Json(RejectResponse { rejected }))
}

/// Members may only take a name off the waiting list.
async fn remove(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<RemoveOutcome>, AppError> {
    if req.list == RosterList::Waiting && !claims.role.is_admin() {
        let removed = state.service.leave_waiting_list(&id, &req.name).await?;
        return Ok(Json(RemoveOutcome { removed, promoted: None }));
    }
    Ok(Json(state.service.remove(&id, &req.name, req.list, claims.role).await?))
}

async fn participants(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.service.frequent_participants().await?))
}
