use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use rally_catalog::LocationConfig;

use crate::{error::AppError, middleware::auth::Claims, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/locations", get(list_locations).put(save_locations))
        .route("/locations/reset", post(reset_locations))
        .route("/locations/{id}", delete(delete_location))
}

async fn list_locations(State(state): State<AppState>) -> Result<Json<Vec<LocationConfig>>, AppError> {
    Ok(Json(state.service.locations().await?))
}

/// Replace the registry with the submitted list.
async fn save_locations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(locations): Json<Vec<LocationConfig>>,
) -> Result<Json<Vec<LocationConfig>>, AppError> {
    Ok(Json(state.service.save_locations(locations, claims.role).await?))
}

async fn delete_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.service.delete_location(&id, claims.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_locations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<LocationConfig>>, AppError> {
    Ok(Json(state.service.reset_locations(claims.role).await?))
}
