use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, middleware::auth::Claims, state::AppState};

#[derive(Debug, Deserialize, Default)]
pub struct ImportQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub export_date: String,
    pub sessions: usize,
    pub locations: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/backup", get(export_backup).post(import_backup))
}

async fn export_backup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let backup = state.service.export_backup(claims.role).await?;
    let disposition = format!("attachment; filename=\"{}\"", backup.file_name());
    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(backup)))
}

/// Body is the raw backup file. Nothing is written unless `?confirm=true`.
async fn import_backup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<Json<ImportResponse>, AppError> {
    let backup = state.service.import_backup(&body, query.confirm, claims.role).await?;
    Ok(Json(ImportResponse {
        export_date: backup.export_date,
        sessions: backup.sessions.len(),
        locations: backup.locations.len(),
    }))
}
