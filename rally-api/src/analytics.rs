use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rally_session::{AnalyticsReport, Period};
use serde::Deserialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize, Default)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub period: Period,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/analytics", get(analytics))
}

async fn analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsReport>, AppError> {
    Ok(Json(state.service.analytics(query.period).await?))
}
