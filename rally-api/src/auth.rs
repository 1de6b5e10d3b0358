use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rally_core::identity::Role;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, middleware::auth::Claims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let role = state
        .credentials
        .verify(&req.login, &req.password)
        .ok_or_else(|| AppError::AuthenticationError("Invalid login or password".into()))?;

    let claims = Claims {
        sub: req.login.trim().to_string(),
        role,
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(state.auth.secret.expose().as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    tracing::info!("{} signed in as {:?}", claims.sub, role);
    Ok(Json(AuthResponse { token, role }))
}
