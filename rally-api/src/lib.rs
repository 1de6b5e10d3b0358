use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod advice;
pub mod analytics;
pub mod auth;
pub mod backup;
pub mod error;
pub mod locations;
pub mod middleware;
pub mod sessions;
pub mod state;
pub mod status;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Everything except login needs a bearer token.
    let protected = Router::new()
        .merge(sessions::routes())
        .merge(locations::routes())
        .merge(analytics::routes())
        .merge(backup::routes())
        .merge(advice::routes())
        .merge(status::routes())
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth_middleware));

    Router::new()
        .merge(auth::routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
