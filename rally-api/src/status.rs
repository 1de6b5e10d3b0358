use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures_util::stream::{self, Stream};
use rally_core::repository::StoreEvent;
use rally_session::SyncStatus;
use std::convert::Infallible;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/events", get(events))
}

async fn status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.service.status().await)
}

/// Live snapshots: every change pushes the whole affected collection.
async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let feed = state.service.store().subscribe();
    let stream = stream::unfold(feed, |mut feed| async move {
        let event = feed.next().await?;
        Some((Ok(to_sse(&event)), feed))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &StoreEvent) -> Event {
    let (name, payload) = match event {
        StoreEvent::Sessions(sessions) => ("sessions", serde_json::to_string(sessions)),
        StoreEvent::Locations(locations) => ("locations", serde_json::to_string(locations)),
        StoreEvent::SyncError(message) => ("sync-error", serde_json::to_string(message)),
    };
    match payload {
        Ok(data) => Event::default().event(name).data(data),
        Err(e) => {
            tracing::warn!("Could not encode {} event: {}", name, e);
            Event::default().event("sync-error").data("encoding failed")
        }
    }
}
