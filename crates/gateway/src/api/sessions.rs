//! Session lifecycle routes: start, snapshot, end, send message, interrupt,
//! SSE snapshot stream. Grounded in
//! `original_source/backend/internal/handler/http/handler.go` and the
//! teacher's `api/chat.rs`/`api/runs.rs` handler shapes.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use concierge_domain::{Allergen, Error, MenuItem, Session};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

const START_SESSION_DEADLINE: Duration = Duration::from_secs(10);
const STREAM_TICK: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub restaurant_id: String,
    #[serde(default)]
    pub hard_allergens: BTreeSet<Allergen>,
    #[serde(default)]
    pub preference_tags: Vec<String>,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session: Session,
    pub suggested_menu_items: Vec<MenuItem>,
}

/// `POST /v1/sessions`. Enriches and persists `menuItems` before starting
/// the session, matching `ConciergeService.StartSession`'s ordering. Bound
/// to a 10-second deadline per spec.md §4.6.
pub async fn start_session(State(state): State<AppState>, Json(req): Json<StartSessionRequest>) -> Response {
    let work = async move {
        let mut items = req.menu_items;
        concierge_menu::enrich_all(&mut items);
        state
            .store
            .save_menu_safety_metadata(&req.restaurant_id, items.clone())
            .await?;
        let session = state
            .sessions
            .start_session(&req.restaurant_id, req.hard_allergens, req.preference_tags)
            .await?;
        Ok::<_, Error>(StartSessionResponse {
            session,
            suggested_menu_items: items,
        })
    };

    match tokio::time::timeout(START_SESSION_DEADLINE, work).await {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(err)) => err.into_response(),
        Err(_) => Error::StoreError("request deadline exceeded".to_string()).into_response(),
    }
}

/// `GET /v1/sessions/{id}`.
pub async fn get_session(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    match state.sessions.get_session(&session_id).await {
        Ok(session) => Json(session).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `DELETE /v1/sessions/{id}`.
pub async fn end_session(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    match state.sessions.end_session(&session_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub reply: String,
}

/// `POST /v1/sessions/{id}/messages`. Every error on this route is reported
/// as `400`, per spec.md §4.6 — this deliberately overrides `Error`'s
/// default REST mapping (which would 404 a missing session or 500 a store
/// failure).
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    match state
        .sessions
        .send_message(CancellationToken::new(), &session_id, &req.prompt)
        .await
    {
        Ok(reply) => Json(SendMessageResponse { reply }).into_response(),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

/// `POST /v1/sessions/{id}/interrupt`.
pub async fn interrupt(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    match state.sessions.interrupt(&session_id).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => err.into_response(),
    }
}

/// `GET /v1/sessions/{id}/stream`. Emits `event: ready` immediately, then a
/// `event: session` snapshot every 5 seconds, until the client disconnects.
pub async fn stream_session(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    if let Err(err) = state.sessions.get_session(&session_id).await {
        return err.into_response();
    }

    let events = make_session_event_stream(state, session_id);
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}

fn make_session_event_stream(
    state: AppState,
    session_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        yield Ok(Event::default().event("ready").data("stream-open"));

        let mut interval = tokio::time::interval(STREAM_TICK);
        interval.tick().await; // first tick fires immediately; consume it so the cadence starts at +5s

        loop {
            interval.tick().await;
            match state.sessions.get_session(&session_id).await {
                Ok(session) => {
                    let data = serde_json::to_string(&session).unwrap_or_default();
                    yield Ok(Event::default().event("session").data(data));
                }
                Err(_) => break,
            }
        }
    }
}
