//! `GET /healthz`, `GET /v1/readyz`, `GET /v1/restaurants/{id}/voice-config`.

use std::sync::atomic::Ordering;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

pub async fn healthz() -> impl IntoResponse {
    "ok"
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "ready": state.ready.load(Ordering::Relaxed) }))
}

pub async fn voice_config(State(state): State<AppState>, Path(restaurant_id): Path<String>) -> impl IntoResponse {
    Json(serde_json::json!({
        "restaurantId": restaurant_id,
        "name": state.config.voice.name,
        "languageCode": state.config.voice.language_code,
    }))
}
