//! Optional bearer-token gate on mutating routes.
//!
//! Reads `CONCIERGE_API_TOKEN` once at startup and caches its SHA-256 digest
//! in `AppState::api_token_hash`. Unset (the default, dev mode) disables the
//! check entirely. Mirrors the teacher's `api/auth.rs::require_api_token`,
//! narrowed to `POST`/`DELETE` requests only — `GET` routes (snapshots, the
//! SSE stream, the realtime upgrade) are never gated.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

pub async fn require_api_token_for_mutations(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !matches!(*req.method(), Method::POST | Method::DELETE) {
        return next.run(req).await;
    }

    let expected_hash = match &state.api_token_hash {
        Some(h) => h,
        None => return next.run(req).await,
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    let provided_hash = Sha256::digest(provided.as_bytes());
    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid or missing API token" })),
        )
            .into_response();
    }

    next.run(req).await
}
