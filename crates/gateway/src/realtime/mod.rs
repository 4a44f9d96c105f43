//! The realtime channel (C5): a raw HTTP-Upgrade handshake followed by a
//! hand-rolled frame codec, reached from both `GET /ws/{user}/{id}` and
//! `GET /v1/sessions/{id}/ws`. Bypasses axum's built-in `WebSocketUpgrade`
//! extractor deliberately — that extractor's `Message` abstraction would
//! silently widen outbound frames past the 7-bit/125-byte basic form this
//! spec requires, and this channel must interoperate bit-exactly with an
//! existing hand-rolled client.

mod connection;
mod frame;
mod handshake;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper_util::rt::TokioIo;

use crate::state::AppState;

/// `GET /ws/{user}/{id}` — the leading segment is accepted but ignored,
/// matching the original's `handleRealtimeWebSocket`.
pub async fn ws_user_session(
    State(state): State<AppState>,
    Path((_user, session_id)): Path<(String, String)>,
    req: Request,
) -> Response {
    upgrade_and_serve(state, session_id, req).await
}

/// `GET /v1/sessions/{id}/ws` — reaches the identical handler, matching
/// spec.md §4.6's "either route reaches C5" requirement.
pub async fn ws_session(State(state): State<AppState>, Path(session_id): Path<String>, req: Request) -> Response {
    upgrade_and_serve(state, session_id, req).await
}

async fn upgrade_and_serve(state: AppState, session_id: String, mut req: Request) -> Response {
    let key = match handshake::validate_upgrade_headers(req.headers()) {
        Ok(key) => key,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    let on_upgrade = match req.extensions_mut().remove::<hyper::upgrade::OnUpgrade>() {
        Some(on_upgrade) => on_upgrade,
        None => return (StatusCode::BAD_REQUEST, "connection not upgradable").into_response(),
    };

    let accept = handshake::accept_key(&key);

    tokio::spawn(async move {
        let upgraded = match on_upgrade.await {
            Ok(upgraded) => upgraded,
            Err(err) => {
                tracing::warn!(error = %err, "realtime upgrade failed");
                return;
            }
        };
        let io = TokioIo::new(upgraded);
        connection::serve(io, state, session_id).await;
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::CONNECTION, "Upgrade")
        .header(header::UPGRADE, "websocket")
        .header("Sec-WebSocket-Accept", accept)
        .body(Body::empty())
        .expect("switching-protocols response is well-formed")
}
