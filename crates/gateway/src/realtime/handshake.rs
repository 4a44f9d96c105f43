//! Raw HTTP-Upgrade handshake: header validation plus the standard
//! GUID-based `Sec-WebSocket-Accept` derivation (SHA-1, base64). Ported from
//! `original_source/.../realtime_ws.go`'s `upgradeToWebSocket`.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha1::{Digest, Sha1};

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Validates the `Upgrade`/`Connection`/`Sec-WebSocket-Key` headers a
/// conforming client must send, returning the trimmed key on success.
pub fn validate_upgrade_headers(headers: &HeaderMap) -> Result<String, &'static str> {
    let upgrade_ok = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    if !upgrade_ok {
        return Err("missing websocket upgrade header");
    }

    let connection_ok = headers
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase().contains("upgrade"))
        .unwrap_or(false);
    if !connection_ok {
        return Err("missing connection upgrade header");
    }

    headers
        .get("sec-websocket-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or("missing Sec-WebSocket-Key")
}

/// `base64(sha1(key + wsGUID))`.
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}
