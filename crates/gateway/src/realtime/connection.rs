//! Per-connection lifecycle: looks up the session, emits `ready`, then
//! alternates reading client frames and dispatching the inbound JSON message
//! language. Ported from `realtime_ws.go`'s `handleRealtimeWS`.
//!
//! The connection is single-owner: one task reads frames and runs session
//! operations, a second task owns the write half exclusively and drains an
//! mpsc channel of outbound frames — mirroring the teacher's
//! `nodes/ws.rs` writer-task split, since the hand-rolled frame writer is
//! not safely shareable across tasks without serialization.

use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::realtime::frame::{self, OP_BINARY, OP_CLOSE, OP_TEXT};
use crate::state::AppState;

enum Outbound {
    Frame(u8, Vec<u8>),
}

#[derive(Deserialize, Default)]
struct InboundMessage {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    data: String,
}

async fn send_json(tx: &mpsc::Sender<Outbound>, value: serde_json::Value) {
    if let Ok(bytes) = serde_json::to_vec(&value) {
        let _ = tx.send(Outbound::Frame(OP_TEXT, bytes)).await;
    }
}

/// Drives one upgraded connection to completion. `session_id` is resolved
/// from the URL path by the caller; the leading path segment used by the
/// `/ws/{user}/{id}` route (`user`, or the literal `"session-client"` for
/// `/v1/sessions/{id}/ws`) is intentionally ignored, matching the original's
/// `handleRealtimeWS(_, sessionID)`.
pub async fn serve<IO>(io: IO, state: AppState, session_id: String)
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(io);
    let (tx, mut rx) = mpsc::channel::<Outbound>(32);

    let writer = tokio::spawn(async move {
        let mut write_half = write_half;
        while let Some(Outbound::Frame(opcode, payload)) = rx.recv().await {
            if frame::write_frame(&mut write_half, opcode, &payload).await.is_err() {
                break;
            }
        }
    });

    if state.sessions.get_session(&session_id).await.is_err() {
        send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "session not found"})).await;
        drop(tx);
        let _ = writer.await;
        return;
    }

    send_json(&tx, serde_json::json!({"type": "ready"})).await;

    let mut reader = BufReader::new(read_half);
    loop {
        let (opcode, payload) = match frame::read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(_) => break,
        };

        match opcode {
            OP_BINARY => {
                send_json(&tx, serde_json::json!({"type": "audio_ack", "inputMimeType": "audio/pcm"})).await;
                continue;
            }
            OP_CLOSE => {
                let _ = tx
                    .send(Outbound::Frame(OP_CLOSE, frame::close_payload(1000, "session closed")))
                    .await;
                break;
            }
            OP_TEXT => {}
            _ => {
                send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "unsupported websocket opcode"})).await;
                continue;
            }
        }

        let message: InboundMessage = match serde_json::from_slice(&payload) {
            Ok(m) => m,
            Err(_) => {
                send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "invalid JSON message"})).await;
                continue;
            }
        };

        match message.kind.as_str() {
            "text" => match state.sessions.send_message(CancellationToken::new(), &session_id, &message.text).await {
                Ok(reply) => {
                    send_json(&tx, serde_json::json!({
                        "type": "event",
                        "author": "assistant",
                        "text": reply,
                        "turnComplete": true,
                    }))
                    .await;
                }
                Err(err) => {
                    send_json(&tx, serde_json::json!({"type": "error", "errorMessage": err.to_string()})).await;
                }
            },
            "audio" => {
                if message.data.is_empty() {
                    send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "audio data is required"})).await;
                } else if base64_decode(&message.data).is_err() {
                    send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "invalid base64 audio payload"})).await;
                } else {
                    send_json(&tx, serde_json::json!({"type": "audio_ack", "inputMimeType": "audio/pcm"})).await;
                }
            }
            "image" => {
                if message.data.is_empty() {
                    send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "image data is required"})).await;
                } else if base64_decode(&message.data).is_err() {
                    send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "invalid base64 image payload"})).await;
                } else {
                    send_json(&tx, serde_json::json!({"type": "image_ack"})).await;
                }
            }
            "activity_start" => {
                if !state.config.enable_manual_activity_signals {
                    send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "activity_start ignored: manual activity signals disabled"})).await;
                } else {
                    send_json(&tx, serde_json::json!({"type": "activity_start_ack"})).await;
                }
            }
            "activity_end" => {
                if !state.config.enable_manual_activity_signals {
                    send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "activity_end ignored: manual activity signals disabled"})).await;
                } else {
                    send_json(&tx, serde_json::json!({"type": "activity_end_ack", "turnComplete": true})).await;
                }
            }
            "close" => {
                let _ = tx
                    .send(Outbound::Frame(OP_CLOSE, frame::close_payload(1000, "session closed")))
                    .await;
                break;
            }
            _ => {
                send_json(&tx, serde_json::json!({"type": "error", "errorMessage": "unsupported websocket message type"})).await;
            }
        }
    }

    drop(tx);
    let _ = writer.await;
}

fn base64_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    BASE64.decode(data.as_bytes())
}
