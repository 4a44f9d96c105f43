use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// The error taxonomy shared across every crate boundary: `InvalidInput`,
/// `SessionNotFound`, `Cancelled`, `StoreError`, `GeneratorError`, and
/// `ProtocolError` (realtime channel only).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Observed by the turn pipeline via the cancellation token. Never meant
    /// to reach a caller as an HTTP error — the session manager converts
    /// this into the fixed interrupted-reply string before it escapes.
    #[error("cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    StoreError(String),

    #[error("generator error: {0}")]
    GeneratorError(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Default REST mapping. `SessionNotFound` normalizes to `404` everywhere;
/// callers that need the message-endpoint `400` the spec also permits should
/// match on `Error` directly before falling back to this impl.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
            Error::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::GeneratorError(_) => StatusCode::BAD_REQUEST,
            Error::ProtocolError(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
