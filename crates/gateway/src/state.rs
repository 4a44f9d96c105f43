use std::sync::Arc;

use concierge_domain::config::Config;
use concierge_sessions::SessionManager;
use concierge_store::{ImageStore, MenuExtractor, SessionStore};

/// Shared application state passed to every handler. Grouped by concern,
/// mirroring the teacher's `AppState` (`crates/gateway/src/state.rs`).
#[derive(Clone)]
pub struct AppState {
    // ── Core services ──────────────────────────────────────────────
    pub config: Arc<Config>,

    // ── Session management (C4) ───────────────────────────────────
    pub sessions: Arc<SessionManager>,

    // ── External collaborators ────────────────────────────────────
    pub store: Arc<dyn SessionStore>,
    pub image_store: Arc<dyn ImageStore>,
    pub menu_extractor: Arc<dyn MenuExtractor>,

    // ── Security (startup-computed) ───────────────────────────────
    /// SHA-256 hash of the API bearer token. `None` = dev mode, no auth
    /// enforced on mutating routes.
    pub api_token_hash: Option<Vec<u8>>,

    /// Set once the persistence store is constructed; backs `GET /v1/readyz`.
    pub ready: Arc<std::sync::atomic::AtomicBool>,
}
