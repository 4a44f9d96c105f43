pub mod auth;
pub mod health;
pub mod restaurants;
pub mod sessions;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::realtime;
use crate::state::AppState;

/// Builds the full HTTP + realtime router, all routes from spec.md §4.6
/// plus the ambient additions SPEC_FULL.md §4.6 carries regardless of the
/// spec's Non-goals. Mirrors the teacher's `api::router` shape: a single
/// router with the bearer-token middleware applied via `route_layer`.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/readyz", get(health::readyz))
        .route("/v1/restaurants/:id/voice-config", get(health::voice_config))
        .route("/v1/sessions", post(sessions::start_session))
        .route("/v1/sessions/:id", get(sessions::get_session))
        .route("/v1/sessions/:id", delete(sessions::end_session))
        .route("/v1/sessions/:id/messages", post(sessions::send_message))
        .route("/v1/sessions/:id/interrupt", post(sessions::interrupt))
        .route("/v1/sessions/:id/stream", get(sessions::stream_session))
        .route("/v1/sessions/:id/ws", get(realtime::ws_session))
        .route("/ws/:user/:id", get(realtime::ws_user_session))
        .route("/v1/restaurants/:id/menu-tags", post(restaurants::menu_tags))
        .route("/v1/restaurants/:id/menu-extraction", post(restaurants::menu_extraction))
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_token_for_mutations))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
