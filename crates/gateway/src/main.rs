use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use concierge_domain::config::{Config, CorsConfig};
use concierge_gateway::api;
use concierge_gateway::state::AppState;
use concierge_generator::EchoGenerator;
use concierge_sessions::SessionManager;
use concierge_store::{HeuristicMenuExtractor, InMemoryImageStore, InMemorySessionStore};
use sha2::{Digest, Sha256};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

/// Dining concierge gateway: serves the HTTP and realtime surfaces described
/// in the service specification.
#[derive(Parser)]
#[command(version, about)]
struct Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();

    init_tracing();
    let config = Config::load().context("loading configuration")?;
    run_server(Arc::new(config)).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,concierge_gateway=debug")))
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("concierge gateway starting");

    let store: Arc<dyn concierge_store::SessionStore> = Arc::new(InMemorySessionStore::new());
    let image_store: Arc<dyn concierge_store::ImageStore> = Arc::new(InMemoryImageStore::new());
    let menu_extractor: Arc<dyn concierge_store::MenuExtractor> = Arc::new(HeuristicMenuExtractor::new());
    let generator: Arc<dyn concierge_generator::TextGenerator> = Arc::new(EchoGenerator::new());
    tracing::info!("in-memory store, image store, menu extractor, and echo generator ready");

    let sessions = Arc::new(SessionManager::new(store.clone(), generator, config.gemini_model.clone()));
    tracing::info!(model = %config.gemini_model, "session manager ready");

    let api_token_hash = match &config.server.api_token {
        Some(token) if !token.is_empty() => {
            tracing::info!("API bearer-token auth enabled for mutating routes");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!("API bearer-token auth DISABLED — set CONCIERGE_API_TOKEN to enable");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        sessions,
        store,
        image_store,
        menu_extractor,
        api_token_hash,
        ready: Arc::new(AtomicBool::new(true)),
    };

    let cors_layer = build_cors_layer(&config.server.cors);
    let max_concurrent = config.server.max_concurrent_requests;
    tracing::info!(max_concurrent, "concurrency limit set");

    let app = api::router(state.clone())
        .layer(cors_layer)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "concierge gateway listening");
    axum::serve(listener, app).await.context("axum server error")?;
    Ok(())
}

/// Builds a [`CorsLayer`] from the configured allowed origins. A literal
/// `"*"` entry allows all origins; entries ending in `:*` allow any port on
/// that host/scheme; everything else is matched exactly. Mirrors the
/// teacher's `build_cors_layer`.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    use axum::http::header;

    if cors.allowed_origins.is_empty() || (cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*") {
        tracing::warn!("CORS configured to allow all origins");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(value) = origin.parse::<HeaderValue>() {
            exact.push(value);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
