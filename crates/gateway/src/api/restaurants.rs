//! Restaurant-scoped menu routes: tag enrichment and image-based extraction.
//! Grounded in
//! `original_source/backend/internal/handler/http/handler.go`'s
//! `handleRestaurantRoutes`.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use concierge_domain::{Error, MenuItem};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuTagsRequest {
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuTagsResponse {
    pub menu_items: Vec<MenuItem>,
    pub note: String,
}

/// `POST /v1/restaurants/{id}/menu-tags`.
pub async fn menu_tags(
    State(state): State<AppState>,
    Path(restaurant_id): Path<String>,
    Json(req): Json<MenuTagsRequest>,
) -> Response {
    let mut items = req.menu_items;
    concierge_menu::enrich_all(&mut items);

    if let Err(err) = state.store.save_menu_safety_metadata(&restaurant_id, items.clone()).await {
        return err.into_response();
    }

    Json(MenuTagsResponse {
        menu_items: items,
        note: "Tags were auto-suggested to simplify allergy/diet filters for business owners.".to_string(),
    })
    .into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuExtractionRequest {
    pub file_name: String,
    pub base64: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuExtractionResponse {
    pub image_path: String,
    pub menu_items: Vec<MenuItem>,
    pub note: String,
}

/// `POST /v1/restaurants/{id}/menu-extraction`. Saves the uploaded image
/// keyed by `restaurantId` (not a session id), matching
/// `ConciergeApp.ExtractMenuFromImage`'s original behavior.
pub async fn menu_extraction(
    State(state): State<AppState>,
    Path(restaurant_id): Path<String>,
    Json(req): Json<MenuExtractionRequest>,
) -> Response {
    let content = match BASE64.decode(req.base64.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => return Error::InvalidInput("invalid base64 image".to_string()).into_response(),
    };

    let image_path = match state
        .image_store
        .save_session_image(&restaurant_id, &req.file_name, &content)
        .await
    {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };

    let mut items = match state.menu_extractor.extract_menu_items(&content).await {
        Ok(items) => items,
        Err(err) => return err.into_response(),
    };
    concierge_menu::enrich_all(&mut items);

    if let Err(err) = state.store.save_menu_safety_metadata(&restaurant_id, items.clone()).await {
        return err.into_response();
    }

    Json(MenuExtractionResponse {
        image_path,
        menu_items: items,
        note: "Vision extraction is optional for onboarding; for live interaction, use text/audio session APIs.".to_string(),
    })
    .into_response()
}
