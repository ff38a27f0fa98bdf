//! Endpoint handlers organized by area.

/// `/save-config` and `/get-config`
pub mod config;
/// `/model-info`, `/shop-model`, `/products`, `/save-layout`
pub mod registry;
/// `/upload`, `/upload-shop`, `/upload-product`
pub mod upload;

use axum::Json;
use serde_json::{Value, json};

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
