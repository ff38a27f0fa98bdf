//! Registry endpoints - stored filenames, product listing and layout saves.

use crate::{
    api::AppState,
    core::registry,
    errors::{Error, Result},
    models::{
        DEFAULT_MODEL_ENTITY, EntityName, ModelEntry, ModelInfo, ModelListing, SaveResponse,
    },
};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::Deserialize;

/// Query string of `/model-info`.
#[derive(Debug, Default, Deserialize)]
pub struct ModelInfoQuery {
    /// Entity to look up; defaults to the single-model entity
    pub name: Option<String>,
}

/// `GET /model-info[?name=]` - stored filenames of one model.
pub async fn model_info(
    State(state): State<AppState>,
    Query(query): Query<ModelInfoQuery>,
) -> Result<Json<ModelInfo>> {
    let raw = query.name.as_deref().unwrap_or(DEFAULT_MODEL_ENTITY);
    let name = EntityName::parse_any(raw)?;
    let info = registry::model_info(&state.store, &state.config.uploads_dir, &name).await?;
    Ok(Json(info))
}

/// `GET /shop-model` - stored filenames of the shop scene.
pub async fn shop_model(State(state): State<AppState>) -> Result<Json<ModelInfo>> {
    let info =
        registry::model_info(&state.store, &state.config.uploads_dir, &EntityName::shop()).await?;
    Ok(Json(info))
}

/// `GET /models` - every uploaded entity with its stored filenames.
pub async fn models(State(state): State<AppState>) -> Result<Json<Vec<ModelListing>>> {
    Ok(Json(registry::list_models(&state.store).await?))
}

/// `GET /products` - every placed product.
pub async fn products(State(state): State<AppState>) -> Result<Json<Vec<ModelEntry>>> {
    Ok(Json(registry::list_entries(&state.store).await?))
}

/// `POST /save-layout` - replaces the product registry.
pub async fn save_layout(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<ModelEntry>>, JsonRejection>,
) -> Result<Json<SaveResponse>> {
    let Json(entries) = payload.map_err(|e| Error::InvalidBody {
        message: e.body_text(),
    })?;
    let count = registry::save_layout(&state.store, entries).await?;
    Ok(Json(SaveResponse {
        message: "Layout saved successfully".to_string(),
        count,
    }))
}
