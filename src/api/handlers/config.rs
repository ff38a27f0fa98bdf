//! Mesh action config endpoints.

use crate::{
    api::AppState,
    core::config_store,
    errors::{Error, Result},
    models::{MeshActionConfig, SaveResponse},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

/// `POST /save-config` - replaces the mesh action config.
///
/// Anything but a non-empty mapping of mesh name to actions is rejected.
pub async fn save_config(
    State(state): State<AppState>,
    payload: std::result::Result<Json<MeshActionConfig>, JsonRejection>,
) -> Result<Json<SaveResponse>> {
    let Json(config) = payload.map_err(|e| Error::InvalidBody {
        message: e.body_text(),
    })?;
    let count = config_store::save_config(&state.store, config).await?;
    Ok(Json(SaveResponse {
        message: "Configuration saved successfully".to_string(),
        count,
    }))
}

/// `GET /get-config` - the mesh action config, `{}` when none was saved.
pub async fn get_config(State(state): State<AppState>) -> Result<Json<MeshActionConfig>> {
    Ok(Json(config_store::get_config(&state.store).await?))
}
