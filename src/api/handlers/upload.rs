//! Upload endpoints.
//!
//! The multipart stream is read to the end before anything is validated, so
//! a rejected request never creates a directory.

use crate::{
    api::AppState,
    core::upload::{self, StoredUpload, UploadForm, UploadKind},
    errors::{Error, Result},
    models::{ProductUploadResponse, UploadResponse},
};
use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::{debug, warn};

const UPLOADED: &str = "Files uploaded successfully";

/// Drains `multipart` into an [`UploadForm`].
///
/// # Errors
/// Returns `Error::Multipart` when the stream is malformed or exceeds the
/// body limit, or `Error::InvalidUpload` for an unusable filename.
pub async fn read_form(kind: UploadKind, mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::new(kind);
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Multipart(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::Multipart(e.body_text()))?;
            debug!("Received '{}' ({} bytes) in field '{}'", file_name, data.len(), name);
            form.push_file(&name, &file_name, data.to_vec())?;
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| Error::Multipart(e.body_text()))?;
            form.push_text(&name, value);
        }
    }
    Ok(form)
}

async fn accept(state: &AppState, kind: UploadKind, multipart: Multipart) -> Result<StoredUpload> {
    let form = read_form(kind, multipart).await?;
    let plan = form
        .into_plan(state.config.max_textures)
        .inspect_err(|e| warn!("Rejected {:?} upload: {}", kind, e))?;
    upload::store_upload(&state.store, &state.config.uploads_dir, plan).await
}

fn upload_response(stored: StoredUpload) -> UploadResponse {
    UploadResponse {
        message: UPLOADED.to_string(),
        gltf_file: stored.info.gltf_file,
        bin_file: stored.info.bin_file,
        texture_files: stored.info.textures,
    }
}

/// `POST /upload` - a single model (`gltf`, `bin`, `textures`, optional `name`).
pub async fn upload_model(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let stored = accept(&state, UploadKind::Model, multipart).await?;
    Ok(Json(upload_response(stored)))
}

/// `POST /upload-shop` - the shop scene (`shop`, `shopBin`, `shopTextures`).
pub async fn upload_shop(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let stored = accept(&state, UploadKind::Shop, multipart).await?;
    Ok(Json(upload_response(stored)))
}

/// `POST /upload-product` - a named product (`product`, `productBin`,
/// `productTextures`, `productName`).
pub async fn upload_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProductUploadResponse>> {
    let stored = accept(&state, UploadKind::Product, multipart).await?;
    let product = stored.product.ok_or_else(|| Error::Server {
        message: format!("product '{}' was stored but not registered", stored.entity),
    })?;
    Ok(Json(ProductUploadResponse {
        message: "Product uploaded successfully".to_string(),
        product,
    }))
}
