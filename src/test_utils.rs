//! Shared test utilities for the showroom crate.
//!
//! Helpers for setting up throwaway stores and routers and for building
//! records and multipart bodies with sensible defaults.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::{
    api::{AppState, router},
    config::ServerConfig,
    errors::Result,
    models::{MeshAction, MeshActionConfig, ModelEntry, ModelInfo, Vec3Triple},
    store::{AnyStore, FileStore, SqliteStore},
};
use axum::Router;
use tempfile::TempDir;

/// Boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "showroom-test-boundary";

/// A file store rooted in a fresh temporary directory.
/// Uploads land in `<tmp>/uploads`, documents in `<tmp>`.
/// Keep the `TempDir` alive for the duration of the test.
pub fn setup_file_store() -> (TempDir, FileStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = FileStore::new(dir.path().join("uploads"), dir.path());
    (dir, store)
}

/// An in-memory `SQLite` store with its table created.
/// This is the standard setup for database-backed tests.
pub async fn setup_sqlite_store() -> Result<SqliteStore> {
    SqliteStore::connect("sqlite::memory:").await
}

/// A router over a file store in a fresh temporary directory.
pub fn setup_test_app() -> (TempDir, Router) {
    let (dir, store) = setup_file_store();
    let config = ServerConfig::rooted_at(dir.path());
    let app = router(AppState::new(AnyStore::File(store), config));
    (dir, app)
}

/// The filenames of the canonical `chair` upload.
pub fn chair_info() -> ModelInfo {
    ModelInfo {
        gltf_file: "chair.gltf".to_string(),
        bin_file: "chair.bin".to_string(),
        textures: vec!["wood_baseColor.png".to_string()],
    }
}

/// A product entry named `name` at `position` with unit scale.
pub fn test_entry(name: &str, position: Vec3Triple) -> ModelEntry {
    ModelEntry {
        name: name.to_string(),
        gltf_file: format!("{name}.gltf"),
        bin_file: format!("{name}.bin"),
        texture_files: vec![format!("{name}_baseColor.png")],
        position,
        scale: Vec3Triple::ONE,
        table_number: None,
    }
}

/// A two-mesh action config.
pub fn sample_config() -> MeshActionConfig {
    let mut config = MeshActionConfig::new();
    config.insert(
        "Chair_Seat".to_string(),
        MeshAction {
            hover: Some("highlight".to_string()),
            click: Some("Add to cart".to_string()),
        },
    );
    config.insert(
        "Chair_Leg".to_string(),
        MeshAction {
            hover: Some("highlight".to_string()),
            click: None,
        },
    );
    config
}

/// One multipart part.
#[derive(Debug, Clone, Copy)]
pub struct Part<'a> {
    /// Field name
    pub name: &'a str,
    /// Filename, for file parts
    pub file_name: Option<&'a str>,
    /// Part body
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    /// A plain text field.
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            data: value.as_bytes(),
        }
    }

    /// A file field.
    pub const fn file(name: &'a str, file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            data,
        }
    }
}

/// Encodes `parts` as `multipart/form-data`.
/// Returns the `Content-Type` header value and the body.
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match part.file_name {
            Some(file_name) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                part.name, file_name
            ),
            None => format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                part.name
            ),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
