//! Flat-file JSON backend.
//!
//! Layout on disk:
//! - `Models`: one sidecar per entity at `<uploads>/<entity>/info.json`
//! - `Products`: `<data>/products.json`, a JSON object keyed by name
//! - `MeshConfig`: `<data>/meshConfig.json`, a JSON object keyed by mesh
//!
//! Documents are rewritten whole on every change. Sidecars belong to their
//! upload directories: `replace` on `Models` writes the given sidecars and
//! never removes one, since uploads are never deleted.

use super::{KeyValueStore, Namespace};
use crate::{
    errors::{Error, Result},
    models::EntityName,
};
use serde_json::{Map, Value};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Name of the per-entity sidecar file.
pub const SIDECAR_FILE: &str = "info.json";
/// Products document filename.
pub const PRODUCTS_FILE: &str = "products.json";
/// Mesh config document filename.
pub const MESH_CONFIG_FILE: &str = "meshConfig.json";

/// JSON files under an uploads root and a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    uploads_dir: PathBuf,
    data_dir: PathBuf,
}

impl FileStore {
    /// Creates a store; directories are created lazily on first write.
    #[must_use]
    pub fn new(uploads_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    fn document_path(&self, namespace: Namespace) -> Option<PathBuf> {
        match namespace {
            Namespace::Models => None,
            Namespace::Products => Some(self.data_dir.join(PRODUCTS_FILE)),
            Namespace::MeshConfig => Some(self.data_dir.join(MESH_CONFIG_FILE)),
        }
    }

    fn sidecar_path(&self, key: &str) -> Result<PathBuf> {
        let entity = EntityName::parse_any(key)?;
        Ok(self.uploads_dir.join(entity.as_str()).join(SIDECAR_FILE))
    }

    async fn read_document(path: &Path) -> Result<Map<String, Value>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::Serialization(serde::de::Error::custom(format!(
                "expected a JSON object in {}, found {}",
                path.display(),
                json_kind(&other)
            )))),
        }
    }

    /// Reads a document, treating a malformed one as empty.
    ///
    /// Listings already skip such a file; reads and writes follow suit so
    /// the next write replaces it with a well-formed document instead of
    /// failing the request.
    async fn load_document(path: &Path) -> Result<Map<String, Value>> {
        match Self::read_document(path).await {
            Err(Error::Serialization(e)) => {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                Ok(Map::new())
            }
            other => other,
        }
    }

    async fn write_json(path: &Path, value: &Value) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, bytes).await?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    async fn read_sidecar(path: &Path) -> Result<Option<Value>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_sidecars(&self) -> Result<Vec<(String, Value)>> {
        let mut dir = match tokio::fs::read_dir(&self.uploads_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if EntityName::parse_any(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            let path = self.uploads_dir.join(&name).join(SIDECAR_FILE);
            match Self::read_sidecar(&path).await {
                Ok(Some(value)) => records.push((name, value)),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable sidecar {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Value>> {
        match self.document_path(namespace) {
            Some(path) => Ok(Self::load_document(&path).await?.remove(key)),
            None => Self::read_sidecar(&self.sidecar_path(key)?).await,
        }
    }

    async fn put(&self, namespace: Namespace, key: &str, value: Value) -> Result<()> {
        match self.document_path(namespace) {
            Some(path) => {
                let mut document = Self::load_document(&path).await?;
                document.insert(key.to_string(), value);
                Self::write_json(&path, &Value::Object(document)).await
            }
            None => Self::write_json(&self.sidecar_path(key)?, &value).await,
        }
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<(String, Value)>> {
        match self.document_path(namespace) {
            Some(path) => Ok(Self::load_document(&path).await?.into_iter().collect()),
            None => self.list_sidecars().await,
        }
    }

    async fn replace(&self, namespace: Namespace, records: Vec<(String, Value)>) -> Result<()> {
        match self.document_path(namespace) {
            Some(path) => {
                let document: Map<String, Value> = records.into_iter().collect();
                Self::write_json(&path, &Value::Object(document)).await
            }
            None => {
                for (key, value) in records {
                    Self::write_json(&self.sidecar_path(&key)?, &value).await?;
                }
                Ok(())
            }
        }
    }
}
