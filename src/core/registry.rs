//! Model registry - upload sidecars and the placed-products list.
//!
//! Each uploaded entity has a `ModelInfo` sidecar recording which files were
//! stored for it. Products additionally have a `ModelEntry` carrying their
//! placement, and the full product list is replaced wholesale on every
//! layout save (last writer wins, no merge).

use crate::{
    errors::{Error, Result},
    models::{EntityName, ModelEntry, ModelInfo, ModelListing, has_extension},
    store::{KeyValueStore, Namespace},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{collections::HashSet, io::ErrorKind, path::Path};
use tracing::{debug, info, warn};

/// Subdirectory of an entity directory holding its textures.
pub const TEXTURES_DIR: &str = "textures";

fn decode<T: DeserializeOwned>(namespace: Namespace, key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Skipping malformed {} record '{}': {}", namespace.as_str(), key, e);
            None
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(Into::into)
}

fn files_missing() -> Error {
    Error::NotFound {
        message: "Some model files are missing".to_string(),
    }
}

/// Writes or overwrites the sidecar of `name`.
///
/// The sidecar is the authoritative answer of `model_info` for the entity.
/// A re-upload replaces it whole, so texture lists never accumulate.
///
/// # Errors
/// Returns `Error::InvalidName` if the store rejects the key, or an I/O or
/// database error if the write fails.
pub async fn record_upload<S: KeyValueStore>(
    store: &S,
    name: &EntityName,
    info: &ModelInfo,
) -> Result<()> {
    store
        .put(Namespace::Models, name.as_str(), encode(info)?)
        .await
}

/// Looks up the stored filenames of `name`.
///
/// The sidecar is authoritative. Without a usable one, the entity directory
/// is scanned for the first `.gltf` and `.bin` file and its textures.
///
/// # Errors
/// Returns `Error::NotFound` when the GLTF or BIN file cannot be found, or an
/// I/O or store error.
pub async fn model_info<S: KeyValueStore>(
    store: &S,
    uploads_dir: &Path,
    name: &EntityName,
) -> Result<ModelInfo> {
    let stored = match store.get(Namespace::Models, name.as_str()).await {
        Ok(stored) => stored,
        Err(Error::Serialization(e)) => {
            warn!("Sidecar for '{}' is malformed, rescanning: {}", name, e);
            None
        }
        Err(e) => return Err(e),
    };

    if let Some(info) = stored.and_then(|v| decode::<ModelInfo>(Namespace::Models, name.as_str(), v)) {
        return Ok(info);
    }

    debug!("No sidecar for '{}', scanning its directory", name);
    scan_entity_dir(&uploads_dir.join(name.as_str()))
        .await?
        .ok_or_else(files_missing)
}

async fn sorted_file_names(dir: &Path) -> Result<Option<Vec<String>>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(Some(names))
}

/// Derives a `ModelInfo` from the files present in an entity directory.
///
/// Returns `None` when the directory, its GLTF or its BIN file is missing.
/// Directory order is platform dependent, so names are sorted first.
///
/// # Errors
/// Returns an error if a directory exists but cannot be read.
pub async fn scan_entity_dir(dir: &Path) -> Result<Option<ModelInfo>> {
    let Some(files) = sorted_file_names(dir).await? else {
        return Ok(None);
    };
    let gltf_file = files.iter().find(|f| has_extension(f, "gltf")).cloned();
    let bin_file = files.iter().find(|f| has_extension(f, "bin")).cloned();
    let textures = sorted_file_names(&dir.join(TEXTURES_DIR))
        .await?
        .unwrap_or_default();

    Ok(match (gltf_file, bin_file) {
        (Some(gltf_file), Some(bin_file)) => Some(ModelInfo {
            gltf_file,
            bin_file,
            textures,
        }),
        _ => None,
    })
}

/// Every uploaded entity with a readable sidecar, ordered by name.
///
/// This covers the shop scene, single models and products alike. Entities
/// whose sidecar is missing or malformed are left out; `model_info` can
/// still answer for them by scanning their directory.
///
/// # Errors
/// Returns an error if the store cannot be listed.
pub async fn list_models<S: KeyValueStore>(store: &S) -> Result<Vec<ModelListing>> {
    Ok(store
        .list(Namespace::Models)
        .await?
        .into_iter()
        .filter_map(|(key, value)| {
            let name = EntityName::parse_any(&key).ok()?;
            let info = decode(Namespace::Models, &key, value)?;
            Some(ModelListing {
                name: name.to_string(),
                info,
            })
        })
        .collect())
}

/// Every placed product in registry order, skipping malformed records.
///
/// # Errors
/// Returns an error if the store cannot be listed.
pub async fn list_entries<S: KeyValueStore>(store: &S) -> Result<Vec<ModelEntry>> {
    Ok(store
        .list(Namespace::Products)
        .await?
        .into_iter()
        .filter_map(|(key, value)| decode(Namespace::Products, &key, value))
        .collect())
}

/// Registers a freshly uploaded product.
///
/// A product already registered under the same name keeps its place,
/// position, scale and table, and takes the new filenames. A previous
/// record that cannot be decoded is treated as absent, the same way
/// listings skip it, so the upload still ends up registered.
///
/// # Errors
/// Returns an error if the store read or write fails for any reason other
/// than malformed stored JSON.
pub async fn upsert_product<S: KeyValueStore>(
    store: &S,
    name: &EntityName,
    info: &ModelInfo,
) -> Result<ModelEntry> {
    let mut entry = ModelEntry::new(name, info);
    let existing = match store.get(Namespace::Products, name.as_str()).await {
        Ok(existing) => existing,
        Err(Error::Serialization(e)) => {
            warn!("Previous record for product '{}' is malformed: {}", name, e);
            None
        }
        Err(e) => return Err(e),
    };
    if let Some(previous) =
        existing.and_then(|v| decode::<ModelEntry>(Namespace::Products, name.as_str(), v))
    {
        entry.position = previous.position;
        entry.scale = previous.scale;
        entry.table_number = previous.table_number;
    }

    store
        .put(Namespace::Products, name.as_str(), encode(&entry)?)
        .await?;
    info!("Registered product '{}'", name);
    Ok(entry)
}

/// Checks a layout before it replaces the registry.
///
/// # Errors
/// Returns `Error::InvalidName` for a bad product name and
/// `Error::InvalidLayout` for duplicates, empty filenames or non-finite
/// vectors.
pub fn validate_layout(entries: &[ModelEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        let name = EntityName::parse(&entry.name)?;
        if name.as_str() != entry.name {
            return Err(Error::InvalidLayout {
                message: format!("product name '{}' has surrounding whitespace", entry.name),
            });
        }
        if !seen.insert(name) {
            return Err(Error::InvalidLayout {
                message: format!("product '{}' appears more than once", entry.name),
            });
        }
        if entry.gltf_file.trim().is_empty() || entry.bin_file.trim().is_empty() {
            return Err(Error::InvalidLayout {
                message: format!("product '{}' is missing its GLTF or BIN file", entry.name),
            });
        }
        if !entry.position.is_finite() || !entry.scale.is_finite() {
            return Err(Error::InvalidLayout {
                message: format!("product '{}' has a non-finite position or scale", entry.name),
            });
        }
    }
    Ok(())
}

/// Replaces the whole product registry with `entries`, in order.
///
/// Products missing from `entries` drop out of the registry, but their
/// upload directories stay on disk. Concurrent saves are not merged; the
/// last one wins.
///
/// # Errors
/// - `Error::InvalidName` or `Error::InvalidLayout` from [`validate_layout`];
///   nothing is written in that case
/// - a store error if the replacement fails
pub async fn save_layout<S: KeyValueStore>(store: &S, entries: Vec<ModelEntry>) -> Result<usize> {
    validate_layout(&entries)?;
    let count = entries.len();
    let records = entries
        .into_iter()
        .map(|entry| Ok((entry.name.clone(), encode(&entry)?)))
        .collect::<Result<Vec<_>>>()?;

    store.replace(Namespace::Products, records).await?;
    info!("Saved layout with {} products", count);
    Ok(count)
}
