//! Mesh action config - which hover and click actions each mesh carries.
//!
//! The config is one mapping replaced wholesale on each save. Mesh names are
//! whatever the authoring tool wrote into the GLTF; names that match no mesh
//! in the current scene are kept as-is.

use crate::{
    errors::{Error, Result},
    models::{MeshAction, MeshActionConfig},
    store::{KeyValueStore, Namespace},
};
use tracing::{info, warn};

/// Replaces the stored config with `config`.
///
/// Returns the number of mesh entries written. Entries for meshes that no
/// current scene contains are stored like any other.
///
/// # Errors
/// Returns `Error::EmptyConfig` for an empty mapping (nothing is written), or
/// a store error.
pub async fn save_config<S: KeyValueStore>(store: &S, config: MeshActionConfig) -> Result<usize> {
    if config.is_empty() {
        return Err(Error::EmptyConfig);
    }

    let count = config.len();
    let records = config
        .into_iter()
        .map(|(mesh, action)| Ok((mesh, serde_json::to_value(action)?)))
        .collect::<Result<Vec<_>>>()?;

    store.replace(Namespace::MeshConfig, records).await?;
    info!("Saved mesh config with {} entries", count);
    Ok(count)
}

/// The stored config, or an empty mapping when nothing was saved yet.
///
/// Entries whose stored action cannot be decoded are skipped with a
/// `warn!` log, so one bad record never hides the rest.
///
/// # Errors
/// Returns an error if the store cannot be listed.
pub async fn get_config<S: KeyValueStore>(store: &S) -> Result<MeshActionConfig> {
    Ok(store
        .list(Namespace::MeshConfig)
        .await?
        .into_iter()
        .filter_map(|(mesh, value)| match serde_json::from_value::<MeshAction>(value) {
            Ok(action) => Some((mesh, action)),
            Err(e) => {
                warn!("Skipping malformed action for mesh '{}': {}", mesh, e);
                None
            }
        })
        .collect())
}
