//! Record store abstraction.
//!
//! Every persisted record goes through [`KeyValueStore`]: `get`, `put`,
//! `list` and `replace` over JSON values grouped by [`Namespace`]. The
//! business logic in `core` only sees the trait, so the flat-file backend
//! and the `SQLite` backend are interchangeable.

use crate::errors::Result;
use serde_json::Value;
use std::future::Future;

pub mod file;
pub mod sqlite;

pub use file::FileStore;
pub use sqlite::SqliteStore;

/// Logical groups of records.
///
/// Each namespace maps onto one file layout in [`FileStore`] and onto one
/// `namespace` value in the `records` table of [`SqliteStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Per-entity upload sidecars (`ModelInfo`), keyed by entity name
    Models,
    /// Placed products (`ModelEntry`), keyed by product name
    Products,
    /// Mesh actions (`MeshAction`), keyed by mesh name
    MeshConfig,
}

impl Namespace {
    /// Stable identifier used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Models => "models",
            Self::Products => "products",
            Self::MeshConfig => "meshConfig",
        }
    }
}

/// Narrow key-value interface over JSON records.
///
/// Listings return records in insertion order; `put` on an existing key
/// keeps its place. There is no locking: concurrent writers race and the
/// last write wins.
pub trait KeyValueStore: Send + Sync {
    /// Fetches one record, `None` when absent.
    ///
    /// # Errors
    /// Returns `Error::InvalidName` for a key that cannot name an upload
    /// directory (`Models` on the file backend), `Error::Serialization` when
    /// a stored record cannot be decoded, and I/O or database errors.
    fn get(
        &self,
        namespace: Namespace,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Inserts or overwrites one record.
    ///
    /// A new key goes to the end of the namespace; an existing key keeps
    /// its place and takes the new value.
    ///
    /// # Errors
    /// Returns `Error::InvalidName` for an unusable `Models` key and I/O or
    /// database errors when the write fails.
    fn put(
        &self,
        namespace: Namespace,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<()>> + Send;

    /// All records of a namespace in insertion order.
    ///
    /// Records that cannot be decoded are skipped and logged with `warn!`,
    /// never returned as errors.
    ///
    /// # Errors
    /// Returns an error only when the backing storage cannot be read.
    fn list(
        &self,
        namespace: Namespace,
    ) -> impl Future<Output = Result<Vec<(String, Value)>>> + Send;

    /// Replaces the whole namespace with `records`, in the given order.
    ///
    /// Keys absent from `records` are dropped, except for `Models` on the
    /// file backend: sidecars live inside upload directories, which are
    /// never deleted, so there the given sidecars are written and the rest
    /// stay.
    ///
    /// # Errors
    /// Returns an error when any write fails. The `SQLite` backend rolls the
    /// whole replacement back; the file backend writes documents in one go.
    fn replace(
        &self,
        namespace: Namespace,
        records: Vec<(String, Value)>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// The store picked at startup from `StoreBackend`.
///
/// Handlers hold this enum in `AppState` so the router does not need to be
/// generic over the backend; every method forwards to the wrapped store.
#[derive(Debug, Clone)]
pub enum AnyStore {
    /// Flat JSON files
    File(FileStore),
    /// `SQLite` through `SeaORM`
    Sqlite(SqliteStore),
}

impl KeyValueStore for AnyStore {
    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Value>> {
        match self {
            Self::File(store) => store.get(namespace, key).await,
            Self::Sqlite(store) => store.get(namespace, key).await,
        }
    }

    async fn put(&self, namespace: Namespace, key: &str, value: Value) -> Result<()> {
        match self {
            Self::File(store) => store.put(namespace, key, value).await,
            Self::Sqlite(store) => store.put(namespace, key, value).await,
        }
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<(String, Value)>> {
        match self {
            Self::File(store) => store.list(namespace).await,
            Self::Sqlite(store) => store.list(namespace).await,
        }
    }

    async fn replace(&self, namespace: Namespace, records: Vec<(String, Value)>) -> Result<()> {
        match self {
            Self::File(store) => store.replace(namespace, records).await,
            Self::Sqlite(store) => store.replace(namespace, records).await,
        }
    }
}
