//! Core business logic - framework-agnostic upload, registry and config operations.
//!
//! Every function takes a [`KeyValueStore`](crate::store::KeyValueStore) so the
//! HTTP layer and the tests can run the same code against either backend.

/// Mesh action config persistence
pub mod config_store;
/// Upload sidecars and the product registry
pub mod registry;
/// Multipart form resolution and file storage
pub mod upload;
