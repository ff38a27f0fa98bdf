//! HTTP layer - routes, handlers and the shared application state.
//!
//! Handlers stay thin: they decode the request, call into `core`, and let
//! [`Error`](crate::errors::Error) turn failures into JSON responses.

/// Error to HTTP response mapping
pub mod error;
/// Endpoint handlers grouped by area
pub mod handlers;
/// Router assembly and the server loop
pub mod router;

use crate::{config::ServerConfig, store::AnyStore};
use std::sync::Arc;

pub use router::{router, serve};

/// Shared data available to every handler.
/// Holds the record store and the resolved configuration.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Record store for registry and config operations
    pub store: AnyStore,
    /// Server settings (upload root, limits)
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Creates the state handed to the router.
    #[must_use]
    pub fn new(store: AnyStore, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
