/// `SQLite` connection and table creation for the database record store
pub mod database;

/// Server settings from defaults, `showroom.toml` and the environment
pub mod server;

pub use server::{ServerConfig, StoreBackend, load_server_config};
