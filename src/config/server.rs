//! Server configuration loading.
//!
//! Settings come from three layers, later layers winning: built-in defaults,
//! an optional TOML file (`showroom.toml` or the path in `SHOWROOM_CONFIG`),
//! and `SHOWROOM_*` environment variables. `DATABASE_URL` switches the
//! record store from flat JSON files to `SQLite`.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{
    env,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default location of the optional TOML file.
pub const DEFAULT_CONFIG_PATH: &str = "showroom.toml";
/// Default cap on texture files per upload.
pub const DEFAULT_MAX_TEXTURES: usize = 10;
/// Default request body cap for uploads (256 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Where registry and config records are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// `info.json` sidecars plus `products.json` / `meshConfig.json`
    File,
    /// A `SQLite` database reached through `SeaORM`
    Sqlite {
        /// Connection URL, e.g. `sqlite://data/showroom.sqlite?mode=rwc`
        url: String,
    },
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address
    pub host: IpAddr,
    /// Bind port
    pub port: u16,
    /// Root of the per-entity upload directories, served under `/uploads`
    pub uploads_dir: PathBuf,
    /// Directory holding `products.json` and `meshConfig.json`
    pub data_dir: PathBuf,
    /// Texture files accepted per upload
    pub max_textures: usize,
    /// Request body cap for upload endpoints
    pub max_upload_bytes: usize,
    /// Record store selection
    pub store: StoreBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            uploads_dir: PathBuf::from("uploads"),
            data_dir: PathBuf::from("."),
            max_textures: DEFAULT_MAX_TEXTURES,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            store: StoreBackend::File,
        }
    }
}

impl ServerConfig {
    /// The socket address to bind.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// A config rooted in `root`, for tests and embedded use.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            uploads_dir: root.join("uploads"),
            data_dir: root.to_path_buf(),
            ..Self::default()
        }
    }
}

/// The TOML file layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Bind address
    pub host: Option<String>,
    /// Bind port
    pub port: Option<u16>,
    /// Upload root
    pub uploads_dir: Option<PathBuf>,
    /// JSON record directory
    pub data_dir: Option<PathBuf>,
    /// Texture cap
    pub max_textures: Option<usize>,
    /// Body cap in bytes
    pub max_upload_bytes: Option<usize>,
    /// `SQLite` URL; selects the database store when present
    pub database_url: Option<String>,
}

/// Parses TOML text into a [`FileConfig`].
///
/// # Errors
/// Returns `Error::Config` when the TOML is malformed or has unknown keys.
pub fn parse_file_config(contents: &str) -> Result<FileConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Reads the TOML file at `path`; a missing file yields an empty layer.
///
/// # Errors
/// Returns `Error::Config` when the file exists but cannot be read or parsed.
pub fn load_file_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    match std::fs::read_to_string(path_ref) {
        Ok(contents) => parse_file_config(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {:?}, using defaults", path_ref);
            Ok(FileConfig::default())
        }
        Err(e) => Err(Error::Config {
            message: format!("Failed to read config file {path_ref:?}: {e}"),
        }),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| Error::Config {
        message: format!("Invalid value for {key} ('{value}'): {e}"),
    })
}

/// Folds the file layer and an environment lookup over the defaults.
///
/// `lookup` is injected so tests never touch the process environment.
///
/// # Errors
/// Returns `Error::Config` for unparsable values or a zero body cap.
pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ServerConfig::default();

    if let Some(host) = file.host {
        config.host = parse_value("host", &host)?;
    }
    if let Some(port) = file.port {
        config.port = port;
    }
    if let Some(dir) = file.uploads_dir {
        config.uploads_dir = dir;
    }
    if let Some(dir) = file.data_dir {
        config.data_dir = dir;
    }
    if let Some(max) = file.max_textures {
        config.max_textures = max;
    }
    if let Some(max) = file.max_upload_bytes {
        config.max_upload_bytes = max;
    }
    if let Some(url) = file.database_url {
        config.store = StoreBackend::Sqlite { url };
    }

    if let Some(host) = lookup("SHOWROOM_HOST") {
        config.host = parse_value("SHOWROOM_HOST", &host)?;
    }
    if let Some(port) = lookup("SHOWROOM_PORT") {
        config.port = parse_value("SHOWROOM_PORT", &port)?;
    }
    if let Some(dir) = lookup("SHOWROOM_UPLOADS_DIR") {
        config.uploads_dir = PathBuf::from(dir);
    }
    if let Some(dir) = lookup("SHOWROOM_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(max) = lookup("SHOWROOM_MAX_TEXTURES") {
        config.max_textures = parse_value("SHOWROOM_MAX_TEXTURES", &max)?;
    }
    if let Some(max) = lookup("SHOWROOM_MAX_UPLOAD_BYTES") {
        config.max_upload_bytes = parse_value("SHOWROOM_MAX_UPLOAD_BYTES", &max)?;
    }
    if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()) {
        config.store = StoreBackend::Sqlite { url };
    }

    if config.max_upload_bytes == 0 {
        return Err(Error::Config {
            message: "max_upload_bytes must be greater than zero".to_string(),
        });
    }

    Ok(config)
}

/// Loads the server configuration from the TOML file and process environment.
///
/// Call after `dotenvy::dotenv()` so `.env` values are visible.
///
/// # Errors
/// Returns `Error::Config` when any layer is invalid.
pub fn load_server_config() -> Result<ServerConfig> {
    let path = env::var("SHOWROOM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let file = load_file_config(&path)?;
    let config = resolve(file, |key| env::var(key).ok())?;
    tracing::info!(
        addr = %config.bind_addr(),
        uploads = ?config.uploads_dir,
        store = ?config.store,
        "Server configuration loaded"
    );
    Ok(config)
}
