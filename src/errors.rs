//! Unified error type for the showroom server and viewer client.

use thiserror::Error;

/// Every failure the crate can report.
///
/// Variants are grouped by who caused them: client input (`MissingUpload`,
/// `InvalidName`, `InvalidUpload`, `InvalidLayout`, `EmptyConfig`,
/// `InvalidBody`, `Multipart`), lookups (`NotFound`) and everything the server itself
/// failed at. The HTTP layer maps the groups to 400, 404 and 500.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// A required multipart part was absent
    #[error("{message}")]
    MissingUpload {
        /// Human-readable description of the missing parts
        message: String,
    },

    /// An entity name failed validation
    #[error("Invalid name '{name}': {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Which rule it broke
        reason: String,
    },

    /// An uploaded file or form field was unusable
    #[error("Invalid upload: {message}")]
    InvalidUpload {
        /// Description of the problem
        message: String,
    },

    /// A layout save contained an unusable entry
    #[error("Invalid layout: {message}")]
    InvalidLayout {
        /// Description of the problem
        message: String,
    },

    /// A config save carried no mesh entries
    #[error("Invalid configuration data")]
    EmptyConfig,

    /// A JSON request body could not be decoded
    #[error("Invalid request body: {message}")]
    InvalidBody {
        /// Decoder message
        message: String,
    },

    /// The requested record or files do not exist
    #[error("{message}")]
    NotFound {
        /// What was missing
        message: String,
    },

    /// The multipart stream could not be decoded
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `SeaORM` database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable lookup failure
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Outbound HTTP failure in the viewer client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-success status to the viewer client
    #[error("HTTP error! status: {status}")]
    Status {
        /// Numeric status code
        status: u16,
    },

    /// The HTTP server failed to bind or run
    #[error("Server error: {message}")]
    Server {
        /// Description of the failure
        message: String,
    },
}

impl Error {
    /// True for errors caused by the request rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingUpload { .. }
                | Self::InvalidName { .. }
                | Self::InvalidUpload { .. }
                | Self::InvalidLayout { .. }
                | Self::EmptyConfig
                | Self::InvalidBody { .. }
                | Self::Multipart(_)
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
