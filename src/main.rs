use showroom::{
    api,
    config::{self, StoreBackend},
    errors::Result,
    store::{AnyStore, FileStore, SqliteStore},
};

use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Resolve server configuration (TOML file, then environment)
    let server_config = config::load_server_config()
        .inspect_err(|e| error!("Critical error loading server configuration: {}", e))?;

    // 4. Make sure the upload root exists before it is served
    tokio::fs::create_dir_all(&server_config.uploads_dir)
        .await
        .inspect_err(|e| error!("Failed to create {:?}: {}", server_config.uploads_dir, e))?;

    // 5. Open the record store
    let store = match &server_config.store {
        StoreBackend::File => AnyStore::File(FileStore::new(
            &server_config.uploads_dir,
            &server_config.data_dir,
        )),
        StoreBackend::Sqlite { url } => AnyStore::Sqlite(
            SqliteStore::connect(url)
                .await
                .inspect(|_| info!("Database initialized successfully."))
                .inspect_err(|e| error!("Failed to initialize database: {}", e))?,
        ),
    };

    // 6. Run the server until Ctrl-C
    api::serve(server_config, store)
        .await
        .inspect_err(|e| error!("Server stopped with an error: {}", e))
}
