use std::sync::Arc;

use tracing::{error, info};

use filecab::file::{FileService, LocalBlobStore, RetryingBlobStore, StagingArea};
use filecab::{Config, Database, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = filecab::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        filecab::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "filecab stopped");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> filecab::Result<()> {
    config.validate()?;

    info!("filecab - multi-user file cabinet");

    let db = Database::open(&config.database.path, config.database.max_connections).await?;

    let store = LocalBlobStore::new(&config.storage.blob_path, &config.storage.public_url)?;
    let retry = config.storage.retry.policy();
    info!(
        blob_path = %config.storage.blob_path,
        max_attempts = retry.max_attempts(),
        "Blob store ready"
    );

    let staging = StagingArea::new(&config.storage.staging_path)?;
    let files = Arc::new(FileService::new(
        db.clone(),
        Arc::new(RetryingBlobStore::new(store, retry)),
        staging,
        config.storage.max_upload_bytes(),
    ));

    let server = WebServer::new(&config.web, &config.storage, db, files)?;
    info!(addr = %server.addr(), "Starting web server");
    server.run().await
}
