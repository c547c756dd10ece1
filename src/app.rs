use std::sync::{Arc, Mutex};

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::IngestionUseCase;
use crate::domain::dataset::IngestConfig;
use crate::domain::error::{AppError, Result};
use crate::interfaces::http::start_server;

/// `RUST_LOG` wins when set, otherwise `info`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Serve the HTTP surface until the server stops
pub async fn serve(config: IngestConfig, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.http_bind.clone());
    let ingestion = Arc::new(IngestionUseCase::new(config)?);
    let logs = Arc::new(Mutex::new(Vec::new()));

    let server = start_server(ingestion, logs, &bind)
        .map_err(|e| AppError::IoError(format!("Failed to bind {}: {}", bind, e)))?;
    server.await?;

    info!("HTTP server stopped");
    Ok(())
}
