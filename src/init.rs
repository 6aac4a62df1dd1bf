// Initialization utilities for server mode
//
// Storage backend and logging/tracing setup

use crate::config::{LogFormat, RuntimeConfig, StorageBackend};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use telemorph_storage::{MemoryStore, SqliteStore, TelemetryStore};
use tracing::{info, warn};

/// Initialize the storage port from RuntimeConfig
pub async fn init_store(config: &RuntimeConfig) -> Result<Arc<dyn TelemetryStore>> {
    info!(
        "Initializing store with storage backend: {}",
        config.storage.backend
    );

    match config.storage.backend {
        StorageBackend::Sqlite => {
            let sqlite = &config.storage.sqlite;
            info!("Using SQLite storage at: {}", sqlite.path);

            if let Some(parent) = Path::new(&sqlite.path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {}", parent.display())
                    })?;
                }
            }

            let store = SqliteStore::connect(&sqlite.to_options())
                .await
                .with_context(|| format!("Failed to open SQLite database: {}", sqlite.path))?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Initialize tracing/logging from RuntimeConfig
pub fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Parse log level from config
    let env_filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.server.log_format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}
