// Configuration validation
//
// Validates that required fields are present and values are sensible

use super::*;
use anyhow::{bail, Result};
use std::net::SocketAddr;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_request_config(&config.request)?;
    validate_storage_config(&config.storage)?;
    validate_query_config(&config.query)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.listen_addr.parse::<SocketAddr>().is_err() {
        bail!(
            "Invalid listen address '{}'\n\n\
            How to fix:\n\
              • Environment: export {}LISTEN_ADDR=0.0.0.0:4318\n\
              • TOML: [server]\n              listen_addr = \"0.0.0.0:4318\"\n\
              • CLI: --port 4318",
            config.listen_addr,
            ENV_PREFIX
        );
    }

    if config.log_level.trim().is_empty() {
        bail!(
            "server.log_level must not be empty\n\n\
            How to fix:\n\
              • Environment: export {}LOG_LEVEL=info",
            ENV_PREFIX
        );
    }

    Ok(())
}

fn validate_request_config(config: &RequestConfig) -> Result<()> {
    if config.max_payload_bytes == 0 {
        bail!("request.max_payload_bytes must be greater than 0");
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    match config.backend {
        StorageBackend::Sqlite => {
            if config.sqlite.path.trim().is_empty() {
                bail!(
                    "SQLite database path is required\n\n\
                    How to fix:\n\
                      • Environment: export {}SQLITE_PATH=/data/telemorph.db\n\
                      • TOML: [storage.sqlite]\n              path = \"/data/telemorph.db\"\n\
                      • CLI: --db /data/telemorph.db",
                    ENV_PREFIX
                );
            }

            if config.sqlite.max_connections == 0 {
                bail!("storage.sqlite.max_connections must be greater than 0");
            }
        }
        StorageBackend::Memory => {}
    }

    Ok(())
}

fn validate_query_config(config: &QueryConfig) -> Result<()> {
    if config.default_limit == 0 {
        bail!("query.default_limit must be greater than 0");
    }

    if config.max_limit < config.default_limit {
        bail!(
            "query.max_limit ({}) must be at least query.default_limit ({})",
            config.max_limit,
            config.default_limit
        );
    }

    Ok(())
}
