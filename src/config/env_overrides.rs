use super::{LogFormat, RuntimeConfig, StorageBackend};
use anyhow::{anyhow, Context, Result};
use telemorph_core::TimestampPolicy;

pub const ENV_PREFIX: &str = "TELEMORPH_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    /// Get a variable by its name without the TELEMORPH_ prefix
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Server configuration (listen addr, log level/format)
    if let Some(addr) = env.get("LISTEN_ADDR") {
        config.server.listen_addr = addr;
    }
    if let Some(level) = env.get("LOG_LEVEL") {
        config.server.log_level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.server.log_format = format
            .parse::<LogFormat>()
            .with_context(|| format!("Invalid {}LOG_FORMAT value", ENV_PREFIX))?;
    }

    // Request configuration
    if let Some(val) = get_env_usize(env, "MAX_PAYLOAD_BYTES")? {
        config.request.max_payload_bytes = val;
    }

    // Storage backend
    if let Some(backend) = env.get("STORAGE_BACKEND") {
        config.storage.backend = backend
            .parse::<StorageBackend>()
            .with_context(|| format!("Invalid {}STORAGE_BACKEND value", ENV_PREFIX))?;
    }
    if let Some(path) = env.get("SQLITE_PATH") {
        config.storage.sqlite.path = path;
    }
    if let Some(val) = get_env_u32(env, "SQLITE_MAX_CONNECTIONS")? {
        config.storage.sqlite.max_connections = val;
    }

    // Ingestion
    if let Some(policy) = env.get("TIMESTAMP_POLICY") {
        config.ingest.timestamp_policy = policy
            .parse::<TimestampPolicy>()
            .map_err(|e| anyhow!("Invalid {}TIMESTAMP_POLICY value: {}", ENV_PREFIX, e))?;
    }

    // Query API
    if let Some(val) = get_env_usize(env, "QUERY_DEFAULT_LIMIT")? {
        config.query.default_limit = val;
    }
    if let Some(val) = get_env_usize(env, "QUERY_MAX_LIMIT")? {
        config.query.max_limit = val;
    }

    Ok(())
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_u32<E: EnvSource>(env: &E, key: &str) -> Result<Option<u32>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .parse::<u32>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
