// Configuration source loading.
//
// Priority order:
// 1. Environment variables (TELEMORPH_* prefix)
// 2. Config file path from TELEMORPH_CONFIG
// 3. Inline config content from TELEMORPH_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.telemorph.toml)
// 5. Built-in defaults

use super::env_overrides::{self, EnvSource, ENV_PREFIX};
use super::RuntimeConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_FILES: &[&str] = &["./config.toml", "./.telemorph.toml"];

fn load_from_file<E: EnvSource>(env: &E) -> Result<Option<RuntimeConfig>> {
    if let Some(path) = env.get("CONFIG") {
        return read_file(Path::new(&path)).map(Some);
    }

    if let Some(content) = env.get("CONFIG_CONTENT") {
        let config = RuntimeConfig::from_toml(&content).with_context(|| {
            format!("Failed to parse inline config from {}CONFIG_CONTENT", ENV_PREFIX)
        })?;
        return Ok(Some(config));
    }

    for path in DEFAULT_CONFIG_FILES {
        let path = Path::new(path);
        if path.exists() {
            return read_file(path).map(Some);
        }
    }

    Ok(None)
}

fn read_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    RuntimeConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = read_file(path.as_ref())?;

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration with fallback to defaults.
/// Tries standard config file locations, returns defaults if none found.
/// A config file that is found but malformed is reported, not ignored.
pub fn load_or_default() -> Result<RuntimeConfig> {
    load_or_default_from(&StdEnvSource)
}

fn load_or_default_from<E: EnvSource>(env: &E) -> Result<RuntimeConfig> {
    let mut config = load_from_file(env)?.unwrap_or_default();

    env_overrides::apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use std::collections::HashMap;
    use std::io::Write;

    struct MapEnv(HashMap<&'static str, String>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    #[test]
    fn test_read_file_parses_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\nbackend = \"memory\"").unwrap();

        let config = read_file(file.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_read_file_reports_path() {
        let err = read_file(Path::new("/nonexistent/telemorph.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/telemorph.toml"));
    }

    #[test]
    fn test_inline_config_is_layered_under_env_overrides() {
        let env = MapEnv(HashMap::from([
            ("CONFIG_CONTENT", "[storage]\nbackend = \"memory\"".to_string()),
            ("QUERY_DEFAULT_LIMIT", "25".to_string()),
        ]));

        let config = load_or_default_from(&env).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.query.default_limit, 25);
    }

    #[test]
    fn test_malformed_config_is_an_error_not_defaults() {
        let env = MapEnv(HashMap::from([(
            "CONFIG_CONTENT",
            "[storage\nbackend = ".to_string(),
        )]));

        let err = load_or_default_from(&env).unwrap_err();
        assert!(err.to_string().contains("CONFIG_CONTENT"));
    }

    #[test]
    fn test_malformed_config_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nlisten_addr = ").unwrap();
        let env = MapEnv(HashMap::from([(
            "CONFIG",
            file.path().to_string_lossy().to_string(),
        )]));

        let err = load_or_default_from(&env).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
