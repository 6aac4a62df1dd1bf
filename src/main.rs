use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use telemorph::config::{RuntimeConfig, StorageBackend};

/// OTLP/JSON ingestion server with a paginated query API
#[derive(Parser)]
#[command(name = "telemorph")]
#[command(version)]
#[command(about = "OTLP/JSON ingestion server with a paginated query API", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP listen port (overrides config file)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// SQLite database file (sqlite backend only)
    #[arg(short, long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build tokio runtime and run async server
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // Step 1: Load base configuration (defaults, file, environment)
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority)
    apply_cli_overrides(&mut config, &cli)?;

    // Step 3: Re-validate with overrides applied
    config.validate()?;

    // Step 4: Run server with resolved config
    telemorph::run_with_config(config).await
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) -> Result<()> {
    if let Some(port) = cli.port {
        config.server.listen_addr = format!("0.0.0.0:{}", port);
    }

    if let Some(db) = &cli.db {
        if config.storage.backend != StorageBackend::Sqlite {
            anyhow::bail!(
                "--db flag only works with the sqlite backend, but backend is '{}'.\n\
                Either remove --db flag or set backend to 'sqlite' in config file.",
                config.storage.backend
            );
        }
        config.storage.sqlite.path = db.to_string_lossy().to_string();
    }

    if let Some(level) = &cli.log_level {
        config.server.log_level = level.clone();
    }

    Ok(())
}
