use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use drover_driver::{DriverConfig, DriverFactory};
use serde_json::json;
use tracing::info;

/// Load and validate the configuration, then print what a pool built from
/// it would start.
pub fn run(config_path: Option<&Path>) -> Result<ExitCode> {
    let (path, _) = DriverConfig::resolve_path(config_path);
    let config = DriverConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    let factory = DriverFactory::new(config);
    let (backend, capabilities) = factory
        .resolve()
        .context("Configuration does not describe a usable backend")?;

    info!("Configuration OK: backend {}", backend);

    let config = factory.config();
    let output = json!({
        "driver": config.driver,
        "backend": backend.to_string(),
        "pool": config.pool,
        "sessions_path_prefix": config.sessions_path_prefix,
        "capabilities": capabilities,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(ExitCode::SUCCESS)
}
