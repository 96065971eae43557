//! TOML form of the report configuration, picked when the file name ends in
//! `.toml`.

use super::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read, parse and validate a TOML configuration.
pub fn load_toml_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    log::debug!(
        "Loaded TOML configuration from {} ({} demo accounts)",
        path.display(),
        config.verification.accounts.len()
    );
    Ok(config)
}

pub fn write_toml_config(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
