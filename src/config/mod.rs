mod schema;
mod validation;

pub use schema::{
    Config, RankingConfig, RetryConfig, StoreConfig, StoreKind, DEFAULT_ROSTER_RANGE,
    DEFAULT_SCORE_SHEET, DEFAULT_SUMMARY_SHEET,
};
pub use validation::validate_config;

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the config directory path (~/.config/judgebook/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("judgebook"))
}

/// Get the default config file path (~/.config/judgebook/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Parse configuration from YAML text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_saphyr::from_str(content).context("Failed to parse config: invalid YAML")?;
    Ok(config)
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/judgebook/config.yaml)
///
/// # Errors
///
/// Returns an error if:
/// - The config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed or has unknown keys
/// - Validation fails (all problems are listed)
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => p,
        None => get_config_path()?,
    };

    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Create ~/.config/judgebook/config.yaml or pass --config",
            config_path.display()
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config = parse_config(&config_content)
        .with_context(|| format!("Invalid config in {}", config_path.display()))?;

    if let Err(errors) = validate_config(&config) {
        anyhow::bail!(
            "Invalid config in {}:\n  {}",
            config_path.display(),
            errors.join("\n  ")
        );
    }

    tracing::debug!(path = %config_path.display(), classes = config.classes.len(), "loaded config");
    Ok(config)
}
