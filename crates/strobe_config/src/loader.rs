//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// File name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "strobe.toml";

/// Loads and validates `<project_dir>/strobe.toml`.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks required fields and value ranges.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.sim.max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "sim.max_iterations must be at least 1".to_string(),
        ));
    }
    if config.clock.frequency.period_fs().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "clock.frequency must be positive, got {}",
            config.clock.frequency
        )));
    }
    if config.clock.time_precision < config.clock.time_unit {
        return Err(ConfigError::ValidationError(format!(
            "clock.time_precision ({}) is coarser than clock.time_unit ({})",
            config.clock.time_precision, config.clock.time_unit
        )));
    }
    for (name, p) in [
        ("stimulus.send_probability", config.stimulus.send_probability),
        (
            "stimulus.accept_probability",
            config.stimulus.accept_probability,
        ),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be within [0, 1], got {p}"
            )));
        }
    }
    Ok(())
}
