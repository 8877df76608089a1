//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `strobe.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A value is out of its allowed range.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("project.name".to_string());
        assert_eq!(err.to_string(), "missing required field: project.name");
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("sim.max_iterations must be at least 1".into());
        assert_eq!(
            err.to_string(),
            "validation error: sim.max_iterations must be at least 1"
        );
    }

    #[test]
    fn display_io_error() {
        let err = ConfigError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        assert!(err.to_string().starts_with("failed to read configuration:"));
    }
}
