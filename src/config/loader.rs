//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::LoggingConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoggingConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), backend = ?config.backend, "configuration loaded");
    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<LoggingConfig, ConfigError> {
    let config: LoggingConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_config("backend = \"log\"\n[logging]\napplication_name = \"shop\"").unwrap();
        assert_eq!(config.logging.application_name, "shop");
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        assert!(matches!(parse_config("backend = "), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_semantic_errors_are_collected() {
        let err = parse_config(
            r#"
            [logging]
            format = "%(message"
            datefmt = "%Y %"

            [tracing.file]
            file_name_prefix = ""
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 3, "{errors:?}"),
            other => panic!("expected validation errors, got {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/request-logging.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
