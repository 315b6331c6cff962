//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic, including level names)
//! - Compile every template and date pattern once, up front
//! - Check file sink settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LoggingConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{FileSinkConfig, LoggingConfig};
use crate::format::record::validate_date_pattern;
use crate::format::Template;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{section}.format: {reason}")]
    Template { section: String, reason: String },

    #[error("{section}.datefmt: {reason}")]
    DatePattern { section: String, reason: String },

    #[error("{section}.file_name_prefix must not be empty")]
    EmptyFilePrefix { section: String },

    #[error("logging.logger_name must not be empty")]
    EmptyLoggerName,
}

/// Check every section of `config`.
pub fn validate_config(config: &LoggingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let logging = &config.logging;
    if logging.logger_name.as_deref().is_some_and(str::is_empty) {
        errors.push(ValidationError::EmptyLoggerName);
    }
    if let Err(e) = Template::percent(&logging.format) {
        errors.push(ValidationError::Template {
            section: "logging".to_string(),
            reason: e.to_string(),
        });
    }
    if let Err(e) = validate_date_pattern(&logging.datefmt) {
        errors.push(ValidationError::DatePattern {
            section: "logging".to_string(),
            reason: e.to_string(),
        });
    }
    if let Some(file) = &logging.file {
        validate_file_sink("logging.file", file, &mut errors);
    }

    if let Err(e) = Template::brace(&config.tracing.format) {
        errors.push(ValidationError::Template {
            section: "tracing".to_string(),
            reason: e.to_string(),
        });
    }
    if let Some(file) = &config.tracing.file {
        validate_file_sink("tracing.file", file, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_file_sink(section: &str, file: &FileSinkConfig, errors: &mut Vec<ValidationError>) {
    if file.file_name_prefix.trim().is_empty() {
        errors.push(ValidationError::EmptyFilePrefix {
            section: section.to_string(),
        });
    }
    if let Err(e) = Template::percent(&file.format) {
        errors.push(ValidationError::Template {
            section: section.to_string(),
            reason: e.to_string(),
        });
    }
    if let Err(e) = validate_date_pattern(&file.datefmt) {
        errors.push(ValidationError::DatePattern {
            section: section.to_string(),
            reason: e.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_brace_template() {
        let mut config = LoggingConfig::default();
        config.tracing.format = "{level".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(&errors[..], [ValidationError::Template { section, .. }] if section == "tracing"));
    }

    #[test]
    fn test_empty_logger_name() {
        let mut config = LoggingConfig::default();
        config.logging.logger_name = Some(String::new());
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::EmptyLoggerName]);
    }
}
