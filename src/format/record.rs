//! Backend-neutral log record.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde_json::Value;

use crate::error::Error;
use crate::fields::{self, Fields};
use crate::observability::level::Severity;

/// Default pattern for `asctime` / `time`.
pub const DATE_DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp with a strftime pattern.
///
/// Invalid specifiers render as nothing instead of panicking; patterns are
/// validated up front by [`validate_date_pattern`].
pub fn format_time(created: &DateTime<Local>, pattern: &str) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}", created.format(pattern));
    out
}

/// Reject strftime patterns containing unknown specifiers.
pub fn validate_date_pattern(pattern: &str) -> Result<(), Error> {
    match StrftimeItems::new(pattern).position(|item| matches!(item, Item::Error)) {
        Some(_) => Err(Error::template(0, format!("invalid date pattern '{pattern}'"))),
        None => Ok(()),
    }
}

/// One record as seen by a formatter.
///
/// Backends build this from their own record type: `log::Record` key-values
/// and `tracing` event fields both end up in `fields`.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
    /// Logger name (`log` target or `tracing` target).
    pub logger: String,
    pub module: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub created: DateTime<Local>,
    pub fields: Fields,
    /// Rendered exception trace, if one was attached.
    pub exception: Option<String>,
}

impl LogRecord {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            logger: String::new(),
            module: None,
            file: None,
            line: None,
            created: Local::now(),
            fields: Fields::new(),
            exception: None,
        }
    }

    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = logger.into();
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_exception(mut self, exception: Option<String>) -> Self {
        self.exception = exception;
        self
    }

    pub fn with_location(mut self, module: Option<&str>, file: Option<&str>, line: Option<u32>) -> Self {
        self.module = module.map(str::to_string);
        self.file = file.map(str::to_string);
        self.line = line;
        self
    }

    /// Value of a record field, falling back to the schema default and then
    /// to `null` for names outside the schema.
    pub fn field(&self, name: &str) -> Value {
        self.fields
            .get(name)
            .cloned()
            .or_else(|| fields::default_for(name))
            .unwrap_or(Value::Null)
    }

    /// Millisecond part of the creation time.
    pub fn msecs(&self) -> u32 {
        self.created.timestamp_subsec_millis()
    }

    /// Backend-native attributes shared by every formatter.
    ///
    /// Returns `None` for names that are not native, so the caller can fall
    /// through to [`LogRecord::field`].
    pub fn native(&self, name: &str) -> Option<Value> {
        let value = match name {
            "asctime" | "time" => Value::from(format_time(&self.created, DATE_DEFAULT_FORMAT)),
            "levelname" | "level" => Value::from(self.severity.name()),
            "levelno" => Value::from(self.severity.number()),
            "message" => Value::from(self.message.as_str()),
            "name" | "source" => Value::from(self.logger.as_str()),
            "thread" | "process" => Value::from(std::process::id()),
            "module" => Value::from(self.module.as_deref().unwrap_or_default()),
            "filename" | "file" => Value::from(self.file.as_deref().unwrap_or_default()),
            "lineno" | "line" => self.line.map(Value::from).unwrap_or(Value::Null),
            "created" => Value::from(self.created.timestamp_millis() as f64 / 1000.0),
            "msecs" => Value::from(self.msecs()),
            "props" => self.fields.get("props").cloned().unwrap_or_else(|| Value::from("")),
            "exceptions" | "exception" => Value::from(self.exception.as_deref().unwrap_or_default()),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_falls_back_to_schema_default() {
        let record = LogRecord::new(Severity::Info, "hi");
        assert_eq!(record.field("duration"), Value::from(0));
        assert_eq!(record.field("request_body"), Value::from(""));
        assert_eq!(record.field("not_a_field"), Value::Null);
    }

    #[test]
    fn test_native_attributes() {
        let mut fields = Fields::new();
        fields.insert("props".into(), Value::from("{}"));
        let record = LogRecord::new(Severity::Warning, "careful")
            .with_logger("app")
            .with_fields(fields)
            .with_exception(Some("trace".into()));

        assert_eq!(record.native("levelname"), Some(Value::from("WARNING")));
        assert_eq!(record.native("levelno"), Some(Value::from(30)));
        assert_eq!(record.native("source"), Some(Value::from("app")));
        assert_eq!(record.native("props"), Some(Value::from("{}")));
        assert_eq!(record.native("exceptions"), Some(Value::from("trace")));
        assert_eq!(record.native("request_body"), None);
    }

    #[test]
    fn test_date_patterns() {
        assert!(validate_date_pattern(DATE_DEFAULT_FORMAT).is_ok());
        assert!(validate_date_pattern("%Y %").is_err());
        let record = LogRecord::new(Severity::Info, "x");
        assert_eq!(format_time(&record.created, "%Y").len(), 4);
    }
}
