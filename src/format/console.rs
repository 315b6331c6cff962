//! Console formatter for the `log` backend.

use serde_json::Value;

use crate::error::Error;
use crate::format::record::{format_time, validate_date_pattern, LogRecord};
use crate::format::style::{colorize_level, stdout_is_terminal};
use crate::format::template::Template;
use crate::format::Formatter;

/// Default console template.
pub const LOGGING_DEFAULT_FORMAT: &str = "%(levelprefix)s %(asctime)s path: %(request_path)s %(response_status_code)-4s %(message)s request body: %(request_body)s";

/// Percent-style formatter with a colored level prefix.
///
/// Provides `levelprefix` (`INFO:     `). With colors on, the level name
/// and the message are colored by severity. The exception trace is written
/// on the following lines only when `traceback_to_console` is set.
#[derive(Debug, Clone)]
pub struct ConsoleFormatter {
    template: Template,
    datefmt: String,
    use_colors: bool,
    traceback_to_console: bool,
}

impl ConsoleFormatter {
    pub fn new(format: &str, datefmt: &str, traceback_to_console: bool) -> Result<Self, Error> {
        validate_date_pattern(datefmt)?;
        Ok(Self {
            template: Template::percent(format)?,
            datefmt: datefmt.to_string(),
            use_colors: stdout_is_terminal(),
            traceback_to_console,
        })
    }

    /// Force colors on or off instead of following the terminal check.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn use_colors(&self) -> bool {
        self.use_colors
    }

    fn level_prefix(&self, record: &LogRecord) -> String {
        let name = record.severity.name();
        let separator = " ".repeat(8usize.saturating_sub(name.len()));
        let name = if self.use_colors {
            colorize_level(name, record.severity)
        } else {
            name.to_string()
        };
        format!("{name}:{separator}")
    }
}

impl Formatter for ConsoleFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let trace = match (&record.exception, self.traceback_to_console) {
            (Some(trace), true) => trace.as_str(),
            _ => "",
        };
        let message = if self.use_colors {
            colorize_level(&record.message, record.severity)
        } else {
            record.message.clone()
        };

        let mut line = self.template.render(
            |placeholder| match placeholder.name.as_str() {
                "levelprefix" => Value::from(self.level_prefix(record)),
                "message" => Value::from(message.as_str()),
                "asctime" | "time" => Value::from(format_time(&record.created, &self.datefmt)),
                "exceptions" | "exception" => Value::from(trace),
                name => record.native(name).unwrap_or_else(|| record.field(name)),
            },
            None,
        );

        if !trace.is_empty() && !self.template.references("exceptions") && !self.template.references("exception") {
            line.push('\n');
            line.push_str(trace.trim_end());
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Fields;
    use crate::observability::level::Severity;

    fn record() -> LogRecord {
        let mut fields = Fields::new();
        fields.insert("request_path".into(), Value::from("/noerr"));
        fields.insert("response_status_code".into(), Value::from(200));
        fields.insert("request_body".into(), Value::from("{}"));
        LogRecord::new(Severity::Info, "Response with code 200").with_fields(fields)
    }

    #[test]
    fn test_default_format_compiles() {
        assert!(Template::percent(LOGGING_DEFAULT_FORMAT).is_ok());
    }

    #[test]
    fn test_renders_level_prefix_and_fields() {
        let formatter = ConsoleFormatter::new(LOGGING_DEFAULT_FORMAT, "%Y", false)
            .unwrap()
            .with_colors(false);
        let line = formatter.format(&record());
        assert!(line.starts_with("INFO:     "), "{line}");
        assert!(line.contains("path: /noerr 200  Response with code 200 request body: {}"), "{line}");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_missing_fields_render_defaults() {
        let formatter = ConsoleFormatter::new("%(request_uri)s|%(duration)d|%(request_size)s|", "%Y", false)
            .unwrap()
            .with_colors(false);
        let line = formatter.format(&LogRecord::new(Severity::Info, "x"));
        assert_eq!(line, "|0||");
    }

    #[test]
    fn test_traceback_toggle() {
        let failing = record().with_exception(Some("panicked at src/main.rs:1:1".into()));

        let shown = ConsoleFormatter::new("%(message)s", "%Y", true)
            .unwrap()
            .with_colors(false)
            .format(&failing);
        assert_eq!(shown, "Response with code 200\npanicked at src/main.rs:1:1");

        let hidden = ConsoleFormatter::new("%(message)s [%(exceptions)s]", "%Y", false)
            .unwrap()
            .with_colors(false)
            .format(&failing);
        assert_eq!(hidden, "Response with code 200 []");
    }

    #[test]
    fn test_invalid_datefmt_rejected() {
        assert!(ConsoleFormatter::new(LOGGING_DEFAULT_FORMAT, "%Y %", false).is_err());
    }
}
