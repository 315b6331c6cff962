//! Brace-style formatter for the `tracing` backend.

use serde_json::Value;

use crate::error::Error;
use crate::format::record::{format_time, LogRecord};
use crate::format::style::stderr_is_terminal;
use crate::format::template::{brace_time_pattern, Template};
use crate::format::Formatter;

/// Default console template.
pub const TRACING_DEFAULT_FORMAT: &str = "<green>{time:YYYY-MM-DD HH:mm:ss}</green> <level>{level: <8}</level> {extra[request_path]} <level>{extra[response_status_code]: <3} {message}</level>";

const TIME_DEFAULT_PATTERN: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Formatter for brace templates with `<color>` markup.
///
/// `{extra[name]}` and `{name}` both resolve record fields. Markup is
/// rendered when stderr is a terminal and stripped otherwise.
#[derive(Debug, Clone)]
pub struct BraceFormatter {
    template: Template,
    use_colors: bool,
    traceback_to_console: bool,
}

impl BraceFormatter {
    pub fn new(format: &str, traceback_to_console: bool) -> Result<Self, Error> {
        Ok(Self {
            template: Template::brace(format)?,
            use_colors: stderr_is_terminal(),
            traceback_to_console,
        })
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn use_colors(&self) -> bool {
        self.use_colors
    }
}

impl Formatter for BraceFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let trace = match (&record.exception, self.traceback_to_console) {
            (Some(trace), true) => trace.as_str(),
            _ => "",
        };
        let colors = self.use_colors.then_some(record.severity);

        let mut line = self.template.render(
            |placeholder| match placeholder.name.as_str() {
                "time" | "asctime" => {
                    let pattern = placeholder
                        .pattern
                        .as_deref()
                        .map(brace_time_pattern)
                        .unwrap_or_else(|| TIME_DEFAULT_PATTERN.to_string());
                    Value::from(format_time(&record.created, &pattern))
                }
                "exception" | "exceptions" => Value::from(trace),
                name => record.native(name).unwrap_or_else(|| record.field(name)),
            },
            colors,
        );

        if !trace.is_empty() && !self.template.references("exception") && !self.template.references("exceptions") {
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
        fields.insert("request_path".into(), Value::from("/err"));
        fields.insert("response_status_code".into(), Value::from(500));
        LogRecord::new(Severity::Error, "Error with code 500").with_fields(fields)
    }

    #[test]
    fn test_default_format_without_colors() {
        let formatter = BraceFormatter::new(TRACING_DEFAULT_FORMAT, false)
            .unwrap()
            .with_colors(false);
        let line = formatter.format(&record());
        assert!(line.ends_with(" ERROR    /err 500 Error with code 500"), "{line}");
        assert!(!line.contains('<'));
    }

    #[test]
    fn test_unknown_extra_renders_empty() {
        let formatter = BraceFormatter::new("[{extra[nope]}][{extra[request_body]}]", false)
            .unwrap()
            .with_colors(false);
        assert_eq!(formatter.format(&record()), "[][]");
    }

    #[test]
    fn test_traceback_appended_only_when_enabled() {
        let failing = record().with_exception(Some("panicked at 'attempt to divide by zero'\n".into()));

        let shown = BraceFormatter::new("{message}", true).unwrap().with_colors(false);
        assert_eq!(
            shown.format(&failing),
            "Error with code 500\npanicked at 'attempt to divide by zero'"
        );

        let hidden = BraceFormatter::new("{message}", false).unwrap().with_colors(false);
        assert_eq!(hidden.format(&failing), "Error with code 500");
    }

    #[test]
    fn test_time_pattern() {
        let formatter = BraceFormatter::new("{time:YYYY}", false).unwrap().with_colors(false);
        let record = record();
        assert_eq!(formatter.format(&record), record.created.format("%Y").to_string());
    }
}
