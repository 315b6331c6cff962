//! File formatter.
//!
//! Available format attributes:
//!
//! | name | value |
//! |---|---|
//! | `asctime` | creation time, rendered with the configured date pattern |
//! | `created`, `msecs` | creation time in seconds / its millisecond part |
//! | `levelname`, `levelno` | severity name / number |
//! | `name` | `application_name` when set, otherwise the logger name |
//! | `source` | logger name |
//! | `module`, `filename`, `lineno` | source location, when the backend knows it |
//! | `thread`, `process` | process id |
//! | `message` | the record message |
//! | `props` | extra properties attached to the record |
//! | `exceptions` | exception trace |
//! | `duration` | request duration in ms, else the millisecond part of the creation time |
//! | every field of [`crate::fields::FIELD_NAMES`] | request/response values |

use serde_json::Value;

use crate::error::Error;
use crate::format::record::{format_time, validate_date_pattern, LogRecord};
use crate::format::template::Template;
use crate::format::Formatter;

/// Default file template.
pub const FILE_DEFAULT_FORMAT: &str = "%(asctime)s %(levelname)-8s %(response_status_code)-4s %(duration)-10d %(request_method)-4s %(thread)-10s %(request_path)-20s %(request_body)s %(message)s %(exceptions)s";

/// Percent-style formatter for file sinks. Never colors, always renders the
/// exception trace.
#[derive(Debug, Clone)]
pub struct FileFormatter {
    template: Template,
    datefmt: String,
}

impl FileFormatter {
    pub fn new(format: &str, datefmt: &str) -> Result<Self, Error> {
        validate_date_pattern(datefmt)?;
        Ok(Self {
            template: Template::percent(format)?,
            datefmt: datefmt.to_string(),
        })
    }

    fn resolve(&self, record: &LogRecord, name: &str) -> Value {
        match name {
            "asctime" | "time" => Value::from(format_time(&record.created, &self.datefmt)),
            "duration" => record
                .fields
                .get("duration")
                .cloned()
                .unwrap_or_else(|| Value::from(record.msecs())),
            "name" => match record.fields.get("application_name") {
                Some(Value::String(app)) if !app.is_empty() => Value::from(app.as_str()),
                _ => Value::from(record.logger.as_str()),
            },
            other => record.native(other).unwrap_or_else(|| record.field(other)),
        }
    }
}

impl Formatter for FileFormatter {
    fn format(&self, record: &LogRecord) -> String {
        self.template
            .render(|placeholder| self.resolve(record, &placeholder.name), None)
    }
}
