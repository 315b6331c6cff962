//! `tracing` backend.
//!
//! # Responsibilities
//! - Emit request records as `tracing` events, one named field per schema key
//! - Turn events back into `LogRecord`s for the crate's formatters
//! - Install the global subscriber (console, optional rotating file)
//!
//! # Design Decisions
//! - Schema values are recorded as display strings and integer keys are
//!   parsed back, so every formatter sees the same types as with `log`
//! - Non-schema fields travel as one JSON object in `props`
//! - `log` records from framework crates are bridged in by `tracing-log`
//! - A second subscriber install is ignored, not an error

use std::fmt;
use std::io;

use ::tracing::field::{Field, Visit};
use ::tracing::{Event, Level, Subscriber};
use serde_json::Value;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{self as subscriber_fmt, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::schema::TracingOptions;
use crate::error::Error;
use crate::fields::{self, display_value, Fields};
use crate::format::{BraceFormatter, FileFormatter, Formatter, LogRecord};
use crate::http::panic::Failure;
use crate::observability::level::Severity;
use crate::observability::logging::FRAMEWORK_LOGGERS;
use crate::observability::{Emit, EXCEPTION_KEY, SEVERITY_KEY};

/// Target of every request event.
pub const TARGET: &str = "request_logging";

/// Emits request records as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

impl TracingEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emit for TracingEmitter {
    fn emit(&self, severity: Severity, message: &str, fields: &Fields, failure: Option<&Failure>) {
        let defaults = fields::defaults();
        let text = |name: &str| {
            fields
                .get(name)
                .or_else(|| defaults.get(name))
                .map(display_value)
                .unwrap_or_default()
        };
        let exception = failure.map(Failure::trace);
        let props = props(fields);

        macro_rules! request_event {
            ($level:expr) => {
                ::tracing::event!(
                    target: TARGET,
                    $level,
                    application_name = %text("application_name"),
                    request_uri = %text("request_uri"),
                    request_referrer = %text("request_referrer"),
                    request_protocol = %text("request_protocol"),
                    request_method = %text("request_method"),
                    request_path = %text("request_path"),
                    request_host = %text("request_host"),
                    request_size = %text("request_size"),
                    request_content_type = %text("request_content_type"),
                    request_headers = %text("request_headers"),
                    request_body = %text("request_body"),
                    request_direction = %text("request_direction"),
                    remote_ip = %text("remote_ip"),
                    remote_port = %text("remote_port"),
                    response_status_code = %text("response_status_code"),
                    response_size = %text("response_size"),
                    response_headers = %text("response_headers"),
                    response_body = %text("response_body"),
                    duration = %text("duration"),
                    severity = severity.name(),
                    exception = exception.as_deref(),
                    props = %props,
                    "{}",
                    message
                )
            };
        }

        match severity.to_tracing_level() {
            Level::TRACE => request_event!(Level::TRACE),
            Level::DEBUG => request_event!(Level::DEBUG),
            Level::INFO => request_event!(Level::INFO),
            Level::WARN => request_event!(Level::WARN),
            _ => request_event!(Level::ERROR),
        }
    }
}

/// Non-schema fields as a JSON object, or `""` when there are none.
fn props(fields: &Fields) -> String {
    let extra: Fields = fields
        .iter()
        .filter(|(name, _)| !fields::is_field(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    if extra.is_empty() {
        String::new()
    } else {
        Value::Object(extra).to_string()
    }
}

/// Collects event fields into a record.
#[derive(Debug, Default)]
struct EventFields {
    message: String,
    fields: Fields,
    severity: Option<Severity>,
    exception: Option<String>,
    logger: Option<String>,
    module: Option<String>,
    file: Option<String>,
    line: Option<u32>,
}

impl EventFields {
    fn record_text(&mut self, name: &str, text: &str) {
        match name {
            "message" => self.message = text.to_string(),
            SEVERITY_KEY => self.severity = text.parse().ok(),
            EXCEPTION_KEY => self.exception = Some(text.to_string()),
            "log.target" => self.logger = Some(text.to_string()),
            "log.module_path" => self.module = Some(text.to_string()),
            "log.file" => self.file = Some(text.to_string()),
            "log.line" => self.line = text.parse().ok(),
            name if fields::is_integer_field(name) => match text.parse::<i64>() {
                Ok(number) => {
                    self.fields.insert(name.to_string(), Value::from(number));
                }
                Err(_) if text.is_empty() => {}
                Err(_) => {
                    self.fields.insert(name.to_string(), Value::from(text));
                }
            },
            name => {
                self.fields.insert(name.to_string(), Value::from(text));
            }
        }
    }

    fn record_number(&mut self, name: &str, number: Value) {
        if name == "log.line" {
            self.line = number.as_u64().and_then(|line| u32::try_from(line).ok());
        } else {
            self.fields.insert(name.to_string(), number);
        }
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field.name(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_number(field.name(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_number(field.name(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field.name(), &format!("{value:?}"));
    }
}

/// Build a [`LogRecord`] from an event, including events bridged from `log`.
pub fn record_from_event(event: &Event<'_>) -> LogRecord {
    let mut visited = EventFields::default();
    event.record(&mut visited);

    let metadata = event.metadata();
    let severity = visited
        .severity
        .unwrap_or_else(|| Severity::from_tracing_level(metadata.level()));
    let logger = visited.logger.unwrap_or_else(|| metadata.target().to_string());
    let module = visited.module.or_else(|| metadata.module_path().map(str::to_string));
    let file = visited.file.or_else(|| metadata.file().map(str::to_string));
    let line = visited.line.or(metadata.line());

    LogRecord::new(severity, visited.message)
        .with_logger(logger)
        .with_location(module.as_deref(), file.as_deref(), line)
        .with_fields(visited.fields)
        .with_exception(visited.exception)
}

/// `FormatEvent` adapter running one of the crate's formatters.
#[derive(Debug, Clone)]
pub struct EventFormat<F> {
    formatter: F,
}

impl<F> EventFormat<F> {
    pub fn new(formatter: F) -> Self {
        Self { formatter }
    }
}

impl<S, N, F> FormatEvent<S, N> for EventFormat<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: Formatter + 'static,
{
    fn format_event(&self, _ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        writeln!(writer, "{}", self.formatter.format(&record_from_event(event)))
    }
}

/// `EnvFilter` directives: `level` for everything, framework crates no
/// more verbose than `info`.
pub fn framework_targets(level: Severity) -> String {
    let framework = directive_level(level.max(Severity::Info));
    std::iter::once(directive_level(level).to_string())
        .chain(FRAMEWORK_LOGGERS.iter().map(|target| format!("{target}={framework}")))
        .collect::<Vec<_>>()
        .join(",")
}

fn directive_level(level: Severity) -> &'static str {
    match level {
        Severity::Trace => "trace",
        Severity::Debug => "debug",
        Severity::Info => "info",
        Severity::Warning => "warn",
        Severity::Error | Severity::Critical => "error",
    }
}

/// Install the global subscriber for `options`.
///
/// `RUST_LOG` overrides the level directives when set.
pub fn install(options: &TracingOptions) -> Result<(), Error> {
    let console = BraceFormatter::new(&options.format, options.traceback_to_console)?;
    let file_layer = match &options.file {
        Some(file) => {
            let formatter = FileFormatter::new(&file.format, &file.datefmt)?;
            Some(
                subscriber_fmt::layer()
                    .with_ansi(false)
                    .event_format(EventFormat::new(formatter))
                    .with_writer(file.appender()?),
            )
        }
        None => None,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(framework_targets(options.level)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            subscriber_fmt::layer()
                .event_format(EventFormat::new(console))
                .with_writer(io::stderr),
        )
        .with(file_layer)
        .try_init();

    if let Err(e) = installed {
        ::tracing::debug!(error = %e, "global subscriber already installed, keeping it");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::fields::RequestResponseFields;
    use crate::fields::StatusField;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(format: &str, emit: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let formatter = BraceFormatter::new(format, true).unwrap().with_colors(false);
        let subscriber = tracing_subscriber::registry().with(
            subscriber_fmt::layer()
                .event_format(EventFormat::new(formatter))
                .with_writer(move || writer.clone()),
        );
        ::tracing::subscriber::with_default(subscriber, emit);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn request_fields() -> Fields {
        let mut fields = RequestResponseFields {
            request_path: "/noerr".into(),
            request_method: "GET".into(),
            response_status_code: StatusField::Code(200),
            duration: Some(3),
            ..Default::default()
        }
        .into_fields();
        fields.insert("to_mask".into(), Value::from(true));
        fields
    }

    #[test]
    fn test_event_carries_every_field() {
        let fields = request_fields();
        let line = capture(
            "{level}|{extra[request_path]}|{extra[response_status_code]:>5}|{extra[duration]:03d}|{extra[request_size]}|{props}|{message}",
            || TracingEmitter.emit(Severity::Info, "Response with code 200", &fields, None),
        );
        assert_eq!(
            line,
            "INFO|/noerr|  200|003||{\"to_mask\":true}|Response with code 200\n"
        );
    }

    #[test]
    fn test_critical_name_survives() {
        let fields = request_fields();
        let line = capture("{level}", || {
            TracingEmitter.emit(Severity::Critical, "boom", &fields, None)
        });
        assert_eq!(line, "CRITICAL\n");
    }

    #[test]
    fn test_exception_appended() {
        let fields = request_fields();
        let failure = Failure::new("attempt to divide by zero");
        let line = capture("{message}", || {
            TracingEmitter.emit(Severity::Error, "Error with code 500", &fields, Some(&failure))
        });
        assert_eq!(line, "Error with code 500\nattempt to divide by zero\n");
    }

    #[test]
    fn test_framework_targets() {
        let directives = framework_targets(Severity::Debug);
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("hyper=info"));
        assert!(directives.contains("tower_http=info"));

        let directives = framework_targets(Severity::Critical);
        assert!(directives.starts_with("error,"));
        assert!(directives.contains("reqwest=error"));
    }

    #[test]
    fn test_props_empty_without_extra_fields() {
        assert_eq!(props(&fields::defaults()), "");
    }
}
