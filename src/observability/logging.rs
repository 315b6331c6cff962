//! `log` facade backend.
//!
//! # Responsibilities
//! - Emit request records through `log` with fields as key-values
//! - Route records to named handlers (console, rotating file, custom writers)
//! - Reconcile framework loggers so their lines use the application's handlers
//!
//! # Design Decisions
//! - One global dispatcher implements `log::Log`; configuration lives in a
//!   `LoggerRegistry` value swapped wholesale through `ArcSwap`
//! - Loggers are named by target and inherit through `::` ancestry, stopping
//!   at the first logger with `propagate = false`
//! - Registry updates are pure functions, so reconciliation is idempotent
//!
//! # Data Flow
//! ```text
//! LogEmitter::emit → log::Record (target = logger name, key-values)
//!     → Dispatcher::log → LoggerRegistry::handlers_for(target)
//!     → Handler (level check, Formatter, Mutex<writer>)
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use arc_swap::ArcSwap;
use log::kv::{self, Key, Source, VisitSource};
use log::{LevelFilter, Metadata, Record};
use serde_json::Value;

use crate::config::schema::FileSinkConfig;
use crate::error::Error;
use crate::fields::Fields;
use crate::format::{FileFormatter, Formatter, LogRecord};
use crate::http::panic::Failure;
use crate::observability::level::Severity;
use crate::observability::{Emit, EXCEPTION_KEY, SEVERITY_KEY};

/// Framework crates whose loggers are pointed at the application handlers.
pub const FRAMEWORK_LOGGERS: [&str; 6] = ["hyper", "h2", "axum", "tower", "tower_http", "reqwest"];

/// Level used when no logger in a target's ancestry sets one.
const ROOT_LEVEL: Severity = Severity::Warning;

/// A named sink: formatter plus writer.
pub struct Handler {
    name: String,
    level: Severity,
    formatter: Box<dyn Formatter>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Handler {
    pub fn new(name: impl Into<String>, formatter: impl Formatter + 'static, writer: impl Write + Send + 'static) -> Self {
        Self {
            name: name.into(),
            level: Severity::Trace,
            formatter: Box::new(formatter),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Handler writing to stdout.
    pub fn console(formatter: impl Formatter + 'static) -> Self {
        Self::new("console", formatter, io::stdout())
    }

    /// Handler writing to a rotating file.
    pub fn file(config: &FileSinkConfig) -> Result<Self, Error> {
        let formatter = FileFormatter::new(&config.format, &config.datefmt)?;
        Ok(Self::new("file", formatter, config.appender()?))
    }

    /// Minimum severity this handler writes.
    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn handle(&self, record: &LogRecord) {
        if record.severity < self.level {
            return;
        }
        let line = self.formatter.format(record);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            // Not routed through `log`: the record would come back here.
            eprintln!("request-logging: handler '{}' failed to write: {e}", self.name);
        }
    }

    fn flush(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writer.flush();
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Per-logger settings.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// `None` inherits from the nearest ancestor.
    pub level: Option<Severity>,
    /// Whether records continue to ancestor handlers.
    pub propagate: bool,
    handlers: Vec<Arc<Handler>>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: None,
            propagate: true,
            handlers: Vec::new(),
        }
    }
}

impl LoggerConfig {
    pub fn handlers(&self) -> &[Arc<Handler>] {
        &self.handlers
    }

    fn set_handler(&mut self, handler: Arc<Handler>) {
        match self.handlers.iter_mut().find(|h| h.name == handler.name) {
            Some(slot) => *slot = handler,
            None => self.handlers.push(handler),
        }
    }
}

/// Named loggers keyed by target; `""` is the root.
#[derive(Debug, Clone, Default)]
pub struct LoggerRegistry {
    loggers: BTreeMap<String, LoggerConfig>,
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logger(&self, name: &str) -> Option<&LoggerConfig> {
        self.loggers.get(name)
    }

    /// Add a handler to `logger`, replacing one with the same name.
    pub fn with_handler(mut self, logger: &str, handler: Arc<Handler>) -> Self {
        self.loggers.entry(logger.to_string()).or_default().set_handler(handler);
        self
    }

    pub fn with_level(mut self, logger: &str, level: Severity) -> Self {
        self.loggers.entry(logger.to_string()).or_default().level = Some(level);
        self
    }

    pub fn with_propagate(mut self, logger: &str, propagate: bool) -> Self {
        self.loggers.entry(logger.to_string()).or_default().propagate = propagate;
        self
    }

    /// Level of the nearest logger in `target`'s ancestry that sets one.
    pub fn effective_level(&self, target: &str) -> Severity {
        ancestry(target)
            .find_map(|name| self.loggers.get(name).and_then(|logger| logger.level))
            .unwrap_or(ROOT_LEVEL)
    }

    /// Handlers a record for `target` is written to.
    pub fn handlers_for(&self, target: &str) -> Vec<Arc<Handler>> {
        let mut handlers = Vec::new();
        for name in ancestry(target) {
            if let Some(logger) = self.loggers.get(name) {
                handlers.extend(logger.handlers.iter().cloned());
                if !logger.propagate {
                    break;
                }
            }
        }
        handlers
    }

    /// Point each framework logger at the application logger's handlers.
    ///
    /// Descendants of a prefix lose their own handlers and propagate to it,
    /// and the prefix stops propagating, so every framework line is written
    /// exactly once. Applying this twice yields the same registry.
    pub fn reconciled(mut self, app_logger: &str, prefixes: &[&str]) -> Self {
        let handlers = self
            .loggers
            .get(app_logger)
            .map(|logger| logger.handlers.clone())
            .unwrap_or_default();

        for prefix in prefixes.iter().filter(|prefix| **prefix != app_logger) {
            for (name, logger) in self.loggers.iter_mut() {
                if is_descendant(name, prefix) {
                    logger.handlers.clear();
                    logger.propagate = true;
                }
            }
            let logger = self.loggers.entry(prefix.to_string()).or_default();
            logger.handlers = handlers.clone();
            logger.propagate = false;
        }
        self
    }

    fn all_handlers(&self) -> impl Iterator<Item = &Arc<Handler>> {
        self.loggers.values().flat_map(|logger| logger.handlers.iter())
    }
}

/// `target`, its `::` parents, then the root.
fn ancestry(target: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(target);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current.is_empty() {
            None
        } else {
            Some(current.rfind("::").map_or("", |i| &current[..i]))
        };
        Some(current)
    })
}

fn is_descendant(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix).is_some_and(|rest| rest.starts_with("::"))
}

fn registry() -> &'static ArcSwap<LoggerRegistry> {
    static REGISTRY: OnceLock<ArcSwap<LoggerRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| ArcSwap::from_pointee(LoggerRegistry::default()))
}

/// Snapshot of the active registry.
pub fn current() -> Arc<LoggerRegistry> {
    registry().load_full()
}

/// Replace the active registry with `update(current)`.
pub fn configure(update: impl FnOnce(LoggerRegistry) -> LoggerRegistry) {
    static WRITER: Mutex<()> = Mutex::new(());
    let _guard = WRITER.lock().unwrap_or_else(PoisonError::into_inner);
    let next = update((*registry().load_full()).clone());
    registry().store(Arc::new(next));
}

/// Attach a handler to `logger`, replacing one with the same name.
pub fn add_handler(logger: &str, handler: Handler) {
    configure(|registry| registry.with_handler(logger, Arc::new(handler)));
}

/// Install the dispatcher as the global `log` logger.
///
/// Succeeds on repeated calls; fails if another logger was set first.
pub fn install() -> Result<(), Error> {
    static DISPATCHER: Dispatcher = Dispatcher;
    static INSTALLED: OnceLock<bool> = OnceLock::new();

    let installed = *INSTALLED.get_or_init(|| {
        let installed = log::set_logger(&DISPATCHER).is_ok();
        if installed {
            log::set_max_level(LevelFilter::Trace);
        }
        installed
    });
    if installed {
        Ok(())
    } else {
        Err(Error::Install("another `log` logger is already set".to_string()))
    }
}

struct Dispatcher;

impl log::Log for Dispatcher {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        Severity::from_log_level(metadata.level()) >= registry().load().effective_level(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        let registry = registry().load();
        let mut collected = FieldCollector::default();
        let _ = record.key_values().visit(&mut collected);

        let severity = collected
            .severity
            .unwrap_or_else(|| Severity::from_log_level(record.level()));
        if severity < registry.effective_level(record.target()) {
            return;
        }
        let handlers = registry.handlers_for(record.target());
        if handlers.is_empty() {
            return;
        }

        let record = LogRecord::new(severity, record.args().to_string())
            .with_logger(record.target())
            .with_location(record.module_path(), record.file(), record.line())
            .with_fields(collected.fields)
            .with_exception(collected.exception);
        for handler in handlers {
            handler.handle(&record);
        }
    }

    fn flush(&self) {
        for handler in registry().load().all_handlers() {
            handler.flush();
        }
    }
}

/// Emits request records through the `log` facade.
#[derive(Debug, Clone)]
pub struct LogEmitter {
    logger: String,
}

impl LogEmitter {
    pub fn new(logger: impl Into<String>) -> Self {
        Self { logger: logger.into() }
    }

    pub fn logger(&self) -> &str {
        &self.logger
    }
}

impl Emit for LogEmitter {
    fn emit(&self, severity: Severity, message: &str, fields: &Fields, failure: Option<&Failure>) {
        let source = FieldSource {
            fields,
            severity,
            exception: failure.map(Failure::trace),
        };
        log::logger().log(
            &Record::builder()
                .args(format_args!("{message}"))
                .level(severity.to_log_level())
                .target(&self.logger)
                .key_values(&source)
                .build(),
        );
    }
}

/// Record fields as `log` key-values; `null` values are omitted.
struct FieldSource<'a> {
    fields: &'a Fields,
    severity: Severity,
    exception: Option<String>,
}

impl Source for FieldSource<'_> {
    fn visit<'kvs>(&'kvs self, visitor: &mut dyn VisitSource<'kvs>) -> Result<(), kv::Error> {
        visitor.visit_pair(Key::from_str(SEVERITY_KEY), kv::Value::from(self.severity.name()))?;
        if let Some(exception) = self.exception.as_deref() {
            visitor.visit_pair(Key::from_str(EXCEPTION_KEY), kv::Value::from(exception))?;
        }
        for (name, value) in self.fields {
            let value = match value {
                Value::Null => continue,
                Value::String(s) => kv::Value::from(s.as_str()),
                Value::Bool(b) => kv::Value::from(*b),
                Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                    (Some(i), _) => kv::Value::from(i),
                    (None, Some(u)) => kv::Value::from(u),
                    _ => kv::Value::from_display(n),
                },
                other => kv::Value::from_display(other),
            };
            visitor.visit_pair(Key::from_str(name), value)?;
        }
        Ok(())
    }
}

/// Reads key-values back into a field mapping.
#[derive(Default)]
struct FieldCollector {
    fields: Fields,
    severity: Option<Severity>,
    exception: Option<String>,
}

impl<'kvs> VisitSource<'kvs> for FieldCollector {
    fn visit_pair(&mut self, key: Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        match key.as_str() {
            SEVERITY_KEY => self.severity = value.to_borrowed_str().and_then(|s| s.parse().ok()),
            EXCEPTION_KEY => self.exception = Some(value.to_string()),
            name => {
                self.fields.insert(name.to_string(), kv_to_json(&value));
            }
        }
        Ok(())
    }
}

fn kv_to_json(value: &kv::Value<'_>) -> Value {
    if let Some(b) = value.to_bool() {
        Value::from(b)
    } else if let Some(i) = value.to_i64() {
        Value::from(i)
    } else if let Some(u) = value.to_u64() {
        Value::from(u)
    } else if let Some(s) = value.to_borrowed_str() {
        Value::from(s)
    } else {
        Value::from(value.to_string())
    }
}
