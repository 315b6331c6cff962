//! Backend bootstrap.
//!
//! # Responsibilities
//! - Build formatters and sinks from options
//! - Install the backend globally (`log` dispatcher or `tracing` subscriber)
//! - Point framework loggers at the application's sinks
//! - Attach the logging middleware to the application
//!
//! # Design Decisions
//! - Everything fallible runs before global state is changed
//! - The `log` registry replaces same-named handlers, so re-running
//!   `init_logging` does not duplicate output
//! - A second `tracing` subscriber install is ignored

use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

use axum::Router;

use crate::config::schema::{Backend, LoggingConfig, LoggingOptions, TracingOptions};
use crate::error::Error;
use crate::format::ConsoleFormatter;
use crate::http::middleware::logging::RequestLogger;
use crate::observability::logging::{self, Handler, LogEmitter, FRAMEWORK_LOGGERS};
use crate::observability::tracing::{self as tracing_backend, TracingEmitter};

/// Bootstrap the `log` backend and attach the middleware to `app`.
///
/// Without `options.logger_name` the logger is named after the stem of the
/// calling source file.
#[track_caller]
pub fn init_logging<S>(app: Router<S>, options: LoggingOptions) -> Result<Router<S>, Error>
where
    S: Clone + Send + Sync + 'static,
{
    let caller = Location::caller();
    let logger_name = options
        .logger_name
        .clone()
        .unwrap_or_else(|| default_logger_name(caller.file()));

    let console = ConsoleFormatter::new(&options.format, &options.datefmt, options.traceback_to_console)?;
    let file = options.file.as_ref().map(Handler::file).transpose()?;

    logging::install()?;
    logging::configure(|registry| {
        let mut registry = registry
            .with_level(&logger_name, options.level)
            .with_handler(&logger_name, Arc::new(Handler::console(console)));
        if let Some(file) = file {
            registry = registry.with_handler(&logger_name, Arc::new(file));
        }
        registry.reconciled(&logger_name, &FRAMEWORK_LOGGERS)
    });

    tracing::info!(
        logger = %logger_name,
        level = %options.level,
        file_sink = options.file.is_some(),
        "log backend installed"
    );

    let logger = RequestLogger::new(LogEmitter::new(logger_name))
        .with_application_name(options.application_name)
        .with_mask(options.to_mask)
        .with_panic_policy(options.panic_policy)
        .with_body_limit(options.body_limit);
    Ok(logger.attach(app))
}

/// Bootstrap the `tracing` backend and attach the middleware to `app`.
pub fn init_tracing<S>(app: Router<S>, options: TracingOptions) -> Result<Router<S>, Error>
where
    S: Clone + Send + Sync + 'static,
{
    tracing_backend::install(&options)?;

    tracing::info!(
        level = %options.level,
        file_sink = options.file.is_some(),
        "tracing backend installed"
    );

    let logger = RequestLogger::new(TracingEmitter::new())
        .with_application_name(options.application_name)
        .with_mask(options.to_mask)
        .with_panic_policy(options.panic_policy)
        .with_body_limit(options.body_limit);
    Ok(logger.attach(app))
}

/// Bootstrap whichever backend `config` selects.
#[track_caller]
pub fn init_from_config<S>(app: Router<S>, config: &LoggingConfig) -> Result<Router<S>, Error>
where
    S: Clone + Send + Sync + 'static,
{
    match config.backend {
        Backend::Log => init_logging(app, config.logging.clone()),
        Backend::Tracing => init_tracing(app, config.tracing.clone()),
    }
}

fn default_logger_name(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string())
}
