//! Configuration schema definitions.
//!
//! Options for both bootstraps. All types derive Serde traits for
//! deserialization from config files, and every section has defaults so a
//! minimal (or empty) file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{self, RollingFileAppender};

use crate::error::Error;
use crate::format::{DATE_DEFAULT_FORMAT, FILE_DEFAULT_FORMAT, LOGGING_DEFAULT_FORMAT, TRACING_DEFAULT_FORMAT};
use crate::http::middleware::logging::{PanicPolicy, DEFAULT_BODY_LIMIT};
use crate::observability::level::Severity;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Which backend the demo binary bootstraps.
    pub backend: Backend,

    /// Options for the `log` backend.
    pub logging: LoggingOptions,

    /// Options for the `tracing` backend.
    pub tracing: TracingOptions,
}

/// Backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Log,
    #[default]
    Tracing,
}

/// Options for `init_logging`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Logger (target) name. Defaults to the stem of the file calling
    /// `init_logging`.
    pub logger_name: Option<String>,

    /// Percent-style console template.
    pub format: String,

    /// strftime pattern for `asctime`.
    pub datefmt: String,

    /// Minimum severity written by the application logger.
    pub level: Severity,

    /// Render exception traces on the console.
    pub traceback_to_console: bool,

    /// Value of the `application_name` field.
    pub application_name: String,

    /// Passthrough flag attached to every request record.
    pub to_mask: bool,

    pub panic_policy: PanicPolicy,

    /// Bodies above this many bytes are logged as `""`.
    pub body_limit: usize,

    /// Optional rotating file sink.
    pub file: Option<FileSinkConfig>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            logger_name: None,
            format: LOGGING_DEFAULT_FORMAT.to_string(),
            datefmt: DATE_DEFAULT_FORMAT.to_string(),
            level: Severity::Info,
            traceback_to_console: false,
            application_name: String::new(),
            to_mask: true,
            panic_policy: PanicPolicy::default(),
            body_limit: DEFAULT_BODY_LIMIT,
            file: None,
        }
    }
}

/// Options for `init_tracing`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingOptions {
    /// Brace-style console template with `<color>` markup.
    pub format: String,

    /// Minimum severity written to the console.
    pub level: Severity,

    pub traceback_to_console: bool,

    pub application_name: String,

    pub to_mask: bool,

    pub panic_policy: PanicPolicy,

    pub body_limit: usize,

    pub file: Option<FileSinkConfig>,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            format: TRACING_DEFAULT_FORMAT.to_string(),
            level: Severity::Info,
            traceback_to_console: false,
            application_name: String::new(),
            to_mask: true,
            panic_policy: PanicPolicy::default(),
            body_limit: DEFAULT_BODY_LIMIT,
            file: None,
        }
    }
}

/// Rotating file sink.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileSinkConfig {
    /// Directory the log files are created in.
    pub directory: PathBuf,

    /// File name prefix; the rotation date is appended.
    pub file_name_prefix: String,

    pub rotation: Rotation,

    /// Percent-style file template.
    pub format: String,

    pub datefmt: String,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name_prefix: "requests.log".to_string(),
            rotation: Rotation::Daily,
            format: FILE_DEFAULT_FORMAT.to_string(),
            datefmt: DATE_DEFAULT_FORMAT.to_string(),
        }
    }
}

impl FileSinkConfig {
    /// Open the rolling appender, creating the directory if needed.
    pub fn appender(&self) -> Result<RollingFileAppender, Error> {
        RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(&self.file_name_prefix)
            .build(&self.directory)
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
    }
}

/// File rotation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<Rotation> for rolling::Rotation {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Minutely => rolling::Rotation::MINUTELY,
            Rotation::Hourly => rolling::Rotation::HOURLY,
            Rotation::Daily => rolling::Rotation::DAILY,
            Rotation::Never => rolling::Rotation::NEVER,
        }
    }
}
