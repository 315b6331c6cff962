//! Record formatting.
//!
//! # Data Flow
//! ```text
//! backend record (log::Record / tracing::Event)
//!     → record.rs (LogRecord: severity, message, fields, exception)
//!     → console.rs | file.rs | brace.rs (resolve names, derive fields)
//!     → template.rs (substitute, align, colorize)
//!     → one line for the sink
//! ```
//!
//! # Design Decisions
//! - Templates are compiled once when the formatter is built
//! - Every name resolves: native attribute, record field, schema default, ""
//! - Color is decided at construction from the output stream, not per line

pub mod brace;
pub mod console;
pub mod file;
pub mod record;
pub mod style;
pub mod template;

pub use brace::{BraceFormatter, TRACING_DEFAULT_FORMAT};
pub use console::{ConsoleFormatter, LOGGING_DEFAULT_FORMAT};
pub use file::{FileFormatter, FILE_DEFAULT_FORMAT};
pub use record::{LogRecord, DATE_DEFAULT_FORMAT};
pub use template::Template;

/// Renders a record into the text written to a sink.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
}
