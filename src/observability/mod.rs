//! Logging backends.
//!
//! # Data Flow
//! ```text
//! middleware / ExtraLogger
//!     → Emit::emit(severity, message, fields, failure)
//!     → logging.rs (log facade: key-values → LoggerRegistry handlers)
//!     → tracing.rs (tracing event: fields → fmt layer with EventFormat)
//!     → format/ (one line per record)
//!     → console / rotating file
//! ```
//!
//! # Design Decisions
//! - The middleware only knows the `Emit` trait; backends are swapped at bootstrap
//! - Every record carries the full field schema, unset keys at their defaults
//! - The exact severity name travels with the record so `CRITICAL` survives
//!   backends that stop at error

use std::sync::Arc;

use crate::fields::Fields;
use crate::http::panic::Failure;

pub mod level;
pub mod logging;
pub mod tracing;

pub use level::Severity;

/// Record key carrying the exact severity name.
pub const SEVERITY_KEY: &str = "severity";

/// Record key carrying the rendered exception trace.
pub const EXCEPTION_KEY: &str = "exception";

/// Sink for one structured record.
pub trait Emit: Send + Sync {
    fn emit(&self, severity: Severity, message: &str, fields: &Fields, failure: Option<&Failure>);
}

impl<T: Emit + ?Sized> Emit for Arc<T> {
    fn emit(&self, severity: Severity, message: &str, fields: &Fields, failure: Option<&Failure>) {
        (**self).emit(severity, message, fields, failure)
    }
}

impl<T: Emit + ?Sized> Emit for Box<T> {
    fn emit(&self, severity: Severity, message: &str, fields: &Fields, failure: Option<&Failure>) {
        (**self).emit(severity, message, fields, failure)
    }
}
