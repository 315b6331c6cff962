//! Request/response logging middleware for axum.
//!
//! One structured record per HTTP request, emitted through either the `log`
//! facade or `tracing`, plus a logger that tags manual log calls with the
//! calling function and its arguments.
//!
//! ```text
//! Router ──▶ RequestLogger (middleware) ──▶ Emit ──▶ log / tracing ──▶ Formatter ──▶ console / file
//!                                            ▲
//!                 ExtraLogger + caller_context!() ┘
//! ```

// Request pipeline
pub mod fields;
pub mod http;

// Backends and rendering
pub mod format;
pub mod observability;

// Manual logging
pub mod caller;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;

pub use caller::{CallerContext, ExtraLogger};
pub use config::schema::{FileSinkConfig, LoggingConfig, LoggingOptions, TracingOptions};
pub use error::Error;
pub use fields::{Fields, RequestResponseFields};
pub use http::{Failure, PanicPolicy, RequestLogger};
pub use lifecycle::{init_from_config, init_logging, init_tracing};
pub use observability::{Emit, Severity};
