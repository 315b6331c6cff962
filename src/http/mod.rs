//! HTTP request/response logging.
//!
//! # Data Flow
//! ```text
//! axum Router
//!     → middleware/logging.rs (one instance per application)
//!     → capture.rs (request head + buffered body → fields)
//!     → panic.rs (handler panic → Failure + 500)
//!     → capture.rs (response head + drained body → fields)
//!     → observability::Emit
//! ```

pub mod capture;
pub mod middleware;
pub mod panic;

pub use middleware::logging::{log_requests, PanicPolicy, RequestLogger};
pub use panic::Failure;
