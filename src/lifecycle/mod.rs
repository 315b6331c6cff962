//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Options → Formatters and sinks → Install backend → Reconcile
//!     framework loggers → Attach middleware
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown of the serving loop
//! ```
//!
//! # Design Decisions
//! - Fail fast: bad templates or unopenable sinks abort before any global
//!   state is touched
//! - Bootstrapping twice is harmless

pub mod signals;
pub mod startup;

pub use startup::{init_from_config, init_logging, init_tracing};
