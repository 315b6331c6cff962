//! Configuration management.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (templates, date patterns, file sinks)
//!     → LoggingConfig (validated, immutable)
//!     → lifecycle::startup (init_logging / init_tracing)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{Backend, FileSinkConfig, LoggingConfig, LoggingOptions, Rotation, TracingOptions};
pub use validation::{validate_config, ValidationError};
