//! Logger that enriches manual calls with caller metadata.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::caller::context::CallerContext;
use crate::fields::{self, Fields};
use crate::observability::logging::LogEmitter;
use crate::observability::tracing::TracingEmitter;
use crate::observability::{Emit, Severity};

/// Emits records whose `request_path` names the calling file and function
/// and whose `request_body` lists the caller's arguments.
///
/// Field precedence, lowest first: schema defaults, `additional_fields`,
/// the two caller-derived fields, then the `extra` passed to the call.
#[derive(Clone)]
pub struct ExtraLogger {
    emitter: Arc<dyn Emit>,
    additional_fields: Fields,
}

impl ExtraLogger {
    pub fn new(emitter: impl Emit + 'static) -> Self {
        Self::from_shared(Arc::new(emitter))
    }

    pub fn from_shared(emitter: Arc<dyn Emit>) -> Self {
        Self {
            emitter,
            additional_fields: Fields::new(),
        }
    }

    /// Bound to the `log` logger named `logger_name`.
    pub fn logging(logger_name: impl Into<String>) -> Self {
        Self::new(LogEmitter::new(logger_name))
    }

    /// Bound to the `tracing` backend.
    pub fn tracing() -> Self {
        Self::new(TracingEmitter::new())
    }

    pub fn with_additional_fields(mut self, additional_fields: Fields) -> Self {
        self.additional_fields = additional_fields;
        self
    }

    pub fn info(&self, context: &CallerContext, msg: &str, extra: Option<&Fields>) {
        self.log(Severity::Info, context, msg, extra);
    }

    pub fn warning(&self, context: &CallerContext, msg: &str, extra: Option<&Fields>) {
        self.log(Severity::Warning, context, msg, extra);
    }

    pub fn warn(&self, context: &CallerContext, msg: &str, extra: Option<&Fields>) {
        self.log(Severity::Warning, context, msg, extra);
    }

    pub fn error(&self, context: &CallerContext, msg: &str, extra: Option<&Fields>) {
        self.log(Severity::Error, context, msg, extra);
    }

    pub fn debug(&self, context: &CallerContext, msg: &str, extra: Option<&Fields>) {
        self.log(Severity::Debug, context, msg, extra);
    }

    pub fn critical(&self, context: &CallerContext, msg: &str, extra: Option<&Fields>) {
        self.log(Severity::Critical, context, msg, extra);
    }

    pub fn fatal(&self, context: &CallerContext, msg: &str, extra: Option<&Fields>) {
        self.log(Severity::Critical, context, msg, extra);
    }

    pub fn log(&self, severity: Severity, context: &CallerContext, msg: &str, extra: Option<&Fields>) {
        let fields = self.fields_for(context, extra);
        self.emitter.emit(severity, msg, &fields, None);
    }

    /// The merged field mapping for one call.
    pub fn fields_for(&self, context: &CallerContext, extra: Option<&Fields>) -> Fields {
        let cwd = std::env::current_dir().unwrap_or_default();
        self.merged(context, extra, &cwd)
    }

    fn merged(&self, context: &CallerContext, extra: Option<&Fields>, cwd: &Path) -> Fields {
        let mut merged = fields::defaults();
        merged.extend(self.additional_fields.clone());
        merged.insert("request_path".to_string(), Value::from(context.request_path(cwd)));
        merged.insert("request_body".to_string(), Value::from(context.arguments_display()));
        if let Some(extra) = extra {
            merged.extend(extra.clone());
        }
        merged
    }
}

impl fmt::Debug for ExtraLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraLogger")
            .field("additional_fields", &self.additional_fields)
            .finish_non_exhaustive()
    }
}
