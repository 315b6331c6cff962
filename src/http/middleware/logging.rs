//! Request/response logging middleware.
//!
//! # Responsibilities
//! - Buffer the request body and hand the same bytes to the handler
//! - Leave bodies over the size limit unlogged but intact
//! - Capture request and response fields
//! - Turn handler panics into 500 responses with the failure recorded
//! - Emit exactly one record per request
//!
//! # Data Flow
//! ```text
//! Request
//!     → buffer body, capture request fields
//!     → next.run (panic capture)
//!     → drain response body, capture response fields
//!     → Emit::emit(severity, message, fields, failure)
//!     → Response rebuilt from the same parts
//! ```

use std::fmt;
use std::panic;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::RequestResponseFields;
use crate::http::capture::{capture_request, capture_response};
use crate::http::panic::{self as panic_capture, Failure};
use crate::observability::{Emit, Severity};

/// Body of the response synthesized for a panicking handler.
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// Largest body kept for logging, matching axum's `DefaultBodyLimit`.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// What happens after a handler panic has been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanicPolicy {
    /// Answer with a 500.
    #[default]
    Respond,
    /// Resume unwinding, for an outer `CatchPanicLayer` to handle.
    Propagate,
}

/// Middleware state: the backend plus per-application options.
#[derive(Clone)]
pub struct RequestLogger {
    emitter: Arc<dyn Emit>,
    application_name: String,
    to_mask: bool,
    panic_policy: PanicPolicy,
    body_limit: usize,
}

impl RequestLogger {
    pub fn new(emitter: impl Emit + 'static) -> Self {
        Self::from_shared(Arc::new(emitter))
    }

    pub fn from_shared(emitter: Arc<dyn Emit>) -> Self {
        panic_capture::install_hook();
        Self {
            emitter,
            application_name: String::new(),
            to_mask: true,
            panic_policy: PanicPolicy::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_application_name(mut self, application_name: impl Into<String>) -> Self {
        self.application_name = application_name.into();
        self
    }

    /// Value of the `to_mask` flag attached to every record.
    pub fn with_mask(mut self, to_mask: bool) -> Self {
        self.to_mask = to_mask;
        self
    }

    pub fn with_panic_policy(mut self, panic_policy: PanicPolicy) -> Self {
        self.panic_policy = panic_policy;
        self
    }

    /// Bodies larger than `body_limit` bytes are logged as `""` and
    /// streamed through unchanged.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    pub fn emitter(&self) -> &Arc<dyn Emit> {
        &self.emitter
    }

    pub fn panic_policy(&self) -> PanicPolicy {
        self.panic_policy
    }

    /// Wrap every route of `app` with this middleware.
    pub fn attach<S>(self, app: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        app.layer(middleware::from_fn_with_state(self, log_requests))
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("application_name", &self.application_name)
            .field("to_mask", &self.to_mask)
            .field("panic_policy", &self.panic_policy)
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

/// Set on requests already seen by an outer instance.
#[derive(Debug, Clone, Copy)]
struct Logged;

pub async fn log_requests(State(logger): State<RequestLogger>, mut request: Request, next: Next) -> Response {
    if request.extensions().get::<Logged>().is_some() {
        return next.run(request).await;
    }
    request.extensions_mut().insert(Logged);
    let started = Instant::now();

    let mut fields = RequestResponseFields {
        application_name: logger.application_name.clone(),
        ..Default::default()
    };

    let (parts, body) = request.into_parts();
    let body = match buffer(body, logger.body_limit).await {
        Ok(buffered) => buffered,
        Err(_) => Buffered::complete(Bytes::new()),
    };
    let logged = body.bytes.as_deref().unwrap_or_default();
    capture_request(&parts, std::str::from_utf8(logged).unwrap_or_default(), &mut fields);
    let request = Request::from_parts(parts, body.body);

    let (response, failure, payload) = match panic_capture::catch_panic(next.run(request)).await {
        Ok((response, caught)) => {
            let (parts, body) = response.into_parts();
            match buffer(body, logger.body_limit).await {
                Ok(buffered) => {
                    capture_response(&parts, buffered.bytes.as_deref().unwrap_or_default(), &mut fields);
                    (Response::from_parts(parts, buffered.body), caught, None)
                }
                Err(e) => {
                    let failure = Failure::new(format!("failed to read response body: {e}"));
                    (internal_error(&mut fields), Some(failure), None)
                }
            }
        }
        Err((failure, payload)) => (internal_error(&mut fields), Some(failure), Some(payload)),
    };
    fields.duration = Some(elapsed_ms(started));

    let status = response.status().as_u16();
    let severity = match failure {
        Some(_) => Severity::Error,
        None => Severity::from_status(status),
    };
    let outcome = if severity == Severity::Error { "Error" } else { "Response" };
    let message = format!(
        "{outcome} with code {status} for request {} \"{}\"",
        fields.request_method, fields.request_uri
    );

    let mut record = fields.into_fields();
    record.insert("to_mask".to_string(), Value::Bool(logger.to_mask));
    logger.emitter.emit(severity, &message, &record, failure.as_ref());

    if let (PanicPolicy::Propagate, Some(payload)) = (logger.panic_policy, payload) {
        panic::resume_unwind(payload);
    }
    response
}

/// A body read for logging, plus the body to pass on.
struct Buffered {
    /// `None` when the body exceeded the limit.
    bytes: Option<Bytes>,
    body: Body,
}

impl Buffered {
    fn complete(bytes: Bytes) -> Self {
        Self {
            bytes: Some(bytes.clone()),
            body: Body::from(bytes),
        }
    }
}

/// Read `body` up to `limit` bytes. Past the limit, the bytes read so far
/// are replayed ahead of the rest of the stream.
async fn buffer(body: Body, limit: usize) -> Result<Buffered, axum::Error> {
    let mut chunks = body.into_data_stream();
    let mut read = Vec::new();
    while let Some(chunk) = chunks.next().await {
        read.extend_from_slice(&chunk?);
        if read.len() > limit {
            let head = stream::once(async move { Ok::<_, axum::Error>(Bytes::from(read)) });
            return Ok(Buffered {
                bytes: None,
                body: Body::from_stream(head.chain(chunks)),
            });
        }
    }
    Ok(Buffered::complete(Bytes::from(read)))
}

/// The 500 sent in place of a failed response, with its fields captured.
fn internal_error(fields: &mut RequestResponseFields) -> Response {
    let (parts, _) = (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR)
        .into_response()
        .into_parts();
    let body = Bytes::from_static(INTERNAL_SERVER_ERROR.as_bytes());
    capture_response(&parts, &body, fields);
    Response::from_parts(parts, Body::from(body))
}

/// Elapsed milliseconds, rounded up.
fn elapsed_ms(started: Instant) -> u64 {
    let nanos = started.elapsed().as_nanos();
    u64::try_from(nanos.div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_rounds_up() {
        let started = Instant::now();
        std::thread::sleep(std::time::Duration::from_micros(1500));
        assert!(elapsed_ms(started) >= 2);
    }

    #[test]
    fn test_internal_error_fields() {
        let mut fields = RequestResponseFields::default();
        let response = internal_error(&mut fields);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fields.response_body, INTERNAL_SERVER_ERROR);
        assert_eq!(fields.response_size, Some(21));
    }

    #[tokio::test]
    async fn test_buffer_within_limit() {
        let buffered = buffer(Body::from("sku=A-1"), 16).await.unwrap();
        assert_eq!(buffered.bytes.as_deref(), Some(&b"sku=A-1"[..]));
        let replayed = axum::body::to_bytes(buffered.body, usize::MAX).await.unwrap();
        assert_eq!(replayed.as_ref(), b"sku=A-1");
    }

    #[tokio::test]
    async fn test_buffer_over_limit_replays_everything() {
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from_static(b"0123")), Ok(Bytes::from_static(b"4567")), Ok(Bytes::from_static(b"89"))];
        let body = Body::from_stream(stream::iter(chunks));

        let buffered = buffer(body, 5).await.unwrap();
        assert!(buffered.bytes.is_none());
        let replayed = axum::body::to_bytes(buffered.body, usize::MAX).await.unwrap();
        assert_eq!(replayed.as_ref(), b"0123456789");
    }

    #[test]
    fn test_panic_policy_parses() {
        let policy: PanicPolicy = serde_json::from_str("\"propagate\"").unwrap();
        assert_eq!(policy, PanicPolicy::Propagate);
        assert_eq!(PanicPolicy::default(), PanicPolicy::Respond);
    }
}
