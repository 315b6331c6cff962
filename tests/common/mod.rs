//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceExt;

use request_logging::{Emit, Failure, Fields, Severity};

/// One record captured by [`Recorder`].
#[derive(Debug, Clone)]
pub struct Emitted {
    pub severity: Severity,
    pub message: String,
    pub fields: Fields,
    pub failure: Option<Failure>,
}

impl Emitted {
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).and_then(|v| v.as_str()).unwrap_or_default()
    }
}

/// `Emit` implementation keeping every record in memory.
#[derive(Clone, Default)]
pub struct Recorder {
    records: Arc<Mutex<Vec<Emitted>>>,
}

impl Recorder {
    pub fn records(&self) -> Vec<Emitted> {
        self.records.lock().unwrap().clone()
    }

    /// The only record emitted so far.
    pub fn single(&self) -> Emitted {
        let records = self.records();
        assert_eq!(records.len(), 1, "expected exactly one record, got {records:#?}");
        records.into_iter().next().unwrap()
    }
}

impl Emit for Recorder {
    fn emit(&self, severity: Severity, message: &str, fields: &Fields, failure: Option<&Failure>) {
        self.records.lock().unwrap().push(Emitted {
            severity,
            message: message.to_string(),
            fields: fields.clone(),
            failure: failure.cloned(),
        });
    }
}

/// In-memory writer for log handlers and subscriber layers.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub async fn divide_by_zero() -> String {
    let divisor = std::hint::black_box(0);
    (1 / divisor).to_string()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_millis(50)).await;
    "done"
}

/// Routes covering every status class, a panic, an echo and a slow handler.
pub fn routes() -> Router {
    Router::new()
        .route("/noerr", get(|| async { "ok" }))
        .route("/redirect", get(|| async { (StatusCode::MOVED_PERMANENTLY, [("location", "/noerr")]) }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/err", get(divide_by_zero))
        .route("/unit", get(|| async {}))
        .route("/slow", get(slow))
        .route("/echo", post(|body: axum::body::Bytes| async move { body }))
}

/// Send one request through `app` and return status and body text.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
