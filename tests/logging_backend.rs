//! End-to-end through the `log` facade backend.
//!
//! The dispatcher is process-global, so each test uses its own logger name.

use axum::http::StatusCode;

use request_logging::format::FileFormatter;
use request_logging::observability::logging::{self, Handler, LogEmitter, FRAMEWORK_LOGGERS};
use request_logging::{caller_context, init_logging, Emit, ExtraLogger, Fields, LoggingOptions, Severity};

mod common;

use common::{get_request, routes, send, SharedBuffer};

fn options(logger_name: &str) -> LoggingOptions {
    LoggingOptions {
        logger_name: Some(logger_name.to_string()),
        application_name: "shop".to_string(),
        ..Default::default()
    }
}

fn capture(logger_name: &str, format: &str) -> SharedBuffer {
    let buffer = SharedBuffer::default();
    let formatter = FileFormatter::new(format, "%Y").unwrap();
    logging::add_handler(logger_name, Handler::new("capture", formatter, buffer.clone()));
    buffer
}

#[tokio::test]
async fn test_one_line_per_request() {
    let app = init_logging(routes(), options("shop_requests")).unwrap();
    let buffer = capture(
        "shop_requests",
        "%(levelname)s %(request_path)s %(response_status_code)s %(name)s",
    );

    let (status, _) = send(&app, get_request("/noerr")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get_request("/err")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(buffer.lines(), ["INFO /noerr 200 shop", "ERROR /err 500 shop"]);
}

#[tokio::test]
async fn test_exception_reaches_file_format() {
    let app = init_logging(routes(), options("shop_failures")).unwrap();
    let buffer = capture("shop_failures", "%(levelname)s %(exceptions)s");

    send(&app, get_request("/err")).await;

    let contents = buffer.contents();
    assert!(contents.starts_with("ERROR panicked at "), "{contents}");
    assert!(contents.contains("divide by zero"), "{contents}");
}

#[tokio::test]
async fn test_critical_and_level_filter() {
    init_logging(routes(), options("shop_levels")).unwrap();
    let buffer = capture("shop_levels", "%(levelname)s %(levelno)d %(message)s");

    let emitter = LogEmitter::new("shop_levels");
    emitter.emit(Severity::Critical, "disk full", &Fields::new(), None);
    emitter.emit(Severity::Debug, "below the logger level", &Fields::new(), None);

    assert_eq!(buffer.lines(), ["CRITICAL 50 disk full"]);
}

#[tokio::test]
async fn test_extra_logger_through_log() {
    init_logging(routes(), options("shop_manual")).unwrap();
    let buffer = capture("shop_manual", "%(request_path)s | %(request_body)s | %(message)s");

    let logger = ExtraLogger::logging("shop_manual");
    let sku = "A-1";
    logger.warning(&caller_context!(sku), "low stock", None);

    assert_eq!(
        buffer.lines(),
        ["tests/logging_backend.rs test_extra_logger_through_log | {sku: \"A-1\"} | low stock"]
    );
}

#[tokio::test]
async fn test_bootstrap_twice_is_idempotent() {
    let app = init_logging(routes(), options("shop_twice")).unwrap();
    let app = init_logging(app, options("shop_twice")).unwrap();
    let buffer = capture("shop_twice", "%(request_path)s");

    send(&app, get_request("/noerr")).await;
    assert_eq!(buffer.lines(), ["/noerr"]);

    let registry = logging::current();
    let names: Vec<_> = registry
        .logger("shop_twice")
        .unwrap()
        .handlers()
        .iter()
        .map(|h| h.name().to_string())
        .collect();
    assert_eq!(names, ["console", "capture"]);

    for prefix in FRAMEWORK_LOGGERS {
        let logger = registry.logger(prefix).unwrap();
        assert!(!logger.propagate, "{prefix}");
    }
    assert!(logging::install().is_ok());
}

#[tokio::test]
async fn test_invalid_template_rejected() {
    let mut options = options("shop_invalid");
    options.format = "%(message".to_string();
    assert!(matches!(
        init_logging(routes(), options),
        Err(request_logging::Error::Template { .. })
    ));
}
