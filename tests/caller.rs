//! Caller-context logging through `ExtraLogger`.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde_json::Value;

use request_logging::{caller_context, ExtraLogger, Fields, Severity};

mod common;

use common::{get_request, send, Recorder};

fn create_item(logger: &ExtraLogger, name: &str, quantity: u32) {
    logger.info(&caller_context!(name, quantity), "creating item", None);
}

#[test]
fn test_info_records_caller_and_arguments() {
    let recorder = Recorder::default();
    let logger = ExtraLogger::new(recorder.clone());

    create_item(&logger, "apple", 3);

    let record = recorder.single();
    assert_eq!(record.severity, Severity::Info);
    assert_eq!(record.message, "creating item");
    assert_eq!(record.text("request_body"), "{name: \"apple\", quantity: 3}");
    assert_eq!(record.text("request_path"), "tests/caller.rs create_item");
    assert_eq!(record.fields["duration"], 0);
    assert!(record.failure.is_none());
}

#[test]
fn test_level_methods() {
    let recorder = Recorder::default();
    let logger = ExtraLogger::new(recorder.clone());
    let context = caller_context!();

    logger.debug(&context, "d", None);
    logger.warn(&context, "w", None);
    logger.warning(&context, "w", None);
    logger.error(&context, "e", None);
    logger.critical(&context, "c", None);
    logger.fatal(&context, "f", None);

    let severities: Vec<_> = recorder.records().iter().map(|r| r.severity).collect();
    assert_eq!(
        severities,
        [
            Severity::Debug,
            Severity::Warning,
            Severity::Warning,
            Severity::Error,
            Severity::Critical,
            Severity::Critical,
        ]
    );
    assert_eq!(recorder.records()[0].text("request_path"), "tests/caller.rs test_level_methods");
}

#[test]
fn test_extra_overrides_everything() {
    let recorder = Recorder::default();
    let mut additional = Fields::new();
    additional.insert("application_name".into(), Value::from("shop"));
    additional.insert("request_body".into(), Value::from("replaced by arguments"));
    let logger = ExtraLogger::new(recorder.clone()).with_additional_fields(additional);

    let mut extra = Fields::new();
    extra.insert("request_path".into(), Value::from("/explicit"));
    extra.insert("order_id".into(), Value::from(42));

    let order = 42;
    logger.info(&caller_context!(order), "paid", Some(&extra));

    let record = recorder.single();
    assert_eq!(record.text("application_name"), "shop");
    assert_eq!(record.text("request_body"), "{order: 42}");
    assert_eq!(record.text("request_path"), "/explicit");
    assert_eq!(record.fields["order_id"], 42);
}

async fn lookup(State(logger): State<ExtraLogger>) -> &'static str {
    let user_id = 7;
    logger.info(&caller_context!(user_id), "lookup", None);
    "found"
}

#[tokio::test]
async fn test_async_handler_name() {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/lookup", get(lookup))
        .with_state(ExtraLogger::new(recorder.clone()));

    let (_, body) = send(&app, get_request("/lookup")).await;
    assert_eq!(body, "found");

    let record = recorder.single();
    assert_eq!(record.text("request_path"), "tests/caller.rs lookup");
    assert_eq!(record.text("request_body"), "{user_id: 7}");
}
