//! End-to-end through the `tracing` backend.
//!
//! The global subscriber can only be installed once per process, so the
//! whole bootstrap sequence runs in one test.

use std::fs;
use std::path::Path;
use std::time::Duration;

use axum::http::StatusCode;

use request_logging::config::{FileSinkConfig, Rotation};
use request_logging::{init_tracing, Error, TracingOptions};

mod common;

use common::{get_request, routes, send};

fn read_dir_contents(directory: &Path) -> String {
    let mut contents = String::new();
    for entry in fs::read_dir(directory).unwrap() {
        contents.push_str(&fs::read_to_string(entry.unwrap().path()).unwrap());
    }
    contents
}

#[tokio::test]
async fn test_bootstrap_sequence() {
    let directory = std::env::temp_dir().join(format!("request-logging-tracing-{}", std::process::id()));
    let _ = fs::remove_dir_all(&directory);

    let invalid = TracingOptions {
        format: "{level".to_string(),
        ..Default::default()
    };
    assert!(matches!(init_tracing(routes(), invalid), Err(Error::Template { .. })));

    let options = TracingOptions {
        application_name: "shop".to_string(),
        file: Some(FileSinkConfig {
            directory: directory.clone(),
            file_name_prefix: "requests.log".to_string(),
            rotation: Rotation::Never,
            format: "%(name)s %(levelname)s %(request_path)s %(response_status_code)s %(duration)d".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };
    let app = init_tracing(routes(), options.clone()).unwrap();

    let (status, _) = send(&app, get_request("/noerr")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, get_request("/err")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Internal Server Error");

    tokio::time::sleep(Duration::from_millis(20)).await;
    let contents = read_dir_contents(&directory);
    let lines: Vec<&str> = contents.lines().filter(|line| line.starts_with("shop ")).collect();
    assert_eq!(lines.len(), 2, "{contents}");
    assert!(lines[0].starts_with("shop INFO /noerr 200 "), "{}", lines[0]);
    assert!(lines[1].starts_with("shop ERROR /err 500 "), "{}", lines[1]);

    // Second install keeps the first subscriber and still attaches logging.
    let again = init_tracing(routes(), options).unwrap();
    let (status, _) = send(&again, get_request("/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let _ = fs::remove_dir_all(&directory);
}
