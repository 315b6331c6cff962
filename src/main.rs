//! Demo server for the request logging middleware.
//!
//! ```text
//! GET  /noerr                 → 200
//! GET  /redirect              → 301 to /noerr
//! GET  /missing               → 404
//! GET  /err                   → handler panics (divide by zero) → 500
//! POST /extra_logger_example  → manual record tagged with caller metadata
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

use request_logging::config::{load_config, Backend, LoggingConfig};
use request_logging::lifecycle::signals::shutdown_signal;
use request_logging::{caller_context, init_from_config, ExtraLogger, PanicPolicy};

#[derive(Debug, Parser)]
#[command(name = "request-logging", version, about = "Request logging demo server")]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the backend selected in the configuration.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Log,
    Tracing,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Log => Backend::Log,
            BackendArg::Tracing => Backend::Tracing,
        }
    }
}

#[derive(Clone)]
struct AppState {
    logger: ExtraLogger,
}

#[derive(Debug, Serialize, Deserialize)]
struct Item {
    name: String,
    price: f64,
}

#[derive(Serialize)]
struct Message {
    message: &'static str,
}

async fn noerr() -> Json<Message> {
    Json(Message { message: "Hello World" })
}

async fn err() -> String {
    let divisor = std::hint::black_box(0);
    (1 / divisor).to_string()
}

async fn redirect() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/noerr")])
}

async fn missing() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn extra_logger_example(State(state): State<AppState>, Json(item): Json<Item>) -> Json<Item> {
    state.logger.info(&caller_context!(item), "item received", None);
    Json(item)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => LoggingConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }

    let (logger, panic_policy) = match config.backend {
        Backend::Log => {
            let name = config.logging.logger_name.clone().unwrap_or_else(|| "main".to_string());
            (ExtraLogger::logging(name), config.logging.panic_policy)
        }
        Backend::Tracing => (ExtraLogger::tracing(), config.tracing.panic_policy),
    };

    let app = Router::new()
        .route("/noerr", get(noerr))
        .route("/err", get(err))
        .route("/redirect", get(redirect))
        .route("/missing", get(missing))
        .route("/extra_logger_example", post(extra_logger_example))
        .with_state(AppState { logger });

    let mut app = init_from_config(app, &config)?;
    if panic_policy == PanicPolicy::Propagate {
        app = app.layer(CatchPanicLayer::new());
    }

    let listener = TcpListener::bind(cli.bind).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        backend = ?config.backend,
        "Listening for connections"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
