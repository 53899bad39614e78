//! Local server entrypoint.
//!
//! `LOG_FORMAT=json` switches log output to JSON lines.

use std::env;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

use tracker_bff::config::Config;
use tracker_bff::{AppState, create_app};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    let port = config.port;

    let state = match AppState::from_config(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "JWT_PUBLIC_KEY is not a usable RSA public key");
            std::process::exit(1);
        }
    };

    let app = create_app(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
