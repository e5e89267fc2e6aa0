//! Retroznak form API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use retroznak_form_api::config::Config;
use retroznak_form_api::mailer::SendmailTransport;
use retroznak_form_api::{app, AppState};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Load environment variables first so .env RUST_LOG is available to tracing
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    let config = Config::from_env().expect("Invalid configuration");
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let transport = Arc::new(SendmailTransport::new(&config.sendmail_path));
    let state = AppState::new(config, transport);

    let app = app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to port");

    info!("Server running on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
