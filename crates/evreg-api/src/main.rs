//! # evreg-api — Binary Entry Point
//!
//! Starts the registry HTTP server. Configuration comes from the
//! environment; see [`AppConfig::from_env`].

use evreg_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_SECRET not set: caller identity is read from X-Caller-Identity");
    }
    tracing::info!(?config, "configuration loaded");

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = evreg_api::app(AppState::with_config(config));

    tracing::info!("evidence registry listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
