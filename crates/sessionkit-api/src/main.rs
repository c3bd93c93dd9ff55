//! Sessionkit API Server
//!
//! Author: hephaex@gmail.com

use sessionkit_api::{create_router, state::AppState};
use sessionkit_core::{AppConfig, LoggingConfig, MemoryStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let store = Arc::new(MemoryStore::new());
    tracing::warn!(store = "memory", "principals and sessions are not persisted");

    let state = Arc::new(AppState::new(config, store)?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Sessionkit API Server starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// TOML file from `SESSIONKIT_CONFIG` if set, overridden by the environment
fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("SESSIONKIT_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.tokens.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let level = &logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sessionkit_api={level},sessionkit_core={level},tower_http={level}"
        ))
    });

    if logging.json_format {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
