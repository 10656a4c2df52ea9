// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Twelve Weeks API Server
//!
//! Signs users in with Microsoft, creates their 12-week goal plans in
//! Microsoft To Do, and reports the current week of the program.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twelve_weeks::{config::Config, db::FileTokenStore, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Twelve Weeks API");

    // Token cache lives on disk so sign-ins survive restarts
    let store = FileTokenStore::new(config.token_cache_dir.clone());
    tracing::info!(dir = %store.dir().display(), "Token cache directory");

    let state = Arc::new(AppState::new(config.clone(), Arc::new(store))?);
    tracing::info!(
        redirect_uri = %config.redirect_uri(),
        "Microsoft OAuth configured"
    );

    // Build router
    let app = twelve_weeks::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("twelve_weeks=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
