//! Main Entrypoint for the Govi Backend API
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment (fail-fast policy aborts
//!    here when required variables are missing).
//! 2. Initializing logging and reporting environment readiness.
//! 3. Building the shared state: room service, agent config, supervisor.
//! 4. Optionally auto-starting the worker task.
//! 5. Serving HTTP with CORS and handling graceful shutdown.

use anyhow::Context;
use axum::http::HeaderValue;
use govi_api::{
    config::{Config, EnvironmentSnapshot, redacted_preview},
    router::create_router,
    state::AppState,
    worker::run_session,
};
use govi_core::agent::{AgentConfig, DEFAULT_INSTRUCTIONS};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

/// Origins allowed to call this API from a browser.
const ALLOWED_ORIGINS: [&str; 3] = [
    "https://govi-front.onrender.com",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// Loads the system prompt from the prompts directory, if present.
fn load_instructions(prompts_path: &std::path::Path) -> String {
    let prompt_file = prompts_path.join("system_prompt.md");
    match std::fs::read_to_string(&prompt_file) {
        Ok(content) if !content.trim().is_empty() => content,
        _ => {
            warn!(
                path = %prompt_file.display(),
                "system prompt not found; using built-in instructions"
            );
            DEFAULT_INSTRUCTIONS.to_string()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    // Environment validation: loud about gaps, quiet about values.
    let snapshot = EnvironmentSnapshot::capture();
    for (name, present) in snapshot.readiness() {
        if *present {
            if let Ok(value) = std::env::var(name) {
                info!(variable = %name, preview = %redacted_preview(&value), "environment variable set");
            }
        } else {
            error!(variable = %name, "required environment variable is not set");
        }
    }
    if !snapshot.all_present() {
        warn!("starting in degraded mode; the worker cannot run until configuration is complete");
    }

    // --- 3. Build Shared State ---
    let instructions = load_instructions(&config.prompts_path);
    let agent_config = AgentConfig::new(instructions, config.realtime_model.clone());
    let state = Arc::new(AppState::from_config(config, agent_config));

    // --- 4. Auto-start the Worker ---
    if state.config.worker_auto_start {
        match &state.worker_context {
            Some(ctx) => {
                let ctx = Arc::clone(ctx);
                let outcome = state
                    .supervisor
                    .start(move |cancel| run_session(ctx, cancel));
                info!(?outcome, "worker auto-start requested");
            }
            None => warn!("worker auto-start skipped: configuration incomplete"),
        }
    }

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            ALLOWED_ORIGINS.into_iter().map(HeaderValue::from_static),
        ))
        // Credentialed CORS cannot use wildcards; mirror what the browser
        // asks for instead.
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let app = create_router(Arc::clone(&state)).layer(cors);

    // --- 6. Start Server ---
    info!(
        bind_address = %state.config.bind_address,
        model = %state.agent_config.model,
        room = %state.config.agent_room_name,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(state.config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Stop the worker after the HTTP server has drained.
    state.supervisor.shutdown().await;
    info!("Server has shut down.");
    Ok(())
}
