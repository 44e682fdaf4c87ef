//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the control/status endpoints and the OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AgentStatusResponse, ConnectionDetails, ErrorResponse, HealthResponse, ServiceInfo,
        StartWorkerResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::health,
        handlers::agent_status,
        handlers::start_agent,
        handlers::connection_details,
    ),
    components(
        schemas(
            ServiceInfo,
            HealthResponse,
            AgentStatusResponse,
            StartWorkerResponse,
            ConnectionDetails,
            ErrorResponse
        )
    ),
    tags(
        (name = "Govi API", description = "Lifecycle control and status for the Govi voice-agent worker")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/agent/status", get(handlers::agent_status))
        .route("/start-agent", post(handlers::start_agent))
        // Older frontends still call /start-worker; both names drive the
        // same idempotent start operation.
        .route("/start-worker", post(handlers::start_agent))
        .route("/api/connection-details", get(handlers::connection_details))
        .with_state(app_state);

    // Merge the stateful routes with the stateless documentation routes.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
