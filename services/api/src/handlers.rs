//! Axum Handlers for the HTTP facade.
//!
//! Exposes the service banner, health/readiness, worker status and control,
//! and the caller connection-details endpoint. Uses `utoipa` doc comments to
//! generate OpenAPI documentation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    config::EnvironmentSnapshot,
    models::{
        AgentStatusResponse, ConnectionDetails, ErrorResponse, HealthResponse, ServiceInfo,
        StartWorkerResponse,
    },
    state::AppState,
    worker::{StartOutcome, run_session},
};
use govi_core::room::{JoinGrant, RoomError};

/// Service name reported by the banner and health endpoints.
pub const SERVICE_NAME: &str = "Govi Backend API";

#[derive(Debug)]
pub enum ApiError {
    /// The request cannot be served until configuration is completed.
    ServiceUnavailable(String),
    /// Join-token minting failed; the message is safe to return.
    TokenMint(RoomError),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceUnavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(message)),
            )
                .into_response(),
            ApiError::TokenMint(err) => {
                error!(error = %err, "failed to mint a join token");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(format!(
                        "Failed to mint connection details: {}",
                        err
                    ))),
                )
                    .into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("An internal server error occurred.")),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Service banner with the current worker state.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = ServiceInfo)
    )
)]
pub async fn root(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    let status = state.supervisor.status();
    Json(ServiceInfo {
        status: "online".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        health_check: "/health".to_string(),
        worker_status: status.state.label().to_string(),
    })
}

/// Liveness plus per-variable environment readiness.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health report", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = EnvironmentSnapshot::capture();
    let status = if snapshot.all_present() {
        "healthy"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: Utc::now(),
        environment: snapshot.readiness().clone(),
        worker_status: state.supervisor.status().state.label().to_string(),
    })
}

/// Detailed worker state, including the captured failure text if any.
#[utoipa::path(
    get,
    path = "/agent/status",
    responses(
        (status = 200, description = "Worker status", body = AgentStatusResponse)
    )
)]
pub async fn agent_status(State(state): State<Arc<AppState>>) -> Json<AgentStatusResponse> {
    let status = state.supervisor.status();
    Json(AgentStatusResponse {
        worker_running: status.worker_running(),
        state: status.state.label().to_string(),
        error: status.error().map(str::to_string),
        task_id: status.task_id,
    })
}

/// Idempotent start request for the agent worker.
///
/// Also served at `POST /start-worker`.
#[utoipa::path(
    post,
    path = "/start-agent",
    responses(
        (status = 200, description = "Worker started or already running", body = StartWorkerResponse),
        (status = 503, description = "Required configuration missing", body = ErrorResponse)
    )
)]
pub async fn start_agent(State(state): State<Arc<AppState>>) -> Response {
    let outcome = match &state.worker_context {
        None => StartOutcome::ConfigurationMissing {
            missing: EnvironmentSnapshot::capture().missing(),
        },
        Some(ctx) => {
            let ctx = Arc::clone(ctx);
            state
                .supervisor
                .start(move |cancel| run_session(ctx, cancel))
        }
    };
    start_response(outcome)
}

fn start_response(outcome: StartOutcome) -> Response {
    match outcome {
        StartOutcome::Started { task_id } => {
            info!(%task_id, "agent worker started by request");
            (
                StatusCode::OK,
                Json(StartWorkerResponse {
                    status: "success".to_string(),
                    message: "Agent worker started".to_string(),
                }),
            )
                .into_response()
        }
        StartOutcome::AlreadyRunning { task_id } => {
            info!(%task_id, "start requested while agent already running");
            (
                StatusCode::OK,
                Json(StartWorkerResponse {
                    status: "success".to_string(),
                    message: "Agent already running".to_string(),
                }),
            )
                .into_response()
        }
        StartOutcome::ConfigurationMissing { missing } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            ))),
        )
            .into_response(),
    }
}

/// Mints a short-lived join token for a new caller.
///
/// Every call produces a fresh room name and participant identity.
#[utoipa::path(
    get,
    path = "/api/connection-details",
    responses(
        (status = 200, description = "Caller join credentials", body = ConnectionDetails),
        (status = 500, description = "Token minting failed", body = ErrorResponse),
        (status = 503, description = "LiveKit credentials not configured", body = ErrorResponse)
    )
)]
pub async fn connection_details(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConnectionDetails>, ApiError> {
    let rooms = state.room_service.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("LiveKit credentials are not configured".to_string())
    })?;

    let room_name = format!("voice_assistant_room_{}", Uuid::new_v4().simple());
    let identity = format!("voice_assistant_user_{}", Uuid::new_v4().simple());
    let grant = JoinGrant {
        room: room_name.clone(),
        identity: identity.clone(),
        name: identity.clone(),
        ttl: state.config.join_token_ttl,
    };
    let token = rooms.mint_join_token(&grant).map_err(ApiError::TokenMint)?;

    Ok(Json(ConnectionDetails {
        server_url: rooms.server_url().to_string(),
        room_name,
        participant_token: token,
        participant_name: identity,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StartupPolicy};
    use std::path::PathBuf;
    use std::time::Duration;
    use tracing::Level;

    fn base_config() -> Config {
        Config {
            bind_address: "127.0.0.1:3000".parse().unwrap(),
            livekit_url: None,
            livekit_api_key: None,
            livekit_api_secret: None,
            openai_api_key: None,
            realtime_model: "gpt-4o-mini-realtime-preview".to_string(),
            log_level: Level::INFO,
            prompts_path: PathBuf::from("./prompts"),
            startup_policy: StartupPolicy::Degraded,
            worker_auto_start: false,
            agent_room_name: "govi-room".to_string(),
            join_token_ttl: Duration::from_secs(900),
        }
    }

    fn configured_config() -> Config {
        Config {
            livekit_url: Some("wss://example.livekit.cloud".to_string()),
            livekit_api_key: Some("lk_test_key".to_string()),
            livekit_api_secret: Some("lk_test_secret".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            ..base_config()
        }
    }

    fn state_from(config: Config) -> Arc<AppState> {
        Arc::new(AppState::from_config(
            config,
            govi_core::agent::AgentConfig::default(),
        ))
    }

    #[tokio::test]
    async fn root_reports_online_and_idle_worker() {
        let Json(info) = root(State(state_from(base_config()))).await;
        assert_eq!(info.status, "online");
        assert_eq!(info.service, SERVICE_NAME);
        assert_eq!(info.health_check, "/health");
        assert_eq!(info.worker_status, "idle");
    }

    #[tokio::test]
    async fn health_reports_one_flag_per_required_variable() {
        let Json(health) = health(State(state_from(base_config()))).await;
        assert_eq!(health.service, SERVICE_NAME);
        assert_eq!(
            health.environment.len(),
            crate::config::REQUIRED_ENV_VARS.len()
        );
        assert_eq!(health.worker_status, "idle");
    }

    #[tokio::test]
    async fn agent_status_reports_idle_before_start() {
        let Json(status) = agent_status(State(state_from(base_config()))).await;
        assert!(!status.worker_running);
        assert_eq!(status.state, "idle");
        assert!(status.error.is_none());
        assert!(status.task_id.is_none());
    }

    #[tokio::test]
    async fn start_agent_without_configuration_returns_service_unavailable() {
        let response = start_agent(State(state_from(base_config()))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn start_response_maps_outcomes_to_status_codes() {
        let started = start_response(StartOutcome::Started {
            task_id: Uuid::new_v4(),
        });
        assert_eq!(started.status(), StatusCode::OK);

        let already = start_response(StartOutcome::AlreadyRunning {
            task_id: Uuid::new_v4(),
        });
        assert_eq!(already.status(), StatusCode::OK);

        let missing = start_response(StartOutcome::ConfigurationMissing {
            missing: vec!["OPENAI_API_KEY".to_string()],
        });
        assert_eq!(missing.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn connection_details_requires_livekit_credentials() {
        let result = connection_details(State(state_from(base_config()))).await;
        match result {
            Err(ApiError::ServiceUnavailable(message)) => {
                assert!(message.contains("LiveKit"));
            }
            _ => panic!("expected ServiceUnavailable without credentials"),
        }
    }

    #[tokio::test]
    async fn connection_details_mints_distinct_rooms_and_identities() {
        let state = state_from(configured_config());

        let Json(first) = connection_details(State(Arc::clone(&state)))
            .await
            .expect("first mint succeeds");
        let Json(second) = connection_details(State(Arc::clone(&state)))
            .await
            .expect("second mint succeeds");

        assert_eq!(first.server_url, "wss://example.livekit.cloud");
        assert!(first.room_name.starts_with("voice_assistant_room_"));
        assert!(first.participant_name.starts_with("voice_assistant_user_"));
        assert!(!first.participant_token.is_empty());

        assert_ne!(first.room_name, second.room_name);
        assert_ne!(first.participant_name, second.participant_name);
        assert_ne!(first.participant_token, second.participant_token);
    }
}
