//! API Response Models
//!
//! JSON bodies for the HTTP facade. Every type carries a `utoipa` schema
//! for the generated OpenAPI documentation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// Service banner returned from `GET /`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct ServiceInfo {
    #[schema(example = "online")]
    pub status: String,
    #[schema(example = "Govi Backend API")]
    pub service: String,
    pub version: String,
    #[schema(example = "/health")]
    pub health_check: String,
    #[schema(example = "running")]
    pub worker_status: String,
}

/// Liveness and readiness report returned from `GET /health`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    /// One entry per required environment variable, true iff set and
    /// non-empty. Values are never included.
    pub environment: BTreeMap<String, bool>,
    #[schema(example = "running")]
    pub worker_status: String,
}

/// Detailed worker state returned from `GET /agent/status`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct AgentStatusResponse {
    pub worker_running: bool,
    #[schema(example = "failed")]
    pub state: String,
    /// Captured failure text, present only after a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub task_id: Option<Uuid>,
}

/// Result of `POST /start-agent` / `POST /start-worker`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct StartWorkerResponse {
    #[schema(example = "success")]
    pub status: String,
    #[schema(example = "Agent already running")]
    pub message: String,
}

/// Join credentials for a new caller, returned from
/// `GET /api/connection-details`. Field names match what the web frontend
/// expects.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub server_url: String,
    pub room_name: String,
    pub participant_token: String,
    pub participant_name: String,
}

/// JSON error body; `status` is always `"error"`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct ErrorResponse {
    #[schema(example = "error")]
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let error = ErrorResponse::new("join token could not be minted");
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(
            json,
            r#"{"status":"error","message":"join token could not be minted"}"#
        );
    }

    #[test]
    fn test_connection_details_uses_camel_case_keys() {
        let details = ConnectionDetails {
            server_url: "wss://example.livekit.cloud".to_string(),
            room_name: "voice_assistant_room_1".to_string(),
            participant_token: "jwt".to_string(),
            participant_name: "voice_assistant_user_1".to_string(),
        };

        let value = serde_json::to_value(&details).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("serverUrl"));
        assert!(object.contains_key("roomName"));
        assert!(object.contains_key("participantToken"));
        assert!(object.contains_key("participantName"));

        let round_trip: ConnectionDetails = serde_json::from_value(value).unwrap();
        assert_eq!(round_trip.room_name, details.room_name);
    }

    #[test]
    fn test_agent_status_omits_empty_optionals() {
        let status = AgentStatusResponse {
            worker_running: true,
            state: "running".to_string(),
            error: None,
            task_id: None,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(!json.contains("error"));
        assert!(!json.contains("task_id"));

        let failed = AgentStatusResponse {
            worker_running: false,
            state: "failed".to_string(),
            error: Some("room connection failed".to_string()),
            task_id: Some(Uuid::new_v4()),
        };
        let json = serde_json::to_string(&failed).unwrap();
        assert!(json.contains("room connection failed"));
        assert!(json.contains("task_id"));
    }

    #[test]
    fn test_health_response_serializes_environment_map() {
        let mut environment = BTreeMap::new();
        environment.insert("LIVEKIT_API_KEY".to_string(), false);
        environment.insert("LIVEKIT_URL".to_string(), true);

        let health = HealthResponse {
            status: "degraded".to_string(),
            service: "Govi Backend API".to_string(),
            timestamp: Utc::now(),
            environment,
            worker_status: "idle".to_string(),
        };

        let value = serde_json::to_value(&health).unwrap();
        assert_eq!(value["environment"]["LIVEKIT_API_KEY"], false);
        assert_eq!(value["environment"]["LIVEKIT_URL"], true);
        assert_eq!(value["status"], "degraded");
    }

    #[test]
    fn test_service_info_round_trip() {
        let info = ServiceInfo {
            status: "online".to_string(),
            service: "Govi Backend API".to_string(),
            version: "0.1.0".to_string(),
            health_check: "/health".to_string(),
            worker_status: "idle".to_string(),
        };
        let json = serde_json::to_string(&info).unwrap();
        let round_trip: ServiceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(round_trip.status, "online");
        assert_eq!(round_trip.health_check, "/health");
    }
}
