//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared
//! resources: the loaded configuration, the immutable agent configuration,
//! the worker supervisor, and (when credentials permit) the room-service
//! client and the context the worker task runs with.

use crate::{
    config::Config,
    worker::{Supervisor, WorkerContext},
};
use govi_core::{
    agent::AgentConfig,
    room::{LiveKitRoomService, RoomService},
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub agent_config: Arc<AgentConfig>,
    pub supervisor: Arc<Supervisor>,
    /// Present only when every LiveKit credential is configured.
    pub room_service: Option<Arc<dyn RoomService>>,
    /// Present only when the full credential set (LiveKit + model provider)
    /// is configured; the worker cannot start without it.
    pub worker_context: Option<Arc<WorkerContext>>,
}

impl AppState {
    /// Builds the state, wiring the room service and worker context only
    /// when the credentials for them are available. With gaps in the
    /// environment the service still serves health/status traffic.
    pub fn from_config(config: Config, agent_config: AgentConfig) -> Self {
        let config = Arc::new(config);
        let agent_config = Arc::new(agent_config);

        let room_service: Option<Arc<dyn RoomService>> = match (
            &config.livekit_url,
            &config.livekit_api_key,
            &config.livekit_api_secret,
        ) {
            (Some(url), Some(key), Some(secret)) => Some(Arc::new(LiveKitRoomService::new(
                url.clone(),
                key.clone(),
                secret.clone(),
            ))),
            _ => None,
        };

        let worker_context = match (&room_service, &config.openai_api_key) {
            (Some(rooms), Some(openai_api_key)) => Some(Arc::new(WorkerContext {
                room_service: Arc::clone(rooms),
                agent_config: Arc::clone(&agent_config),
                openai_api_key: openai_api_key.clone(),
                room_name: config.agent_room_name.clone(),
            })),
            _ => None,
        };

        Self {
            config,
            agent_config,
            supervisor: Arc::new(Supervisor::new()),
            room_service,
            worker_context,
        }
    }
}
