//! Session entrypoint: room connect, participant wait, agent hand-off.

use super::{WorkerError, agent::run_agent};
use govi_core::{
    agent::AgentConfig,
    room::{ConnectOptions, ParticipantInfo, RoomHandle, RoomService},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything the worker task needs, snapshotted when the task is started.
pub struct WorkerContext {
    pub room_service: Arc<dyn RoomService>,
    pub agent_config: Arc<AgentConfig>,
    pub openai_api_key: String,
    /// The room the agent serves.
    pub room_name: String,
}

/// One connected room + participant pair. Lives only as long as the worker
/// task that created it; nothing is persisted.
pub struct Session {
    pub room: RoomHandle,
    pub participant: ParticipantInfo,
}

/// Runs one agent session to completion.
///
/// Order is fixed: connect to the room in audio-only subscription mode,
/// block until a remote participant is present, then hand off to the agent
/// runner. The runner is invoked at most once, and only after a participant
/// is confirmed. Cancellation is observed at every suspension point and
/// unwinds without reconnecting.
pub async fn run_session(
    ctx: Arc<WorkerContext>,
    cancel: CancellationToken,
) -> Result<(), WorkerError> {
    info!(room = %ctx.room_name, "connecting to room");
    let room = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("cancellation acknowledged before room connect");
            return Ok(());
        }
        result = ctx.room_service.connect(&ctx.room_name, ConnectOptions::default()) => {
            result.map_err(WorkerError::Connection)?
        }
    };

    info!(room = %room.name, "waiting for a participant");
    let participant = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("cancellation acknowledged while waiting for a participant");
            return Ok(());
        }
        result = ctx.room_service.wait_for_participant(&room) => {
            result.map_err(WorkerError::ParticipantWait)?
        }
    };

    info!(participant = %participant.identity, "participant present; starting agent");
    let session = Session { room, participant };
    run_agent(&ctx, &session, cancel).await
}
