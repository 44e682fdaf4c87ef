//! The background worker that runs the voice-agent session.
//!
//! Structured into submodules:
//!
//! - `supervisor`: owns the single background task and its lifecycle state.
//! - `session`: the session entrypoint (room connect, participant wait,
//!   agent hand-off).
//! - `agent`: the realtime-model agent runner for one session.

pub mod agent;
pub mod session;
pub mod supervisor;

pub use session::{Session, WorkerContext, run_session};
pub use supervisor::{StartOutcome, StatusSnapshot, Supervisor, WorkerState};

use govi_core::room::RoomError;

/// Failures the worker task can surface to the supervisor.
///
/// Every variant is captured as the supervisor's `Failed` text; none of them
/// can crash the HTTP facade.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("room connection failed: {0}")]
    Connection(#[source] RoomError),
    #[error("participant wait failed: {0}")]
    ParticipantWait(#[source] RoomError),
    #[error("agent failed: {0}")]
    Agent(anyhow::Error),
}
