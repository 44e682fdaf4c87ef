//! Supervision of the single background worker task.
//!
//! The supervisor owns the task handle, its cancellation token, and the
//! lifecycle state machine `{Idle, Starting, Running, Failed, Cancelled}`.
//! At most one task is live at a time; a start request while one is live is
//! a no-op that reports the existing task.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::WorkerError;

/// How long `shutdown` waits for the task to acknowledge cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle states of the worker task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// No task has run yet, or the last one completed cleanly.
    Idle,
    /// A task was launched but has not begun executing the session.
    Starting,
    /// The session is executing.
    Running,
    /// The session returned an error; the text is kept for status queries.
    Failed(String),
    /// The task observed a cancellation request and unwound.
    Cancelled,
}

impl WorkerState {
    /// Short lowercase name for JSON payloads and logs.
    pub fn label(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Failed(_) => "failed",
            WorkerState::Cancelled => "cancelled",
        }
    }

    /// True while a task exists that has not yet finished.
    pub fn is_live(&self) -> bool {
        matches!(self, WorkerState::Starting | WorkerState::Running)
    }
}

/// Outcome of a start request, mapped by the HTTP layer to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new task was launched.
    Started { task_id: Uuid },
    /// A task is already live; nothing was spawned.
    AlreadyRunning { task_id: Uuid },
    /// Required configuration is absent; nothing was spawned.
    ConfigurationMissing { missing: Vec<String> },
}

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub state: WorkerState,
    pub task_id: Option<Uuid>,
}

impl StatusSnapshot {
    pub fn worker_running(&self) -> bool {
        self.state.is_live()
    }

    /// The captured failure text, when the last task failed.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            WorkerState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

struct Inner {
    state: WorkerState,
    task_id: Option<Uuid>,
    handle: Option<JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

/// Owns the worker task. Held in the application state; the inner state is
/// additionally shared with the monitor wrapper of the spawned task.
pub struct Supervisor {
    inner: Arc<Mutex<Inner>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: WorkerState::Idle,
                task_id: None,
                handle: None,
                cancel: None,
            })),
        }
    }

    /// Launches the worker task unless one is already live.
    ///
    /// The state check and the spawn happen under one lock, so two start
    /// requests racing each other cannot both create a task. The session
    /// future is built from the supplied closure, which receives the
    /// cancellation token it must observe.
    pub fn start<F, Fut>(&self, make_session: F) -> StartOutcome
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        let mut inner = self.inner.lock().expect("supervisor lock poisoned");
        if inner.state.is_live() {
            // task_id is always recorded while a task is live.
            if let Some(task_id) = inner.task_id {
                return StartOutcome::AlreadyRunning { task_id };
            }
        }

        let task_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let session = make_session(cancel.clone());

        let monitor_inner = Arc::clone(&self.inner);
        let monitor_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            Self::note_running(&monitor_inner, task_id);
            let result = session.await;
            Self::note_finished(&monitor_inner, task_id, monitor_cancel.is_cancelled(), result);
        });

        inner.state = WorkerState::Starting;
        inner.task_id = Some(task_id);
        inner.handle = Some(handle);
        inner.cancel = Some(cancel);
        info!(%task_id, "worker task launched");
        StartOutcome::Started { task_id }
    }

    /// Returns the current state without blocking on anything but the
    /// supervisor's own lock.
    pub fn status(&self) -> StatusSnapshot {
        let inner = self.inner.lock().expect("supervisor lock poisoned");
        StatusSnapshot {
            state: inner.state.clone(),
            task_id: inner.task_id,
        }
    }

    /// Cancels the live task, if any, and waits for it to acknowledge.
    ///
    /// Never returns an error: panics in the task and grace-period overruns
    /// are logged and swallowed so shutdown hooks stay clean.
    pub async fn shutdown(&self) {
        let (cancel, handle, task_id) = {
            let mut inner = self.inner.lock().expect("supervisor lock poisoned");
            (inner.cancel.take(), inner.handle.take(), inner.task_id)
        };
        let Some(mut handle) = handle else {
            return;
        };
        if let Some(cancel) = cancel {
            info!(?task_id, "requesting worker cancellation");
            cancel.cancel();
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(join_error)) => {
                error!(error = %join_error, "worker task panicked during shutdown");
            }
            Err(_) => {
                warn!(?task_id, "worker task ignored cancellation; aborting it");
                handle.abort();
            }
        }
    }

    fn note_running(inner: &Mutex<Inner>, task_id: Uuid) {
        let mut inner = inner.lock().expect("supervisor lock poisoned");
        if inner.task_id == Some(task_id) && inner.state == WorkerState::Starting {
            inner.state = WorkerState::Running;
        }
    }

    fn note_finished(
        inner: &Mutex<Inner>,
        task_id: Uuid,
        cancelled: bool,
        result: Result<(), WorkerError>,
    ) {
        let mut inner = inner.lock().expect("supervisor lock poisoned");
        if inner.task_id != Some(task_id) {
            // A newer task has taken over; a stale monitor must not clobber it.
            return;
        }
        inner.handle = None;
        inner.cancel = None;
        inner.state = if cancelled {
            if let Err(err) = result {
                warn!(%task_id, error = %err, "worker task errored while unwinding from cancellation");
            } else {
                info!(%task_id, "worker task cancelled");
            }
            WorkerState::Cancelled
        } else {
            match result {
                Ok(()) => {
                    info!(%task_id, "worker task completed");
                    WorkerState::Idle
                }
                Err(err) => {
                    error!(%task_id, error = %err, "worker task failed");
                    WorkerState::Failed(err.to_string())
                }
            }
        };
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
