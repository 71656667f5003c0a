// ── Connection supervisor ──
//
// Fans out one `StreamClient` per camera and owns their shutdown. Every
// worker shares one cancellation token; `shutdown` cancels it and then
// joins each task against a common deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::StreamSettings;
use crate::error::CoreError;
use crate::model::{CameraEndpoint, CameraId};
use crate::parser::EventParser;
use crate::pipeline::EventHandler;
use crate::worker::{StreamClient, WorkerState};

/// Default grace period for [`SupervisorHandle::shutdown`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Spawns camera workers that share a parser, handler, and settings.
#[derive(Clone)]
pub struct Supervisor {
    parser: Arc<dyn EventParser>,
    handler: Arc<dyn EventHandler>,
    settings: StreamSettings,
}

impl Supervisor {
    pub fn new(
        parser: Arc<dyn EventParser>,
        handler: Arc<dyn EventHandler>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            parser,
            handler,
            settings,
        }
    }

    /// Spawn one worker per endpoint and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, endpoints: Vec<CameraEndpoint>) -> SupervisorHandle {
        let cancel = CancellationToken::new();
        let mut workers = Vec::with_capacity(endpoints.len());

        for endpoint in endpoints {
            let camera_id = endpoint.id;
            let span = tracing::info_span!(
                "camera",
                camera_id = %endpoint.id,
                camera = %endpoint.label(),
                address = %endpoint.address,
            );
            let state = Arc::new(watch::Sender::new(WorkerState::Connecting));
            let state_tx = Arc::clone(&state);
            let client = StreamClient::new(
                endpoint,
                Arc::clone(&self.parser),
                Arc::clone(&self.handler),
                self.settings.clone(),
            );
            let token = cancel.child_token();

            let task = tokio::spawn(
                async move {
                    let result = client.run(token, state_tx.as_ref()).await;
                    state_tx.send_replace(WorkerState::Closed);
                    match result {
                        Ok(()) => tracing::info!("camera worker stopped"),
                        Err(ref e) => tracing::info!(error = %e, "camera worker exited"),
                    }
                    result
                }
                .instrument(span),
            );

            workers.push(Worker {
                camera_id,
                state,
                task,
            });
        }

        tracing::info!(cameras = workers.len(), "supervisor started");
        SupervisorHandle { cancel, workers }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

struct Worker {
    camera_id: CameraId,
    /// Shared with the task so an aborted worker can still be marked closed.
    state: Arc<watch::Sender<WorkerState>>,
    task: JoinHandle<Result<(), CoreError>>,
}

/// Handle to a running set of camera workers.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown)
/// leaves the workers running until the runtime stops.
pub struct SupervisorHandle {
    cancel: CancellationToken,
    workers: Vec<Worker>,
}

impl SupervisorHandle {
    /// Number of workers spawned.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of workers that have not exited yet.
    pub fn running(&self) -> usize {
        self.workers.iter().filter(|w| !w.task.is_finished()).count()
    }

    pub fn camera_ids(&self) -> Vec<CameraId> {
        self.workers.iter().map(|w| w.camera_id).collect()
    }

    /// Current state of one camera's worker.
    pub fn state(&self, camera_id: CameraId) -> Option<WorkerState> {
        self.worker(camera_id).map(|w| *w.state.borrow())
    }

    /// Watch one camera's worker state.
    pub fn subscribe(&self, camera_id: CameraId) -> Option<watch::Receiver<WorkerState>> {
        self.worker(camera_id).map(|w| w.state.subscribe())
    }

    /// Snapshot of every worker's state, in start order.
    pub fn states(&self) -> Vec<(CameraId, WorkerState)> {
        self.workers
            .iter()
            .map(|w| (w.camera_id, *w.state.borrow()))
            .collect()
    }

    fn worker(&self, camera_id: CameraId) -> Option<&Worker> {
        self.workers.iter().find(|w| w.camera_id == camera_id)
    }

    /// Stop every worker and wait up to `grace` for them to exit.
    ///
    /// Workers still running at the deadline are aborted, marked
    /// [`WorkerState::Closed`], and listed in [`CoreError::ShutdownTimeout`].
    pub async fn shutdown(self, grace: Duration) -> Result<(), CoreError> {
        tracing::info!(
            workers = self.workers.len(),
            grace_secs = grace.as_secs(),
            "shutting down camera workers"
        );
        self.cancel.cancel();

        let deadline = tokio::time::Instant::now() + grace;
        let mut stuck = Vec::new();

        for mut worker in self.workers {
            match tokio::time::timeout_at(deadline, &mut worker.task).await {
                Ok(Ok(_)) => {}
                Ok(Err(join_err)) => {
                    tracing::error!(
                        camera_id = %worker.camera_id,
                        error = %join_err,
                        "camera worker panicked"
                    );
                }
                Err(_) => {
                    worker.task.abort();
                    worker.state.send_replace(WorkerState::Closed);
                    stuck.push(worker.camera_id);
                }
            }
        }

        if stuck.is_empty() {
            tracing::info!("all camera workers stopped");
            Ok(())
        } else {
            let err = CoreError::ShutdownTimeout { cameras: stuck };
            tracing::error!(error = %err, "shutdown deadline exceeded");
            Err(err)
        }
    }

    /// Block until SIGINT/SIGTERM, then [`shutdown`](Self::shutdown).
    pub async fn shutdown_on_signal(self, grace: Duration) -> Result<(), CoreError> {
        termination_signal().await;
        self.shutdown(grace).await
    }
}

impl std::fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("workers", &self.states())
            .finish_non_exhaustive()
    }
}

/// Resolve on the first Ctrl-C or (on Unix) SIGTERM.
pub async fn termination_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("interrupt received"),
        () = terminate => tracing::info!("termination signal received"),
    }
}
