//! Runner status heartbeat
//!
//! Pushes the runner status to the registry on a fixed interval. Pool edges
//! (became full, became accepting again) cut the wait short so the registry
//! hears about them at once; the next tick is then scheduled from that push.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use conveyor_core::domain::runner::RunnerStatus;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pool::{PoolStatus, PoolStatusListener, WorkerProcessingPool};
use crate::repository::{RegistryError, RunnerRepository};

/// Source of the status to report
pub trait StatusProvider: Send + Sync {
    fn current_status(&self) -> RunnerStatus;
}

/// Destination of status reports
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, status: RunnerStatus) -> Result<(), RegistryError>;
}

impl<P> StatusProvider for WorkerProcessingPool<P>
where
    P: Clone + Send + 'static,
{
    fn current_status(&self) -> RunnerStatus {
        match self.status() {
            PoolStatus::Full => RunnerStatus::Running,
            PoolStatus::Accepting => RunnerStatus::Idle,
        }
    }
}

/// Notifier patching this runner's status in the registry
pub struct RegistryNotifier {
    runners: Arc<dyn RunnerRepository>,
    runner_id: String,
}

impl RegistryNotifier {
    pub fn new(runners: Arc<dyn RunnerRepository>, runner_id: impl Into<String>) -> Self {
        Self {
            runners,
            runner_id: runner_id.into(),
        }
    }
}

#[async_trait]
impl StatusNotifier for RegistryNotifier {
    async fn notify(&self, status: RunnerStatus) -> Result<(), RegistryError> {
        self.runners.patch_status(&self.runner_id, status).await
    }
}

pub struct RunnerStatusManager {
    provider: Arc<dyn StatusProvider>,
    notifier: Arc<dyn StatusNotifier>,
    interval: Duration,
    last_known: Mutex<Option<RunnerStatus>>,
    wake: Notify,
}

impl RunnerStatusManager {
    pub fn new(
        provider: Arc<dyn StatusProvider>,
        notifier: Arc<dyn StatusNotifier>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            notifier,
            interval,
            last_known: Mutex::new(None),
            wake: Notify::new(),
        })
    }

    /// Starts the heartbeat task
    ///
    /// The task ends when `shutdown` flips to true. A push in progress is
    /// never interrupted.
    pub fn spawn(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            info!("Starting heartbeat (interval: {:?})", manager.interval);

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(manager.interval) => {}
                    _ = manager.wake.notified() => {
                        debug!("Status edge, notifying ahead of schedule");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                manager.beat().await;
            }

            debug!("Heartbeat stopped");
        })
    }

    pub fn on_idle(&self) {
        self.edge(RunnerStatus::Idle);
    }

    pub fn on_busy(&self) {
        self.edge(RunnerStatus::Running);
    }

    fn edge(&self, status: RunnerStatus) {
        {
            let mut last = self.last_known();
            if *last == Some(status) {
                return;
            }
            *last = Some(status);
        }
        self.wake.notify_one();
    }

    async fn beat(&self) {
        let status = self.provider.current_status();
        *self.last_known() = Some(status);

        match self.notifier.notify(status).await {
            Ok(()) => debug!("Sent status {}", status),
            Err(e) => warn!("Failed to send status {}: {}", status, e),
        }
    }

    fn last_known(&self) -> std::sync::MutexGuard<'_, Option<RunnerStatus>> {
        self.last_known.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PoolStatusListener for RunnerStatusManager {
    fn status_changed(&self, status: PoolStatus) {
        match status {
            PoolStatus::Full => self.on_busy(),
            PoolStatus::Accepting => self.on_idle(),
        }
    }
}
