mod recalibration;

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::env_bool;
use crate::state::AppState;

pub use recalibration::run_recalibration_cycle;

const DEFAULT_RECALIBRATION_SCHEDULE: &str = "0 0 3 * * *";

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    state: AppState,
    running: AtomicBool,
}

impl WorkerManager {
    pub async fn new(state: AppState) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            state,
            running: AtomicBool::new(false),
        })
    }

    /// Schedule background jobs. Only the instance started with
    /// `WORKER_LEADER` runs them.
    pub async fn start(&self) -> Result<(), WorkerError> {
        if !env_bool("WORKER_LEADER", false) {
            info!("WORKER_LEADER not set, skipping worker startup");
            return Ok(());
        }

        info!("Starting workers (leader mode)");
        let scheduler = self.scheduler.lock().await;

        if env_bool("ENABLE_RECALIBRATION_WORKER", true) {
            let schedule = std::env::var("RECALIBRATION_SCHEDULE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RECALIBRATION_SCHEDULE.to_string());
            let state = self.state.clone();
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
                let state = state.clone();
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        result = run_recalibration_cycle(&state) => {
                            if let Err(e) = result {
                                error!(error = %e, "Recalibration worker error");
                            }
                        }
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!(schedule = %schedule, "Recalibration worker scheduled");
        }

        scheduler.start().await.map_err(WorkerError::Scheduler)?;
        self.running.store(true, Ordering::Relaxed);
        info!("All workers started");

        Ok(())
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }

        info!("Workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
    #[error("Recalibration error: {0}")]
    Calibration(#[from] crate::services::calibration::CalibrationError),
}
