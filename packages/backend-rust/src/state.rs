use std::sync::Arc;
use std::time::{Instant, SystemTime};

use masterly_algo::Recalibrator;

use crate::config::TutorConfig;
use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db: Arc<Database>,
    tutor: Arc<TutorConfig>,
    recalibrator: Arc<dyn Recalibrator>,
}

impl AppState {
    pub fn new(db: Arc<Database>, tutor: TutorConfig) -> Self {
        let recalibrator: Arc<dyn Recalibrator> = Arc::new(tutor.calibration.clone());
        Self::with_recalibrator(db, tutor, recalibrator)
    }

    pub fn with_recalibrator(
        db: Arc<Database>,
        tutor: TutorConfig,
        recalibrator: Arc<dyn Recalibrator>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db,
            tutor: Arc::new(tutor),
            recalibrator,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn db_arc(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }

    pub fn tutor(&self) -> &TutorConfig {
        &self.tutor
    }

    pub fn recalibrator(&self) -> Arc<dyn Recalibrator> {
        Arc::clone(&self.recalibrator)
    }
}
