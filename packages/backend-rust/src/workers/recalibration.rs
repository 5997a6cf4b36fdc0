use std::time::Instant;

use chrono::Utc;
use tracing::info;

use crate::services::calibration::{recalibrate_all, RecalibrationSummary};
use crate::state::AppState;

use super::WorkerError;

/// Nightly pass over every skill practiced inside the calibration window.
pub async fn run_recalibration_cycle(state: &AppState) -> Result<RecalibrationSummary, WorkerError> {
    let start = Instant::now();
    let now_ms = Utc::now().timestamp_millis();

    let summary = recalibrate_all(state.db(), state.tutor(), state.recalibrator(), now_ms).await?;

    info!(
        updated = summary.updated,
        skipped = summary.skipped,
        failed = summary.failed,
        duration_ms = start.elapsed().as_millis() as u64,
        "Recalibration cycle completed"
    );

    Ok(summary)
}
