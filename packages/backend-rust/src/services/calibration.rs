use std::sync::Arc;

use masterly_algo::{
    BktError, BktParameters, CalibrationOutcome, Recalibrator, DEFAULT_MIN_SAMPLES,
};

use crate::config::TutorConfig;
use crate::db::operations::{
    active_skill_ids_since, get_parameters, get_skill, observations_since, upsert_parameters,
    StoredParameters,
};
use crate::db::Database;
use crate::services::MS_PER_DAY;

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Estimator(#[from] BktError),
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("calibration task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Current calibration for a skill
#[derive(Debug, Clone, PartialEq)]
pub struct SkillParameters {
    pub skill_id: String,
    pub parameters: BktParameters,
    pub last_trained: Option<i64>,
    pub training_samples: i64,
    pub model_accuracy: Option<f64>,
    /// No stored row; defaults are in effect
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecalibrationResult {
    pub skill_id: String,
    pub previous: BktParameters,
    pub outcome: CalibrationOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecalibrationSummary {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub async fn get_skill_parameters(
    db: &Database,
    skill_id: &str,
) -> Result<SkillParameters, CalibrationError> {
    if get_skill(db.pool(), skill_id).await?.is_none() {
        return Err(CalibrationError::NotFound(format!("skill {skill_id} not found")));
    }

    match get_parameters(db.pool(), skill_id).await? {
        Some(stored) => Ok(SkillParameters {
            parameters: stored.to_params()?,
            skill_id: stored.skill_id,
            last_trained: stored.last_trained,
            training_samples: stored.training_samples,
            model_accuracy: stored.model_accuracy,
            is_default: false,
        }),
        None => Ok(SkillParameters {
            skill_id: skill_id.to_string(),
            parameters: BktParameters::default(),
            last_trained: None,
            training_samples: 0,
            model_accuracy: None,
            is_default: true,
        }),
    }
}

/// Re-estimate one skill from its recent attempt log. Nothing is written
/// when the log is too small.
pub async fn recalibrate(
    db: &Database,
    tutor: &TutorConfig,
    recalibrator: Arc<dyn Recalibrator>,
    skill_id: &str,
    now_ms: i64,
) -> Result<RecalibrationResult, CalibrationError> {
    let current = get_skill_parameters(db, skill_id).await?;
    let since = window_start(tutor, now_ms);
    let observations = observations_since(db.pool(), skill_id, since).await?;

    let previous = current.parameters;
    let outcome = if observations.len() < DEFAULT_MIN_SAMPLES {
        CalibrationOutcome::InsufficientData {
            samples: observations.len(),
            required: DEFAULT_MIN_SAMPLES,
        }
    } else {
        tokio::task::spawn_blocking(move || {
            recalibrator.recalibrate(&current.parameters, &observations)
        })
        .await??
    };

    match &outcome {
        CalibrationOutcome::Updated(report) => {
            let mut stored = StoredParameters::new(skill_id, &report.parameters);
            stored.last_trained = Some(now_ms);
            stored.training_samples = report.training_samples as i64;
            stored.model_accuracy = Some(report.model_accuracy);
            upsert_parameters(db.pool(), &stored).await?;

            tracing::info!(
                skill_id,
                samples = report.training_samples,
                observed_accuracy = report.observed_accuracy,
                model_accuracy = report.model_accuracy,
                learn_rate = report.parameters.learn_rate(),
                guess_rate = report.parameters.guess_rate(),
                slip_rate = report.parameters.slip_rate(),
                "skill recalibrated"
            );
        }
        CalibrationOutcome::InsufficientData { samples, required } => {
            tracing::debug!(skill_id, samples, required, "not enough attempts to recalibrate");
        }
    }

    Ok(RecalibrationResult {
        skill_id: skill_id.to_string(),
        previous,
        outcome,
    })
}

/// Recalibrate every skill practiced inside the window. Failures are logged
/// per skill and do not stop the batch.
pub async fn recalibrate_all(
    db: &Database,
    tutor: &TutorConfig,
    recalibrator: Arc<dyn Recalibrator>,
    now_ms: i64,
) -> Result<RecalibrationSummary, CalibrationError> {
    let since = window_start(tutor, now_ms);
    let skill_ids = active_skill_ids_since(db.pool(), since).await?;
    let mut summary = RecalibrationSummary::default();

    for skill_id in &skill_ids {
        match recalibrate(db, tutor, Arc::clone(&recalibrator), skill_id, now_ms).await {
            Ok(result) => match result.outcome {
                CalibrationOutcome::Updated(_) => summary.updated += 1,
                CalibrationOutcome::InsufficientData { .. } => summary.skipped += 1,
            },
            Err(err) => {
                summary.failed += 1;
                tracing::warn!(skill_id = %skill_id, error = %err, "recalibration failed");
            }
        }
    }

    Ok(summary)
}

fn window_start(tutor: &TutorConfig, now_ms: i64) -> i64 {
    now_ms.saturating_sub(tutor.calibration_window_days.saturating_mul(MS_PER_DAY))
}
