//! Parameter Recalibration
//!
//! Batch re-estimation of a skill's learn/guess/slip rates from recent
//! attempt logs.
//!
//! - [`Recalibrator`] is the strategy seam; a more rigorous estimator
//!   (e.g. expectation-maximization over the logs) can replace the default
//!   without touching the session policy.
//! - [`AccuracyHeuristic`] maps aggregate accuracy onto clamped rates.
//! - [`replay_accuracy`] scores a parameter set by replaying each student's
//!   attempts in opportunity order (parallel across students).

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::BktResult;
use crate::estimator;
use crate::types::BktParameters;

// ==================== Constants ====================

/// Minimum attempts before recalibration runs
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// Predicted-correct cut-off used when replaying
const PREDICTION_CUTOFF: f64 = 0.5;

// ==================== Data Structures ====================

/// One graded attempt from the log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptObservation {
    pub student_id: String,
    pub correct: bool,
    /// 1-based index of the attempt within the student's history for the skill
    pub opportunity_index: u32,
}

/// Fitted parameters plus the evidence behind them
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub parameters: BktParameters,
    pub training_samples: usize,
    /// Fraction of correct attempts in the sample
    pub observed_accuracy: f64,
    /// Fraction of attempts whose outcome the fitted parameters predict
    pub model_accuracy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalibrationOutcome {
    Updated(CalibrationReport),
    InsufficientData { samples: usize, required: usize },
}

/// Strategy for re-estimating parameters from attempt logs
pub trait Recalibrator: Send + Sync {
    fn recalibrate(
        &self,
        current: &BktParameters,
        attempts: &[AttemptObservation],
    ) -> BktResult<CalibrationOutcome>;
}

// ==================== Accuracy Heuristic ====================

/// Inclusive clamp range for one rate
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateBounds {
    pub min: f64,
    pub max: f64,
}

impl RateBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Higher aggregate accuracy → higher learn rate, lower guess and slip rates.
///
/// With accuracy `a`: `guess = 1 - a`, `slip = 1 - a`, `learn = a`, each
/// clamped to its bounds. The prior is left as is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccuracyHeuristic {
    pub min_samples: usize,
    pub guess_bounds: RateBounds,
    pub slip_bounds: RateBounds,
    pub learn_bounds: RateBounds,
}

impl Default for AccuracyHeuristic {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            guess_bounds: RateBounds::new(0.1, 0.4),
            slip_bounds: RateBounds::new(0.05, 0.3),
            learn_bounds: RateBounds::new(0.1, 0.3),
        }
    }
}

impl AccuracyHeuristic {
    pub fn with_min_samples(min_samples: usize) -> Self {
        Self {
            min_samples,
            ..Self::default()
        }
    }
}

impl Recalibrator for AccuracyHeuristic {
    fn recalibrate(
        &self,
        current: &BktParameters,
        attempts: &[AttemptObservation],
    ) -> BktResult<CalibrationOutcome> {
        let required = self.min_samples.max(1);
        if attempts.len() < required {
            return Ok(CalibrationOutcome::InsufficientData {
                samples: attempts.len(),
                required,
            });
        }

        let correct = attempts.iter().filter(|a| a.correct).count();
        let accuracy = correct as f64 / attempts.len() as f64;

        let parameters = current.with_rates(
            self.learn_bounds.clamp(accuracy),
            self.guess_bounds.clamp(1.0 - accuracy),
            self.slip_bounds.clamp(1.0 - accuracy),
        )?;
        let model_accuracy = replay_accuracy(&parameters, attempts)?;

        Ok(CalibrationOutcome::Updated(CalibrationReport {
            parameters,
            training_samples: attempts.len(),
            observed_accuracy: accuracy,
            model_accuracy,
        }))
    }
}

// ==================== Replay ====================

/// Fraction of attempts whose outcome `params` predicts, replaying every
/// student from the prior. Returns 0 for an empty log.
pub fn replay_accuracy(params: &BktParameters, attempts: &[AttemptObservation]) -> BktResult<f64> {
    if attempts.is_empty() {
        return Ok(0.0);
    }

    let mut by_student: HashMap<&str, Vec<&AttemptObservation>> = HashMap::new();
    for attempt in attempts {
        by_student
            .entry(attempt.student_id.as_str())
            .or_default()
            .push(attempt);
    }

    let histories: Vec<Vec<&AttemptObservation>> = by_student.into_values().collect();
    let hits = histories
        .into_par_iter()
        .map(|mut history| {
            history.sort_by_key(|a| a.opportunity_index);
            replay_student(params, &history)
        })
        .try_reduce(|| 0usize, |a, b| Ok(a + b))?;

    Ok(hits as f64 / attempts.len() as f64)
}

fn replay_student(params: &BktParameters, history: &[&AttemptObservation]) -> BktResult<usize> {
    let mut mastery = params.prior_knowledge();
    let mut hits = 0;
    for attempt in history {
        let predicted_correct = estimator::predict_correct(mastery, params)? >= PREDICTION_CUTOFF;
        if predicted_correct == attempt.correct {
            hits += 1;
        }
        mastery = estimator::update(mastery, attempt.correct, params)?;
    }
    Ok(hits)
}
