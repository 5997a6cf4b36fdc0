//! Bayesian Knowledge Tracing Estimator
//!
//! Two-step mastery update for a single graded opportunity:
//!
//! 1. Bayesian posterior given the observed outcome
//!    - correct:   `P(L|C) = P(L)(1-S) / (P(L)(1-S) + (1-P(L))G)`
//!    - incorrect: `P(L|I) = P(L)S / (P(L)S + (1-P(L))(1-G))`
//! 2. Learning transition: `P(L') = P(L|obs) + (1 - P(L|obs)) * T`
//!
//! Every function here is pure over its arguments and safe to call
//! concurrently.

use crate::error::BktResult;
use crate::sanitize::{clamp_probability, require_mastery};
use crate::types::{BktParameters, MasteryState};

/// Posterior mastery given an observed outcome, before the learning transition.
pub fn posterior(current_mastery: f64, is_correct: bool, params: &BktParameters) -> BktResult<f64> {
    let p = require_mastery(current_mastery)?;
    let guess = params.guess_rate();
    let slip = params.slip_rate();

    // Both evidence terms are strictly positive for p in [0, 1] and rates in (0, 1).
    let (numerator, evidence) = if is_correct {
        let known = p * (1.0 - slip);
        (known, known + (1.0 - p) * guess)
    } else {
        let known = p * slip;
        (known, known + (1.0 - p) * (1.0 - guess))
    };

    Ok(clamp_probability(numerator / evidence))
}

/// Updated mastery after one graded opportunity.
pub fn update(current_mastery: f64, is_correct: bool, params: &BktParameters) -> BktResult<f64> {
    let posterior = posterior(current_mastery, is_correct, params)?;
    let learned = posterior + (1.0 - posterior) * params.learn_rate();
    Ok(clamp_probability(learned))
}

/// Probability of a correct answer at the given mastery: `P(L)(1-S) + (1-P(L))G`.
pub fn predict_correct(mastery: f64, params: &BktParameters) -> BktResult<f64> {
    let p = require_mastery(mastery)?;
    Ok(clamp_probability(
        p * (1.0 - params.slip_rate()) + (1.0 - p) * params.guess_rate(),
    ))
}

/// Apply one graded attempt to a stored state, producing its successor.
///
/// This is the whole read-modify-write step: callers load `state`, call
/// `apply`, and persist the result inside one transaction.
pub fn apply(
    state: &MasteryState,
    is_correct: bool,
    params: &BktParameters,
    now_ms: i64,
) -> BktResult<MasteryState> {
    let estimated_mastery = update(state.estimated_mastery, is_correct, params)?;
    Ok(MasteryState {
        estimated_mastery,
        opportunity_count: state.opportunity_count.saturating_add(1),
        last_updated: now_ms,
    })
}
