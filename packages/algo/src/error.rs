//! Error types shared by the estimator, the session policy and calibration.

use thiserror::Error;

/// Failures raised by the mastery estimator.
///
/// Both variants indicate corrupted calibration or corrupted stored state.
/// Callers are expected to surface them rather than recover.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BktError {
    /// A calibration value lies outside the open interval (0, 1) or is not finite.
    #[error("invalid parameter `{name}`: {value} is outside (0, 1)")]
    InvalidParameter { name: &'static str, value: f64 },

    /// A mastery probability lies outside the closed interval [0, 1] or is not finite.
    #[error("invalid mastery state: {value} is outside [0, 1]")]
    InvalidState { value: f64 },
}

/// Failures raised while driving an adaptive session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Estimator(#[from] BktError),

    /// An answer was submitted while no item was being presented.
    #[error("session is not awaiting an answer (phase: {phase})")]
    NotAwaitingAnswer { phase: &'static str },
}

pub type BktResult<T> = Result<T, BktError>;
