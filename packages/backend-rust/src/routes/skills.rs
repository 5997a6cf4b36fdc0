use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use masterly_algo::{BktParameters, CalibrationOutcome};
use serde::Serialize;

use crate::db::operations::list_skills;
use crate::response::{ok, AppError};
use crate::routes::millis_to_iso;
use crate::services::calibration::{self, SkillParameters};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SkillDto {
    id: String,
    name: String,
    description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RatesDto {
    prior_knowledge: f64,
    learn_rate: f64,
    guess_rate: f64,
    slip_rate: f64,
}

impl From<&BktParameters> for RatesDto {
    fn from(params: &BktParameters) -> Self {
        Self {
            prior_knowledge: params.prior_knowledge(),
            learn_rate: params.learn_rate(),
            guess_rate: params.guess_rate(),
            slip_rate: params.slip_rate(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParametersResponse {
    skill_id: String,
    #[serde(flatten)]
    rates: RatesDto,
    last_trained: Option<String>,
    training_samples: i64,
    model_accuracy: Option<f64>,
    is_default: bool,
}

impl From<SkillParameters> for ParametersResponse {
    fn from(params: SkillParameters) -> Self {
        Self {
            rates: RatesDto::from(&params.parameters),
            skill_id: params.skill_id,
            last_trained: params.last_trained.map(millis_to_iso),
            training_samples: params.training_samples,
            model_accuracy: params.model_accuracy,
            is_default: params.is_default,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecalibrateResponse {
    skill_id: String,
    status: &'static str,
    samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<usize>,
    previous: RatesDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<RatesDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    observed_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_accuracy: Option<f64>,
}

pub(crate) async fn list(State(state): State<AppState>) -> Result<Response, AppError> {
    let skills: Vec<SkillDto> = list_skills(state.db().pool())
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
        .into_iter()
        .map(|skill| SkillDto {
            id: skill.id,
            name: skill.name,
            description: skill.description,
        })
        .collect();
    Ok(ok(skills).into_response())
}

pub(crate) async fn parameters(
    State(state): State<AppState>,
    Path(skill_id): Path<String>,
) -> Result<Response, AppError> {
    let params = calibration::get_skill_parameters(state.db(), &skill_id).await?;
    Ok(ok(ParametersResponse::from(params)).into_response())
}

pub(crate) async fn recalibrate(
    State(state): State<AppState>,
    Path(skill_id): Path<String>,
) -> Result<Response, AppError> {
    let now_ms = Utc::now().timestamp_millis();
    let result = calibration::recalibrate(
        state.db(),
        state.tutor(),
        state.recalibrator(),
        &skill_id,
        now_ms,
    )
    .await?;

    let previous = RatesDto::from(&result.previous);
    let response = match result.outcome {
        CalibrationOutcome::Updated(report) => RecalibrateResponse {
            skill_id: result.skill_id,
            status: "updated",
            samples: report.training_samples,
            required: None,
            previous,
            parameters: Some(RatesDto::from(&report.parameters)),
            observed_accuracy: Some(report.observed_accuracy),
            model_accuracy: Some(report.model_accuracy),
        },
        CalibrationOutcome::InsufficientData { samples, required } => RecalibrateResponse {
            skill_id: result.skill_id,
            status: "insufficient_data",
            samples,
            required: Some(required),
            previous,
            parameters: None,
            observed_accuracy: None,
            model_accuracy: None,
        },
    };

    Ok(ok(response).into_response())
}
