use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use masterly_algo::{MasteryState, Priority};
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::routes::millis_to_iso;
use crate::services::practice::{
    self, AnswerInput, AnswerSubmission, NextItem, PracticeStep,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerRequest {
    item_id: String,
    is_correct: Option<bool>,
    answer: Option<String>,
    response_time_seconds: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MasteryDto {
    estimated_mastery: f64,
    opportunity_count: u32,
    last_updated: String,
    level: &'static str,
}

impl From<&MasteryState> for MasteryDto {
    fn from(state: &MasteryState) -> Self {
        Self {
            estimated_mastery: state.estimated_mastery,
            opportunity_count: state.opportunity_count,
            last_updated: millis_to_iso(state.last_updated),
            level: state.level().as_str(),
        }
    }
}

/// Presented item. The correct answer never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemDto {
    id: String,
    skill_id: String,
    difficulty: &'static str,
    content: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NextItemResponse {
    student_id: String,
    skill_id: String,
    skill_name: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<ItemDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completion_reason: Option<&'static str>,
    mastery: MasteryDto,
    answered_in_session: usize,
    pool_size: usize,
}

impl NextItemResponse {
    fn new(student_id: &str, next: NextItem) -> Self {
        let (status, item, completion_reason) = match next.step {
            PracticeStep::Item(row) => (
                "in_progress",
                Some(ItemDto {
                    difficulty: row.difficulty.as_str(),
                    id: row.id,
                    skill_id: row.skill_id,
                    content: row.content,
                }),
                None,
            ),
            PracticeStep::Complete(reason) => ("complete", None, Some(reason.as_str())),
        };

        Self {
            student_id: student_id.to_string(),
            skill_id: next.skill.id,
            skill_name: next.skill.name,
            status,
            item,
            completion_reason,
            mastery: MasteryDto::from(&next.mastery),
            answered_in_session: next.answered_in_session,
            pool_size: next.pool_size,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerResponse {
    attempt_id: String,
    item_id: String,
    is_correct: bool,
    mastery_before: f64,
    mastery: MasteryDto,
    next: NextItemResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SkillMasteryDto {
    skill_id: String,
    skill_name: String,
    #[serde(flatten)]
    mastery: MasteryDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudentMasteryResponse {
    student_id: String,
    skills: Vec<SkillMasteryDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationDto {
    skill_id: String,
    skill_name: String,
    mastery: f64,
    level: &'static str,
    priority: Priority,
    advice: &'static str,
}

pub(crate) async fn next_item(
    State(state): State<AppState>,
    Path((student_id, skill_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let now_ms = Utc::now().timestamp_millis();
    let next =
        practice::get_next_item(state.db(), state.tutor(), &student_id, &skill_id, now_ms).await?;
    Ok(ok(NextItemResponse::new(&student_id, next)).into_response())
}

pub(crate) async fn record_answer(
    State(state): State<AppState>,
    Path((student_id, skill_id)): Path<(String, String)>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|err| AppError::validation(err.body_text()))?;

    let submission = match (request.is_correct, request.answer) {
        (Some(correct), None) => AnswerSubmission::Graded(correct),
        (None, Some(answer)) => AnswerSubmission::Response(answer),
        (Some(_), Some(_)) => {
            return Err(AppError::validation(
                "provide either isCorrect or answer, not both",
            ))
        }
        (None, None) => return Err(AppError::validation("isCorrect or answer is required")),
    };

    let input = AnswerInput {
        student_id: student_id.clone(),
        skill_id,
        item_id: request.item_id,
        submission,
        response_time_seconds: request.response_time_seconds,
    };
    let now_ms = Utc::now().timestamp_millis();
    let outcome = practice::record_answer(state.db(), state.tutor(), input, now_ms).await?;

    Ok(ok(AnswerResponse {
        attempt_id: outcome.attempt_id,
        item_id: outcome.item_id,
        is_correct: outcome.is_correct,
        mastery_before: outcome.mastery_before,
        mastery: MasteryDto::from(&outcome.mastery),
        next: NextItemResponse::new(&student_id, outcome.next),
    })
    .into_response())
}

pub(crate) async fn mastery_states(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    let states = practice::get_mastery_states(state.db(), &student_id).await?;
    let skills = states
        .into_iter()
        .map(|s| SkillMasteryDto {
            mastery: MasteryDto::from(&s.state),
            skill_id: s.skill_id,
            skill_name: s.skill_name,
        })
        .collect();

    Ok(ok(StudentMasteryResponse { student_id, skills }).into_response())
}

pub(crate) async fn recommendations(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    let recommendations = practice::get_recommendations(state.db(), &student_id).await?;
    let data: Vec<RecommendationDto> = recommendations
        .into_iter()
        .map(|r| RecommendationDto {
            skill_name: r.skill_name,
            mastery: r.recommendation.mastery,
            level: r.recommendation.level.as_str(),
            priority: r.recommendation.priority,
            advice: r.recommendation.advice,
            skill_id: r.recommendation.skill_id,
        })
        .collect();

    Ok(ok(data).into_response())
}
