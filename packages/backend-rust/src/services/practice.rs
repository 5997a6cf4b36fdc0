use masterly_algo::{
    decide_next, estimator, recommend, BktError, BktParameters, CompletionReason, Item,
    MasteryLevel, MasteryState, NextStep, Recommendation, SessionRecord,
};
use uuid::Uuid;

use crate::config::TutorConfig;
use crate::db::operations::{
    answered_item_ids_since, compare_and_set_mastery, get_item, get_mastery, get_parameters,
    get_skill, insert_attempt, list_items_for_skill, list_student_mastery, AttemptRow, ItemRow,
    SkillRow,
};
use crate::db::Database;
use crate::services::{is_busy, tie_breaker, MS_PER_HOUR};

/// Read-modify-write rounds before an answer is rejected as conflicting
const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum PracticeError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Estimator(#[from] BktError),
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// What the student should do next for one skill
#[derive(Debug, Clone, PartialEq)]
pub enum PracticeStep {
    Item(ItemRow),
    Complete(CompletionReason),
}

#[derive(Debug, Clone)]
pub struct NextItem {
    pub skill: SkillRow,
    pub mastery: MasteryState,
    pub step: PracticeStep,
    pub answered_in_session: usize,
    pub pool_size: usize,
}

#[derive(Debug, Clone)]
pub enum AnswerSubmission {
    Graded(bool),
    Response(String),
}

#[derive(Debug, Clone)]
pub struct AnswerInput {
    pub student_id: String,
    pub skill_id: String,
    pub item_id: String,
    pub submission: AnswerSubmission,
    pub response_time_seconds: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub attempt_id: String,
    pub item_id: String,
    pub is_correct: bool,
    pub mastery_before: f64,
    pub mastery: MasteryState,
    pub next: NextItem,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillMastery {
    pub skill_id: String,
    pub skill_name: String,
    pub state: MasteryState,
    pub level: MasteryLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillRecommendation {
    pub skill_name: String,
    pub recommendation: Recommendation,
}

pub async fn get_next_item(
    db: &Database,
    tutor: &TutorConfig,
    student_id: &str,
    skill_id: &str,
    now_ms: i64,
) -> Result<NextItem, PracticeError> {
    validate_id("studentId", student_id)?;
    validate_id("skillId", skill_id)?;

    let skill = require_skill(db, skill_id).await?;
    let params = load_parameters(db, skill_id).await?;
    let mastery = match get_mastery(db.pool(), student_id, skill_id).await? {
        Some(row) => row.to_state()?,
        None => MasteryState::initial(&params, now_ms),
    };

    resolve_next(db, tutor, skill, student_id, mastery, now_ms).await
}

pub async fn record_answer(
    db: &Database,
    tutor: &TutorConfig,
    input: AnswerInput,
    now_ms: i64,
) -> Result<AnswerOutcome, PracticeError> {
    validate_id("studentId", &input.student_id)?;
    validate_id("skillId", &input.skill_id)?;
    validate_id("itemId", &input.item_id)?;
    if let Some(seconds) = input.response_time_seconds {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(PracticeError::Validation(
                "responseTimeSeconds must be a non-negative number".to_string(),
            ));
        }
    }

    let skill = require_skill(db, &input.skill_id).await?;
    let item = get_item(db.pool(), &input.skill_id, &input.item_id)
        .await?
        .ok_or_else(|| {
            PracticeError::NotFound(format!(
                "item {} not found in skill {}",
                input.item_id, input.skill_id
            ))
        })?;
    let params = load_parameters(db, &input.skill_id).await?;

    let is_correct = match &input.submission {
        AnswerSubmission::Graded(correct) => *correct,
        AnswerSubmission::Response(answer) => item.to_item().grade(answer),
    };

    let attempt_id = Uuid::new_v4().to_string();
    let mut written = None;

    for round in 1..=MAX_WRITE_ATTEMPTS {
        match write_attempt(db, &input, &attempt_id, is_correct, &params, now_ms).await {
            Ok(Some(result)) => {
                written = Some(result);
                break;
            }
            Ok(None) => {
                tracing::warn!(
                    student_id = %input.student_id,
                    skill_id = %input.skill_id,
                    round,
                    "mastery state changed concurrently, retrying"
                );
            }
            Err(PracticeError::Sql(err)) if is_busy(&err) => {
                tracing::warn!(
                    student_id = %input.student_id,
                    skill_id = %input.skill_id,
                    round,
                    error = %err,
                    "database busy while recording answer, retrying"
                );
            }
            Err(err) => return Err(err),
        }
    }

    let (mastery_before, mastery) = written.ok_or_else(|| {
        PracticeError::Conflict(format!(
            "mastery for skill {} was updated concurrently, please retry",
            input.skill_id
        ))
    })?;

    tracing::info!(
        student_id = %input.student_id,
        skill_id = %input.skill_id,
        item_id = %input.item_id,
        is_correct,
        mastery_before,
        mastery_after = mastery.estimated_mastery,
        opportunity_count = mastery.opportunity_count,
        "answer recorded"
    );

    let next = resolve_next(db, tutor, skill, &input.student_id, mastery.clone(), now_ms).await?;

    Ok(AnswerOutcome {
        attempt_id,
        item_id: item.id,
        is_correct,
        mastery_before,
        mastery,
        next,
    })
}

pub async fn get_mastery_states(
    db: &Database,
    student_id: &str,
) -> Result<Vec<SkillMastery>, PracticeError> {
    validate_id("studentId", student_id)?;

    let rows = list_student_mastery(db.pool(), student_id).await?;
    rows.into_iter()
        .map(|row| {
            let state = row.mastery.to_state()?;
            Ok(SkillMastery {
                skill_id: row.mastery.skill_id,
                skill_name: row.skill_name,
                level: state.level(),
                state,
            })
        })
        .collect()
}

pub async fn get_recommendations(
    db: &Database,
    student_id: &str,
) -> Result<Vec<SkillRecommendation>, PracticeError> {
    let states = get_mastery_states(db, student_id).await?;
    let recommendations = recommend(
        states
            .iter()
            .map(|s| (s.skill_id.as_str(), s.state.estimated_mastery)),
    );

    Ok(recommendations
        .into_iter()
        .map(|recommendation| {
            let skill_name = states
                .iter()
                .find(|s| s.skill_id == recommendation.skill_id)
                .map(|s| s.skill_name.clone())
                .unwrap_or_default();
            SkillRecommendation {
                skill_name,
                recommendation,
            }
        })
        .collect())
}

/// Stored calibration for the skill, or the defaults when none exists yet.
pub(crate) async fn load_parameters(
    db: &Database,
    skill_id: &str,
) -> Result<BktParameters, PracticeError> {
    match get_parameters(db.pool(), skill_id).await? {
        Some(stored) => Ok(stored.to_params()?),
        None => Ok(BktParameters::default()),
    }
}

/// One transaction: read state, apply the update, log the attempt and
/// compare-and-set the new state. `Ok(None)` means the CAS lost.
async fn write_attempt(
    db: &Database,
    input: &AnswerInput,
    attempt_id: &str,
    is_correct: bool,
    params: &BktParameters,
    now_ms: i64,
) -> Result<Option<(f64, MasteryState)>, PracticeError> {
    let mut tx = db.pool().begin().await?;

    let (current, expected_count) =
        match get_mastery(&mut *tx, &input.student_id, &input.skill_id).await? {
            Some(row) => {
                let state = row.to_state()?;
                let count = state.opportunity_count;
                (state, Some(count))
            }
            None => (MasteryState::initial(params, now_ms), None),
        };

    let next = estimator::apply(&current, is_correct, params, now_ms)?;

    insert_attempt(
        &mut *tx,
        &AttemptRow {
            id: attempt_id.to_string(),
            student_id: input.student_id.clone(),
            skill_id: input.skill_id.clone(),
            item_id: input.item_id.clone(),
            correct: is_correct,
            opportunity_index: i64::from(next.opportunity_count),
            response_time_seconds: input.response_time_seconds,
            mastery_before: current.estimated_mastery,
            mastery_after: next.estimated_mastery,
            created_at: now_ms,
        },
    )
    .await?;

    let applied = compare_and_set_mastery(
        &mut *tx,
        &input.student_id,
        &input.skill_id,
        &next,
        expected_count,
    )
    .await?;

    if !applied {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;
    Ok(Some((current.estimated_mastery, next)))
}

async fn resolve_next(
    db: &Database,
    tutor: &TutorConfig,
    skill: SkillRow,
    student_id: &str,
    mastery: MasteryState,
    now_ms: i64,
) -> Result<NextItem, PracticeError> {
    let rows = list_items_for_skill(db.pool(), &skill.id).await?;
    let since = now_ms.saturating_sub(tutor.session_window_hours.saturating_mul(MS_PER_HOUR));
    let record: SessionRecord = answered_item_ids_since(db.pool(), student_id, &skill.id, since)
        .await?
        .into_iter()
        .collect();

    let pool: Vec<Item> = rows.iter().map(ItemRow::to_item).collect();
    let mut tie = tie_breaker(tutor.tie_break);
    let step = match decide_next(&pool, &mastery, &record, &tutor.session, tie.as_mut()) {
        NextStep::Item(item) => rows
            .iter()
            .find(|row| row.id == item.id)
            .cloned()
            .map(PracticeStep::Item)
            .unwrap_or(PracticeStep::Complete(CompletionReason::PoolExhausted)),
        NextStep::Complete(reason) => PracticeStep::Complete(reason),
    };

    if let PracticeStep::Complete(reason) = &step {
        tracing::debug!(
            student_id,
            skill_id = %skill.id,
            reason = reason.as_str(),
            mastery = mastery.estimated_mastery,
            "practice session complete"
        );
    }

    Ok(NextItem {
        answered_in_session: record.len(),
        pool_size: rows.len(),
        skill,
        mastery,
        step,
    })
}

async fn require_skill(db: &Database, skill_id: &str) -> Result<SkillRow, PracticeError> {
    get_skill(db.pool(), skill_id)
        .await?
        .ok_or_else(|| PracticeError::NotFound(format!("skill {skill_id} not found")))
}

fn validate_id(field: &str, value: &str) -> Result<(), PracticeError> {
    if value.trim().is_empty() {
        return Err(PracticeError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > 128 {
        return Err(PracticeError::Validation(format!(
            "{field} must be at most 128 characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("studentId", "alice").is_ok());
        assert!(matches!(
            validate_id("studentId", "  "),
            Err(PracticeError::Validation(_))
        ));
        assert!(matches!(
            validate_id("studentId", &"x".repeat(129)),
            Err(PracticeError::Validation(_))
        ));
    }
}
