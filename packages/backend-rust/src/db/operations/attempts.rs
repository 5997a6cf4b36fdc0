use masterly_algo::AttemptObservation;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

/// One row of the append-only attempt log
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub id: String,
    pub student_id: String,
    pub skill_id: String,
    pub item_id: String,
    pub correct: bool,
    pub opportunity_index: i64,
    pub response_time_seconds: Option<f64>,
    pub mastery_before: f64,
    pub mastery_after: f64,
    pub created_at: i64,
}

pub async fn insert_attempt<'e, E>(executor: E, attempt: &AttemptRow) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO "attempts" (
            "id", "studentId", "skillId", "itemId", "correct", "opportunityIndex",
            "responseTimeSeconds", "masteryBefore", "masteryAfter", "createdAt"
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&attempt.id)
    .bind(&attempt.student_id)
    .bind(&attempt.skill_id)
    .bind(&attempt.item_id)
    .bind(attempt.correct)
    .bind(attempt.opportunity_index)
    .bind(attempt.response_time_seconds)
    .bind(attempt.mastery_before)
    .bind(attempt.mastery_after)
    .bind(attempt.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Items the student answered for the skill since `since_ms`, oldest first.
pub async fn answered_item_ids_since<'e, E>(
    executor: E,
    student_id: &str,
    skill_id: &str,
    since_ms: i64,
) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        SELECT "itemId" FROM "attempts"
        WHERE "studentId" = ? AND "skillId" = ? AND "createdAt" >= ?
        ORDER BY "createdAt" ASC, "opportunityIndex" ASC
        "#,
    )
    .bind(student_id)
    .bind(skill_id)
    .bind(since_ms)
    .fetch_all(executor)
    .await
}

/// Graded outcomes for a skill since `since_ms`, in calibration form.
pub async fn observations_since<'e, E>(
    executor: E,
    skill_id: &str,
    since_ms: i64,
) -> Result<Vec<AttemptObservation>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT "studentId", "correct", "opportunityIndex" FROM "attempts"
        WHERE "skillId" = ? AND "createdAt" >= ?
        ORDER BY "studentId" ASC, "opportunityIndex" ASC
        "#,
    )
    .bind(skill_id)
    .bind(since_ms)
    .fetch_all(executor)
    .await?;
    rows.iter().map(map_observation).collect()
}

/// Skills with at least one attempt since `since_ms`.
pub async fn active_skill_ids_since<'e, E>(
    executor: E,
    since_ms: i64,
) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT "skillId" FROM "attempts"
        WHERE "createdAt" >= ?
        ORDER BY "skillId"
        "#,
    )
    .bind(since_ms)
    .fetch_all(executor)
    .await
}

fn map_observation(row: &SqliteRow) -> Result<AttemptObservation, sqlx::Error> {
    let index: i64 = row.try_get("opportunityIndex")?;
    Ok(AttemptObservation {
        student_id: row.try_get("studentId")?,
        correct: row.try_get("correct")?,
        opportunity_index: u32::try_from(index.max(0)).unwrap_or(u32::MAX),
    })
}
