use masterly_algo::{BktResult, MasteryState};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

#[derive(Debug, Clone, PartialEq)]
pub struct MasteryRow {
    pub student_id: String,
    pub skill_id: String,
    pub estimated_mastery: f64,
    pub opportunity_count: i64,
    pub last_updated: i64,
}

impl MasteryRow {
    /// Validated view of the stored row.
    pub fn to_state(&self) -> BktResult<MasteryState> {
        let state = MasteryState {
            estimated_mastery: self.estimated_mastery,
            opportunity_count: u32::try_from(self.opportunity_count.max(0)).unwrap_or(u32::MAX),
            last_updated: self.last_updated,
        };
        state.validate()?;
        Ok(state)
    }
}

/// Mastery row joined with its skill's display name
#[derive(Debug, Clone, PartialEq)]
pub struct StudentMasteryRow {
    pub mastery: MasteryRow,
    pub skill_name: String,
}

pub async fn get_mastery<'e, E>(
    executor: E,
    student_id: &str,
    skill_id: &str,
) -> Result<Option<MasteryRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"SELECT * FROM "mastery_states" WHERE "studentId" = ? AND "skillId" = ? LIMIT 1"#,
    )
    .bind(student_id)
    .bind(skill_id)
    .fetch_optional(executor)
    .await?;
    row.as_ref().map(map_mastery).transpose()
}

/// Every skill the student has a state for, highest mastery first.
pub async fn list_student_mastery<'e, E>(
    executor: E,
    student_id: &str,
) -> Result<Vec<StudentMasteryRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT m.*, s."name" AS "skillName"
        FROM "mastery_states" m
        JOIN "skills" s ON s."id" = m."skillId"
        WHERE m."studentId" = ?
        ORDER BY m."estimatedMastery" DESC, m."skillId" ASC
        "#,
    )
    .bind(student_id)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(StudentMasteryRow {
                mastery: map_mastery(row)?,
                skill_name: row.try_get("skillName")?,
            })
        })
        .collect()
}

/// Write `next` only if the stored opportunity count still equals
/// `expected_count` (`None` = no row yet). Returns false when another writer
/// got there first.
pub async fn compare_and_set_mastery<'e, E>(
    executor: E,
    student_id: &str,
    skill_id: &str,
    next: &MasteryState,
    expected_count: Option<u32>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = match expected_count {
        None => {
            sqlx::query(
                r#"
                INSERT INTO "mastery_states"
                    ("studentId", "skillId", "estimatedMastery", "opportunityCount", "lastUpdated")
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT("studentId", "skillId") DO NOTHING
                "#,
            )
            .bind(student_id)
            .bind(skill_id)
            .bind(next.estimated_mastery)
            .bind(i64::from(next.opportunity_count))
            .bind(next.last_updated)
            .execute(executor)
            .await?
        }
        Some(expected) => {
            sqlx::query(
                r#"
                UPDATE "mastery_states"
                SET "estimatedMastery" = ?, "opportunityCount" = ?, "lastUpdated" = ?
                WHERE "studentId" = ? AND "skillId" = ? AND "opportunityCount" = ?
                "#,
            )
            .bind(next.estimated_mastery)
            .bind(i64::from(next.opportunity_count))
            .bind(next.last_updated)
            .bind(student_id)
            .bind(skill_id)
            .bind(i64::from(expected))
            .execute(executor)
            .await?
        }
    };

    Ok(result.rows_affected() == 1)
}

fn map_mastery(row: &SqliteRow) -> Result<MasteryRow, sqlx::Error> {
    Ok(MasteryRow {
        student_id: row.try_get("studentId")?,
        skill_id: row.try_get("skillId")?,
        estimated_mastery: row.try_get("estimatedMastery")?,
        opportunity_count: row.try_get("opportunityCount")?,
        last_updated: row.try_get("lastUpdated")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(mastery: f64, count: i64) -> MasteryRow {
        MasteryRow {
            student_id: "s".to_string(),
            skill_id: "k".to_string(),
            estimated_mastery: mastery,
            opportunity_count: count,
            last_updated: 0,
        }
    }

    #[test]
    fn test_to_state_validates_mastery() {
        assert!(row(0.4, 3).to_state().is_ok());
        assert!(row(1.2, 3).to_state().is_err());
        assert!(row(f64::NAN, 3).to_state().is_err());
    }

    #[test]
    fn test_negative_count_reads_as_zero() {
        assert_eq!(row(0.4, -2).to_state().unwrap().opportunity_count, 0);
    }
}
