use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
}

pub async fn get_skill<'e, E>(executor: E, skill_id: &str) -> Result<Option<SkillRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(r#"SELECT * FROM "skills" WHERE "id" = ? LIMIT 1"#)
        .bind(skill_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(map_skill).transpose()
}

pub async fn list_skills<'e, E>(executor: E) -> Result<Vec<SkillRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(r#"SELECT * FROM "skills" ORDER BY "id""#)
        .fetch_all(executor)
        .await?;
    rows.iter().map(map_skill).collect()
}

/// Insert the skill, or refresh its name and description if it exists.
pub async fn upsert_skill<'e, E>(executor: E, skill: &SkillRow) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO "skills" ("id", "name", "description", "createdAt")
        VALUES (?, ?, ?, ?)
        ON CONFLICT("id") DO UPDATE SET
            "name" = excluded."name",
            "description" = excluded."description"
        "#,
    )
    .bind(&skill.id)
    .bind(&skill.name)
    .bind(&skill.description)
    .bind(skill.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

fn map_skill(row: &SqliteRow) -> Result<SkillRow, sqlx::Error> {
    Ok(SkillRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("createdAt")?,
    })
}
