use masterly_algo::{Difficulty, Item};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Executor, Row, Sqlite};

/// A stored practice item. `content` is the opaque prompt payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub skill_id: String,
    pub id: String,
    pub difficulty: Difficulty,
    pub correct_answer: String,
    pub content: Value,
}

impl ItemRow {
    pub fn to_item(&self) -> Item {
        Item::new(self.id.clone(), self.difficulty, self.correct_answer.clone())
    }
}

pub async fn list_items_for_skill<'e, E>(
    executor: E,
    skill_id: &str,
) -> Result<Vec<ItemRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(r#"SELECT * FROM "items" WHERE "skillId" = ? ORDER BY "id""#)
        .bind(skill_id)
        .fetch_all(executor)
        .await?;
    rows.iter().map(map_item).collect()
}

pub async fn get_item<'e, E>(
    executor: E,
    skill_id: &str,
    item_id: &str,
) -> Result<Option<ItemRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(r#"SELECT * FROM "items" WHERE "skillId" = ? AND "id" = ? LIMIT 1"#)
        .bind(skill_id)
        .bind(item_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(map_item).transpose()
}

/// Insert or replace an item in a skill's pool.
pub async fn upsert_item<'e, E>(executor: E, item: &ItemRow) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO "items" ("skillId", "id", "difficulty", "correctAnswer", "content")
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT("skillId", "id") DO UPDATE SET
            "difficulty" = excluded."difficulty",
            "correctAnswer" = excluded."correctAnswer",
            "content" = excluded."content"
        "#,
    )
    .bind(&item.skill_id)
    .bind(&item.id)
    .bind(item.difficulty.as_str())
    .bind(&item.correct_answer)
    .bind(Json(&item.content))
    .execute(executor)
    .await?;
    Ok(())
}

fn map_item(row: &SqliteRow) -> Result<ItemRow, sqlx::Error> {
    let difficulty_raw: String = row.try_get("difficulty")?;
    let difficulty = difficulty_raw
        .parse::<Difficulty>()
        .map_err(|err| sqlx::Error::ColumnDecode {
            index: "difficulty".to_string(),
            source: Box::new(err),
        })?;
    let content = row.try_get::<Json<Value>, _>("content")?.0;

    Ok(ItemRow {
        skill_id: row.try_get("skillId")?,
        id: row.try_get("id")?,
        difficulty,
        correct_answer: row.try_get("correctAnswer")?,
        content,
    })
}
