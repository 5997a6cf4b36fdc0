use masterly_algo::{BktParameters, BktResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

/// Calibration row as stored. Rates are validated when converted, not on read.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredParameters {
    pub skill_id: String,
    pub prior_knowledge: f64,
    pub learn_rate: f64,
    pub guess_rate: f64,
    pub slip_rate: f64,
    pub last_trained: Option<i64>,
    pub training_samples: i64,
    pub model_accuracy: Option<f64>,
}

impl StoredParameters {
    pub fn new(skill_id: impl Into<String>, params: &BktParameters) -> Self {
        Self {
            skill_id: skill_id.into(),
            prior_knowledge: params.prior_knowledge(),
            learn_rate: params.learn_rate(),
            guess_rate: params.guess_rate(),
            slip_rate: params.slip_rate(),
            last_trained: None,
            training_samples: 0,
            model_accuracy: None,
        }
    }

    pub fn to_params(&self) -> BktResult<BktParameters> {
        BktParameters::new(
            self.prior_knowledge,
            self.learn_rate,
            self.guess_rate,
            self.slip_rate,
        )
    }
}

pub async fn get_parameters<'e, E>(
    executor: E,
    skill_id: &str,
) -> Result<Option<StoredParameters>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(r#"SELECT * FROM "bkt_parameters" WHERE "skillId" = ? LIMIT 1"#)
        .bind(skill_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(map_parameters).transpose()
}

pub async fn upsert_parameters<'e, E>(
    executor: E,
    stored: &StoredParameters,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO "bkt_parameters" (
            "skillId", "priorKnowledge", "learnRate", "guessRate", "slipRate",
            "lastTrained", "trainingSamples", "modelAccuracy"
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT("skillId") DO UPDATE SET
            "priorKnowledge" = excluded."priorKnowledge",
            "learnRate" = excluded."learnRate",
            "guessRate" = excluded."guessRate",
            "slipRate" = excluded."slipRate",
            "lastTrained" = excluded."lastTrained",
            "trainingSamples" = excluded."trainingSamples",
            "modelAccuracy" = excluded."modelAccuracy"
        "#,
    )
    .bind(&stored.skill_id)
    .bind(stored.prior_knowledge)
    .bind(stored.learn_rate)
    .bind(stored.guess_rate)
    .bind(stored.slip_rate)
    .bind(stored.last_trained)
    .bind(stored.training_samples)
    .bind(stored.model_accuracy)
    .execute(executor)
    .await?;
    Ok(())
}

fn map_parameters(row: &SqliteRow) -> Result<StoredParameters, sqlx::Error> {
    Ok(StoredParameters {
        skill_id: row.try_get("skillId")?,
        prior_knowledge: row.try_get("priorKnowledge")?,
        learn_rate: row.try_get("learnRate")?,
        guess_rate: row.try_get("guessRate")?,
        slip_rate: row.try_get("slipRate")?,
        last_trained: row.try_get("lastTrained")?,
        training_samples: row.try_get("trainingSamples")?,
        model_accuracy: row.try_get("modelAccuracy")?,
    })
}
