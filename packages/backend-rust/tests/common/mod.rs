#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use masterly_algo::{BktParameters, Difficulty};
use masterly_backend::build_router;
use masterly_backend::config::{TieBreakMode, TutorConfig};
use masterly_backend::db::config::DbConfig;
use masterly_backend::db::operations::{
    upsert_item, upsert_parameters, upsert_skill, ItemRow, SkillRow, StoredParameters,
};
use masterly_backend::db::Database;
use masterly_backend::seed::seed_demo_data;
use masterly_backend::state::AppState;

/// Skill with calibration (0.1, 0.3, 0.25, 0.1) and five items
pub const FRACTIONS: &str = "fractions";
/// Skill with no items
pub const EMPTY_SKILL: &str = "empty-skill";
/// Skill whose stored slip rate is outside (0, 1)
pub const BROKEN_SKILL: &str = "broken-skill";

pub struct TestApp {
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_tutor(TutorConfig {
            tie_break: TieBreakMode::LowestId,
            ..TutorConfig::default()
        })
        .await
    }

    pub async fn with_tutor(tutor: TutorConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(DbConfig::for_path(&dir.path().join("test.db")))
            .await
            .unwrap();
        db.migrate().await.unwrap();
        seed_demo_data(&db).await.unwrap();
        insert_fixtures(&db).await;

        Self {
            state: AppState::new(Arc::new(db), tutor),
            _dir: dir,
        }
    }

    pub fn db(&self) -> &Database {
        self.state.db()
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn answer(&self, student: &str, skill: &str, item: &str, correct: bool) -> Value {
        let (status, body) = self
            .post_json(
                &format!("/api/students/{student}/skills/{skill}/answers"),
                json!({ "itemId": item, "isCorrect": correct }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "answer failed: {body}");
        body["data"].clone()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

async fn insert_fixtures(db: &Database) {
    let pool = db.pool();
    for (id, name) in [
        (FRACTIONS, "Fractions"),
        (EMPTY_SKILL, "Empty Skill"),
        (BROKEN_SKILL, "Broken Skill"),
    ] {
        upsert_skill(
            pool,
            &SkillRow {
                id: id.to_string(),
                name: name.to_string(),
                description: String::new(),
                created_at: 0,
            },
        )
        .await
        .unwrap();
    }

    let items = [
        ("f-easy-1", Difficulty::Easy, "1/2"),
        ("f-easy-2", Difficulty::Easy, "3/4"),
        ("f-medium-1", Difficulty::Medium, "5/8"),
        ("f-hard-1", Difficulty::Hard, "7/16"),
        ("f-hard-2", Difficulty::Hard, "Nine Tenths"),
    ];
    for (id, difficulty, answer) in items {
        upsert_item(
            pool,
            &ItemRow {
                skill_id: FRACTIONS.to_string(),
                id: id.to_string(),
                difficulty,
                correct_answer: answer.to_string(),
                content: json!({ "question": format!("question {id}") }),
            },
        )
        .await
        .unwrap();
    }
    upsert_item(
        pool,
        &ItemRow {
            skill_id: BROKEN_SKILL.to_string(),
            id: "b-1".to_string(),
            difficulty: Difficulty::Easy,
            correct_answer: "x".to_string(),
            content: Value::Null,
        },
    )
    .await
    .unwrap();

    let fractions = BktParameters::new(0.1, 0.3, 0.25, 0.1).unwrap();
    upsert_parameters(pool, &StoredParameters::new(FRACTIONS, &fractions))
        .await
        .unwrap();

    let mut broken = StoredParameters::new(BROKEN_SKILL, &BktParameters::default());
    broken.slip_rate = 1.0;
    upsert_parameters(pool, &broken).await.unwrap();
}

pub fn next_item_uri(student: &str, skill: &str) -> String {
    format!("/api/students/{student}/skills/{skill}/next-item")
}
