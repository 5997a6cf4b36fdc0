use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{next_item_uri, TestApp, BROKEN_SKILL, EMPTY_SKILL, FRACTIONS};

fn approx(value: &Value, expected: f64) -> bool {
    value
        .as_f64()
        .map(|v| (v - expected).abs() < 1e-6)
        .unwrap_or(false)
}

// ============================================================================
// Health & Routing
// ============================================================================

#[tokio::test]
async fn test_health_root() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["healthy"], true);
}

#[tokio::test]
async fn test_health_live_and_info() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/health/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "masterly-backend");
    assert_eq!(body["minAttempts"], 5);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_skills_includes_demo_and_fixtures() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/skills").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"js-fundamentals"));
    assert!(ids.contains(&FRACTIONS));
}

// ============================================================================
// Next Item
// ============================================================================

#[tokio::test]
async fn test_new_student_starts_at_prior_with_easy_item() {
    let app = TestApp::new().await;
    let (status, body) = app.get(&next_item_uri("alice", FRACTIONS)).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["status"], "in_progress");
    assert!(approx(&data["mastery"]["estimatedMastery"], 0.1));
    assert_eq!(data["mastery"]["opportunityCount"], 0);
    assert_eq!(data["item"]["id"], "f-easy-1");
    assert_eq!(data["item"]["difficulty"], "easy");
    assert_eq!(data["poolSize"], 5);
    assert!(data["item"].get("correctAnswer").is_none());
}

#[tokio::test]
async fn test_next_item_does_not_change_mastery() {
    let app = TestApp::new().await;
    app.get(&next_item_uri("alice", FRACTIONS)).await;
    let (_, body) = app.get("/api/students/alice/mastery").await;
    assert_eq!(body["data"]["skills"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_empty_pool_completes_immediately() {
    let app = TestApp::new().await;
    let (status, body) = app.get(&next_item_uri("alice", EMPTY_SKILL)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "complete");
    assert_eq!(body["data"]["completionReason"], "pool_exhausted");
    assert!(body["data"].get("item").is_none());
}

#[tokio::test]
async fn test_unknown_skill_is_404() {
    let app = TestApp::new().await;
    let (status, body) = app.get(&next_item_uri("alice", "no-such-skill")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_stored_parameters_surface_as_invalid_parameter() {
    let app = TestApp::new().await;
    let (status, body) = app.get(&next_item_uri("alice", BROKEN_SKILL)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INVALID_PARAMETER");
}

// ============================================================================
// Answers & Session Flow
// ============================================================================

#[tokio::test]
async fn test_first_correct_answer_reaches_half_mastery() {
    let app = TestApp::new().await;
    let data = app.answer("alice", FRACTIONS, "f-easy-1", true).await;

    assert_eq!(data["isCorrect"], true);
    assert!(approx(&data["masteryBefore"], 0.1));
    assert!(approx(&data["mastery"]["estimatedMastery"], 0.5));
    assert_eq!(data["mastery"]["opportunityCount"], 1);
    assert_eq!(data["mastery"]["level"], "developing");

    // 0.5 sits in the middle band, so any unseen item qualifies
    assert_eq!(data["next"]["item"]["id"], "f-easy-2");
    assert_eq!(data["next"]["answeredInSession"], 1);
}

#[tokio::test]
async fn test_high_mastery_below_attempt_floor_keeps_going() {
    let app = TestApp::new().await;
    app.answer("alice", FRACTIONS, "f-easy-1", true).await;
    let data = app.answer("alice", FRACTIONS, "f-easy-2", true).await;

    let mastery = data["mastery"]["estimatedMastery"].as_f64().unwrap();
    assert!((mastery - 0.8478).abs() < 1e-3, "mastery = {mastery}");
    assert_eq!(data["next"]["status"], "in_progress");
    assert_eq!(data["next"]["item"]["difficulty"], "hard");
    assert_eq!(data["next"]["item"]["id"], "f-hard-1");
}

#[tokio::test]
async fn test_session_completes_as_mastered_after_floor() {
    let app = TestApp::new().await;
    let (_, body) = app.get(&next_item_uri("alice", FRACTIONS)).await;
    let mut item_id = body["data"]["item"]["id"].as_str().unwrap().to_string();
    let mut last = Value::Null;

    for _ in 0..5 {
        last = app.answer("alice", FRACTIONS, &item_id, true).await;
        if last["next"]["status"] == "complete" {
            break;
        }
        item_id = last["next"]["item"]["id"].as_str().unwrap().to_string();
    }

    assert_eq!(last["mastery"]["opportunityCount"], 5);
    assert_eq!(last["next"]["status"], "complete");
    assert_eq!(last["next"]["completionReason"], "mastered");
}

#[tokio::test]
async fn test_session_completes_when_pool_exhausted() {
    let app = TestApp::new().await;
    let (_, body) = app.get(&next_item_uri("bob", FRACTIONS)).await;
    let mut item_id = body["data"]["item"]["id"].as_str().unwrap().to_string();
    let mut seen = vec![];
    let mut last = Value::Null;

    for _ in 0..5 {
        assert!(!seen.contains(&item_id), "{item_id} offered twice");
        seen.push(item_id.clone());
        last = app.answer("bob", FRACTIONS, &item_id, false).await;
        if last["next"]["status"] == "complete" {
            break;
        }
        item_id = last["next"]["item"]["id"].as_str().unwrap().to_string();
    }

    assert_eq!(seen.len(), 5);
    assert_eq!(last["next"]["completionReason"], "pool_exhausted");
    assert!(last["mastery"]["estimatedMastery"].as_f64().unwrap() < 0.8);
}

#[tokio::test]
async fn test_free_text_answers_are_graded() {
    let app = TestApp::new().await;
    let uri = format!("/api/students/carol/skills/{FRACTIONS}/answers");

    let (status, body) = app
        .post_json(&uri, json!({ "itemId": "f-easy-1", "answer": "  1/2 " }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCorrect"], true);

    let (_, body) = app
        .post_json(&uri, json!({ "itemId": "f-hard-2", "answer": "nine TENTHS" }))
        .await;
    assert_eq!(body["data"]["isCorrect"], true);

    let (_, body) = app
        .post_json(&uri, json!({ "itemId": "f-easy-2", "answer": "1/2" }))
        .await;
    assert_eq!(body["data"]["isCorrect"], false);
}

#[tokio::test]
async fn test_answer_validation() {
    let app = TestApp::new().await;
    let uri = format!("/api/students/alice/skills/{FRACTIONS}/answers");

    let (status, body) = app.post_json(&uri, json!({ "itemId": "f-easy-1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post_json(
            &uri,
            json!({ "itemId": "f-easy-1", "isCorrect": true, "answer": "1/2" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post_raw(&uri, "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post_json(
            &uri,
            json!({ "itemId": "f-easy-1", "isCorrect": true, "responseTimeSeconds": -1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_item_is_404_and_writes_nothing() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post_json(
            &format!("/api/students/alice/skills/{FRACTIONS}/answers"),
            json!({ "itemId": "js-1", "isCorrect": true }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/students/alice/mastery").await;
    assert!(body["data"]["skills"].as_array().unwrap().is_empty());
}

// ============================================================================
// Mastery & Recommendations
// ============================================================================

#[tokio::test]
async fn test_mastery_states_are_ordered_by_mastery() {
    let app = TestApp::new().await;
    app.answer("carol", FRACTIONS, "f-easy-1", true).await;
    app.answer("carol", "js-fundamentals", "js-1", false).await;
    app.answer("carol", "css-flexbox", "flex-2", true).await;

    let (status, body) = app.get("/api/students/carol/mastery").await;
    assert_eq!(status, StatusCode::OK);

    let skills = body["data"]["skills"].as_array().unwrap();
    let ids: Vec<&str> = skills.iter().map(|s| s["skillId"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![FRACTIONS, "css-flexbox", "js-fundamentals"]);
    assert_eq!(skills[0]["skillName"], "Fractions");
    assert_eq!(skills[0]["level"], "developing");
    assert_eq!(skills[2]["level"], "beginner");
    assert_eq!(skills[0]["opportunityCount"], 1);
}

#[tokio::test]
async fn test_recommendations_put_weakest_high_priority_first() {
    let app = TestApp::new().await;
    app.answer("carol", FRACTIONS, "f-easy-1", true).await;
    app.answer("carol", "js-fundamentals", "js-1", false).await;
    app.answer("carol", "css-flexbox", "flex-2", true).await;

    let (status, body) = app.get("/api/students/carol/recommendations").await;
    assert_eq!(status, StatusCode::OK);

    let recs = body["data"].as_array().unwrap();
    assert_eq!(recs[0]["skillId"], "js-fundamentals");
    assert_eq!(recs[0]["priority"], "high");
    assert_eq!(recs[1]["skillId"], "css-flexbox");
    assert_eq!(recs[1]["priority"], "medium");
    assert_eq!(recs[2]["skillId"], FRACTIONS);
}

#[tokio::test]
async fn test_unknown_student_has_no_mastery() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/students/nobody/mastery").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["studentId"], "nobody");
    assert!(body["data"]["skills"].as_array().unwrap().is_empty());
}

// ============================================================================
// Parameters & Recalibration
// ============================================================================

#[tokio::test]
async fn test_skill_without_calibration_reports_defaults() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/skills/js-fundamentals/parameters").await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["isDefault"], true);
    assert!(approx(&data["priorKnowledge"], 0.1));
    assert!(approx(&data["learnRate"], 0.15));
    assert!(approx(&data["guessRate"], 0.25));
    assert!(approx(&data["slipRate"], 0.1));
    assert_eq!(data["trainingSamples"], 0);
}

#[tokio::test]
async fn test_recalibrate_requires_enough_attempts() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post_json(&format!("/api/skills/{FRACTIONS}/recalibrate"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "insufficient_data");
    assert_eq!(body["data"]["samples"], 0);
    assert_eq!(body["data"]["required"], 10);

    let (_, body) = app.get(&format!("/api/skills/{FRACTIONS}/parameters")).await;
    assert!(approx(&body["data"]["learnRate"], 0.3));
    assert_eq!(body["data"]["trainingSamples"], 0);
}

#[tokio::test]
async fn test_recalibrate_updates_rates_from_accuracy() {
    let app = TestApp::new().await;
    let items = ["f-easy-1", "f-easy-2", "f-medium-1", "f-hard-1"];
    let outcomes = [
        ("s1", [true, true, true, true]),
        ("s2", [true, true, true, false]),
        ("s3", [true, false, true, false]),
    ];
    for (student, answers) in outcomes {
        for (item, correct) in items.iter().zip(answers) {
            app.answer(student, FRACTIONS, item, correct).await;
        }
    }

    let (status, body) = app
        .post_json(&format!("/api/skills/{FRACTIONS}/recalibrate"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["status"], "updated");
    assert_eq!(data["samples"], 12);
    assert!(approx(&data["observedAccuracy"], 0.75));
    assert!(approx(&data["parameters"]["priorKnowledge"], 0.1));
    assert!(approx(&data["parameters"]["learnRate"], 0.3));
    assert!(approx(&data["parameters"]["guessRate"], 0.25));
    assert!(approx(&data["parameters"]["slipRate"], 0.25));
    assert!(approx(&data["previous"]["slipRate"], 0.1));

    let (_, body) = app.get(&format!("/api/skills/{FRACTIONS}/parameters")).await;
    let data = &body["data"];
    assert_eq!(data["isDefault"], false);
    assert_eq!(data["trainingSamples"], 12);
    assert!(data["lastTrained"].is_string());
    let accuracy = data["modelAccuracy"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
}

#[tokio::test]
async fn test_recalibrate_unknown_skill_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post_json("/api/skills/no-such-skill/recalibrate", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
