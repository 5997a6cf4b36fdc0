mod health;
mod practice;
mod skills;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/students/:studentId/skills/:skillId/next-item",
            get(practice::next_item).fallback(fallback_handler),
        )
        .route(
            "/students/:studentId/skills/:skillId/answers",
            post(practice::record_answer).fallback(fallback_handler),
        )
        .route(
            "/students/:studentId/mastery",
            get(practice::mastery_states).fallback(fallback_handler),
        )
        .route(
            "/students/:studentId/recommendations",
            get(practice::recommendations).fallback(fallback_handler),
        )
        .route("/skills", get(skills::list).fallback(fallback_handler))
        .route(
            "/skills/:skillId/parameters",
            get(skills::parameters).fallback(fallback_handler),
        )
        .route(
            "/skills/:skillId/recalibrate",
            post(skills::recalibrate).fallback(fallback_handler),
        );

    Router::new()
        .nest("/health", health::router())
        .nest("/api", api)
        .fallback(fallback_handler)
        .with_state(state)
}

/// Epoch milliseconds as RFC 3339; out-of-range values fall back to the epoch.
pub(crate) fn millis_to_iso(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Endpoint not found").into_response()
}
