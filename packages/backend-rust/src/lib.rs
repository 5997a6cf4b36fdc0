pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod workers;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{Database, DbInitError};
use crate::state::AppState;

/// Router with tracing and CORS layers applied.
pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Connect, migrate and optionally seed, then build the shared state.
pub async fn init_state(config: &Config) -> Result<AppState, DbInitError> {
    let db = Database::connect(config.database.clone()).await?;
    db.migrate().await?;

    if config.seed_demo_data {
        seed::seed_demo_data(&db).await?;
    }

    Ok(AppState::new(Arc::new(db), config.tutor.clone()))
}

pub async fn create_app(config: &Config) -> Result<axum::Router, DbInitError> {
    let state = init_state(config).await?;
    Ok(build_router(state))
}
