//! Readiness endpoint

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use serde_json::Value;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .with_state(state)
}

/// Readiness check: MongoDB answers a ping and the SMTP relay accepts connections
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_name = state.config.mongodb.database();
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![
        (
            "mongodb",
            Box::pin(async {
                database::mongodb::check_health(&state.mongo_client, db_name)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }),
        ),
        (
            "smtp",
            Box::pin(async { state.mailer.health_check().await.map_err(|e| e.to_string()) }),
        ),
    ];

    run_health_checks(checks).await
}
