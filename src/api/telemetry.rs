// /Telemetry handlers

use axum::{extract::State, response::Json};

use super::AppState;
use crate::telemetry::MethodCallStats;

/// GET /Telemetry/methodCalls
pub async fn get_method_calls(State(state): State<AppState>) -> Json<MethodCallStats> {
    Json(state.requests.stats())
}

/// GET /Telemetry/queries
pub async fn get_queries(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.queries.recent())
}
