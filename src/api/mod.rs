// HTTP API - axum router over the car repository
//
// Handlers validate, call the repository under the shared mutex, and map the
// outcome to a status code. The guard is never held across an await: every
// repository call is synchronous and finishes inside `with_repo`.

pub mod cars;
pub mod enum_types;
pub mod makes;
pub mod models;
pub mod telemetry;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::error;

use crate::db::CarRepository;
use crate::error::Error;
use crate::telemetry::{QueryLog, RequestTelemetry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Mutex<CarRepository>>,
    pub requests: Arc<RequestTelemetry>,
    pub queries: Arc<QueryLog>,
}

impl AppState {
    /// Wire `queries` into the repository so every statement is logged.
    pub fn new(repo: CarRepository, queries: Arc<QueryLog>) -> Self {
        AppState {
            repo: Arc::new(Mutex::new(repo.with_query_log(Arc::clone(&queries)))),
            requests: Arc::new(RequestTelemetry::new()),
            queries,
        }
    }

    /// Run one synchronous repository call under the lock.
    pub fn with_repo<T>(
        &self,
        call: impl FnOnce(&CarRepository) -> crate::error::Result<T>,
    ) -> Result<T, ApiError> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| ApiError::Internal("repository mutex poisoned".to_string()))?;
        Ok(call(&*repo)?)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// Detail is logged, never sent
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidId { .. } => ApiError::BadRequest(e.to_string()),
            Error::Constraint(message) => ApiError::Conflict(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal(detail) => {
                error!(%detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let requests = Arc::clone(&state.requests);

    Router::new()
        .route("/health", get(health_check))
        // Makes
        .route(
            "/Makes",
            get(makes::get_make_ids)
                .post(makes::create_make)
                .put(makes::update_make),
        )
        .route("/Makes/all", get(makes::get_all_makes))
        .route(
            "/Makes/:id",
            get(makes::get_make).delete(makes::delete_make),
        )
        // Models
        .route(
            "/Models",
            get(models::get_model_ids)
                .post(models::create_model)
                .put(models::update_model),
        )
        .route("/Models/all", get(models::get_all_models))
        .route("/Models/all/:make_id", get(models::get_models_by_make))
        .route(
            "/Models/:id",
            get(models::get_model).delete(models::delete_model),
        )
        // Cars
        .route(
            "/Cars",
            get(cars::get_car_ids)
                .post(cars::create_car)
                .put(cars::update_car),
        )
        .route("/Cars/:id", get(cars::get_car).delete(cars::delete_car))
        // Enum types
        .route("/EvTypes", get(enum_types::get_ev_types))
        .route("/EvTypes/:id", get(enum_types::get_ev_type))
        .route("/CafvTypes", get(enum_types::get_cafv_types))
        .route("/CafvTypes/:id", get(enum_types::get_cafv_type))
        // Telemetry
        .route("/Telemetry/methodCalls", get(telemetry::get_method_calls))
        .route("/Telemetry/queries", get(telemetry::get_queries))
        .route_layer(middleware::from_fn_with_state(requests, record_request))
        .with_state(state)
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "version": crate::VERSION }))
}

/// Count every matched request as (controller, "METHOD route").
async fn record_request(
    State(requests): State<Arc<RequestTelemetry>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(route) = request.extensions().get::<MatchedPath>() {
        let route = route.as_str();
        let action = format!("{} {}", request.method(), route);
        requests.record(controller_of(route), &action);
    }

    next.run(request).await
}

/// First segment of a route: "/Makes/:id" -> "Makes"
fn controller_of(route: &str) -> &str {
    route
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}
