// /Cars handlers
//
// No "all" listing: the registration dataset runs to hundreds of thousands
// of rows.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};

use super::{ApiError, ApiResult, AppState};
use crate::entities::{Car, IdList};

/// GET /Cars
pub async fn get_car_ids(State(state): State<AppState>) -> ApiResult<Json<IdList>> {
    Ok(Json(state.with_repo(|repo| repo.get_car_id_list())?))
}

/// GET /Cars/:id
pub async fn get_car(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Car>> {
    if id <= 0 {
        return Err(ApiError::BadRequest(format!("Invalid car id {}", id)));
    }

    state
        .with_repo(|repo| repo.get_car_by_id(id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Car {} not found", id)))
}

fn validate(car: &Car) -> ApiResult<()> {
    if car.uuid().is_nil() {
        return Err(ApiError::BadRequest("Car UUID is required".to_string()));
    }
    Ok(())
}

/// POST /Cars
pub async fn create_car(
    State(state): State<AppState>,
    Json(mut car): Json<Car>,
) -> ApiResult<impl IntoResponse> {
    if car.id != 0 {
        return Err(ApiError::BadRequest("A new car must not carry an id".to_string()));
    }
    validate(&car)?;

    if !state.with_repo(|repo| repo.create_car(&mut car))? {
        return Err(ApiError::BadRequest(format!("Car {} already exists", car.uuid())));
    }

    let location = format!("/Cars/{}", car.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(car)))
}

/// PUT /Cars
pub async fn update_car(State(state): State<AppState>, Json(car): Json<Car>) -> ApiResult<Json<Car>> {
    if car.id == 0 {
        return Err(ApiError::BadRequest("Car id is required".to_string()));
    }
    validate(&car)?;

    if !state.with_repo(|repo| repo.update_car(&car))? {
        return Err(ApiError::BadRequest(format!("Car {} was not updated", car.id)));
    }

    Ok(Json(car))
}

/// DELETE /Cars/:id
pub async fn delete_car(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if id == 0 {
        return Err(ApiError::BadRequest("Car id is required".to_string()));
    }

    if !state.with_repo(|repo| repo.delete_car(id))? {
        return Err(ApiError::BadRequest(format!("Car {} was not deleted", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
