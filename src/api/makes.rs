// /Makes handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};

use super::{ApiError, ApiResult, AppState};
use crate::entities::{IdList, Make};

/// GET /Makes
pub async fn get_make_ids(State(state): State<AppState>) -> ApiResult<Json<IdList>> {
    Ok(Json(state.with_repo(|repo| repo.get_make_id_list())?))
}

/// GET /Makes/all
pub async fn get_all_makes(State(state): State<AppState>) -> ApiResult<Json<Vec<Make>>> {
    Ok(Json(state.with_repo(|repo| repo.get_all_makes())?))
}

/// GET /Makes/:id
pub async fn get_make(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Make>> {
    if id <= 0 {
        return Err(ApiError::BadRequest(format!("Invalid make id {}", id)));
    }

    state
        .with_repo(|repo| repo.get_make_by_id(id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Make {} not found", id)))
}

fn validate(make: &Make) -> ApiResult<()> {
    if make.manufacturer.trim().is_empty() {
        return Err(ApiError::BadRequest("Manufacturer is required".to_string()));
    }
    Ok(())
}

/// POST /Makes
pub async fn create_make(
    State(state): State<AppState>,
    Json(mut make): Json<Make>,
) -> ApiResult<impl IntoResponse> {
    if make.id != 0 {
        return Err(ApiError::BadRequest("A new make must not carry an id".to_string()));
    }
    validate(&make)?;

    if !state.with_repo(|repo| repo.create_make(&mut make))? {
        return Err(ApiError::BadRequest(format!(
            "Make {:?} already exists",
            make.manufacturer
        )));
    }

    let location = format!("/Makes/{}", make.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(make)))
}

/// PUT /Makes
pub async fn update_make(State(state): State<AppState>, Json(make): Json<Make>) -> ApiResult<Json<Make>> {
    if make.id == 0 {
        return Err(ApiError::BadRequest("Make id is required".to_string()));
    }
    validate(&make)?;

    if !state.with_repo(|repo| repo.update_make(&make))? {
        return Err(ApiError::BadRequest(format!("Make {} was not updated", make.id)));
    }

    Ok(Json(make))
}

/// DELETE /Makes/:id
pub async fn delete_make(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if id == 0 {
        return Err(ApiError::BadRequest("Make id is required".to_string()));
    }

    if !state.with_repo(|repo| repo.delete_make(id))? {
        return Err(ApiError::BadRequest(format!("Make {} was not deleted", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
