// /Models handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};

use super::{ApiError, ApiResult, AppState};
use crate::entities::{IdList, Model};

/// GET /Models
pub async fn get_model_ids(State(state): State<AppState>) -> ApiResult<Json<IdList>> {
    Ok(Json(state.with_repo(|repo| repo.get_model_id_list())?))
}

/// GET /Models/all
pub async fn get_all_models(State(state): State<AppState>) -> ApiResult<Json<Vec<Model>>> {
    Ok(Json(state.with_repo(|repo| repo.get_all_models())?))
}

/// GET /Models/all/:make_id
pub async fn get_models_by_make(
    State(state): State<AppState>,
    Path(make_id): Path<i64>,
) -> ApiResult<Json<Vec<Model>>> {
    if make_id <= 0 {
        return Err(ApiError::BadRequest(format!("Invalid make id {}", make_id)));
    }

    Ok(Json(state.with_repo(|repo| repo.get_models_by_make_id(make_id))?))
}

/// GET /Models/:id
pub async fn get_model(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Model>> {
    if id <= 0 {
        return Err(ApiError::BadRequest(format!("Invalid model id {}", id)));
    }

    state
        .with_repo(|repo| repo.get_model_by_id(id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Model {} not found", id)))
}

fn validate(model: &Model) -> ApiResult<()> {
    if model.model_name().trim().is_empty() {
        return Err(ApiError::BadRequest("Model name is required".to_string()));
    }
    if model.make.id == 0 && model.make.manufacturer.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Model needs a make id or a manufacturer".to_string(),
        ));
    }
    Ok(())
}

/// POST /Models
pub async fn create_model(
    State(state): State<AppState>,
    Json(mut model): Json<Model>,
) -> ApiResult<impl IntoResponse> {
    if model.id != 0 {
        return Err(ApiError::BadRequest("A new model must not carry an id".to_string()));
    }
    validate(&model)?;

    if !state.with_repo(|repo| repo.create_model(&mut model))? {
        return Err(ApiError::BadRequest(format!(
            "Model {:?} already exists for make {}",
            model.model_name(),
            model.make.id
        )));
    }

    let location = format!("/Models/{}", model.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(model)))
}

/// PUT /Models
pub async fn update_model(
    State(state): State<AppState>,
    Json(model): Json<Model>,
) -> ApiResult<Json<Model>> {
    if model.id == 0 {
        return Err(ApiError::BadRequest("Model id is required".to_string()));
    }
    validate(&model)?;

    if !state.with_repo(|repo| repo.update_model(&model))? {
        return Err(ApiError::BadRequest(format!("Model {} was not updated", model.id)));
    }

    Ok(Json(model))
}

/// DELETE /Models/:id
pub async fn delete_model(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if id == 0 {
        return Err(ApiError::BadRequest("Model id is required".to_string()));
    }

    if !state.with_repo(|repo| repo.delete_model(id))? {
        return Err(ApiError::BadRequest(format!("Model {} was not deleted", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{send, test_state};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn model_body() -> serde_json::Value {
        json!({
            "make": { "manufacturer": "TESLA" },
            "model": "MODEL 3",
            "model_year": 2021,
            "ev_type": 2,
            "cafv_type": 3,
            "electric_range": 266,
            "base_msrp": 39990
        })
    }

    #[tokio::test]
    async fn test_create_model_creates_make() {
        let state = test_state();

        let (status, location, body) = send(&state, Method::POST, "/Models", Some(model_body())).await;

        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();
        assert_eq!(location, Some(format!("/Models/{}", id)));
        assert!(body["make"]["id"].as_i64().unwrap() > 0);

        let (status, _, fetched) = send(&state, Method::GET, &format!("/Models/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, body);
    }

    #[tokio::test]
    async fn test_blank_model_name_rejected() {
        let state = test_state();
        let mut body = model_body();
        body["model"] = json!("");

        let (status, _, response) = send(&state, Method::POST, "/Models", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Model name is required");
    }

    #[tokio::test]
    async fn test_duplicate_model_rejected() {
        let state = test_state();
        send(&state, Method::POST, "/Models", Some(model_body())).await;

        let (status, _, _) = send(&state, Method::POST, "/Models", Some(model_body())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_models_by_make() {
        let state = test_state();
        let (_, _, created) = send(&state, Method::POST, "/Models", Some(model_body())).await;
        let make_id = created["make"]["id"].as_i64().unwrap();

        let (status, _, list) =
            send(&state, Method::GET, &format!("/Models/all/{}", make_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _, _) = send(&state, Method::GET, "/Models/all/0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, _, all) = send(&state, Method::GET, "/Models/all", None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);

        let (_, _, ids) = send(&state, Method::GET, "/Models", None).await;
        assert_eq!(ids["data_type"], "model");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let state = test_state();
        let (_, _, mut created) = send(&state, Method::POST, "/Models", Some(model_body())).await;
        let id = created["id"].as_i64().unwrap();

        created["electric_range"] = json!(272);
        let (status, _, updated) = send(&state, Method::PUT, "/Models", Some(created)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["electric_range"], 272);

        let (status, _, _) = send(&state, Method::DELETE, &format!("/Models/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, _) = send(&state, Method::GET, &format!("/Models/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
