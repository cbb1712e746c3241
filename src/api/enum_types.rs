// /EvTypes and /CafvTypes - read-only views of the described enums

use axum::{
    extract::Path,
    response::Json,
};

use super::{ApiError, ApiResult};
use crate::entities::EnumIdentifier;
use crate::enums::{identifier_by_id, CafvType, DescribedEnum, EvType};

fn identifier<E: DescribedEnum>(id: i32) -> ApiResult<Json<EnumIdentifier>> {
    if id < 0 {
        return Err(ApiError::BadRequest(format!("Invalid {} id {}", E::NAME, id)));
    }

    identifier_by_id::<E>(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} {} not found", E::NAME, id)))
}

/// GET /EvTypes
pub async fn get_ev_types() -> Json<Vec<EnumIdentifier>> {
    Json(EvType::identifiers())
}

/// GET /EvTypes/:id
pub async fn get_ev_type(Path(id): Path<i32>) -> ApiResult<Json<EnumIdentifier>> {
    identifier::<EvType>(id)
}

/// GET /CafvTypes
pub async fn get_cafv_types() -> Json<Vec<EnumIdentifier>> {
    Json(CafvType::identifiers())
}

/// GET /CafvTypes/:id
pub async fn get_cafv_type(Path(id): Path<i32>) -> ApiResult<Json<EnumIdentifier>> {
    identifier::<CafvType>(id)
}
