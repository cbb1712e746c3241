// Entity models for the EV schema
//
// Make 1 --- * Model 1 --- * Car
//
// Ids are database surrogates (0 = not persisted). Relationships are held by
// value here; the reconciler's arena (`reconciliation::Dataset`) is where
// sharing by identity happens.

pub mod car;
pub mod make;
pub mod model;

pub use car::{Car, Registration};
pub use make::Make;
pub use model::{Model, ModelAttributes};

use serde::{Deserialize, Serialize};

/// All ids of one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdList {
    #[serde(rename = "id_list", default)]
    pub ids: Vec<i64>,

    #[serde(default)]
    pub data_type: String,
}

impl IdList {
    pub fn new(data_type: &str) -> Self {
        IdList {
            ids: Vec::new(),
            data_type: data_type.to_string(),
        }
    }
}

/// One enum variant as exposed by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumIdentifier {
    pub id: i32,
    pub description: String,
}
