// Make entity - one row per manufacturer
//
// The manufacturer string is the natural key (exact, case-sensitive).
// `id` is the database surrogate; 0 means "not persisted yet".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Make {
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub manufacturer: String,
}

impl Make {
    pub fn new(manufacturer: impl Into<String>) -> Self {
        Make {
            id: 0,
            manufacturer: manufacturer.into(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }
}
