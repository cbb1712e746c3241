// Model entity - a manufacturer's nameplate
//
// Model years of the same nameplate collapse into one Model; the first year
// seen is the one kept.

use serde::{Deserialize, Serialize};

use super::Make;
use crate::enums::{CafvType, EvType};

// ============================================================================
// MODEL ATTRIBUTES
// ============================================================================

/// The per-nameplate values, without identity or the owning Make.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelAttributes {
    #[serde(rename = "model", default)]
    pub model_name: String,

    #[serde(default)]
    pub model_year: i32,

    #[serde(default)]
    pub ev_type: EvType,

    #[serde(default)]
    pub cafv_type: CafvType,

    /// Miles; 0 means "not recorded"
    #[serde(default)]
    pub electric_range: i32,

    /// Whole dollars; 0 means "not recorded"
    #[serde(rename = "base_msrp", default)]
    pub base_msrp: i64,
}

impl ModelAttributes {
    /// True when any healable field still holds its "unpopulated" value.
    pub fn is_incomplete(&self) -> bool {
        self.ev_type == EvType::None
            || self.cafv_type == CafvType::None
            || self.electric_range == 0
            || self.base_msrp == 0
    }

    /// Overwrite the four healable fields from `other`.
    ///
    /// Name and model year are identity for this record and never change.
    pub fn heal_from(&mut self, other: &ModelAttributes) {
        self.ev_type = other.ev_type;
        self.cafv_type = other.cafv_type;
        self.electric_range = other.electric_range;
        self.base_msrp = other.base_msrp;
    }
}

// ============================================================================
// MODEL ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub make: Make,

    #[serde(flatten)]
    pub attributes: ModelAttributes,
}

impl Model {
    pub fn new(make: Make, attributes: ModelAttributes) -> Self {
        Model {
            id: 0,
            make,
            attributes,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.attributes.model_name
    }
}
