// Car entity - one vehicle registration record
//
// UUID is the natural key. Everything in `Registration` comes straight from a
// dataset row; the owning Model is attached separately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Model;
use crate::geometry::GeoPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub uuid: Uuid,

    #[serde(default)]
    pub sid: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// First ten characters of the VIN
    #[serde(rename = "vin_1_10", default)]
    pub vin_1_10: String,

    #[serde(default)]
    pub county: String,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub zip_code: String,

    #[serde(default)]
    pub legislative_district: String,

    #[serde(default)]
    pub dol_vehicle_id: String,

    #[serde(default)]
    pub vehicle_location: Option<GeoPoint>,

    #[serde(default)]
    pub electric_utility: String,

    /// Kept as text: the dataset never says whether it is a number or a code
    #[serde(rename = "_2020_census_tract", default)]
    pub census_tract_2020: String,

    // Choropleth region indicators from the source map layers
    #[serde(default)]
    pub counties: i64,

    #[serde(default)]
    pub districts: i64,

    #[serde(default)]
    pub legislative_district_boundary: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub model: Model,

    #[serde(flatten)]
    pub registration: Registration,
}

impl Car {
    pub fn new(model: Model, registration: Registration) -> Self {
        Car {
            id: 0,
            model,
            registration,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.registration.uuid
    }
}
