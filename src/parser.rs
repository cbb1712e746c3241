// Washington State EV dataset parser
//
// The source is a Socrata export: a JSON object whose "data" key holds an
// array of rows, each row a fixed-position array of strings, numbers and
// nulls. The positions below are the vendor's format and are not ours to
// change.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::entities::{ModelAttributes, Registration};
use crate::enums::{CafvType, DescribedEnum, EvType};
use crate::error::{Error, Result};
use crate::geometry::{parse_point, GeoPoint};
use crate::reconciliation::{reconcile_rows, Dataset, ReconcileError};

// ============================================================================
// ROW POSITIONS
// ============================================================================

mod pos {
    pub const SID: usize = 0;
    pub const UUID: usize = 1;
    pub const CREATED_AT: usize = 3;
    pub const UPDATED_AT: usize = 5;
    pub const VIN_1_10: usize = 8;
    pub const COUNTY: usize = 9;
    pub const CITY: usize = 10;
    pub const STATE: usize = 11;
    pub const ZIP_CODE: usize = 12;
    pub const MODEL_YEAR: usize = 13;
    pub const MANUFACTURER: usize = 14;
    pub const MODEL_NAME: usize = 15;
    pub const EV_TYPE: usize = 16;
    pub const CAFV_TYPE: usize = 17;
    pub const ELECTRIC_RANGE: usize = 18;
    pub const BASE_MSRP: usize = 19;
    pub const LEGISLATIVE_DISTRICT: usize = 20;
    pub const DOL_VEHICLE_ID: usize = 21;
    pub const VEHICLE_LOCATION: usize = 22;
    pub const ELECTRIC_UTILITY: usize = 23;
    pub const CENSUS_TRACT_2020: usize = 24;
    pub const COUNTIES: usize = 25;
    pub const DISTRICTS: usize = 26;
    pub const LEGISLATIVE_DISTRICT_BOUNDARY: usize = 27;
}

// ============================================================================
// ROW FIELDS
// ============================================================================

/// Everything one dataset row says, before dedup.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFields {
    pub manufacturer: String,
    pub model: ModelAttributes,
    pub registration: Registration,
}

impl RowFields {
    /// Extract and validate the positional fields of row `index`.
    ///
    /// Required fields fail with `MalformedField`; optional ones default to
    /// "" / 0 / None. A point string that is present but malformed fails with
    /// `MalformedGeometry`.
    pub fn extract(index: usize, values: &[Value]) -> std::result::Result<Self, ReconcileError> {
        let row = RowReader { index, values };

        let sid = row.required_str(pos::SID, "Sid")?;
        let uuid_text = row.required_str(pos::UUID, "Uuid")?;
        let uuid = Uuid::parse_str(uuid_text).map_err(|_| row.malformed("Uuid"))?;
        let created_at = row.required_epoch(pos::CREATED_AT, "CreatedAt")?;
        let updated_at = row.required_epoch(pos::UPDATED_AT, "UpdatedAt")?;
        let vin_1_10 = row.required_str(pos::VIN_1_10, "Vin1To10")?;
        let model_year = row.required_numeric_str(pos::MODEL_YEAR, "ModelYear")?;
        let manufacturer = row.required_str(pos::MANUFACTURER, "Manufacturer")?;
        let model_name = row.required_str(pos::MODEL_NAME, "ModelName")?;
        let ev_type = row.required_str(pos::EV_TYPE, "EvType")?;
        let cafv_type = row.required_str(pos::CAFV_TYPE, "CafvType")?;

        let model = ModelAttributes {
            model_name: model_name.to_string(),
            model_year,
            ev_type: EvType::from_description(ev_type),
            cafv_type: CafvType::from_description(cafv_type),
            electric_range: row.optional_numeric_str(pos::ELECTRIC_RANGE).unwrap_or(0),
            base_msrp: row.optional_numeric_str(pos::BASE_MSRP).unwrap_or(0),
        };

        let registration = Registration {
            uuid,
            sid: sid.to_string(),
            created_at,
            updated_at: Some(updated_at),
            vin_1_10: vin_1_10.to_string(),
            county: row.optional_str(pos::COUNTY),
            city: row.optional_str(pos::CITY),
            state: row.optional_str(pos::STATE),
            zip_code: row.optional_str(pos::ZIP_CODE),
            legislative_district: row.optional_str(pos::LEGISLATIVE_DISTRICT),
            dol_vehicle_id: row.optional_str(pos::DOL_VEHICLE_ID),
            vehicle_location: row.optional_point(pos::VEHICLE_LOCATION)?,
            electric_utility: row.optional_str(pos::ELECTRIC_UTILITY),
            census_tract_2020: row.optional_str(pos::CENSUS_TRACT_2020),
            counties: row.optional_i64(pos::COUNTIES),
            districts: row.optional_i64(pos::DISTRICTS),
            legislative_district_boundary: row.optional_i64(pos::LEGISLATIVE_DISTRICT_BOUNDARY),
        };

        Ok(RowFields {
            manufacturer: manufacturer.to_string(),
            model,
            registration,
        })
    }
}

/// Positional accessors over one row. Out-of-range positions read as null.
struct RowReader<'a> {
    index: usize,
    values: &'a [Value],
}

impl<'a> RowReader<'a> {
    fn get(&self, position: usize) -> &'a Value {
        self.values.get(position).unwrap_or(&Value::Null)
    }

    fn malformed(&self, field: &'static str) -> ReconcileError {
        ReconcileError::MalformedField {
            field,
            row: self.index,
        }
    }

    fn required_str(&self, position: usize, field: &'static str) -> std::result::Result<&'a str, ReconcileError> {
        self.get(position).as_str().ok_or_else(|| self.malformed(field))
    }

    fn required_epoch(
        &self,
        position: usize,
        field: &'static str,
    ) -> std::result::Result<DateTime<Utc>, ReconcileError> {
        self.get(position)
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| self.malformed(field))
    }

    fn required_numeric_str<T: std::str::FromStr>(
        &self,
        position: usize,
        field: &'static str,
    ) -> std::result::Result<T, ReconcileError> {
        self.optional_numeric_str(position)
            .ok_or_else(|| self.malformed(field))
    }

    fn optional_numeric_str<T: std::str::FromStr>(&self, position: usize) -> Option<T> {
        self.get(position).as_str()?.trim().parse().ok()
    }

    fn optional_str(&self, position: usize) -> String {
        self.get(position).as_str().unwrap_or_default().to_string()
    }

    fn optional_i64(&self, position: usize) -> i64 {
        self.get(position).as_i64().unwrap_or(0)
    }

    fn optional_point(&self, position: usize) -> std::result::Result<Option<GeoPoint>, ReconcileError> {
        match self.get(position).as_str() {
            None => Ok(None),
            Some(text) => parse_point(text)
                .map(Some)
                .map_err(|reason| ReconcileError::MalformedGeometry {
                    row: self.index,
                    text: text.to_string(),
                    reason,
                }),
        }
    }
}

// ============================================================================
// FILE PROVIDER
// ============================================================================

/// Reads a Washington EV JSON export into a reconciled `Dataset`.
pub struct WashingtonEvJsonProvider;

impl WashingtonEvJsonProvider {
    pub fn new() -> Self {
        WashingtonEvJsonProvider
    }

    /// Reconcile an already-parsed document.
    pub fn process_document(&self, document: &Value) -> Result<Dataset> {
        let rows = document
            .get("data")
            .and_then(Value::as_array)
            .ok_or(Error::MissingData)?;

        let dataset = reconcile_rows(rows)?;
        let (makes, models, cars) = dataset.counts();
        info!(
            rows = rows.len(),
            makes,
            models,
            cars,
            healed_models = dataset.stats.healed_models,
            duplicate_cars = dataset.stats.duplicate_cars,
            "reconciled dataset"
        );

        Ok(dataset)
    }

    /// Read, parse and reconcile a file.
    ///
    /// The export is read whole into a `Value`: it is a single object whose
    /// `data` array may come before or after `meta`, and the state export fits
    /// in memory. Rows are then reconciled in file order. Callers holding rows
    /// from elsewhere can feed any iterator to `reconcile_rows` directly.
    pub fn process_file(&self, file_path: &Path) -> Result<Dataset> {
        let file = File::open(file_path)?;
        let document: Value = serde_json::from_reader(BufReader::new(file))?;
        self.process_document(&document)
    }
}

impl Default for WashingtonEvJsonProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience for binaries: `process_file` with the path in the error chain.
pub fn load_dataset(file_path: &Path) -> anyhow::Result<Dataset> {
    WashingtonEvJsonProvider::new()
        .process_file(file_path)
        .with_context(|| format!("Failed to process file: {}", file_path.display()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geometry::PointParseError;
    use serde_json::json;
    use std::io::Write;

    /// A full 28-position row as the export delivers it.
    pub(crate) fn sample_row(uuid: &str, manufacturer: &str, model: &str) -> Value {
        json!([
            "row-sid-1",
            uuid,
            0,
            1_700_000_000,
            null,
            1_700_000_600,
            "{ }",
            null,
            "5YJ3E1EA7J",
            "King",
            "Seattle",
            "WA",
            "98101",
            "2021",
            manufacturer,
            model,
            "Battery Electric Vehicle (BEV)",
            "Clean Alternative Fuel Vehicle Eligible",
            "266",
            "39990",
            "43",
            "123456789",
            "POINT (-122.33207 47.60611)",
            "CITY OF SEATTLE - (WA)|CITY OF TACOMA - (WA)",
            "53033008100",
            3009,
            4,
            30
        ])
    }

    fn fields_of(row: &Value) -> std::result::Result<RowFields, ReconcileError> {
        RowFields::extract(0, row.as_array().unwrap())
    }

    #[test]
    fn test_extract_full_row() {
        let row = sample_row("0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11", "TESLA", "MODEL 3");
        let fields = fields_of(&row).unwrap();

        assert_eq!(fields.manufacturer, "TESLA");
        assert_eq!(fields.model.model_name, "MODEL 3");
        assert_eq!(fields.model.model_year, 2021);
        assert_eq!(fields.model.ev_type, EvType::Bev);
        assert_eq!(fields.model.cafv_type, CafvType::Eligible);
        assert_eq!(fields.model.electric_range, 266);
        assert_eq!(fields.model.base_msrp, 39990);

        let reg = &fields.registration;
        assert_eq!(reg.sid, "row-sid-1");
        assert_eq!(reg.created_at.timestamp(), 1_700_000_000);
        assert_eq!(reg.updated_at.unwrap().timestamp(), 1_700_000_600);
        assert_eq!(reg.vin_1_10, "5YJ3E1EA7J");
        assert_eq!(reg.city, "Seattle");
        assert_eq!(reg.vehicle_location, Some(GeoPoint::new(-122.33207, 47.60611)));
        assert_eq!(reg.counties, 3009);
        assert_eq!(reg.legislative_district_boundary, 30);
    }

    #[test]
    fn test_optional_fields_default_when_null() {
        let mut row = sample_row("0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11", "KIA", "EV6");
        for position in [9, 10, 11, 12, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27] {
            row[position] = Value::Null;
        }

        let fields = fields_of(&row).unwrap();

        assert_eq!(fields.model.electric_range, 0);
        assert_eq!(fields.model.base_msrp, 0);
        assert_eq!(fields.registration.county, "");
        assert_eq!(fields.registration.zip_code, "");
        assert_eq!(fields.registration.vehicle_location, None);
        assert_eq!(fields.registration.districts, 0);
    }

    #[test]
    fn test_short_row_reads_missing_optionals_as_absent() {
        let row = sample_row("0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11", "KIA", "EV6");
        let truncated: Vec<Value> = row.as_array().unwrap()[..18].to_vec();

        let fields = RowFields::extract(0, &truncated).unwrap();

        assert_eq!(fields.model.electric_range, 0);
        assert_eq!(fields.registration.vehicle_location, None);
    }

    #[test]
    fn test_missing_required_fields_name_the_field() {
        let cases = [
            (0, "Sid"),
            (1, "Uuid"),
            (3, "CreatedAt"),
            (5, "UpdatedAt"),
            (8, "Vin1To10"),
            (13, "ModelYear"),
            (14, "Manufacturer"),
            (15, "ModelName"),
            (16, "EvType"),
            (17, "CafvType"),
        ];

        for (position, expected) in cases {
            let mut row = sample_row("0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11", "KIA", "EV6");
            row[position] = Value::Null;

            let err = RowFields::extract(7, row.as_array().unwrap()).unwrap_err();
            assert_eq!(
                err,
                ReconcileError::MalformedField { field: expected, row: 7 },
                "position {}",
                position
            );
        }
    }

    #[test]
    fn test_malformed_required_values() {
        let mut bad_uuid = sample_row("not-a-uuid", "KIA", "EV6");
        assert_eq!(
            fields_of(&bad_uuid).unwrap_err(),
            ReconcileError::MalformedField { field: "Uuid", row: 0 }
        );

        bad_uuid[1] = json!("0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11");
        bad_uuid[13] = json!("twenty-twenty");
        assert_eq!(
            fields_of(&bad_uuid).unwrap_err(),
            ReconcileError::MalformedField { field: "ModelYear", row: 0 }
        );

        let mut text_timestamp = sample_row("0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11", "KIA", "EV6");
        text_timestamp[3] = json!("1700000000");
        assert_eq!(
            fields_of(&text_timestamp).unwrap_err(),
            ReconcileError::MalformedField { field: "CreatedAt", row: 0 }
        );
    }

    #[test]
    fn test_malformed_point_fails_row() {
        let mut row = sample_row("0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11", "KIA", "EV6");
        row[22] = json!("POINT 47 -122");

        let err = fields_of(&row).unwrap_err();

        assert_eq!(
            err,
            ReconcileError::MalformedGeometry {
                row: 0,
                text: "POINT 47 -122".to_string(),
                reason: PointParseError::MissingDelimiters,
            }
        );
    }

    #[test]
    fn test_unknown_ev_type_is_sentinel() {
        let mut row = sample_row("0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11", "TOYOTA", "MIRAI");
        row[16] = json!("Fuel Cell Electric Vehicle (FCEV)");

        let fields = fields_of(&row).unwrap();

        assert_eq!(fields.model.ev_type, EvType::None);
    }

    #[test]
    fn test_process_document_requires_data_array() {
        let provider = WashingtonEvJsonProvider::new();

        let missing = provider.process_document(&json!({ "meta": {} }));
        assert!(matches!(missing, Err(Error::MissingData)));

        let not_array = provider.process_document(&json!({ "data": "rows" }));
        assert!(matches!(not_array, Err(Error::MissingData)));
    }

    #[test]
    fn test_process_file() {
        let document = json!({
            "meta": { "view": { "name": "Electric Vehicle Population Data" } },
            "data": [
                sample_row("0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11", "TESLA", "MODEL 3"),
                sample_row("1c6c6e44-7b1b-4ce7-9e44-ac6c9c1cab22", "TESLA", "MODEL Y"),
                sample_row("2d7d7f55-8c2c-4df8-af55-bd7dad2dbc33", "NISSAN", "LEAF"),
            ]
        });

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", document).unwrap();

        let dataset = WashingtonEvJsonProvider::new()
            .process_file(file.path())
            .unwrap();

        assert_eq!(dataset.counts(), (2, 3, 3));
    }

    #[test]
    fn test_process_file_data_before_meta_keeps_row_order() {
        let tesla = "0b5b5d33-6a0a-4bd6-8d33-9b5b8b0b9a11";
        let kia = "1c6c6e44-7b1b-4ce7-9e44-ac6c9c1cab22";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{{\"data\": [{}, {}], \"meta\": {{\"view\": {{}}}}}}",
            sample_row(kia, "KIA", "EV6"),
            sample_row(tesla, "TESLA", "MODEL 3"),
        )
        .unwrap();

        let dataset = WashingtonEvJsonProvider::new()
            .process_file(file.path())
            .unwrap();

        let cars: Vec<_> = dataset.cars.iter().map(|entry| dataset.car(entry)).collect();
        assert_eq!(cars[0].registration.uuid.to_string(), kia);
        assert_eq!(cars[1].registration.uuid.to_string(), tesla);
        assert_eq!(dataset.makes[0].manufacturer, "KIA");
    }

    #[test]
    fn test_process_file_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"data\": [ ").unwrap();

        let result = WashingtonEvJsonProvider::new().process_file(file.path());

        assert!(matches!(result, Err(Error::Json(_))));
    }
}
