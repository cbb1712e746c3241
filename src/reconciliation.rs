// Reconciliation Engine - dataset rows -> deduplicated Makes, Models, Cars
//
// One pass over the rows in file order. Three policies, on purpose different:
//
//   Make   keyed by manufacturer               first wins
//   Model  keyed by "<manufacturer>_<model>"   first wins, unpopulated fields healed
//   Car    keyed by UUID                        first wins, later duplicates dropped
//
// Sharing is by arena index: a Model holds a MakeId, a Car holds a ModelId.
// Healing a Model therefore shows up for every Car pointing at it.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::entities::{Car, Make, Model, ModelAttributes, Registration};
use crate::geometry::PointParseError;
use crate::parser::RowFields;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("Row {row}: required field {field} is missing or malformed")]
    MalformedField { field: &'static str, row: usize },

    #[error("Row {row}: invalid vehicle location {text:?}: {reason}")]
    MalformedGeometry {
        row: usize,
        text: String,
        reason: PointParseError,
    },
}

// ============================================================================
// ARENA
// ============================================================================

/// Index of a Make inside a `Dataset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MakeId(usize);

/// Index of a Model inside a `Dataset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(usize);

impl MakeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ModelId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    /// Database id, 0 until persisted
    pub id: i64,
    pub make: MakeId,
    pub attributes: ModelAttributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarEntry {
    /// Database id, 0 until persisted
    pub id: i64,
    pub model: ModelId,
    pub registration: Registration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub rows: usize,
    pub healed_models: usize,
    pub duplicate_cars: usize,
}

/// Output of one reconciliation run, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub makes: Vec<Make>,
    pub models: Vec<ModelEntry>,
    pub cars: Vec<CarEntry>,
    pub stats: ReconcileStats,
}

impl Dataset {
    /// (makes, models, cars)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.makes.len(), self.models.len(), self.cars.len())
    }

    pub fn make(&self, id: MakeId) -> &Make {
        &self.makes[id.0]
    }

    pub fn model_entry(&self, id: ModelId) -> &ModelEntry {
        &self.models[id.0]
    }

    /// Materialise the nested Model (with its Make) for API/persistence use.
    pub fn model(&self, id: ModelId) -> Model {
        let entry = &self.models[id.0];
        Model {
            id: entry.id,
            make: self.make(entry.make).clone(),
            attributes: entry.attributes.clone(),
        }
    }

    /// Materialise the nested Car (with Model and Make).
    pub fn car(&self, entry: &CarEntry) -> Car {
        Car {
            id: entry.id,
            model: self.model(entry.model),
            registration: entry.registration.clone(),
        }
    }

    pub fn model_ids(&self) -> impl Iterator<Item = ModelId> {
        (0..self.models.len()).map(ModelId)
    }

    /// Record database ids assigned to a materialised Car back into the arena.
    pub fn adopt_ids(&mut self, car_index: usize, car: &Car) {
        let entry = &mut self.cars[car_index];
        entry.id = car.id;
        let model_id = entry.model;
        self.adopt_model_ids(model_id, &car.model);
    }

    /// Record database ids assigned to a materialised Model back into the arena.
    pub fn adopt_model_ids(&mut self, id: ModelId, model: &Model) {
        let entry = &mut self.models[id.0];
        entry.id = model.id;
        let make_id = entry.make;
        self.makes[make_id.0].id = model.make.id;
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

/// Accumulates rows into a `Dataset`. Holds no state beyond one run.
#[derive(Debug, Default)]
pub struct Reconciler {
    dataset: Dataset,
    makes_by_name: HashMap<String, MakeId>,
    models_by_key: HashMap<String, ModelId>,
    car_uuids: HashSet<Uuid>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest row `index`. Rows must arrive in file order.
    pub fn ingest_row(&mut self, index: usize, values: &[Value]) -> Result<(), ReconcileError> {
        let fields = RowFields::extract(index, values)?;
        self.dataset.stats.rows += 1;

        let make = self.intern_make(&fields.manufacturer);
        let model = self.intern_model(make, &fields.manufacturer, fields.model);
        self.insert_car(model, fields.registration);

        Ok(())
    }

    pub fn finish(self) -> Dataset {
        self.dataset
    }

    fn intern_make(&mut self, manufacturer: &str) -> MakeId {
        if let Some(id) = self.makes_by_name.get(manufacturer) {
            return *id;
        }

        let id = MakeId(self.dataset.makes.len());
        self.dataset.makes.push(Make::new(manufacturer));
        self.makes_by_name.insert(manufacturer.to_string(), id);
        id
    }

    fn intern_model(&mut self, make: MakeId, manufacturer: &str, incoming: ModelAttributes) -> ModelId {
        let key = model_key(manufacturer, &incoming.model_name);

        if let Some(id) = self.models_by_key.get(&key) {
            let stored = &mut self.dataset.models[id.0].attributes;
            if stored.is_incomplete() {
                debug!(key = %key, "healing model from later row");
                stored.heal_from(&incoming);
                self.dataset.stats.healed_models += 1;
            }
            return *id;
        }

        let id = ModelId(self.dataset.models.len());
        self.dataset.models.push(ModelEntry {
            id: 0,
            make,
            attributes: incoming,
        });
        self.models_by_key.insert(key, id);
        id
    }

    fn insert_car(&mut self, model: ModelId, registration: Registration) {
        // A duplicate UUID never updates the stored car.
        if !self.car_uuids.insert(registration.uuid) {
            debug!(uuid = %registration.uuid, "dropping duplicate car");
            self.dataset.stats.duplicate_cars += 1;
            return;
        }

        self.dataset.cars.push(CarEntry {
            id: 0,
            model,
            registration,
        });
    }
}

/// Model dedup key: literal "<manufacturer>_<model name>".
pub fn model_key(manufacturer: &str, model_name: &str) -> String {
    format!("{}_{}", manufacturer, model_name)
}

/// Reconcile rows in order; the first bad row aborts the whole run.
///
/// A row that is not a JSON array is read as an empty row.
pub fn reconcile_rows<'a, I>(rows: I) -> Result<Dataset, ReconcileError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut reconciler = Reconciler::new();

    for (index, row) in rows.into_iter().enumerate() {
        let values = row.as_array().map(Vec::as_slice).unwrap_or(&[]);
        reconciler.ingest_row(index, values)?;
    }

    Ok(reconciler.finish())
}
