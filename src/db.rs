// SQLite persistence - makes, models, cars
//
// One connection, owned by `CarRepository`. Every statement goes through
// `timed`, which logs it at debug level and pushes it to the optional
// `QueryLog` so the API can show recent queries.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::{Car, IdList, Make, Model, ModelAttributes, Registration};
use crate::error::{Error, Result};
use crate::telemetry::QueryLog;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases answer "memory"
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Makes
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS makes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            manufacturer TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    // ==========================================================================
    // Models (one per make + nameplate, any model year)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS models (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            make_id INTEGER NOT NULL REFERENCES makes(id),
            model_name TEXT NOT NULL,
            model_year INTEGER NOT NULL,
            ev_type INTEGER NOT NULL,
            cafv_type INTEGER NOT NULL,
            electric_range INTEGER NOT NULL,
            base_msrp INTEGER NOT NULL,
            UNIQUE (make_id, model_name)
        )",
        [],
    )?;

    // ==========================================================================
    // Cars
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cars (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model_id INTEGER NOT NULL REFERENCES models(id),
            uuid TEXT NOT NULL UNIQUE,
            sid TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            vin_1_10 TEXT NOT NULL,
            county TEXT NOT NULL,
            city TEXT NOT NULL,
            state TEXT NOT NULL,
            zip_code TEXT NOT NULL,
            legislative_district TEXT NOT NULL,
            dol_vehicle_id TEXT NOT NULL,
            vehicle_location TEXT,
            electric_utility TEXT NOT NULL,
            census_tract_2020 TEXT NOT NULL,
            counties INTEGER NOT NULL,
            districts INTEGER NOT NULL,
            legislative_district_boundary INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_models_make ON models(make_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cars_model ON cars(model_id)",
        [],
    )?;

    Ok(())
}

/// Tables `CarRepository::count` can report on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Makes,
    Models,
    Cars,
}

impl Table {
    fn count_sql(self) -> &'static str {
        match self {
            Table::Makes => "SELECT COUNT(*) FROM makes",
            Table::Models => "SELECT COUNT(*) FROM models",
            Table::Cars => "SELECT COUNT(*) FROM cars",
        }
    }
}

// ============================================================================
// SQL
// ============================================================================

const MAKE_COLUMNS: &str = "SELECT k.id, k.manufacturer FROM makes k";

const MODEL_COLUMNS: &str = "SELECT m.id, m.model_name, m.model_year, m.ev_type, m.cafv_type,
        m.electric_range, m.base_msrp, k.id, k.manufacturer
 FROM models m JOIN makes k ON k.id = m.make_id";

const CAR_COLUMNS: &str = "SELECT c.id, c.uuid, c.sid, c.created_at, c.updated_at, c.vin_1_10,
        c.county, c.city, c.state, c.zip_code, c.legislative_district,
        c.dol_vehicle_id, c.vehicle_location, c.electric_utility,
        c.census_tract_2020, c.counties, c.districts, c.legislative_district_boundary,
        m.id, m.model_name, m.model_year, m.ev_type, m.cafv_type,
        m.electric_range, m.base_msrp, k.id, k.manufacturer
 FROM cars c
 JOIN models m ON m.id = c.model_id
 JOIN makes k ON k.id = m.make_id";

fn make_from_row(row: &Row, offset: usize) -> rusqlite::Result<Make> {
    Ok(Make {
        id: row.get(offset)?,
        manufacturer: row.get(offset + 1)?,
    })
}

fn model_from_row(row: &Row, offset: usize) -> rusqlite::Result<Model> {
    Ok(Model {
        id: row.get(offset)?,
        attributes: ModelAttributes {
            model_name: row.get(offset + 1)?,
            model_year: row.get(offset + 2)?,
            ev_type: row.get(offset + 3)?,
            cafv_type: row.get(offset + 4)?,
            electric_range: row.get(offset + 5)?,
            base_msrp: row.get(offset + 6)?,
        },
        make: make_from_row(row, offset + 7)?,
    })
}

fn car_from_row(row: &Row) -> rusqlite::Result<Car> {
    let uuid_text: String = row.get(1)?;
    let created_at: String = row.get(3)?;
    let updated_at: Option<String> = row.get(4)?;

    let registration = Registration {
        uuid: Uuid::parse_str(&uuid_text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
        sid: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
        updated_at: updated_at
            .map(|text| parse_timestamp(4, &text))
            .transpose()?,
        vin_1_10: row.get(5)?,
        county: row.get(6)?,
        city: row.get(7)?,
        state: row.get(8)?,
        zip_code: row.get(9)?,
        legislative_district: row.get(10)?,
        dol_vehicle_id: row.get(11)?,
        vehicle_location: row.get(12)?,
        electric_utility: row.get(13)?,
        census_tract_2020: row.get(14)?,
        counties: row.get(15)?,
        districts: row.get(16)?,
        legislative_district_boundary: row.get(17)?,
    };

    Ok(Car {
        id: row.get(0)?,
        model: model_from_row(row, 18)?,
        registration,
    })
}

fn parse_timestamp(column: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ============================================================================
// REPOSITORY
// ============================================================================

pub struct CarRepository {
    conn: Connection,
    queries: Option<Arc<QueryLog>>,
}

impl CarRepository {
    /// Wrap an already set-up connection.
    pub fn new(conn: Connection) -> Self {
        CarRepository {
            conn,
            queries: None,
        }
    }

    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn with_query_log(mut self, queries: Arc<QueryLog>) -> Self {
        self.queries = Some(queries);
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn timed<T>(
        &self,
        sql: &str,
        run: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> rusqlite::Result<T> {
        let started = Instant::now();
        let result = run(&self.conn);
        let elapsed = started.elapsed();

        debug!(sql, elapsed_ms = elapsed.as_millis() as u64, ok = result.is_ok(), "query");
        if let Some(queries) = &self.queries {
            queries.push(sql, elapsed);
        }

        result
    }

    fn id_list(&self, sql: &str, data_type: &str) -> Result<IdList> {
        let ids = self.timed(sql, |conn| {
            let mut stmt = conn.prepare(sql)?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })?;

        let mut list = IdList::new(data_type);
        list.ids = ids;
        Ok(list)
    }

    /// Run `work` inside one SQLite transaction; any error rolls it back.
    pub fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;

        match work(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "transaction rollback failed");
                }
                Err(e)
            }
        }
    }

    pub fn count(&self, table: Table) -> Result<i64> {
        let sql = table.count_sql();
        let count = self.timed(sql, |conn| conn.query_row(sql, [], |row| row.get(0)))?;
        Ok(count)
    }

    // ========================================================================
    // MAKES
    // ========================================================================

    pub fn get_make_by_id(&self, id: i64) -> Result<Option<Make>> {
        let sql = format!("{} WHERE k.id = ?1", MAKE_COLUMNS);
        let make = self.timed(&sql, |conn| {
            conn.query_row(&sql, [id], |row| make_from_row(row, 0)).optional()
        })?;
        Ok(make)
    }

    pub fn get_make_id_list(&self) -> Result<IdList> {
        self.id_list("SELECT id FROM makes ORDER BY id", "make")
    }

    pub fn get_all_makes(&self) -> Result<Vec<Make>> {
        let sql = format!("{} ORDER BY k.id", MAKE_COLUMNS);
        let makes = self.timed(&sql, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let makes = stmt
                .query_map([], |row| make_from_row(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(makes)
        })?;
        Ok(makes)
    }

    pub fn find_make_id(&self, manufacturer: &str) -> Result<Option<i64>> {
        let sql = "SELECT id FROM makes WHERE manufacturer = ?1";
        let id = self.timed(sql, |conn| {
            conn.query_row(sql, [manufacturer], |row| row.get(0)).optional()
        })?;
        Ok(id)
    }

    /// Insert a new make and assign its id. `Ok(false)` if the manufacturer exists.
    pub fn create_make(&self, make: &mut Make) -> Result<bool> {
        if make.id != 0 {
            return Err(Error::invalid_id("make", "a new make must not carry an id"));
        }

        let sql = "INSERT INTO makes (manufacturer) VALUES (?1)";
        match self.timed(sql, |conn| conn.execute(sql, params![make.manufacturer])) {
            Ok(_) => {
                make.id = self.conn.last_insert_rowid();
                Ok(true)
            }
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_make(&self, make: &Make) -> Result<bool> {
        if make.id == 0 {
            return Err(Error::invalid_id("make", "id is required"));
        }

        let sql = "UPDATE makes SET manufacturer = ?1 WHERE id = ?2";
        match self.timed(sql, |conn| conn.execute(sql, params![make.manufacturer, make.id])) {
            Ok(rows) => Ok(rows > 0),
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Fails with `Constraint` while models still reference the make.
    pub fn delete_make(&self, id: i64) -> Result<bool> {
        if id == 0 {
            return Err(Error::invalid_id("make", "id is required"));
        }

        let sql = "DELETE FROM makes WHERE id = ?1";
        match self.timed(sql, |conn| conn.execute(sql, [id])) {
            Ok(rows) => Ok(rows > 0),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::Constraint(format!("make {} is still referenced by models", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Give `make` a database id, creating it or adopting the existing row.
    pub fn ensure_make(&self, make: &mut Make) -> Result<()> {
        if make.id != 0 || self.create_make(make)? {
            return Ok(());
        }

        make.id = self.find_make_id(&make.manufacturer)?.ok_or_else(|| {
            Error::Constraint(format!("make {:?} could not be created", make.manufacturer))
        })?;
        Ok(())
    }

    // ========================================================================
    // MODELS
    // ========================================================================

    pub fn get_model_by_id(&self, id: i64) -> Result<Option<Model>> {
        let sql = format!("{} WHERE m.id = ?1", MODEL_COLUMNS);
        let model = self.timed(&sql, |conn| {
            conn.query_row(&sql, [id], |row| model_from_row(row, 0)).optional()
        })?;
        Ok(model)
    }

    pub fn get_model_id_list(&self) -> Result<IdList> {
        self.id_list("SELECT id FROM models ORDER BY id", "model")
    }

    pub fn get_all_models(&self) -> Result<Vec<Model>> {
        let sql = format!("{} ORDER BY m.id", MODEL_COLUMNS);
        self.query_models(&sql, None)
    }

    pub fn get_models_by_make_id(&self, make_id: i64) -> Result<Vec<Model>> {
        let sql = format!("{} WHERE k.id = ?1 ORDER BY m.id", MODEL_COLUMNS);
        self.query_models(&sql, Some(make_id))
    }

    fn query_models(&self, sql: &str, make_id: Option<i64>) -> Result<Vec<Model>> {
        let models = self.timed(sql, |conn| {
            let mut stmt = conn.prepare(sql)?;
            let models = stmt
                .query_map(params_from_iter(make_id), |row| model_from_row(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(models)
        })?;
        Ok(models)
    }

    pub fn find_model_id(&self, make_id: i64, model_name: &str) -> Result<Option<i64>> {
        let sql = "SELECT id FROM models WHERE make_id = ?1 AND model_name = ?2";
        let id = self.timed(sql, |conn| {
            conn.query_row(sql, params![make_id, model_name], |row| row.get(0))
                .optional()
        })?;
        Ok(id)
    }

    /// Insert a new model, creating its make first when that has no id yet.
    ///
    /// `Ok(false)` if the (make, model name) pair exists.
    pub fn create_model(&self, model: &mut Model) -> Result<bool> {
        if model.id != 0 {
            return Err(Error::invalid_id("model", "a new model must not carry an id"));
        }

        self.ensure_make(&mut model.make)?;

        let sql = "INSERT INTO models (
                make_id, model_name, model_year, ev_type, cafv_type, electric_range, base_msrp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
        let a = &model.attributes;
        let result = self.timed(sql, |conn| {
            conn.execute(
                sql,
                params![
                    model.make.id,
                    a.model_name,
                    a.model_year,
                    a.ev_type,
                    a.cafv_type,
                    a.electric_range,
                    a.base_msrp,
                ],
            )
        });

        match result {
            Ok(_) => {
                model.id = self.conn.last_insert_rowid();
                Ok(true)
            }
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_model(&self, model: &Model) -> Result<bool> {
        if model.id == 0 {
            return Err(Error::invalid_id("model", "id is required"));
        }

        let sql = "UPDATE models SET
                make_id = ?1, model_name = ?2, model_year = ?3, ev_type = ?4,
                cafv_type = ?5, electric_range = ?6, base_msrp = ?7
            WHERE id = ?8";
        let a = &model.attributes;
        let result = self.timed(sql, |conn| {
            conn.execute(
                sql,
                params![
                    model.make.id,
                    a.model_name,
                    a.model_year,
                    a.ev_type,
                    a.cafv_type,
                    a.electric_range,
                    a.base_msrp,
                    model.id,
                ],
            )
        });

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete_model(&self, id: i64) -> Result<bool> {
        if id == 0 {
            return Err(Error::invalid_id("model", "id is required"));
        }

        let sql = "DELETE FROM models WHERE id = ?1";
        match self.timed(sql, |conn| conn.execute(sql, [id])) {
            Ok(rows) => Ok(rows > 0),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::Constraint(format!("model {} is still referenced by cars", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_model(&self, model: &mut Model) -> Result<()> {
        if model.id != 0 || self.create_model(model)? {
            return Ok(());
        }

        model.id = self
            .find_model_id(model.make.id, &model.attributes.model_name)?
            .ok_or_else(|| {
                Error::Constraint(format!("model {:?} could not be created", model.attributes.model_name))
            })?;
        Ok(())
    }

    // ========================================================================
    // CARS
    // ========================================================================

    pub fn get_car_by_id(&self, id: i64) -> Result<Option<Car>> {
        let sql = format!("{} WHERE c.id = ?1", CAR_COLUMNS);
        let car = self.timed(&sql, |conn| conn.query_row(&sql, [id], car_from_row).optional())?;
        Ok(car)
    }

    pub fn get_car_id_list(&self) -> Result<IdList> {
        self.id_list("SELECT id FROM cars ORDER BY id", "car")
    }

    /// Insert a new car, creating its model (and make) first when needed.
    ///
    /// `Ok(false)` if a car with the same UUID exists.
    pub fn create_car(&self, car: &mut Car) -> Result<bool> {
        if car.id != 0 {
            return Err(Error::invalid_id("car", "a new car must not carry an id"));
        }

        self.ensure_model(&mut car.model)?;

        let sql = "INSERT INTO cars (
                model_id, uuid, sid, created_at, updated_at, vin_1_10, county, city,
                state, zip_code, legislative_district, dol_vehicle_id, vehicle_location,
                electric_utility, census_tract_2020, counties, districts,
                legislative_district_boundary
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)";
        let r = &car.registration;
        let result = self.timed(sql, |conn| {
            conn.execute(
                sql,
                params![
                    car.model.id,
                    r.uuid.to_string(),
                    r.sid,
                    r.created_at.to_rfc3339(),
                    r.updated_at.map(|dt| dt.to_rfc3339()),
                    r.vin_1_10,
                    r.county,
                    r.city,
                    r.state,
                    r.zip_code,
                    r.legislative_district,
                    r.dol_vehicle_id,
                    r.vehicle_location,
                    r.electric_utility,
                    r.census_tract_2020,
                    r.counties,
                    r.districts,
                    r.legislative_district_boundary,
                ],
            )
        });

        match result {
            Ok(_) => {
                car.id = self.conn.last_insert_rowid();
                Ok(true)
            }
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_car(&self, car: &Car) -> Result<bool> {
        if car.id == 0 {
            return Err(Error::invalid_id("car", "id is required"));
        }

        let sql = "UPDATE cars SET
                model_id = ?1, uuid = ?2, sid = ?3, created_at = ?4, updated_at = ?5,
                vin_1_10 = ?6, county = ?7, city = ?8, state = ?9, zip_code = ?10,
                legislative_district = ?11, dol_vehicle_id = ?12, vehicle_location = ?13,
                electric_utility = ?14, census_tract_2020 = ?15, counties = ?16,
                districts = ?17, legislative_district_boundary = ?18
            WHERE id = ?19";
        let r = &car.registration;
        let result = self.timed(sql, |conn| {
            conn.execute(
                sql,
                params![
                    car.model.id,
                    r.uuid.to_string(),
                    r.sid,
                    r.created_at.to_rfc3339(),
                    r.updated_at.map(|dt| dt.to_rfc3339()),
                    r.vin_1_10,
                    r.county,
                    r.city,
                    r.state,
                    r.zip_code,
                    r.legislative_district,
                    r.dol_vehicle_id,
                    r.vehicle_location,
                    r.electric_utility,
                    r.census_tract_2020,
                    r.counties,
                    r.districts,
                    r.legislative_district_boundary,
                    car.id,
                ],
            )
        });

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete_car(&self, id: i64) -> Result<bool> {
        if id == 0 {
            return Err(Error::invalid_id("car", "id is required"));
        }

        let sql = "DELETE FROM cars WHERE id = ?1";
        let rows = self.timed(sql, |conn| conn.execute(sql, [id]))?;
        Ok(rows > 0)
    }
}
