// EV Registry - Core Library
// Exposes all modules for use in the loader, the API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod enums;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod logging;
pub mod parser;
pub mod reconciliation;
pub mod telemetry;

#[cfg(feature = "server")]
pub mod api;

#[cfg(feature = "client")]
pub mod client;

// Re-export commonly used types
pub use config::Config;
pub use db::{setup_database, CarRepository, Table};
pub use entities::{Car, EnumIdentifier, IdList, Make, Model, ModelAttributes, Registration};
pub use enums::{from_description, identifier_by_id, CafvType, DescribedEnum, EvType};
pub use error::{Error, Result};
pub use geometry::{parse_point, GeoPoint, PointParseError};
pub use loader::{persist_dataset, LoadSummary};
pub use parser::{load_dataset, RowFields, WashingtonEvJsonProvider};
pub use reconciliation::{
    reconcile_rows, CarEntry, Dataset, MakeId, ModelEntry, ModelId, ReconcileError,
    ReconcileStats, Reconciler,
};
pub use telemetry::{MethodCallStats, QueryLog, RequestTelemetry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
