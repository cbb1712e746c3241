use thiserror::Error;

use crate::reconciliation::ReconcileError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document has no \"data\" array")]
    MissingData,

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid {entity} id: {reason}")]
    InvalidId { entity: &'static str, reason: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn invalid_id(entity: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidId {
            entity,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
