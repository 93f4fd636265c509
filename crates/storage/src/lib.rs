//! Storage Layer
//!
//! Read-only SQLite access to the weather observation dataset.

mod records;
mod repository;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use records::{
    DerivedConstants, MeasurementRecord, PrecipitationRecord, StationRecord,
    TemperatureObservation, TemperatureSummary,
};
pub use repository::{DatabaseConfig, WeatherStore};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Data source unavailable: {0}")]
    Unavailable(String),
    #[error("Relation '{0}' not found in data source")]
    MissingRelation(&'static str),
    #[error("Measurement relation is empty")]
    EmptyDataset,
    #[error("Invalid stored date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),
}
