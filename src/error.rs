use thiserror::Error;

use crate::dataset::DatasetKind;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// A required connection endpoint is missing or malformed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested dataset is not part of the supported set
    #[error("unsupported dataset: {kind} {year}")]
    UnsupportedDataset { kind: DatasetKind, year: u16 },

    /// An operation was pointed at the wrong kind of dataset
    #[error("expected a {expected} dataset, got {found}")]
    KindMismatch {
        expected: DatasetKind,
        found: DatasetKind,
    },

    /// The record store was unreachable or rejected the query
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
