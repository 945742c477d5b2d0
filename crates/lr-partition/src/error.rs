//! Partition-subsystem error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `lr-partition`.
///
/// A partition whose files are absent is not an error (see
/// [`crate::read_partition`]); every variant here means the dataset on disk
/// is unusable or corrupt.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("partition manifest not found at {0}")]
    ManifestMissing(PathBuf),

    #[error("malformed partition manifest: {0}")]
    Manifest(String),

    #[error("invalid partition key {0}")]
    InvalidKey(String),

    #[error("{file}: column {column:?}: {reason}")]
    Column {
        file:   PathBuf,
        column: String,
        reason: String,
    },

    #[error("node {id} has invalid coordinates ({lat}, {lon})")]
    InvalidCoordinate { id: i64, lat: f64, lon: f64 },

    #[error("edge {source_id}->{target} references a source node that was not supplied")]
    UnknownSource { source_id: i64, target: i64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, PartitionError>`.
pub type PartitionResult<T> = Result<T, PartitionError>;
