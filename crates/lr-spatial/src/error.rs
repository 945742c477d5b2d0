//! Spatial-subsystem error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `lr-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("graph capacity exceeded: {0}")]
    Capacity(&'static str),

    #[error("invalid index artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("index encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("index decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
