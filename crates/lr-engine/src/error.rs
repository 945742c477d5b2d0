//! Engine error type.
//!
//! "No route" is not an error: [`crate::RoutingEngine::route`] returns
//! `Ok(None)` for unreachable endpoints and missing paths.  Everything here
//! is a hard failure the caller must not mistake for an absent route.

use thiserror::Error;

use lr_core::{CoreError, GeoPoint, RoadNodeId};
use lr_partition::{PartitionError, PartitionKey};
use lr_spatial::SpatialError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("partition data error: {0}")]
    Partition(#[from] PartitionError),

    #[error("spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// The index and the loaded graph disagree about a node's position.
    #[error("node {node} is indexed at {indexed} but loaded at {graph}")]
    Integrity {
        node:    RoadNodeId,
        indexed: GeoPoint,
        graph:   GeoPoint,
    },

    /// The index points at a node its own partition does not contain.
    #[error("indexed node {node} is missing from partition {partition}")]
    MissingNode {
        node:      RoadNodeId,
        partition: PartitionKey,
    },

    #[error("{0} lock poisoned by a panicked thread")]
    Poisoned(&'static str),
}

pub type EngineResult<T> = Result<T, EngineError>;
