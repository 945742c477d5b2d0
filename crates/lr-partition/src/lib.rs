//! `lr-partition` - the on-disk partitioned road network.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`key`]     | `PartitionKey` - an H3 cell at the catalog's resolution       |
//! | [`catalog`] | `PartitionCatalog` - manifest + which partitions exist        |
//! | [`columns`] | `NodeRow`, `EdgeRow`, Parquet readers, `PartitionData`        |
//! | [`writer`]  | `PartitionWriter` - lays a network out as partition files     |
//! | [`error`]   | `PartitionError`, `PartitionResult<T>`                        |
//!
//! # Directory layout
//!
//! ```text
//! <root>/metadata.json
//! <root>/nodes_h3_<level>/h3_<cell>.parquet   id, lat, lon
//! <root>/edges_h3_<level>/h3_<cell>.parquet   source, target, length_m,
//!                                             classification, posted_limit, one_way
//! ```
//!
//! Partitions are immutable once written.  An edge file holds the edges
//! whose *source* node lies in the cell; the target may live in a
//! neighbouring partition.

pub mod catalog;
pub mod columns;
pub mod error;
pub mod key;
pub mod writer;


pub use catalog::{Manifest, PartitionCatalog, MANIFEST_FILE};
pub use columns::{read_edges, read_nodes, read_partition, EdgeRow, NodeRow, PartitionData};
pub use error::{PartitionError, PartitionResult};
pub use key::PartitionKey;
pub use writer::{PartitionWriter, WriteSummary};

pub use h3o::Resolution;
