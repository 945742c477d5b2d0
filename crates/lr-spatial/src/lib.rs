//! `lr-spatial` - the in-memory road graph, node snapping, and path search.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                      |
//! |------------|---------------------------------------------------------------|
//! | [`graph`]  | `RoadGraph` - node arena + adjacency lists, grows on load     |
//! | [`index`]  | `SpatialIndex` - sampled R-tree, persistence, snap memo       |
//! | [`search`] | `dijkstra`, `astar`, `PathSearch`, `Path`, `SearchError`      |
//! | [`error`]  | `SpatialError`, `SpatialResult<T>`                            |
//!
//! The graph and the index are independent: the index is built from a
//! sample of partition nodes at startup, the graph is filled partition by
//! partition as routes need it.  The engine crate ties them together.

pub mod error;
pub mod graph;
pub mod index;
pub mod search;

#[cfg(test)]
mod tests;

pub use error::{SpatialError, SpatialResult};
pub use graph::{GraphEdge, GraphNode, RoadGraph};
pub use index::{IndexEntry, IndexHeader, NodeRef, SnapOptions, SpatialIndex, COORDS_FILE, INDEX_FILE};
pub use search::{astar, dijkstra, GuidedSearch, Path, PathSearch, PlainSearch, SearchError};
