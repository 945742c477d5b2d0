//! `lr-engine` - the routing engine: corridor selection, lazy partition
//! loading, snapping, and search behind one shareable handle.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                    |
//! |--------------|-------------------------------------------------------------|
//! | [`corridor`] | `CorridorSelector`, `Corridor` - partitions a trip needs    |
//! | [`loader`]   | `PartitionLoader`, `LoadReport` - merges partitions lazily  |
//! | [`builder`]  | `EngineBuilder` - catalog + index build-or-load at startup  |
//! | [`engine`]   | `RoutingEngine` - `route`, `nearest_node`, `stats`, …       |
//! | [`result`]   | `RouteResult`, `Algorithm`, `EngineStats`                   |
//! | [`error`]    | `EngineError`, `EngineResult<T>`                            |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                      |
//! |------------|-------------------------------------------------------------|
//! | `parallel` | Reads partitions and samples the index on the Rayon pool.   |
//!
//! # Lifecycle
//!
//! The catalog and the spatial index are set up once in
//! [`EngineBuilder::build`].  The graph starts empty and grows as routes
//! touch new partitions; nothing is ever evicted.

pub mod builder;
pub mod corridor;
pub mod engine;
pub mod error;
pub mod loader;
pub mod result;


pub use builder::EngineBuilder;
pub use corridor::{Corridor, CorridorSelector};
pub use engine::RoutingEngine;
pub use error::{EngineError, EngineResult};
pub use loader::{LoadReport, PartitionLoader};
pub use result::{Algorithm, EngineStats, RouteResult};
