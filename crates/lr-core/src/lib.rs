//! `lr-core` - foundational types for the `lazyroute` routing engine.
//!
//! This crate is a dependency of every other `lr-*` crate.  It has no `lr-*`
//! dependencies and only a handful of external ones (`rand`, `serde`,
//! `serde_json`, `thiserror`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`ids`]      | `NodeId`, `ClassId`, `RoadNodeId`                        |
//! | [`geo`]      | `GeoPoint`, haversine distance, interpolation            |
//! | [`speed`]    | `SpeedProfile` - road classification → km/h              |
//! | [`weight`]   | `Weight` - which edge attribute a search minimises       |
//! | [`config`]   | `EngineConfig` and its JSON loader                       |
//! | [`rng`]      | `SampleRng` - deterministic per-partition sampling       |
//! | [`error`]    | `CoreError`, `CoreResult`                                |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod speed;
pub mod weight;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::EngineConfig;
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{ClassId, NodeId, RoadNodeId};
pub use rng::SampleRng;
pub use speed::{SpeedProfile, DEFAULT_SPEED_KMH, MIN_SPEED_KMH};
pub use weight::Weight;
