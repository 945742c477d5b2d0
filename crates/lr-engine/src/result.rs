//! Values returned to engine callers.

use std::fmt;

use lr_core::{RoadNodeId, Weight};

/// Which search produced a route.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Uniform-cost search; used for short trips.
    Plain,
    /// Great-circle guided search; used above the heuristic threshold.
    Heuristic,
    /// The guided search failed and the plain search was run instead.
    PlainFallback,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Plain         => "plain",
            Algorithm::Heuristic     => "heuristic",
            Algorithm::PlainFallback => "plain-fallback",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A found route.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteResult {
    /// Road nodes from the snapped origin to the snapped destination.
    pub path:            Vec<RoadNodeId>,
    pub distance_m:      f64,
    pub travel_time_s:   f64,
    /// Classification of each traversed edge, in order
    /// (`path.len() - 1` entries).
    pub classifications: Vec<String>,
    /// `0.0` when `travel_time_s` is zero.
    pub avg_speed_kmh:   f64,
    pub weight:          Weight,
    pub algorithm:       Algorithm,
    /// How far the origin and destination were moved to reach the network.
    pub origin_snap_m:      f64,
    pub destination_snap_m: f64,
}

impl RouteResult {
    pub(crate) fn average_speed_kmh(distance_m: f64, travel_time_s: f64) -> f64 {
        if travel_time_s > 0.0 {
            (distance_m / 1_000.0) / (travel_time_s / 3_600.0)
        } else {
            0.0
        }
    }
}

/// Snapshot of engine state, see [`crate::RoutingEngine::stats`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineStats {
    pub partitions_total:      usize,
    pub partitions_loaded:     usize,
    pub graph_nodes:           usize,
    /// Directed edges.
    pub graph_edges:           usize,
    pub index_size:            usize,
    /// Snap memo hit rate in `[0, 1]`.
    pub cache_hit_rate:        f64,
    pub snap_cache_entries:    usize,
    pub partition_set_entries: usize,
    pub partition_set_hits:    u64,
}
