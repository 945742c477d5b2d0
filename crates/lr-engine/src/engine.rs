//! The routing engine handle.
//!
//! A query runs through these phases:
//!
//! ```text
//! SelectingCorridor → LoadingPartitions → SnappingEndpoints
//!     → Searching{heuristic | plain} → Success | NoRoute
//! ```
//!
//! Only one retry exists: a failed heuristic search is repeated once with
//! the plain search.
//!
//! The engine is `Sync`; share it behind an `Arc` and call `route` from as
//! many threads as needed.  Searches hold the graph read lock; only
//! partition merges take it for writing.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use lr_core::{EngineConfig, GeoPoint, NodeId, Weight};
use lr_partition::{PartitionCatalog, PartitionKey};
use lr_spatial::{dijkstra, NodeRef, Path, PathSearch, RoadGraph, SearchError, SpatialIndex};

use crate::corridor::{Corridor, CorridorSelector};
use crate::loader::{LoadReport, PartitionLoader};
use crate::result::{Algorithm, EngineStats, RouteResult};
use crate::{EngineBuilder, EngineError, EngineResult};

pub struct RoutingEngine {
    pub(crate) config:   EngineConfig,
    pub(crate) catalog:  Arc<PartitionCatalog>,
    pub(crate) index:    SpatialIndex,
    pub(crate) graph:    RwLock<RoadGraph>,
    pub(crate) loader:   PartitionLoader,
    pub(crate) corridor: CorridorSelector,
    pub(crate) guided:   Box<dyn PathSearch>,
}

impl RoutingEngine {
    /// Open the dataset at `config.data_dir` with default builder settings.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        EngineBuilder::new(config).build()
    }

    // ── Routing ───────────────────────────────────────────────────────────

    /// Route from `origin` to `destination`.
    ///
    /// `Ok(None)` means no route: an endpoint is too far from the indexed
    /// network, or the loaded partitions do not connect the two.  `Err` is
    /// reserved for corrupt data and index/graph disagreement.
    pub fn route(&self, origin: GeoPoint, destination: GeoPoint, weight: Weight) -> EngineResult<Option<RouteResult>> {
        let corridor = self.corridor.select(&self.catalog, origin, destination);
        if corridor.is_empty() {
            log::debug!("route {origin} -> {destination}: no available partitions in corridor");
            return Ok(None);
        }
        self.loader.ensure_loaded(&self.graph, &corridor.available)?;

        let max_m = self.config.snap_max_distance_m;
        let Some(from) = self.index.nearest(origin.lat, origin.lon, max_m) else {
            log::debug!("route {origin} -> {destination}: origin is off the network");
            return Ok(None);
        };
        let Some(to) = self.index.nearest(destination.lat, destination.lon, max_m) else {
            log::debug!("route {origin} -> {destination}: destination is off the network");
            return Ok(None);
        };

        let u = self.resolve(&from)?;
        let v = self.resolve(&to)?;

        let graph = self.graph.read().map_err(|_| EngineError::Poisoned("graph"))?;
        let Some((path, algorithm)) = self.search(&graph, u, v, weight, corridor.distance_m) else {
            log::info!("route {origin} -> {destination}: no path in loaded graph");
            return Ok(None);
        };

        let result = summarize(&graph, &path, weight, algorithm, &from, &to);
        log::info!(
            "route {origin} -> {destination}: {:.0} m, {:.0} s, {} nodes ({algorithm})",
            result.distance_m,
            result.travel_time_s,
            result.path.len()
        );
        Ok(Some(result))
    }

    /// Choose the algorithm by straight-line distance and fall back once.
    fn search(
        &self,
        graph: &RoadGraph,
        from: NodeId,
        to: NodeId,
        weight: Weight,
        straight_m: f64,
    ) -> Option<(Path, Algorithm)> {
        let limit = self.config.step_limit;

        if straight_m > self.config.heuristic_threshold_m {
            match self.guided.search(graph, from, to, weight, limit) {
                Ok(path) => return Some((path, Algorithm::Heuristic)),
                Err(e) => log::warn!("heuristic search failed ({e}), retrying with plain search"),
            }
            return plain(graph, from, to, weight, limit).map(|p| (p, Algorithm::PlainFallback));
        }
        plain(graph, from, to, weight, limit).map(|p| (p, Algorithm::Plain))
    }

    /// Graph slot of a snapped node, loading its partition if the corridor
    /// did not cover it.
    fn resolve(&self, snap: &NodeRef) -> EngineResult<NodeId> {
        if let Some(id) = self.positioned(snap)? {
            return Ok(id);
        }
        if self.catalog.is_available(snap.partition) {
            self.loader.ensure_loaded(&self.graph, &BTreeSet::from([snap.partition]))?;
            if let Some(id) = self.positioned(snap)? {
                return Ok(id);
            }
        }
        Err(EngineError::MissingNode { node: snap.id, partition: snap.partition })
    }

    /// `Some` if the snapped node is loaded with a position; checks that the
    /// position matches what the index recorded.
    fn positioned(&self, snap: &NodeRef) -> EngineResult<Option<NodeId>> {
        let graph = self.graph.read().map_err(|_| EngineError::Poisoned("graph"))?;
        let Some(id) = graph.lookup(snap.id) else {
            return Ok(None);
        };
        match graph.position(id) {
            None => Ok(None),
            Some(pos) if pos == snap.position => Ok(Some(id)),
            Some(pos) => Err(EngineError::Integrity { node: snap.id, indexed: snap.position, graph: pos }),
        }
    }

    // ── Other operations ──────────────────────────────────────────────────

    /// Snap a coordinate to the nearest indexed node within `max_distance_m`.
    pub fn nearest_node(&self, lat: f64, lon: f64, max_distance_m: f64) -> Option<NodeRef> {
        self.index.nearest(lat, lon, max_distance_m)
    }

    /// Corridor between two points at an explicit width.
    pub fn select_partitions(&self, origin: GeoPoint, destination: GeoPoint, width_km: f64) -> Corridor {
        self.corridor.select_with_width(&self.catalog, origin, destination, width_km)
    }

    /// Load `keys` into the graph.  See [`PartitionLoader::ensure_loaded`].
    pub fn ensure_loaded(&self, keys: &BTreeSet<PartitionKey>) -> EngineResult<LoadReport> {
        self.loader.ensure_loaded(&self.graph, keys)
    }

    /// Positions of the nodes along `route`.  Nodes without a known position
    /// are skipped.
    pub fn route_coordinates(&self, route: &RouteResult) -> EngineResult<Vec<GeoPoint>> {
        let graph = self.graph.read().map_err(|_| EngineError::Poisoned("graph"))?;
        Ok(route
            .path
            .iter()
            .filter_map(|&id| graph.lookup(id).and_then(|n| graph.position(n)))
            .collect())
    }

    pub fn stats(&self) -> EngineResult<EngineStats> {
        let (partition_set_entries, partition_set_hits) = self.loader.set_cache_stats()?;
        let partitions_loaded = self.loader.loaded_count()?;
        let graph = self.graph.read().map_err(|_| EngineError::Poisoned("graph"))?;

        Ok(EngineStats {
            partitions_total: self.catalog.len(),
            partitions_loaded,
            graph_nodes: graph.node_count(),
            graph_edges: graph.edge_count(),
            index_size: self.index.len(),
            cache_hit_rate: self.index.hit_rate(),
            snap_cache_entries: self.index.memo_len(),
            partition_set_entries,
            partition_set_hits,
        })
    }

    /// Run `f` against the current graph under the read lock.
    pub fn with_graph<R>(&self, f: impl FnOnce(&RoadGraph) -> R) -> EngineResult<R> {
        let graph = self.graph.read().map_err(|_| EngineError::Poisoned("graph"))?;
        Ok(f(&graph))
    }

    pub fn catalog(&self) -> &PartitionCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn plain(graph: &RoadGraph, from: NodeId, to: NodeId, weight: Weight, limit: Option<usize>) -> Option<Path> {
    match dijkstra(graph, from, to, weight, limit) {
        Ok(path) => Some(path),
        Err(SearchError::StepLimitExceeded) => {
            log::warn!("plain search hit the step limit");
            None
        }
        Err(e) => {
            log::debug!("plain search failed: {e}");
            None
        }
    }
}

/// Walk `path` summing both weights and collecting classifications.
fn summarize(
    graph: &RoadGraph,
    path: &Path,
    weight: Weight,
    algorithm: Algorithm,
    from: &NodeRef,
    to: &NodeRef,
) -> RouteResult {
    let mut distance_m = 0.0;
    let mut travel_time_s = 0.0;
    let mut classifications = Vec::with_capacity(path.nodes.len().saturating_sub(1));

    for pair in path.nodes.windows(2) {
        if let Some(edge) = graph.edge(pair[0], pair[1]) {
            distance_m += edge.length_m;
            travel_time_s += edge.travel_s;
            classifications.push(graph.class_name(edge.class).to_owned());
        }
    }

    RouteResult {
        path: path.nodes.iter().filter_map(|&n| graph.road_id(n)).collect(),
        distance_m,
        travel_time_s,
        classifications,
        avg_speed_kmh: RouteResult::average_speed_kmh(distance_m, travel_time_s),
        weight,
        algorithm,
        origin_snap_m: from.distance_m,
        destination_snap_m: to.distance_m,
    }
}
