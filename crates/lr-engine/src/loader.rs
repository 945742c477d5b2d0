//! Lazy partition loading into the shared graph.
//!
//! # Locking
//!
//! One `Mutex` guards the loaded-partition set and the partition-set cache.
//! A request holds it for the whole check → read → merge → record sequence,
//! so two requests for overlapping sets never insert the same partition
//! twice.  The graph `RwLock` is taken for writing only during the merge;
//! Parquet decoding happens before that, so searches keep running while a
//! load is reading files.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use lr_core::{GeoPoint, RoadNodeId, SpeedProfile};
use lr_partition::{read_partition, PartitionCatalog, PartitionData, PartitionKey};
use lr_spatial::{RoadGraph, SpatialResult};

use crate::{EngineError, EngineResult};

/// What one [`PartitionLoader::ensure_loaded`] call did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub nodes_added:     usize,
    /// Directed edges.
    pub edges_added:     usize,
    pub partitions_read: usize,
    /// The exact key set had been requested before; nothing was done.
    pub cache_hit:       bool,
}

#[derive(Default)]
struct LoaderState {
    loaded:    HashSet<PartitionKey>,
    /// Sorted key set → counts from the request that first loaded it.
    set_cache: HashMap<Vec<PartitionKey>, (usize, usize)>,
    set_hits:  u64,
}

pub struct PartitionLoader {
    catalog: Arc<PartitionCatalog>,
    speeds:  SpeedProfile,
    state:   Mutex<LoaderState>,
}

impl PartitionLoader {
    pub fn new(catalog: Arc<PartitionCatalog>, speeds: SpeedProfile) -> Self {
        Self { catalog, speeds, state: Mutex::new(LoaderState::default()) }
    }

    /// Merge every partition of `keys` that is available and not yet loaded
    /// into `graph`.
    ///
    /// Keys missing from the catalog are skipped.  A repeated request for the
    /// same key set is answered from the partition-set cache with zero
    /// counts.
    pub fn ensure_loaded(&self, graph: &RwLock<RoadGraph>, keys: &BTreeSet<PartitionKey>) -> EngineResult<LoadReport> {
        let mut state = self.state.lock().map_err(|_| EngineError::Poisoned("loader"))?;

        let set_key: Vec<PartitionKey> = keys.iter().copied().collect();
        if state.set_cache.contains_key(&set_key) {
            state.set_hits += 1;
            log::debug!("partition set of {} already resident", set_key.len());
            return Ok(LoadReport { cache_hit: true, ..LoadReport::default() });
        }

        let mut pending = Vec::new();
        for &key in keys {
            if !self.catalog.is_available(key) {
                log::debug!("partition {key} not in catalog, skipped");
            } else if !state.loaded.contains(&key) {
                pending.push(key);
            }
        }

        let batches = self.read_all(&pending)?;

        let mut report = LoadReport { partitions_read: batches.len(), ..LoadReport::default() };
        {
            let mut graph = graph.write().map_err(|_| EngineError::Poisoned("graph"))?;
            for data in &batches {
                let (nodes, edges) = merge(&mut graph, data, &self.speeds)?;
                report.nodes_added += nodes;
                report.edges_added += edges;
                state.loaded.insert(data.key);
            }
        }

        state.set_cache.insert(set_key, (report.nodes_added, report.edges_added));

        if report.partitions_read > 0 {
            log::info!(
                "loaded {} partitions: +{} nodes, +{} edges",
                report.partitions_read,
                report.nodes_added,
                report.edges_added
            );
        }
        Ok(report)
    }

    #[cfg(not(feature = "parallel"))]
    fn read_all(&self, keys: &[PartitionKey]) -> EngineResult<Vec<PartitionData>> {
        keys.iter()
            .map(|&key| read_partition(&self.catalog, key).map_err(EngineError::from))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn read_all(&self, keys: &[PartitionKey]) -> EngineResult<Vec<PartitionData>> {
        use rayon::prelude::*;

        keys.par_iter()
            .map(|&key| read_partition(&self.catalog, key).map_err(EngineError::from))
            .collect()
    }

    pub fn is_loaded(&self, key: PartitionKey) -> EngineResult<bool> {
        let state = self.state.lock().map_err(|_| EngineError::Poisoned("loader"))?;
        Ok(state.loaded.contains(&key))
    }

    pub fn loaded_count(&self) -> EngineResult<usize> {
        let state = self.state.lock().map_err(|_| EngineError::Poisoned("loader"))?;
        Ok(state.loaded.len())
    }

    /// `(entries, hits)` of the partition-set cache.
    pub fn set_cache_stats(&self) -> EngineResult<(usize, u64)> {
        let state = self.state.lock().map_err(|_| EngineError::Poisoned("loader"))?;
        Ok((state.set_cache.len(), state.set_hits))
    }
}

/// Insert one partition's rows.  Returns `(nodes_added, edges_added)`.
fn merge(graph: &mut RoadGraph, data: &PartitionData, speeds: &SpeedProfile) -> SpatialResult<(usize, usize)> {
    let mut nodes = 0;
    for row in &data.nodes {
        if graph.insert_node(RoadNodeId(row.id), GeoPoint::new(row.lat, row.lon))? {
            nodes += 1;
        }
    }

    let mut edges = 0;
    for row in &data.edges {
        let (from, to) = (RoadNodeId(row.source), RoadNodeId(row.target));
        let travel_s = speeds.travel_time_seconds(row.length_m, &row.classification, row.posted_limit.as_deref());

        if graph.add_edge(from, to, row.length_m, travel_s, &row.classification)? {
            edges += 1;
        }
        if !row.one_way && graph.add_edge(to, from, row.length_m, travel_s, &row.classification)? {
            edges += 1;
        }
    }
    Ok((nodes, edges))
}
