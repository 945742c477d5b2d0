//! Startup: catalog, spatial index, and a ready [`RoutingEngine`].

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use lr_core::{EngineConfig, GeoPoint, RoadNodeId, SampleRng, SpeedProfile};
use lr_partition::{read_nodes, PartitionCatalog, PartitionKey};
use lr_spatial::{GuidedSearch, IndexEntry, IndexHeader, PathSearch, RoadGraph, SnapOptions, SpatialIndex};

use crate::corridor::CorridorSelector;
use crate::loader::PartitionLoader;
use crate::{EngineResult, RoutingEngine};

/// Builder for [`RoutingEngine`].
///
/// | Method               | Default                    |
/// |----------------------|----------------------------|
/// | `.index_dir(p)`      | `config.data_dir`          |
/// | `.persist_index(b)`  | `true`                     |
/// | `.guided_search(s)`  | [`GuidedSearch`] at `config.heuristic_speed_kmh` |
///
/// ```rust,ignore
/// let engine = EngineBuilder::new(EngineConfig::with_data_dir("data/chile"))
///     .index_dir("/var/cache/lazyroute")
///     .build()?;
/// ```
pub struct EngineBuilder {
    config:        EngineConfig,
    index_dir:     Option<PathBuf>,
    persist_index: bool,
    guided:        Option<Box<dyn PathSearch>>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, index_dir: None, persist_index: true, guided: None }
    }

    /// Directory holding the index artifacts.
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = Some(dir.into());
        self
    }

    /// Whether a freshly built index is written back to disk.
    pub fn persist_index(mut self, persist: bool) -> Self {
        self.persist_index = persist;
        self
    }

    /// Search used for trips above the heuristic threshold.  When it fails
    /// the engine retries once with the plain search.
    pub fn guided_search(mut self, search: impl PathSearch + 'static) -> Self {
        self.guided = Some(Box::new(search));
        self
    }

    /// Validate the configuration, read the catalog, and load or build the
    /// spatial index.
    ///
    /// # Errors
    ///
    /// A missing or malformed manifest, an invalid configuration, or an
    /// unreadable partition file during a cold index build.  Unusable index
    /// artifacts are not an error; they are rebuilt.
    pub fn build(mut self) -> EngineResult<RoutingEngine> {
        self.config.validate()?;

        let catalog = Arc::new(PartitionCatalog::load(&self.config.data_dir)?);
        let index_dir = self.index_dir.clone().unwrap_or_else(|| self.config.data_dir.clone());

        let header = expected_header(&catalog, &self.config);
        let options = snap_options(&self.config);

        let index = match SpatialIndex::load(&index_dir, &header, options) {
            Ok(Some(index)) => index,
            Ok(None) => {
                log::info!("no spatial index in {}, building", index_dir.display());
                self.cold_build(&catalog, header, options, &index_dir)?
            }
            Err(e) => {
                log::warn!("discarding spatial index in {}: {e}", index_dir.display());
                self.cold_build(&catalog, header, options, &index_dir)?
            }
        };

        let speeds = SpeedProfile::with_overrides(&self.config.speed_overrides);
        let max_speed_kmh = self.config.heuristic_speed_kmh;
        let guided = self
            .guided
            .take()
            .unwrap_or_else(|| Box::new(GuidedSearch { max_speed_kmh }) as Box<dyn PathSearch>);
        log::info!(
            "routing engine ready: {} partitions, {} indexed nodes",
            catalog.len(),
            index.len()
        );

        Ok(RoutingEngine {
            corridor: CorridorSelector::from_config(&self.config),
            loader: PartitionLoader::new(Arc::clone(&catalog), speeds),
            graph: RwLock::new(RoadGraph::new()),
            guided,
            catalog,
            index,
            config: self.config,
        })
    }

    fn cold_build(
        &self,
        catalog: &PartitionCatalog,
        header: IndexHeader,
        options: SnapOptions,
        index_dir: &std::path::Path,
    ) -> EngineResult<SpatialIndex> {
        let entries = sample_catalog(catalog, self.config.index_sample_cap, self.config.sample_seed)?;
        let index = SpatialIndex::build(entries, header, options);

        if self.persist_index {
            if let Err(e) = index.save(index_dir) {
                log::warn!("could not persist spatial index to {}: {e}", index_dir.display());
            }
        }
        Ok(index)
    }
}

/// Header an index must carry to be reused with this catalog and config.
pub fn expected_header(catalog: &PartitionCatalog, config: &EngineConfig) -> IndexHeader {
    IndexHeader {
        format_version:        lr_spatial::index::FORMAT_VERSION,
        resolution_level:      u8::from(catalog.resolution()),
        sample_cap:            config.index_sample_cap as u64,
        sample_seed:           config.sample_seed,
        partition_count:       catalog.len() as u64,
        partition_fingerprint: catalog.fingerprint(),
    }
}

pub fn snap_options(config: &EngineConfig) -> SnapOptions {
    SnapOptions {
        candidates:     config.nearest_candidates,
        memo_capacity:  config.snap_cache_capacity,
        round_decimals: config.snap_round_decimals,
    }
}

/// Index entries for every partition, at most `cap` per partition.
///
/// Each partition's sample depends only on `seed` and its own key, so the
/// result is the same whichever order (or thread) partitions are read in.
pub fn sample_catalog(catalog: &PartitionCatalog, cap: usize, seed: u64) -> EngineResult<Vec<IndexEntry>> {
    let keys: Vec<PartitionKey> = catalog.keys().collect();

    #[cfg(not(feature = "parallel"))]
    let per_partition: Vec<Vec<IndexEntry>> = keys
        .iter()
        .map(|&key| sample_partition(catalog, key, cap, seed))
        .collect::<EngineResult<_>>()?;

    #[cfg(feature = "parallel")]
    let per_partition: Vec<Vec<IndexEntry>> = {
        use rayon::prelude::*;
        keys.par_iter()
            .map(|&key| sample_partition(catalog, key, cap, seed))
            .collect::<EngineResult<_>>()?
    };

    let entries: Vec<IndexEntry> = per_partition.into_iter().flatten().collect();
    log::info!("sampled {} index nodes from {} partitions", entries.len(), keys.len());
    Ok(entries)
}

fn sample_partition(
    catalog: &PartitionCatalog,
    key: PartitionKey,
    cap: usize,
    seed: u64,
) -> EngineResult<Vec<IndexEntry>> {
    let path = catalog.node_path(key);
    if !path.is_file() {
        log::debug!("partition {key}: no node file, nothing to index");
        return Ok(Vec::new());
    }
    let nodes = read_nodes(&path)?;
    let picked = SampleRng::new(seed, key.as_u64()).sample_indices(nodes.len(), cap);

    Ok(picked
        .into_iter()
        .map(|i| &nodes[i])
        .map(|n| IndexEntry::new(RoadNodeId(n.id), GeoPoint::new(n.lat, n.lon), key))
        .collect())
}
