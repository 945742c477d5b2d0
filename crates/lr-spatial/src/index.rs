//! Persisted snap index over a sample of road nodes.
//!
//! # Approximation
//!
//! The R-tree holds at most `sample_cap` nodes per partition, and a query
//! only re-ranks the `candidates` nearest entries by raw index distance
//! (squared degrees, which overweights longitude away from the equator).
//! The true nearest road node can therefore be missed, either because it
//! was not sampled or because it fell outside the raw top-N.  Callers
//! accept this in exchange for a small index that loads in milliseconds.
//!
//! # Artifacts
//!
//! | File                | Contents                                          |
//! |---------------------|---------------------------------------------------|
//! | `spatial_index.idx` | header + the R-tree itself                        |
//! | `node_coords.bin`   | header + `(id, lat, lon)` table                   |
//!
//! Both are `bincode` encodings.  An artifact is accepted only if its header
//! equals the one expected for the current catalog and configuration and the
//! two files agree entry for entry.
//!
//! # Memo
//!
//! `nearest` is memoized on the rounded query.  The memo is a `DashMap`, so
//! concurrent snaps never block each other; it stops accepting new entries
//! once `memo_capacity` is reached.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use lr_core::{GeoPoint, RoadNodeId};
use lr_partition::PartitionKey;

use crate::{SpatialError, SpatialResult};

pub const INDEX_FILE: &str = "spatial_index.idx";
pub const COORDS_FILE: &str = "node_coords.bin";

/// Bumped whenever the artifact encoding changes.
pub const FORMAT_VERSION: u32 = 1;

// ── R-tree entry ──────────────────────────────────────────────────────────────

/// A sampled node: `[lon, lat]` point, road id and owning partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub point:     [f64; 2],
    pub id:        i64,
    pub partition: u64,
}

impl IndexEntry {
    pub fn new(id: RoadNodeId, pos: GeoPoint, partition: PartitionKey) -> Self {
        Self { point: [pos.lon, pos.lat], id: id.0, partition: partition.as_u64() }
    }

    #[inline]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.point[1], self.point[0])
    }
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for IndexEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlon = self.point[0] - point[0];
        let dlat = self.point[1] - point[1];
        dlon * dlon + dlat * dlat
    }
}

// ── Header ────────────────────────────────────────────────────────────────────

/// Identity of the dataset and sampling parameters an index was built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHeader {
    pub format_version:        u32,
    pub resolution_level:      u8,
    pub sample_cap:            u64,
    pub sample_seed:           u64,
    pub partition_count:       u64,
    pub partition_fingerprint: u64,
}

// ── Snap result ───────────────────────────────────────────────────────────────

/// A node selected by [`SpatialIndex::nearest`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NodeRef {
    pub id:         RoadNodeId,
    pub position:   GeoPoint,
    /// Great-circle distance from the (rounded) query point.
    pub distance_m: f64,
    pub partition:  PartitionKey,
}

#[derive(Copy, Clone, Debug)]
pub struct SnapOptions {
    /// Raw nearest entries re-ranked by great-circle distance.
    pub candidates:     usize,
    pub memo_capacity:  usize,
    pub round_decimals: u32,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self { candidates: 10, memo_capacity: 10_000, round_decimals: 6 }
    }
}

/// `(lat, lon)` in fixed point plus the bit pattern of `max_distance_m`.
type SnapKey = (i64, i64, u64);

// ── SpatialIndex ──────────────────────────────────────────────────────────────

pub struct SpatialIndex {
    tree:    RTree<IndexEntry>,
    coords:  FxHashMap<i64, GeoPoint>,
    header:  IndexHeader,
    options: SnapOptions,

    memo:   DashMap<SnapKey, Option<NodeRef>>,
    hits:   AtomicU64,
    misses: AtomicU64,
}

impl SpatialIndex {
    /// Bulk-load an index from sampled entries.
    pub fn build(entries: Vec<IndexEntry>, header: IndexHeader, options: SnapOptions) -> Self {
        let coords = entries.iter().map(|e| (e.id, e.position())).collect();
        Self::from_parts(RTree::bulk_load(entries), coords, header, options)
    }

    fn from_parts(
        tree: RTree<IndexEntry>,
        coords: FxHashMap<i64, GeoPoint>,
        header: IndexHeader,
        options: SnapOptions,
    ) -> Self {
        Self {
            tree,
            coords,
            header,
            options,
            memo: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // ── Persistence ───────────────────────────────────────────────────────

    /// Write both artifacts into `dir`.
    pub fn save(&self, dir: &Path) -> SpatialResult<()> {
        std::fs::create_dir_all(dir)?;
        let config = bincode::config::standard();

        let mut writer = BufWriter::new(File::create(dir.join(INDEX_FILE))?);
        bincode::serde::encode_into_std_write((&self.header, &self.tree), &mut writer, config)?;

        let mut table: Vec<(i64, f64, f64)> =
            self.coords.iter().map(|(&id, p)| (id, p.lat, p.lon)).collect();
        table.sort_unstable_by_key(|row| row.0);
        let mut writer = BufWriter::new(File::create(dir.join(COORDS_FILE))?);
        bincode::serde::encode_into_std_write((&self.header, &table), &mut writer, config)?;

        log::info!("spatial index persisted: {} entries in {}", self.len(), dir.display());
        Ok(())
    }

    /// Load artifacts from `dir`.
    ///
    /// `Ok(None)` when either file is absent.  A decode failure, a header
    /// different from `expected`, or disagreement between the two files is
    /// an error; the caller is expected to rebuild.
    pub fn load(dir: &Path, expected: &IndexHeader, options: SnapOptions) -> SpatialResult<Option<Self>> {
        let index_path = dir.join(INDEX_FILE);
        let coords_path = dir.join(COORDS_FILE);
        if !index_path.is_file() || !coords_path.is_file() {
            return Ok(None);
        }
        let config = bincode::config::standard();

        let mut reader = BufReader::new(File::open(&index_path)?);
        let (header, tree): (IndexHeader, RTree<IndexEntry>) =
            bincode::serde::decode_from_std_read(&mut reader, config)?;
        check_header(&index_path, &header, expected)?;

        let mut reader = BufReader::new(File::open(&coords_path)?);
        let (coord_header, table): (IndexHeader, Vec<(i64, f64, f64)>) =
            bincode::serde::decode_from_std_read(&mut reader, config)?;
        check_header(&coords_path, &coord_header, expected)?;

        if table.len() != tree.size() {
            return Err(artifact(
                &coords_path,
                format!("{} coordinates for {} index entries", table.len(), tree.size()),
            ));
        }
        let coords: FxHashMap<i64, GeoPoint> =
            table.into_iter().map(|(id, lat, lon)| (id, GeoPoint::new(lat, lon))).collect();
        for entry in tree.iter() {
            if coords.get(&entry.id) != Some(&entry.position()) {
                return Err(artifact(&coords_path, format!("node {} disagrees with the index", entry.id)));
            }
            if PartitionKey::from_u64(entry.partition).is_err() {
                return Err(artifact(&index_path, format!("node {} has an invalid partition", entry.id)));
            }
        }

        log::info!("spatial index loaded: {} entries from {}", tree.size(), dir.display());
        Ok(Some(Self::from_parts(tree, coords, header, options)))
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Nearest sampled node within `max_distance_m` of `(lat, lon)`.
    ///
    /// Out-of-range results are memoized too, so a repeated miss is as cheap
    /// as a repeated hit.
    pub fn nearest(&self, lat: f64, lon: f64, max_distance_m: f64) -> Option<NodeRef> {
        if !GeoPoint::new(lat, lon).is_valid() || max_distance_m.is_nan() {
            return None;
        }
        let scale = 10_f64.powi(self.options.round_decimals as i32);
        let key: SnapKey = ((lat * scale).round() as i64, (lon * scale).round() as i64, max_distance_m.to_bits());

        if let Some(cached) = self.memo.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return *cached;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let query = GeoPoint::new(key.0 as f64 / scale, key.1 as f64 / scale);
        let found = self.scan(query, max_distance_m);

        if self.memo.len() < self.options.memo_capacity {
            self.memo.insert(key, found);
        }
        found
    }

    fn scan(&self, query: GeoPoint, max_distance_m: f64) -> Option<NodeRef> {
        let best = self
            .tree
            .nearest_neighbor_iter(&[query.lon, query.lat])
            .take(self.options.candidates)
            .map(|e| (query.distance_m(e.position()), e))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));

        match best {
            Some((distance_m, entry)) if distance_m <= max_distance_m => Some(NodeRef {
                id: RoadNodeId(entry.id),
                position: entry.position(),
                distance_m,
                partition: PartitionKey::from_u64(entry.partition).ok()?,
            }),
            Some((distance_m, entry)) => {
                log::debug!(
                    "snap {query}: nearest indexed node {} is {distance_m:.0} m away (limit {max_distance_m:.0} m)",
                    entry.id
                );
                None
            }
            None => None,
        }
    }

    /// Coordinates the index recorded for `id`.
    pub fn coordinate(&self, id: RoadNodeId) -> Option<GeoPoint> {
        self.coords.get(&id.0).copied()
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Fraction of `nearest` calls answered from the memo; 0 before any call.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}

fn check_header(path: &Path, found: &IndexHeader, expected: &IndexHeader) -> SpatialResult<()> {
    if found == expected {
        Ok(())
    } else {
        Err(artifact(path, format!("built for {found:?}, expected {expected:?}")))
    }
}

fn artifact(path: &Path, reason: String) -> SpatialError {
    SpatialError::Artifact { path: PathBuf::from(path), reason }
}
