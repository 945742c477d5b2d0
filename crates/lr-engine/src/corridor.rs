//! Corridor selection: which partitions a route between two points is
//! likely to touch.
//!
//! The straight origin→destination line is sampled every
//! `sample_km`; each sample's cell is expanded to a grid disk of radius
//! `k = clamp(floor(width_km / 3.5), 1, 20)`, and the radius-1 disks around the
//! exact endpoint cells are always added.  The union is then restricted to
//! partitions that exist on disk.
//!
//! The fraction that survives the restriction is the coverage ratio.  A low
//! ratio means the straight line crosses territory that was never ingested,
//! so the route may fail or detour badly.

use std::collections::BTreeSet;

use lr_core::{EngineConfig, GeoPoint};
use lr_partition::{PartitionCatalog, PartitionKey, Resolution};

/// Approximate H3 cell spacing the corridor width is divided by.
const CELL_SPACING_KM: f64 = 3.5;

/// Largest grid-disk radius a corridor sample expands to (1 261 cells).
pub const MAX_DISK_RADIUS: u32 = 20;

// ── Corridor ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Corridor {
    /// Every cell the sampling produced.
    pub computed:   BTreeSet<PartitionKey>,
    /// The subset that exists in the catalog.
    pub available:  BTreeSet<PartitionKey>,
    /// Straight-line origin→destination distance.
    pub distance_m: f64,
}

impl Corridor {
    /// Restrict `computed` to what `catalog` has.
    pub fn restrict(computed: BTreeSet<PartitionKey>, catalog: &PartitionCatalog, distance_m: f64) -> Self {
        let available = computed.iter().copied().filter(|k| catalog.is_available(*k)).collect();
        Self { computed, available, distance_m }
    }

    /// `available / computed`, or 1.0 when nothing was computed.
    pub fn coverage_ratio(&self) -> f64 {
        if self.computed.is_empty() {
            1.0
        } else {
            self.available.len() as f64 / self.computed.len() as f64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

// ── Selector ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
pub struct CorridorSelector {
    pub width_km:   f64,
    pub sample_km:  f64,
    pub warn_ratio: f64,
}

impl CorridorSelector {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            width_km:   config.corridor_width_km,
            sample_km:  config.corridor_sample_km,
            warn_ratio: config.coverage_warn_ratio,
        }
    }

    /// Corridor at the configured width.
    pub fn select(&self, catalog: &PartitionCatalog, origin: GeoPoint, destination: GeoPoint) -> Corridor {
        self.select_with_width(catalog, origin, destination, self.width_km)
    }

    /// Corridor at an explicit width.  Invalid coordinates give an empty
    /// corridor.
    pub fn select_with_width(
        &self,
        catalog: &PartitionCatalog,
        origin: GeoPoint,
        destination: GeoPoint,
        width_km: f64,
    ) -> Corridor {
        if !origin.is_valid() || !destination.is_valid() {
            log::debug!("corridor {origin} -> {destination}: invalid coordinates");
            return Corridor::default();
        }
        let distance_m = origin.distance_m(destination);
        let computed = computed_cells(origin, destination, width_km, self.sample_km, catalog.resolution());
        let corridor = Corridor::restrict(computed, catalog, distance_m);

        let ratio = corridor.coverage_ratio();
        if ratio < self.warn_ratio {
            log::warn!(
                "corridor {origin} -> {destination}: only {}/{} cells available ({:.0}%); \
                 the route crosses data that was not ingested",
                corridor.available.len(),
                corridor.computed.len(),
                ratio * 100.0
            );
        } else {
            log::debug!(
                "corridor {origin} -> {destination}: {}/{} cells available",
                corridor.available.len(),
                corridor.computed.len()
            );
        }
        corridor
    }
}

/// Number of segments the line is cut into; it is sampled at `n + 1` points.
pub fn segment_count(distance_km: f64, sample_km: f64) -> usize {
    ((distance_km / sample_km).floor() as usize).max(2)
}

/// Grid-disk radius for a corridor `width_km` wide, at most
/// [`MAX_DISK_RADIUS`].
pub fn disk_radius(width_km: f64) -> u32 {
    ((width_km / CELL_SPACING_KM).floor() as u32).clamp(1, MAX_DISK_RADIUS)
}

/// Every cell the corridor covers before catalog restriction.
pub fn computed_cells(
    origin: GeoPoint,
    destination: GeoPoint,
    width_km: f64,
    sample_km: f64,
    resolution: Resolution,
) -> BTreeSet<PartitionKey> {
    let mut cells = BTreeSet::new();
    let distance_km = origin.distance_m(destination) / 1_000.0;
    let n = segment_count(distance_km, sample_km);
    let k = disk_radius(width_km);

    for i in 0..=n {
        let sample = origin.lerp(destination, i as f64 / n as f64);
        if let Some(cell) = PartitionKey::containing(sample, resolution) {
            cells.extend(cell.disk(k));
        }
    }
    for endpoint in [origin, destination] {
        if let Some(cell) = PartitionKey::containing(endpoint, resolution) {
            cells.extend(cell.disk(1));
        }
    }
    cells
}
