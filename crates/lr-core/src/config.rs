//! Engine configuration.
//!
//! Every field has a default, so a config file only needs to name the
//! tunables it changes:
//!
//! ```json
//! { "data_dir": "/srv/graphs/chile/optimized", "index_sample_cap": 250 }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::speed::MIN_SPEED_KMH;
use crate::{CoreError, CoreResult};

/// Recommended number of node expansions a single search may perform
/// before giving up.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Tunables for the routing engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root of the partitioned dataset (holds `metadata.json`).
    pub data_dir: PathBuf,

    /// Maximum nodes per partition inserted into the spatial index.  Lower
    /// values start faster and use less memory at the cost of snap recall.
    pub index_sample_cap: usize,

    /// Seed for the per-partition index sample.  Same seed, same index.
    pub sample_seed: u64,

    /// Raw index candidates re-ranked by great-circle distance per snap.
    pub nearest_candidates: usize,

    /// Default snap radius used by `route`.
    pub snap_max_distance_m: f64,

    /// Upper bound on memoized snap results.
    pub snap_cache_capacity: usize,

    /// Decimal places snap inputs are rounded to before memoization.
    /// 6 decimals ≈ 0.11 m.
    pub snap_round_decimals: u32,

    /// Total corridor width buffered around the straight origin→destination
    /// line.
    pub corridor_width_km: f64,

    /// Spacing between corridor sample points.
    pub corridor_sample_km: f64,

    /// Corridors whose available/computed cell ratio falls below this are
    /// reported at `warn`.
    pub coverage_warn_ratio: f64,

    /// Straight-line distance above which the heuristic search is used.
    pub heuristic_threshold_m: f64,

    /// Fastest plausible speed; the heuristic divides remaining great-circle
    /// distance by it, so it must not be below any real edge speed.
    pub heuristic_speed_kmh: f64,

    /// Node expansions allowed per search.  `None` = unlimited.
    pub step_limit: Option<usize>,

    /// Per-classification speed replacements, km/h.
    pub speed_overrides: HashMap<String, f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir:              PathBuf::from("data/graphs/optimized"),
            index_sample_cap:      1_000,
            sample_seed:           42,
            nearest_candidates:    10,
            snap_max_distance_m:   1_000.0,
            snap_cache_capacity:   10_000,
            snap_round_decimals:   6,
            corridor_width_km:     8.0,
            corridor_sample_km:    5.0,
            coverage_warn_ratio:   0.4,
            heuristic_threshold_m: 50_000.0,
            heuristic_speed_kmh:   120.0,
            step_limit:            Some(DEFAULT_STEP_LIMIT),
            speed_overrides:       HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), ..Self::default() }
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        let file = std::fs::File::open(path)?;
        let config: EngineConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tunables that would make routing meaningless.
    pub fn validate(&self) -> CoreResult<()> {
        positive("snap_max_distance_m", self.snap_max_distance_m)?;
        positive("corridor_width_km", self.corridor_width_km)?;
        positive("corridor_sample_km", self.corridor_sample_km)?;
        positive("heuristic_threshold_m", self.heuristic_threshold_m)?;
        positive("heuristic_speed_kmh", self.heuristic_speed_kmh)?;

        if !(0.0..=1.0).contains(&self.coverage_warn_ratio) {
            return Err(CoreError::Config(format!(
                "coverage_warn_ratio must be within [0, 1], got {}",
                self.coverage_warn_ratio
            )));
        }
        if self.index_sample_cap == 0 {
            return Err(CoreError::Config("index_sample_cap must be at least 1".into()));
        }
        if self.nearest_candidates == 0 {
            return Err(CoreError::Config("nearest_candidates must be at least 1".into()));
        }
        if self.snap_round_decimals > 9 {
            return Err(CoreError::Config(format!(
                "snap_round_decimals must be at most 9, got {}",
                self.snap_round_decimals
            )));
        }
        if let Some((class, kmh)) = self
            .speed_overrides
            .iter()
            .find(|(_, kmh)| !(kmh.is_finite() && **kmh >= MIN_SPEED_KMH))
        {
            return Err(CoreError::Config(format!(
                "speed override for {class:?} must be at least {MIN_SPEED_KMH} km/h, got {kmh}"
            )));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> CoreResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoreError::Config(format!("{name} must be positive, got {value}")))
    }
}
