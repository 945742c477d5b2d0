//! Road classification → travel speed.
//!
//! A posted limit on the edge wins when it parses; otherwise the
//! classification's table speed applies, and unknown classifications fall
//! back to [`DEFAULT_SPEED_KMH`].  Every lookup returns a finite, strictly
//! positive speed, so travel times are always finite for finite distances.

use std::collections::HashMap;

/// Speed used for classifications missing from the table.
pub const DEFAULT_SPEED_KMH: f64 = 50.0;

/// Slowest speed accepted from a posted limit or an override, km/h.
/// Anything slower is treated as bad data.
pub const MIN_SPEED_KMH: f64 = 1.0;

/// Kilometres per statute mile.
const KM_PER_MILE: f64 = 1.60934;

/// Speed lookup with optional per-classification overrides.
///
/// Cheap to clone; the engine keeps one instance for its whole lifetime.
#[derive(Clone, Debug, Default)]
pub struct SpeedProfile {
    overrides: HashMap<String, f64>,
}

impl SpeedProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a profile whose table entries are replaced by `overrides`.
    /// Non-finite overrides and those below [`MIN_SPEED_KMH`] are ignored.
    pub fn with_overrides(overrides: &HashMap<String, f64>) -> Self {
        let overrides = overrides
            .iter()
            .filter(|(_, kmh)| plausible(**kmh))
            .map(|(class, kmh)| (class.clone(), *kmh))
            .collect();
        Self { overrides }
    }

    /// Speed in km/h for an edge.
    pub fn speed_kmh(&self, classification: &str, posted_limit: Option<&str>) -> f64 {
        if let Some(kmh) = posted_limit.and_then(parse_posted_limit) {
            return kmh;
        }
        if let Some(&kmh) = self.overrides.get(classification) {
            return kmh;
        }
        table_speed_kmh(classification).unwrap_or(DEFAULT_SPEED_KMH)
    }

    /// Seconds needed to drive `distance_m` metres on such an edge.
    #[inline]
    pub fn travel_time_seconds(
        &self,
        distance_m: f64,
        classification: &str,
        posted_limit: Option<&str>,
    ) -> f64 {
        distance_m / (self.speed_kmh(classification, posted_limit) / 3.6)
    }
}

/// Table speed in km/h for a road classification, or `None` if unknown.
pub fn table_speed_kmh(classification: &str) -> Option<f64> {
    let kmh = match classification {
        "motorway"       => 120.0,
        "motorway_link"  => 80.0,
        "trunk"          => 100.0,
        "trunk_link"     => 70.0,
        "primary"        => 80.0,
        "primary_link"   => 60.0,
        "secondary"      => 50.0,
        "secondary_link" => 40.0,
        "tertiary"       => 60.0,
        "tertiary_link"  => 40.0,
        "unclassified"   => 50.0,
        "residential"    => 30.0,
        "service"        => 20.0,
        "living_street"  => 10.0,
        "pedestrian"     => 5.0,
        "track"          => 30.0,
        "bus_guideway"   => 50.0,
        "raceway"        => 200.0,
        "road"           => 50.0,
        "busway"         => 50.0,
        "footway"        => 5.0,
        "bridleway"      => 10.0,
        "steps"          => 3.0,
        "path"           => 5.0,
        "cycleway"       => 15.0,
        _                => return None,
    };
    Some(kmh)
}

/// Parse a posted limit such as `"60"`, `"60 km/h"` or `"40 mph"` into km/h.
///
/// Returns `None` for anything that does not reduce to a single finite
/// number of at least [`MIN_SPEED_KMH`] (`"50;70"`, `"walk"`, `"0"`, `"1e-320"`, …).
pub fn parse_posted_limit(raw: &str) -> Option<f64> {
    let s = raw.trim().to_ascii_lowercase();

    let (number, factor) = if let Some(n) = s.strip_suffix("mph") {
        (n, KM_PER_MILE)
    } else if let Some(n) = s
        .strip_suffix("km/h")
        .or_else(|| s.strip_suffix("kmh"))
        .or_else(|| s.strip_suffix("kph"))
    {
        (n, 1.0)
    } else {
        (s.as_str(), 1.0)
    };

    let kmh = number.trim().parse::<f64>().ok()? * factor;
    plausible(kmh).then_some(kmh)
}

#[inline]
fn plausible(kmh: f64) -> bool {
    kmh.is_finite() && kmh >= MIN_SPEED_KMH
}
