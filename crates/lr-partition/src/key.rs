//! Partition keys.
//!
//! A partition is identified by an H3 cell.  The textual form (used in file
//! names and the manifest) is the lowercase hexadecimal cell index, e.g.
//! `862a1072fffffff`.

use std::fmt;
use std::str::FromStr;

use h3o::{CellIndex, LatLng, Resolution};

use lr_core::GeoPoint;

use crate::PartitionError;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct PartitionKey(pub CellIndex);

impl PartitionKey {
    /// Cell containing `point` at `resolution`, or `None` for coordinates
    /// outside the WGS-84 domain.
    pub fn containing(point: GeoPoint, resolution: Resolution) -> Option<Self> {
        if !point.is_valid() {
            return None;
        }
        LatLng::new(point.lat, point.lon)
            .ok()
            .map(|ll| PartitionKey(ll.to_cell(resolution)))
    }

    /// All cells within `k` grid steps of this one, itself included.
    pub fn disk(self, k: u32) -> Vec<PartitionKey> {
        self.0
            .grid_disk::<Vec<_>>(k)
            .into_iter()
            .map(PartitionKey)
            .collect()
    }

    /// Centre of the cell.
    pub fn center(self) -> GeoPoint {
        let ll = LatLng::from(self.0);
        GeoPoint::new(ll.lat(), ll.lng())
    }

    #[inline]
    pub fn resolution(self) -> Resolution {
        self.0.resolution()
    }

    /// Raw 64-bit cell index.
    #[inline]
    pub fn as_u64(self) -> u64 {
        u64::from(self.0)
    }

    pub fn from_u64(raw: u64) -> Result<Self, PartitionError> {
        CellIndex::try_from(raw)
            .map(PartitionKey)
            .map_err(|e| PartitionError::InvalidKey(format!("{raw:#x}: {e}")))
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PartitionKey {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<CellIndex>()
            .map(PartitionKey)
            .map_err(|e| PartitionError::InvalidKey(format!("{s:?}: {e}")))
    }
}
