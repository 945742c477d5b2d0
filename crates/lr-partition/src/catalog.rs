//! Partition catalog: the manifest plus the set of partitions on disk.
//!
//! The catalog is read once at startup.  A missing or malformed manifest is
//! fatal; the engine cannot start without knowing the grid resolution.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use h3o::Resolution;
use serde::{Deserialize, Serialize};

use crate::{PartitionError, PartitionKey, PartitionResult};

/// Manifest file name inside the dataset root.
pub const MANIFEST_FILE: &str = "metadata.json";

// ── Manifest ──────────────────────────────────────────────────────────────────

/// JSON manifest describing how the network was partitioned.
///
/// ```json
/// { "resolution_level": 6, "partitions": ["862a1072fffffff", "862a10727ffffff"] }
/// ```
///
/// `partitions` may be omitted, in which case the node directory is scanned.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(alias = "h3_level")]
    pub resolution_level: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitions: Option<Vec<String>>,
}

// ── PartitionCatalog ──────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct PartitionCatalog {
    root:       PathBuf,
    resolution: Resolution,
    keys:       BTreeSet<PartitionKey>,
}

impl PartitionCatalog {
    /// Read `<root>/metadata.json` and resolve the available partition keys.
    ///
    /// # Errors
    ///
    /// [`PartitionError::ManifestMissing`] if the manifest does not exist;
    /// [`PartitionError::Manifest`] / [`PartitionError::Json`] if it cannot be
    /// interpreted; [`PartitionError::InvalidKey`] if a listed key is not a
    /// cell at the manifest's resolution.
    pub fn load(root: &Path) -> PartitionResult<Self> {
        let manifest_path = root.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(PartitionError::ManifestMissing(manifest_path));
        }
        let file = std::fs::File::open(&manifest_path)?;
        let manifest: Manifest = serde_json::from_reader(std::io::BufReader::new(file))?;

        let resolution = Resolution::try_from(manifest.resolution_level).map_err(|e| {
            PartitionError::Manifest(format!(
                "resolution_level {}: {e}",
                manifest.resolution_level
            ))
        })?;

        let mut catalog = Self { root: root.to_path_buf(), resolution, keys: BTreeSet::new() };

        let raw_keys = match manifest.partitions {
            Some(listed) => listed,
            None => catalog.scan_node_dir()?,
        };
        for raw in raw_keys {
            let key: PartitionKey = raw.parse()?;
            if key.resolution() != resolution {
                return Err(PartitionError::InvalidKey(format!(
                    "{key} has resolution {}, manifest says {}",
                    u8::from(key.resolution()),
                    manifest.resolution_level
                )));
            }
            catalog.keys.insert(key);
        }

        log::info!(
            "partition catalog loaded: {} partitions at H3 resolution {} ({})",
            catalog.keys.len(),
            manifest.resolution_level,
            root.display()
        );
        Ok(catalog)
    }

    /// Build a catalog from known parts without touching the manifest.
    pub fn from_parts(
        root: impl Into<PathBuf>,
        resolution: Resolution,
        keys: impl IntoIterator<Item = PartitionKey>,
    ) -> Self {
        Self { root: root.into(), resolution, keys: keys.into_iter().collect() }
    }

    /// List `h3_*.parquet` stems in the node directory.
    fn scan_node_dir(&self) -> PartitionResult<Vec<String>> {
        let dir = self.node_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            if let Some(cell) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix("h3_"))
            {
                found.push(cell.to_string());
            }
        }
        Ok(found)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[inline]
    pub fn is_available(&self, key: PartitionKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = PartitionKey> + '_ {
        self.keys.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Order-independent digest of the available key set.  Persisted
    /// artifacts derived from the catalog record it to detect a changed
    /// dataset.
    pub fn fingerprint(&self) -> u64 {
        self.keys
            .iter()
            .fold(0xcbf2_9ce4_8422_2325_u64, |acc, k| {
                (acc ^ k.as_u64()).wrapping_mul(0x0100_0000_01b3)
            })
    }

    // ── Layout ────────────────────────────────────────────────────────────

    pub fn node_dir(&self) -> PathBuf {
        node_dir(&self.root, self.resolution)
    }

    pub fn edge_dir(&self) -> PathBuf {
        edge_dir(&self.root, self.resolution)
    }

    pub fn node_path(&self, key: PartitionKey) -> PathBuf {
        self.node_dir().join(file_name(key))
    }

    pub fn edge_path(&self, key: PartitionKey) -> PathBuf {
        self.edge_dir().join(file_name(key))
    }
}

pub(crate) fn node_dir(root: &Path, resolution: Resolution) -> PathBuf {
    root.join(format!("nodes_h3_{}", u8::from(resolution)))
}

pub(crate) fn edge_dir(root: &Path, resolution: Resolution) -> PathBuf {
    root.join(format!("edges_h3_{}", u8::from(resolution)))
}

pub(crate) fn file_name(key: PartitionKey) -> String {
    format!("h3_{key}.parquet")
}
