//! Parquet readers for partition files.
//!
//! Only the columns the engine needs are decoded (projection pushdown), so
//! partition files may carry extra attributes without slowing loads down.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, LargeStringArray, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::{PartitionCatalog, PartitionError, PartitionKey, PartitionResult};

pub(crate) const NODE_COLUMNS: [&str; 3] = ["id", "lat", "lon"];
pub(crate) const EDGE_COLUMNS: [&str; 6] =
    ["source", "target", "length_m", "classification", "posted_limit", "one_way"];

// ── Rows ──────────────────────────────────────────────────────────────────────

/// One row of a node file.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRow {
    pub id:  i64,
    pub lat: f64,
    pub lon: f64,
}

/// One row of an edge file.  `one_way == false` means the road is also
/// drivable from `target` to `source` with the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRow {
    pub source:         i64,
    pub target:         i64,
    pub length_m:       f64,
    pub classification: String,
    pub posted_limit:   Option<String>,
    pub one_way:        bool,
}

/// Decoded contents of one partition.
#[derive(Clone, Debug)]
pub struct PartitionData {
    pub key:   PartitionKey,
    pub nodes: Vec<NodeRow>,
    pub edges: Vec<EdgeRow>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read both files of `key`.
///
/// A file that does not exist yields an empty row list: the catalog already
/// filtered requests down to partitions it knows about, and a cell with
/// nodes but no outgoing edges legitimately has no edge file.  A file that
/// exists but cannot be decoded is an error.
pub fn read_partition(catalog: &PartitionCatalog, key: PartitionKey) -> PartitionResult<PartitionData> {
    let node_path = catalog.node_path(key);
    let edge_path = catalog.edge_path(key);

    let nodes = if node_path.is_file() {
        read_nodes(&node_path)?
    } else {
        log::debug!("partition {key}: no node file at {}", node_path.display());
        Vec::new()
    };
    let edges = if edge_path.is_file() {
        read_edges(&edge_path)?
    } else {
        Vec::new()
    };

    Ok(PartitionData { key, nodes, edges })
}

/// Read the `id, lat, lon` columns of a node file.
pub fn read_nodes(path: &Path) -> PartitionResult<Vec<NodeRow>> {
    let mut rows = Vec::new();
    for batch in read_batches(path, &NODE_COLUMNS)? {
        let batch = batch?;
        let cols = Columns { file: path, batch: &batch };

        let ids = cols.int64("id")?;
        let lats = cols.float64("lat")?;
        let lons = cols.float64("lon")?;

        rows.reserve(batch.num_rows());
        for i in 0..batch.num_rows() {
            rows.push(NodeRow { id: ids.value(i), lat: lats.value(i), lon: lons.value(i) });
        }
    }
    Ok(rows)
}

/// Read the routing columns of an edge file.
pub fn read_edges(path: &Path) -> PartitionResult<Vec<EdgeRow>> {
    let mut rows = Vec::new();
    for batch in read_batches(path, &EDGE_COLUMNS)? {
        let batch = batch?;
        let cols = Columns { file: path, batch: &batch };

        let sources = cols.int64("source")?;
        let targets = cols.int64("target")?;
        let lengths = cols.float64("length_m")?;
        let classes = cols.strings("classification", false)?;
        let limits = cols.strings("posted_limit", true)?;
        let one_way = cols.boolean("one_way")?;

        rows.reserve(batch.num_rows());
        for (i, (classification, posted_limit)) in classes.into_iter().zip(limits).enumerate() {
            let length_m = lengths.value(i);
            if !(length_m.is_finite() && length_m >= 0.0) {
                return Err(cols.corrupt("length_m", format!("row {i} has length {length_m}")));
            }
            rows.push(EdgeRow {
                source: sources.value(i),
                target: targets.value(i),
                length_m,
                classification: classification.unwrap_or_default(),
                posted_limit,
                // A missing flag means "two-way", the common case.
                one_way: one_way.is_valid(i) && one_way.value(i),
            });
        }
    }
    Ok(rows)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn read_batches(
    path: &Path,
    columns: &[&str],
) -> PartitionResult<impl Iterator<Item = Result<RecordBatch, arrow::error::ArrowError>>> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let mut roots = Vec::with_capacity(columns.len());
    for name in columns {
        let idx = builder.schema().index_of(name).map_err(|_| PartitionError::Column {
            file:   PathBuf::from(path),
            column: (*name).to_string(),
            reason: "column missing".into(),
        })?;
        roots.push(idx);
    }
    let mask = ProjectionMask::roots(builder.parquet_schema(), roots);
    Ok(builder.with_projection(mask).build()?)
}

/// Typed, name-based access to the columns of one batch.
struct Columns<'a> {
    file:  &'a Path,
    batch: &'a RecordBatch,
}

impl<'a> Columns<'a> {
    fn corrupt(&self, column: &str, reason: impl Into<String>) -> PartitionError {
        PartitionError::Column {
            file:   self.file.to_path_buf(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    fn column(&self, name: &str) -> PartitionResult<&'a ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| self.corrupt(name, "column missing"))
    }

    fn typed<T: Array + 'static>(&self, name: &str, expected: &str) -> PartitionResult<&'a T> {
        let col = self.column(name)?;
        let arr = col
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| self.corrupt(name, format!("expected {expected}, found {}", col.data_type())))?;
        if arr.null_count() > 0 {
            return Err(self.corrupt(name, "unexpected nulls"));
        }
        Ok(arr)
    }

    fn int64(&self, name: &str) -> PartitionResult<&'a Int64Array> {
        self.typed::<Int64Array>(name, "int64")
    }

    fn float64(&self, name: &str) -> PartitionResult<&'a Float64Array> {
        self.typed::<Float64Array>(name, "float64")
    }

    /// Boolean column; nulls are allowed and handled by the caller.
    fn boolean(&self, name: &str) -> PartitionResult<&'a BooleanArray> {
        let col = self.column(name)?;
        col.as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| self.corrupt(name, format!("expected bool, found {}", col.data_type())))
    }

    /// Utf8 or LargeUtf8 column decoded to owned strings.
    fn strings(&self, name: &str, nullable: bool) -> PartitionResult<Vec<Option<String>>> {
        let col = self.column(name)?;
        if !nullable && col.null_count() > 0 {
            return Err(self.corrupt(name, "unexpected nulls"));
        }
        if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
            return Ok(arr.iter().map(|v| v.map(str::to_owned)).collect());
        }
        if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
            return Ok(arr.iter().map(|v| v.map(str::to_owned)).collect());
        }
        Err(self.corrupt(name, format!("expected utf8, found {}", col.data_type())))
    }
}
