//! Lays a road network out as H3 partition files.
//!
//! Every node goes to the cell containing it; every edge goes to the cell of
//! its source node.  One node file and one edge file are written per cell,
//! followed by `metadata.json` listing the cells.  Files are Snappy
//! compressed.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use h3o::Resolution;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use lr_core::GeoPoint;

use crate::catalog::{edge_dir, file_name, node_dir};
use crate::{EdgeRow, Manifest, NodeRow, PartitionError, PartitionKey, PartitionResult, MANIFEST_FILE};

fn node_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id",  DataType::Int64,   false),
        Field::new("lat", DataType::Float64, false),
        Field::new("lon", DataType::Float64, false),
    ]))
}

fn edge_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("source",         DataType::Int64,   false),
        Field::new("target",         DataType::Int64,   false),
        Field::new("length_m",       DataType::Float64, false),
        Field::new("classification", DataType::Utf8,    false),
        Field::new("posted_limit",   DataType::Utf8,    true),
        Field::new("one_way",        DataType::Boolean, false),
    ]))
}

fn snappy_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// What [`PartitionWriter::write_network`] produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub partitions: usize,
    pub nodes:      usize,
    pub edges:      usize,
}

/// Writes partition files for one dataset root.
pub struct PartitionWriter<'a> {
    root:       &'a Path,
    resolution: Resolution,
}

impl<'a> PartitionWriter<'a> {
    pub fn new(root: &'a Path, resolution: Resolution) -> Self {
        Self { root, resolution }
    }

    /// Partition `nodes` and `edges` by H3 cell and write the whole dataset,
    /// manifest included.
    ///
    /// # Errors
    ///
    /// [`PartitionError::InvalidCoordinate`] for a node outside the WGS-84
    /// domain; [`PartitionError::UnknownSource`] for an edge whose source is
    /// not among `nodes` (its partition would be undefined).
    pub fn write_network(&self, nodes: &[NodeRow], edges: &[EdgeRow]) -> PartitionResult<WriteSummary> {
        let mut cell_of: HashMap<i64, PartitionKey> = HashMap::with_capacity(nodes.len());
        let mut node_groups: BTreeMap<PartitionKey, Vec<NodeRow>> = BTreeMap::new();

        for node in nodes {
            let key = PartitionKey::containing(GeoPoint::new(node.lat, node.lon), self.resolution)
                .ok_or(PartitionError::InvalidCoordinate { id: node.id, lat: node.lat, lon: node.lon })?;
            cell_of.insert(node.id, key);
            node_groups.entry(key).or_default().push(node.clone());
        }

        let mut edge_groups: BTreeMap<PartitionKey, Vec<EdgeRow>> = BTreeMap::new();
        for edge in edges {
            let key = cell_of
                .get(&edge.source)
                .copied()
                .ok_or(PartitionError::UnknownSource { source_id: edge.source, target: edge.target })?;
            edge_groups.entry(key).or_default().push(edge.clone());
        }

        std::fs::create_dir_all(node_dir(self.root, self.resolution))?;
        std::fs::create_dir_all(edge_dir(self.root, self.resolution))?;

        for (key, rows) in &node_groups {
            self.write_nodes(*key, rows)?;
            self.write_edges(*key, edge_groups.get(key).map(Vec::as_slice).unwrap_or_default())?;
        }

        self.write_manifest(node_groups.keys().copied())?;

        Ok(WriteSummary { partitions: node_groups.len(), nodes: nodes.len(), edges: edges.len() })
    }

    /// Write one node file.
    pub fn write_nodes(&self, key: PartitionKey, rows: &[NodeRow]) -> PartitionResult<()> {
        let schema = node_schema();

        let mut ids  = Int64Builder::with_capacity(rows.len());
        let mut lats = Float64Builder::with_capacity(rows.len());
        let mut lons = Float64Builder::with_capacity(rows.len());

        for row in rows {
            ids.append_value(row.id);
            lats.append_value(row.lat);
            lons.append_value(row.lon);
        }

        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(ids.finish()),
                Arc::new(lats.finish()),
                Arc::new(lons.finish()),
            ],
        )?;

        let dir = node_dir(self.root, self.resolution);
        std::fs::create_dir_all(&dir)?;
        write_batch(&dir.join(file_name(key)), schema, &batch)
    }

    /// Write one edge file.
    pub fn write_edges(&self, key: PartitionKey, rows: &[EdgeRow]) -> PartitionResult<()> {
        let schema = edge_schema();

        let mut sources = Int64Builder::with_capacity(rows.len());
        let mut targets = Int64Builder::with_capacity(rows.len());
        let mut lengths = Float64Builder::with_capacity(rows.len());
        let mut classes = StringBuilder::new();
        let mut limits  = StringBuilder::new();
        let mut one_way = BooleanBuilder::with_capacity(rows.len());

        for row in rows {
            sources.append_value(row.source);
            targets.append_value(row.target);
            lengths.append_value(row.length_m);
            classes.append_value(&row.classification);
            limits.append_option(row.posted_limit.as_deref());
            one_way.append_value(row.one_way);
        }

        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(sources.finish()),
                Arc::new(targets.finish()),
                Arc::new(lengths.finish()),
                Arc::new(classes.finish()),
                Arc::new(limits.finish()),
                Arc::new(one_way.finish()),
            ],
        )?;

        let dir = edge_dir(self.root, self.resolution);
        std::fs::create_dir_all(&dir)?;
        write_batch(&dir.join(file_name(key)), schema, &batch)
    }

    /// Write `metadata.json` listing `keys`.
    pub fn write_manifest(&self, keys: impl IntoIterator<Item = PartitionKey>) -> PartitionResult<()> {
        let manifest = Manifest {
            resolution_level: u8::from(self.resolution),
            partitions:       Some(keys.into_iter().map(|k| k.to_string()).collect()),
        };
        std::fs::create_dir_all(self.root)?;
        let file = File::create(self.root.join(MANIFEST_FILE))?;
        serde_json::to_writer_pretty(file, &manifest)?;
        Ok(())
    }
}

fn write_batch(path: &Path, schema: Arc<Schema>, batch: &RecordBatch) -> PartitionResult<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(snappy_props()))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}
