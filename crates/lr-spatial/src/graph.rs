//! Incrementally built directed road graph.
//!
//! # Data layout
//!
//! Nodes live in an arena indexed by dense [`NodeId`]; each slot holds the
//! stable [`RoadNodeId`] and, once its partition has been read, a position.
//! Outgoing edges of node `n` are `adjacency[n]`, a short `Vec` of
//! [`GraphEdge`] records.  Unlike a CSR layout this can grow one partition at
//! a time without rebuilding, which is what lazy loading needs.
//!
//! # Placeholders
//!
//! An edge may point at a node whose partition is not loaded yet.  The target
//! is then created as a placeholder with `pos == None`; the position is filled
//! in when its own partition arrives.  Placeholders are routable (edges out of
//! them appear once their partition loads) but contribute zero to the search
//! heuristic.
//!
//! The graph never shrinks.

use rustc_hash::FxHashMap;

use lr_core::{ClassId, GeoPoint, NodeId, RoadNodeId};

use crate::{SpatialError, SpatialResult};

// ── Records ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub road_id: RoadNodeId,
    /// `None` for a placeholder.
    pub pos:     Option<GeoPoint>,
}

/// One directed edge.  Both weights are stored so a single graph serves
/// time- and distance-weighted searches.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GraphEdge {
    pub to:       NodeId,
    pub length_m: f64,
    pub travel_s: f64,
    pub class:    ClassId,
}

// ── RoadGraph ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RoadGraph {
    nodes:      Vec<GraphNode>,
    adjacency:  Vec<Vec<GraphEdge>>,
    ids:        FxHashMap<RoadNodeId, NodeId>,
    classes:    Vec<String>,
    class_ids:  FxHashMap<String, ClassId>,
    edge_count: usize,
    /// Highest `length_m / travel_s` seen on any inserted edge, km/h.
    fastest_kmh: f64,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Fastest speed of any edge ever inserted, km/h.  Never decreases,
    /// even when that edge is later replaced.  `0.0` on an empty graph and
    /// infinite once a zero-time edge of positive length exists.
    pub fn fastest_edge_kmh(&self) -> f64 {
        self.fastest_kmh
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    #[inline]
    pub fn lookup(&self, road_id: RoadNodeId) -> Option<NodeId> {
        self.ids.get(&road_id).copied()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub fn position(&self, id: NodeId) -> Option<GeoPoint> {
        self.nodes.get(id.index()).and_then(|n| n.pos)
    }

    #[inline]
    pub fn road_id(&self, id: NodeId) -> Option<RoadNodeId> {
        self.nodes.get(id.index()).map(|n| n.road_id)
    }

    /// Outgoing edges of `id`; empty for an unknown id.
    #[inline]
    pub fn out_edges(&self, id: NodeId) -> &[GraphEdge] {
        self.adjacency.get(id.index()).map(Vec::as_slice).unwrap_or_default()
    }

    /// The directed edge `from → to`, if present.
    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&GraphEdge> {
        self.out_edges(from).iter().find(|e| e.to == to)
    }

    pub fn class_name(&self, class: ClassId) -> &str {
        self.classes.get(class.index()).map(String::as_str).unwrap_or("unknown")
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Insert a positioned node.
    ///
    /// Returns `true` when the node is new to the graph or was a placeholder
    /// until now, i.e. when it counts as newly loaded.
    pub fn insert_node(&mut self, road_id: RoadNodeId, pos: GeoPoint) -> SpatialResult<bool> {
        match self.ids.get(&road_id) {
            Some(&id) => {
                let slot = &mut self.nodes[id.index()];
                let was_placeholder = slot.pos.is_none();
                slot.pos = Some(pos);
                Ok(was_placeholder)
            }
            None => {
                self.push_node(road_id, Some(pos))?;
                Ok(true)
            }
        }
    }

    /// Slot of `road_id`, creating a placeholder if it is unknown.
    pub fn ensure_node(&mut self, road_id: RoadNodeId) -> SpatialResult<NodeId> {
        match self.ids.get(&road_id) {
            Some(&id) => Ok(id),
            None => self.push_node(road_id, None),
        }
    }

    /// Insert the directed edge `from → to`.
    ///
    /// An existing `from → to` edge is overwritten with the new weights and
    /// `false` is returned; `true` means a new directed edge was added.
    pub fn add_edge(
        &mut self,
        from: RoadNodeId,
        to: RoadNodeId,
        length_m: f64,
        travel_s: f64,
        classification: &str,
    ) -> SpatialResult<bool> {
        let u = self.ensure_node(from)?;
        let v = self.ensure_node(to)?;
        let class = self.intern_class(classification)?;
        let record = GraphEdge { to: v, length_m, travel_s, class };
        self.note_speed(length_m, travel_s);

        let out = &mut self.adjacency[u.index()];
        if let Some(existing) = out.iter_mut().find(|e| e.to == v) {
            *existing = record;
            return Ok(false);
        }
        out.push(record);
        self.edge_count += 1;
        Ok(true)
    }

    fn push_node(&mut self, road_id: RoadNodeId, pos: Option<GeoPoint>) -> SpatialResult<NodeId> {
        let id = NodeId::try_from(self.nodes.len())
            .ok()
            .filter(|id| *id != NodeId::INVALID)
            .ok_or(SpatialError::Capacity("node arena is full"))?;
        self.nodes.push(GraphNode { road_id, pos });
        self.adjacency.push(Vec::new());
        self.ids.insert(road_id, id);
        Ok(id)
    }

    fn note_speed(&mut self, length_m: f64, travel_s: f64) {
        if length_m.is_nan() || length_m <= 0.0 {
            return;
        }
        let kmh = if travel_s > 0.0 { length_m / travel_s * 3.6 } else { f64::INFINITY };
        if kmh > self.fastest_kmh {
            self.fastest_kmh = kmh;
        }
    }

    fn intern_class(&mut self, name: &str) -> SpatialResult<ClassId> {
        if let Some(&id) = self.class_ids.get(name) {
            return Ok(id);
        }
        let id = ClassId::try_from(self.classes.len())
            .ok()
            .filter(|id| *id != ClassId::INVALID)
            .ok_or(SpatialError::Capacity("too many road classifications"))?;
        self.classes.push(name.to_owned());
        self.class_ids.insert(name.to_owned(), id);
        Ok(id)
    }
}
