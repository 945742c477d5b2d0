//! Synthetic road grid east of Santiago.
//!
//! `COLS × ROWS` intersections about 2 km apart.  Even rows are `primary`
//! avenues, odd rows `residential` streets, and every column is a
//! `secondary` road.  Row 0 also carries a one-way `motorway` express lane
//! west → east with a posted limit.

use lr_core::GeoPoint;
use lr_partition::{EdgeRow, NodeRow};

pub const COLS: usize = 32;
pub const ROWS: usize = 10;

const ORIGIN_LAT: f64 = -33.55;
const ORIGIN_LON: f64 = -70.90;
const STEP_DEG:   f64 = 0.02;

/// Roads wind; lengths are this much longer than the straight segment.
const DETOUR_FACTOR: f64 = 1.15;

pub fn node_id(col: usize, row: usize) -> i64 {
    (row * COLS + col) as i64 + 1
}

pub fn position(col: usize, row: usize) -> GeoPoint {
    GeoPoint::new(ORIGIN_LAT + STEP_DEG * row as f64, ORIGIN_LON + STEP_DEG * col as f64)
}

pub fn build_network() -> (Vec<NodeRow>, Vec<EdgeRow>) {
    let mut nodes = Vec::with_capacity(COLS * ROWS);
    for row in 0..ROWS {
        for col in 0..COLS {
            let p = position(col, row);
            nodes.push(NodeRow { id: node_id(col, row), lat: p.lat, lon: p.lon });
        }
    }

    let mut edges = Vec::new();
    for row in 0..ROWS {
        let class = if row % 2 == 0 { "primary" } else { "residential" };
        for col in 0..COLS - 1 {
            edges.push(road((col, row), (col + 1, row), class, None, false));
        }
    }
    for col in 0..COLS {
        for row in 0..ROWS - 1 {
            edges.push(road((col, row), (col, row + 1), "secondary", None, false));
        }
    }
    for col in (0..COLS - 4).step_by(4) {
        edges.push(road((col, 0), (col + 4, 0), "motorway", Some("110 km/h"), true));
    }
    (nodes, edges)
}

fn road(
    from: (usize, usize),
    to: (usize, usize),
    class: &str,
    posted_limit: Option<&str>,
    one_way: bool,
) -> EdgeRow {
    let length_m = position(from.0, from.1).distance_m(position(to.0, to.1)) * DETOUR_FACTOR;
    EdgeRow {
        source: node_id(from.0, from.1),
        target: node_id(to.0, to.1),
        length_m,
        classification: class.to_string(),
        posted_limit: posted_limit.map(str::to_string),
        one_way,
    }
}
