//! Unit tests for lr-spatial.
//!
//! Graph and search tests use hand-built graphs; index tests build small
//! synthetic indexes and persist them into `tempfile` directories.

#[cfg(test)]
mod helpers {
    use lr_core::{GeoPoint, NodeId, RoadNodeId};
    use lr_partition::{PartitionKey, Resolution};

    use crate::{IndexEntry, IndexHeader, RoadGraph};

    /// Small grid graph.
    ///
    /// ```text
    ///   1:(0,0) ── 2:(0,0.01) ── 3:(0,0.02)
    ///     │                        │
    ///   4:(0.01,0) ───────────── 5:(0.01,0.02)
    /// ```
    ///
    /// Two-way roads, none faster than 120 km/h.  Travel times make 1→2→3→5
    /// (120 s) beat 1→4→5 (280 s).
    pub fn grid_graph() -> (RoadGraph, [NodeId; 5]) {
        let mut g = RoadGraph::new();
        let pos = [
            (1, 0.0, 0.0),
            (2, 0.0, 0.01),
            (3, 0.0, 0.02),
            (4, 0.01, 0.0),
            (5, 0.01, 0.02),
        ];
        for (id, lat, lon) in pos {
            g.insert_node(RoadNodeId(id), GeoPoint::new(lat, lon)).unwrap();
        }
        // (a, b, length_m, travel_s)
        let roads = [
            (1, 2, 1_200.0, 40.0),
            (2, 3, 1_200.0, 40.0),
            (3, 5, 1_200.0, 40.0),
            (1, 4, 1_200.0, 200.0),
            (4, 5, 2_400.0, 80.0),
        ];
        for (a, b, len, secs) in roads {
            g.add_edge(RoadNodeId(a), RoadNodeId(b), len, secs, "residential").unwrap();
            g.add_edge(RoadNodeId(b), RoadNodeId(a), len, secs, "residential").unwrap();
        }
        let ids = [1, 2, 3, 4, 5].map(|id| g.lookup(RoadNodeId(id)).unwrap());
        (g, ids)
    }

    pub fn entry(id: i64, lat: f64, lon: f64) -> IndexEntry {
        let pos = GeoPoint::new(lat, lon);
        let key = PartitionKey::containing(pos, Resolution::Six).unwrap();
        IndexEntry::new(RoadNodeId(id), pos, key)
    }

    pub fn header() -> IndexHeader {
        IndexHeader {
            format_version:        crate::index::FORMAT_VERSION,
            resolution_level:      6,
            sample_cap:            1_000,
            sample_seed:           42,
            partition_count:       1,
            partition_fingerprint: 7,
        }
    }
}

// ── Graph ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod graph {
    use lr_core::{GeoPoint, RoadNodeId};

    use crate::RoadGraph;

    #[test]
    fn empty_graph() {
        let g = RoadGraph::new();
        assert!(g.is_empty());
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.lookup(RoadNodeId(1)).is_none());
    }

    #[test]
    fn placeholder_then_position() {
        let mut g = RoadGraph::new();
        g.insert_node(RoadNodeId(1), GeoPoint::new(0.0, 0.0)).unwrap();
        // Target 2 lives in a partition that has not been read yet.
        assert!(g.add_edge(RoadNodeId(1), RoadNodeId(2), 100.0, 7.2, "residential").unwrap());

        let two = g.lookup(RoadNodeId(2)).unwrap();
        assert_eq!(g.position(two), None);
        assert_eq!(g.node_count(), 2);

        // Reading that partition fills the slot in and counts as new.
        assert!(g.insert_node(RoadNodeId(2), GeoPoint::new(0.0, 0.001)).unwrap());
        assert_eq!(g.position(two), Some(GeoPoint::new(0.0, 0.001)));
        assert_eq!(g.node_count(), 2);

        // A second insert of a positioned node is not new.
        assert!(!g.insert_node(RoadNodeId(2), GeoPoint::new(0.0, 0.001)).unwrap());
    }

    #[test]
    fn duplicate_edge_replaces() {
        let mut g = RoadGraph::new();
        assert!(g.add_edge(RoadNodeId(1), RoadNodeId(2), 100.0, 10.0, "primary").unwrap());
        assert!(!g.add_edge(RoadNodeId(1), RoadNodeId(2), 150.0, 12.0, "secondary").unwrap());
        assert_eq!(g.edge_count(), 1);

        let (a, b) = (g.lookup(RoadNodeId(1)).unwrap(), g.lookup(RoadNodeId(2)).unwrap());
        let e = g.edge(a, b).unwrap();
        assert_eq!(e.length_m, 150.0);
        assert_eq!(g.class_name(e.class), "secondary");
    }

    #[test]
    fn edges_are_directed() {
        let mut g = RoadGraph::new();
        g.add_edge(RoadNodeId(1), RoadNodeId(2), 100.0, 10.0, "primary").unwrap();
        let (a, b) = (g.lookup(RoadNodeId(1)).unwrap(), g.lookup(RoadNodeId(2)).unwrap());
        assert!(g.edge(a, b).is_some());
        assert!(g.edge(b, a).is_none());
        assert!(g.out_edges(b).is_empty());
    }

    #[test]
    fn classifications_are_interned() {
        let mut g = RoadGraph::new();
        g.add_edge(RoadNodeId(1), RoadNodeId(2), 1.0, 1.0, "primary").unwrap();
        g.add_edge(RoadNodeId(2), RoadNodeId(3), 1.0, 1.0, "primary").unwrap();
        let (a, b, c) = (
            g.lookup(RoadNodeId(1)).unwrap(),
            g.lookup(RoadNodeId(2)).unwrap(),
            g.lookup(RoadNodeId(3)).unwrap(),
        );
        assert_eq!(g.edge(a, b).unwrap().class, g.edge(b, c).unwrap().class);
    }
}

// ── Search ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod search {
    use lr_core::{GeoPoint, NodeId, RoadNodeId, Weight};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::helpers::grid_graph;
    use crate::{astar, dijkstra, RoadGraph, SearchError};

    #[test]
    fn fastest_route_by_time() {
        let (g, [n1, n2, n3, _n4, n5]) = grid_graph();
        let path = dijkstra(&g, n1, n5, Weight::Time, None).unwrap();
        assert_eq!(path.nodes, vec![n1, n2, n3, n5]);
        assert!((path.cost - 120.0).abs() < 1e-9);
    }

    #[test]
    fn shortest_route_by_distance() {
        let (g, [n1, _, _, _, n5]) = grid_graph();
        // 1→4→5 = 3600 m ties 1→2→3→5 = 3600 m; either is optimal.
        let path = dijkstra(&g, n1, n5, Weight::Distance, None).unwrap();
        assert!((path.cost - 3_600.0).abs() < 1e-9);
        assert_eq!(path.nodes.first(), Some(&n1));
        assert_eq!(path.nodes.last(), Some(&n5));
    }

    #[test]
    fn same_node_is_trivial() {
        let (g, [n1, ..]) = grid_graph();
        let path = dijkstra(&g, n1, n1, Weight::Time, None).unwrap();
        assert_eq!(path.nodes, vec![n1]);
        assert_eq!(path.cost, 0.0);
    }

    #[test]
    fn one_way_blocks_reverse() {
        let mut g = RoadGraph::new();
        g.insert_node(RoadNodeId(1), GeoPoint::new(0.0, 0.0)).unwrap();
        g.insert_node(RoadNodeId(2), GeoPoint::new(0.0, 0.01)).unwrap();
        g.add_edge(RoadNodeId(1), RoadNodeId(2), 1_100.0, 80.0, "primary").unwrap();
        let (a, b) = (g.lookup(RoadNodeId(1)).unwrap(), g.lookup(RoadNodeId(2)).unwrap());

        assert!(dijkstra(&g, a, b, Weight::Time, None).is_ok());
        assert_eq!(dijkstra(&g, b, a, Weight::Time, None), Err(SearchError::NoPath));
        assert_eq!(astar(&g, b, a, Weight::Time, None, 120.0), Err(SearchError::NoPath));
    }

    /// S→T is a direct motorway posted at 130 km/h.  S→M→T is a raceway
    /// detour 1.5× as long but faster overall at 200 km/h.
    fn fast_detour_graph() -> (RoadGraph, [NodeId; 3]) {
        use lr_core::SpeedProfile;

        let speeds = SpeedProfile::new();
        let (s, m, t) = (GeoPoint::new(0.0, 0.0), GeoPoint::new(0.03, 0.05), GeoPoint::new(0.0, 0.1));
        let straight = s.distance_m(t);

        let mut g = RoadGraph::new();
        for (id, p) in [(1, s), (2, m), (3, t)] {
            g.insert_node(RoadNodeId(id), p).unwrap();
        }
        let direct_s = speeds.travel_time_seconds(straight, "motorway", Some("130"));
        g.add_edge(RoadNodeId(1), RoadNodeId(3), straight, direct_s, "motorway").unwrap();

        let leg = straight * 0.75;
        let leg_s = speeds.travel_time_seconds(leg, "raceway", None);
        g.add_edge(RoadNodeId(1), RoadNodeId(2), leg, leg_s, "raceway").unwrap();
        g.add_edge(RoadNodeId(2), RoadNodeId(3), leg, leg_s, "raceway").unwrap();

        let ids = [1, 2, 3].map(|id| g.lookup(RoadNodeId(id)).unwrap());
        (g, ids)
    }

    #[test]
    fn edges_faster_than_heuristic_speed_stay_optimal() {
        let (g, [s, m, t]) = fast_detour_graph();
        assert!((g.fastest_edge_kmh() - 200.0).abs() < 1e-6);

        let plain = dijkstra(&g, s, t, Weight::Time, None).unwrap();
        let guided = astar(&g, s, t, Weight::Time, None, 120.0).unwrap();
        assert_eq!(plain.nodes, vec![s, m, t]);
        assert_eq!(guided.nodes, plain.nodes);
        assert!((guided.cost - plain.cost).abs() < 1e-9);
    }

    #[test]
    fn fastest_edge_tracks_inserts() {
        let mut g = RoadGraph::new();
        assert_eq!(g.fastest_edge_kmh(), 0.0);

        g.add_edge(RoadNodeId(1), RoadNodeId(2), 1_000.0, 60.0, "secondary").unwrap();
        assert!((g.fastest_edge_kmh() - 60.0).abs() < 1e-9);

        // Replacing with a slower edge keeps the bound.
        g.add_edge(RoadNodeId(1), RoadNodeId(2), 1_000.0, 120.0, "secondary").unwrap();
        assert!((g.fastest_edge_kmh() - 60.0).abs() < 1e-9);

        // Zero-length edges say nothing about speed.
        g.add_edge(RoadNodeId(2), RoadNodeId(3), 0.0, 0.0, "service").unwrap();
        assert!((g.fastest_edge_kmh() - 60.0).abs() < 1e-9);

        g.add_edge(RoadNodeId(3), RoadNodeId(4), 10.0, 0.0, "service").unwrap();
        assert_eq!(g.fastest_edge_kmh(), f64::INFINITY);
    }

    #[test]
    fn unknown_node_rejected() {
        let (g, [n1, ..]) = grid_graph();
        let ghost = NodeId(999);
        assert_eq!(dijkstra(&g, n1, ghost, Weight::Time, None), Err(SearchError::UnknownNode(ghost)));
        assert_eq!(astar(&g, ghost, n1, Weight::Time, None, 120.0), Err(SearchError::UnknownNode(ghost)));
    }

    #[test]
    fn step_limit_enforced() {
        let (g, [n1, .., n5]) = grid_graph();
        assert_eq!(dijkstra(&g, n1, n5, Weight::Time, Some(1)), Err(SearchError::StepLimitExceeded));
        assert!(dijkstra(&g, n1, n5, Weight::Time, Some(100)).is_ok());
    }

    #[test]
    fn astar_matches_dijkstra_on_grid() {
        let (g, ids) = grid_graph();
        for &from in &ids {
            for &to in &ids {
                for weight in [Weight::Time, Weight::Distance] {
                    let plain = dijkstra(&g, from, to, weight, None).unwrap();
                    let guided = astar(&g, from, to, weight, None, 120.0).unwrap();
                    assert!((plain.cost - guided.cost).abs() < 1e-6, "{from}->{to} {weight}");
                }
            }
        }
    }

    /// Random geometric graphs whose edges are never shorter than the
    /// straight line and never faster than 120 km/h.  The guided search must
    /// find exactly the plain search's optimum.
    #[test]
    fn astar_matches_dijkstra_on_random_graphs() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);

        for _ in 0..25 {
            let mut g = RoadGraph::new();
            let n = rng.gen_range(5..40);
            let mut pts = Vec::with_capacity(n);
            for i in 0..n {
                let p = GeoPoint::new(-33.0 + rng.gen_range(0.0..0.5), -70.0 + rng.gen_range(0.0..0.5));
                g.insert_node(RoadNodeId(i as i64), p).unwrap();
                pts.push(p);
            }
            for _ in 0..n * 3 {
                let a = rng.gen_range(0..n);
                let b = rng.gen_range(0..n);
                if a == b {
                    continue;
                }
                let straight = pts[a].distance_m(pts[b]);
                let length = straight * rng.gen_range(1.0..1.6);
                let kmh = rng.gen_range(20.0..120.0);
                g.add_edge(RoadNodeId(a as i64), RoadNodeId(b as i64), length, length / (kmh / 3.6), "road")
                    .unwrap();
            }

            let from = g.lookup(RoadNodeId(0)).unwrap();
            for t in 1..n {
                let to = g.lookup(RoadNodeId(t as i64)).unwrap();
                for weight in [Weight::Time, Weight::Distance] {
                    match (dijkstra(&g, from, to, weight, None), astar(&g, from, to, weight, None, 120.0)) {
                        (Ok(p), Ok(h)) => assert!((p.cost - h.cost).abs() < 1e-6 * p.cost.max(1.0)),
                        (Err(a), Err(b)) => assert_eq!(a, b),
                        (a, b) => panic!("algorithms disagree: {a:?} vs {b:?}"),
                    }
                }
            }
        }
    }
}

// ── Index ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod index {
    use lr_core::{GeoPoint, RoadNodeId};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use tempfile::TempDir;

    use super::helpers::{entry, header};
    use crate::{IndexHeader, SnapOptions, SpatialError, SpatialIndex, COORDS_FILE, INDEX_FILE};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn snap_respects_max_distance() {
        let idx = SpatialIndex::build(vec![entry(1, 0.0, 0.0)], header(), SnapOptions::default());
        // 0.018° of latitude ≈ 2001 m.
        assert!(idx.nearest(0.018, 0.0, 1_000.0).is_none());

        let hit = idx.nearest(0.018, 0.0, 3_000.0).unwrap();
        assert_eq!(hit.id, RoadNodeId(1));
        assert!((hit.distance_m - 2_001.5).abs() < 5.0, "got {}", hit.distance_m);
        assert_eq!(hit.position, GeoPoint::new(0.0, 0.0));
    }

    #[test]
    fn snap_picks_closest_by_great_circle() {
        let idx = SpatialIndex::build(
            vec![entry(1, 10.0, 10.0), entry(2, 10.001, 10.0), entry(3, 10.01, 10.01)],
            header(),
            SnapOptions::default(),
        );
        let hit = idx.nearest(10.0009, 10.0, 500.0).unwrap();
        assert_eq!(hit.id, RoadNodeId(2));
    }

    #[test]
    fn empty_index_finds_nothing() {
        let idx = SpatialIndex::build(Vec::new(), header(), SnapOptions::default());
        assert!(idx.is_empty());
        assert!(idx.nearest(0.0, 0.0, 1e9).is_none());
    }

    #[test]
    fn invalid_query_finds_nothing() {
        let idx = SpatialIndex::build(vec![entry(1, 0.0, 0.0)], header(), SnapOptions::default());
        assert!(idx.nearest(f64::NAN, 0.0, 1e9).is_none());
        assert!(idx.nearest(91.0, 0.0, 1e9).is_none());
    }

    #[test]
    fn memo_counts_hits() {
        let idx = SpatialIndex::build(vec![entry(1, 0.0, 0.0)], header(), SnapOptions::default());
        assert_eq!(idx.hit_rate(), 0.0);

        let first = idx.nearest(0.001, 0.001, 1_000.0);
        // Rounds to the same key at 6 decimals.
        let second = idx.nearest(0.001_000_01, 0.001, 1_000.0);
        assert_eq!(first, second);
        assert_eq!(idx.memo_len(), 1);
        assert!((idx.hit_rate() - 0.5).abs() < 1e-12);

        // A different radius is a different key.
        idx.nearest(0.001, 0.001, 10.0);
        assert_eq!(idx.memo_len(), 2);
    }

    #[test]
    fn memo_is_bounded() {
        let opts = SnapOptions { memo_capacity: 3, ..SnapOptions::default() };
        let idx = SpatialIndex::build(vec![entry(1, 0.0, 0.0)], header(), opts);
        for i in 0..10 {
            assert!(idx.nearest(0.0001 * i as f64, 0.0, 1_000.0).is_some());
        }
        assert_eq!(idx.memo_len(), 3);
    }

    /// Near the pole a degree of longitude is short, so raw index distance
    /// ranks the wrong nodes first.  With ten raw candidates the true nearest
    /// node is missed; this is the documented approximation.
    #[test]
    fn sparse_candidates_can_miss_true_nearest() {
        let mut entries: Vec<_> = (0..10).map(|i| entry(100 + i, 80.005 + 0.001 * i as f64, 0.0)).collect();
        // 0.02° of longitude at 80°N ≈ 386 m; the others are ≥ 556 m away
        // but closer in raw degrees.
        entries.push(entry(1, 80.0, 0.02));

        let idx = SpatialIndex::build(entries.clone(), header(), SnapOptions::default());
        let approx = idx.nearest(80.0, 0.0, 5_000.0).unwrap();
        assert_eq!(approx.id, RoadNodeId(100));

        let wide = SnapOptions { candidates: 11, ..SnapOptions::default() };
        let idx = SpatialIndex::build(entries, header(), wide);
        let exact = idx.nearest(80.0, 0.0, 5_000.0).unwrap();
        assert_eq!(exact.id, RoadNodeId(1));
        assert!(exact.distance_m < approx.distance_m);
    }

    /// Sampled snapping degrades gracefully: it never panics, never reports a
    /// node closer than the true nearest, and with enough candidates is exact.
    #[test]
    fn snap_recall_property() {
        let mut rng = SmallRng::seed_from_u64(2024);
        let entries: Vec<_> = (0..300)
            .map(|i| entry(i, -33.0 + rng.gen_range(0.0..1.0), -70.0 + rng.gen_range(0.0..1.0)))
            .collect();

        let approx = SpatialIndex::build(entries.clone(), header(), SnapOptions::default());
        let exact = SpatialIndex::build(
            entries.clone(),
            header(),
            SnapOptions { candidates: entries.len(), ..SnapOptions::default() },
        );

        let mut misses = 0;
        for _ in 0..200 {
            let lat = -33.0 + rng.gen_range(0.0..1.0);
            let lon = -70.0 + rng.gen_range(0.0..1.0);
            let q = GeoPoint::new(lat, lon);
            let truth = entries
                .iter()
                .map(|e| q.distance_m(e.position()))
                .fold(f64::INFINITY, f64::min);

            let a = approx.nearest(lat, lon, 1e7).unwrap();
            let e = exact.nearest(lat, lon, 1e7).unwrap();
            assert!(a.distance_m + 1.0 >= truth);
            assert!((e.distance_m - truth).abs() < 1.0);
            if a.id != e.id {
                misses += 1;
            }
        }
        assert!(misses < 20, "{misses} of 200 snaps missed the true nearest");
    }

    #[test]
    fn save_then_load() {
        let dir = tmp();
        let built = SpatialIndex::build(
            vec![entry(1, 0.0, 0.0), entry(2, 0.01, 0.01), entry(3, -0.01, 0.02)],
            header(),
            SnapOptions::default(),
        );
        built.save(dir.path()).unwrap();

        let loaded = SpatialIndex::load(dir.path(), &header(), SnapOptions::default())
            .unwrap()
            .expect("artifacts present");
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.coordinate(RoadNodeId(2)), Some(GeoPoint::new(0.01, 0.01)));
        assert_eq!(
            loaded.nearest(0.0099, 0.0099, 1_000.0).map(|r| r.id),
            built.nearest(0.0099, 0.0099, 1_000.0).map(|r| r.id),
        );
    }

    #[test]
    fn absent_artifacts_load_as_none() {
        let dir = tmp();
        assert!(SpatialIndex::load(dir.path(), &header(), SnapOptions::default()).unwrap().is_none());
    }

    #[test]
    fn stale_header_rejected() {
        let dir = tmp();
        SpatialIndex::build(vec![entry(1, 0.0, 0.0)], header(), SnapOptions::default())
            .save(dir.path())
            .unwrap();

        let changed = IndexHeader { partition_count: 2, ..header() };
        let err = SpatialIndex::load(dir.path(), &changed, SnapOptions::default()).err();
        assert!(matches!(err, Some(SpatialError::Artifact { .. })));
    }

    #[test]
    fn corrupt_artifacts_rejected() {
        let dir = tmp();
        SpatialIndex::build(vec![entry(1, 0.0, 0.0)], header(), SnapOptions::default())
            .save(dir.path())
            .unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), b"\x01\x02").unwrap();
        assert!(SpatialIndex::load(dir.path(), &header(), SnapOptions::default()).is_err());

        // Coordinate table from a different index.
        let dir = tmp();
        SpatialIndex::build(vec![entry(1, 0.0, 0.0)], header(), SnapOptions::default())
            .save(dir.path())
            .unwrap();
        let other = tmp();
        SpatialIndex::build(vec![entry(1, 0.5, 0.5)], header(), SnapOptions::default())
            .save(other.path())
            .unwrap();
        std::fs::copy(other.path().join(COORDS_FILE), dir.path().join(COORDS_FILE)).unwrap();
        let err = SpatialIndex::load(dir.path(), &header(), SnapOptions::default()).err();
        assert!(matches!(err, Some(SpatialError::Artifact { .. })));
    }
}
