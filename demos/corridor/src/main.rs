//! corridor - end-to-end demo for the lazyroute engine.
//!
//! Writes a synthetic partitioned road grid to a dataset directory, opens an
//! engine on it twice (cold start, then warm start from the persisted snap
//! index) and routes a handful of trips, printing what was loaded.
//!
//! ```text
//! cargo run -p corridor                 # dataset in a temp dir
//! cargo run -p corridor -- data/demo    # keep the dataset
//! RUST_LOG=debug cargo run -p corridor  # engine logs
//! ```

mod network;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};

use lr_core::{EngineConfig, GeoPoint, Weight};
use lr_engine::{EngineBuilder, RouteResult, RoutingEngine};
use lr_partition::{PartitionWriter, Resolution};

use network::{build_network, position, COLS, ROWS};

// ── Constants ─────────────────────────────────────────────────────────────────

const RESOLUTION:  Resolution = Resolution::Six;
const SAMPLE_CAP:  usize      = 25;

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Keep the temp dir alive for the whole run.
    let tmp;
    let data_dir: PathBuf = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => {
            tmp = tempfile::tempdir().context("creating temp dataset dir")?;
            tmp.path().to_path_buf()
        }
    };

    println!("=== corridor - lazyroute demo ===");
    println!("Grid: {COLS} × {ROWS} intersections  |  dataset: {}", data_dir.display());
    println!();

    // 1. Partition the network.
    let (nodes, edges) = build_network();
    let summary = PartitionWriter::new(&data_dir, RESOLUTION)
        .write_network(&nodes, &edges)
        .context("writing partitions")?;
    println!(
        "Wrote {} partitions ({} nodes, {} edges) at H3 resolution {}",
        summary.partitions,
        summary.nodes,
        summary.edges,
        u8::from(RESOLUTION)
    );

    let config = EngineConfig {
        index_sample_cap: SAMPLE_CAP,
        heuristic_threshold_m: 20_000.0,
        snap_max_distance_m: 2_000.0,
        ..EngineConfig::with_data_dir(&data_dir)
    };

    // 2. Cold start builds and persists the snap index.
    let t0 = Instant::now();
    let engine = RoutingEngine::open(config.clone()).context("cold start")?;
    println!("Cold start: {:.1} ms", t0.elapsed().as_secs_f64() * 1e3);

    // 3. Trips.
    let trips = [
        ("short hop",          position(2, 2),         position(5, 3)),
        ("cross town",         position(0, 0),         position(COLS - 1, ROWS - 1)),
        ("express lane",       position(0, 0),         position(COLS - 4, 0)),
        ("return leg",         position(COLS - 4, 0),  position(0, 0)),
        ("off the grid",       GeoPoint::new(-34.5, -70.0), position(3, 3)),
    ];

    println!();
    for (label, from, to) in trips {
        for weight in [Weight::Time, Weight::Distance] {
            let t = Instant::now();
            let route = engine.route(from, to, weight)?;
            let ms = t.elapsed().as_secs_f64() * 1e3;
            match route {
                Some(r) => print_route(label, &engine, &r, ms)?,
                None => println!("{label:<13} [{weight:<8}] no route ({ms:.1} ms)"),
            }
        }
    }

    // 4. Engine state.
    let stats = engine.stats()?;
    println!();
    println!("Partitions loaded:   {}/{}", stats.partitions_loaded, stats.partitions_total);
    println!("Graph:               {} nodes, {} directed edges", stats.graph_nodes, stats.graph_edges);
    println!("Snap index:          {} nodes", stats.index_size);
    println!(
        "Snap memo:           {} entries, {:.0}% hits",
        stats.snap_cache_entries,
        stats.cache_hit_rate * 100.0
    );
    println!(
        "Partition-set cache: {} entries, {} hits",
        stats.partition_set_entries, stats.partition_set_hits
    );
    drop(engine);

    // 5. Warm start reuses the persisted index.
    warm_start(&data_dir, config)?;
    Ok(())
}

fn print_route(label: &str, engine: &RoutingEngine, r: &RouteResult, ms: f64) -> Result<()> {
    let coords = engine.route_coordinates(r)?;
    let motorway = r.classifications.iter().filter(|c| *c == "motorway").count();
    println!(
        "{label:<13} [{:<8}] {:>7.0} m  {:>6.0} s  {:>5.1} km/h  {:>3} nodes  {motorway} motorway  {} ({ms:.1} ms)",
        r.weight,
        r.distance_m,
        r.travel_time_s,
        r.avg_speed_kmh,
        coords.len(),
        r.algorithm,
    );
    Ok(())
}

fn warm_start(data_dir: &Path, config: EngineConfig) -> Result<()> {
    let t0 = Instant::now();
    let engine = EngineBuilder::new(config).build().context("warm start")?;
    println!();
    println!(
        "Warm start: {:.1} ms ({} indexed nodes from {})",
        t0.elapsed().as_secs_f64() * 1e3,
        engine.stats()?.index_size,
        data_dir.display()
    );
    Ok(())
}
