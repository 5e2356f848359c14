// Criterion benchmarks for the A* loop and the pooled search path.
//
// The world is one region of open ground broken by staggered walls, so
// searches have to route around obstacles and corners instead of walking a
// straight line. Walls leave a gap every few rows, alternating ends.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use geonav_engine::buffer::SearchContext;
use geonav_engine::{
    BufferTier, GridCell, Location, MemoryGeodata, NodeBuffer, PathFinder, PathRequest,
    PathfindingConfig, WorldExtents, WorldGrid,
};
use std::hint::black_box;
use std::sync::Arc;

const SIDE: i32 = 128;

fn config() -> PathfindingConfig {
    PathfindingConfig {
        world: WorldExtents::single_region(),
        buffers: vec![BufferTier {
            capacity: 16_384,
            count: 8,
        }],
        max_iterations: 16_000,
        ..PathfindingConfig::default()
    }
}

fn walled_world(config: &PathfindingConfig) -> MemoryGeodata {
    let mut geo = MemoryGeodata::new(WorldGrid::new(&config.world));
    geo.fill_flat(0, 0, SIDE - 1, SIDE - 1, 0);
    for (i, x) in (16..SIDE - 8).step_by(16).enumerate() {
        let gap = if i % 2 == 0 { SIDE - 6 } else { 5 };
        for y in 0..SIDE {
            if (y - gap).abs() > 2 {
                geo.carve_obstacle(x, y, 0);
            }
        }
    }
    geo
}

fn at(grid: &WorldGrid, x: i32, y: i32) -> Location {
    grid.to_world(GridCell::new(x, y, 0))
}

/// Benchmark: single searches of increasing length through one buffer.
fn bench_buffer_search(c: &mut Criterion) {
    let config = config();
    let geo = walled_world(&config);
    let grid = *geo.grid();
    let ctx = SearchContext {
        geodata: &geo,
        grid: &grid,
        config: &config,
    };
    let mut buffer = NodeBuffer::new(config.max_capacity());

    let mut group = c.benchmark_group("buffer_search");
    for &reach in &[16, 48, 120] {
        let origin = at(&grid, 2, SIDE / 2);
        let target = at(&grid, reach, SIDE / 2 + 3);
        group.bench_with_input(BenchmarkId::from_parameter(reach), &reach, |b, _| {
            b.iter(|| {
                let path = buffer.find_path(&ctx, black_box(origin), black_box(target));
                black_box(path);
            });
        });
    }
    group.finish();
}

/// Benchmark: a batch of 64 cross-map requests through the pooled finder.
fn bench_parallel_batch(c: &mut Criterion) {
    let config = config();
    let geo = Arc::new(walled_world(&config));
    let grid = *geo.grid();
    let finder = PathFinder::new(geo, config).unwrap();

    let requests: Vec<PathRequest> = (0..64)
        .map(|i| {
            PathRequest::new(
                at(&grid, 1 + i % 8, 1 + i),
                at(&grid, SIDE - 2 - i % 8, SIDE - 2 - i),
            )
        })
        .collect();

    c.bench_function("finder_batch_64", |b| {
        b.iter(|| {
            let results = finder.find_paths(black_box(&requests));
            black_box(results);
        });
    });
}

criterion_group!(benches, bench_buffer_search, bench_parallel_batch);
criterion_main!(benches);
