// Test-only world builders for multi-threaded pathfinding scenarios.
//
// Wraps a real `MemoryGeodata` and a real `PathFinder` behind a small,
// test-friendly API: build a synthetic world, address cells by grid
// coordinates instead of world units, and compute single-threaded reference
// routes to compare concurrent results against.
//
// Nothing here reimplements engine logic. Every search goes through the
// same pool and buffers a host would use.
//
// See also: `tests/pool_scenarios.rs` for the scenarios.

use std::sync::Arc;

use geonav_engine::buffer::SearchContext;
use geonav_engine::{
    BufferTier, GridCell, Location, MemoryGeodata, NodeBuffer, PathFinder, PathRequest,
    PathfindingConfig, WorldExtents, WorldGrid,
};

/// Side length of the square test world, in cells.
pub const WORLD_SIDE: i32 = 96;

/// Config with a single tier of `count` buffers of `capacity` nodes.
pub fn pool_config(capacity: usize, count: usize) -> PathfindingConfig {
    PathfindingConfig {
        world: WorldExtents::single_region(),
        buffers: vec![BufferTier { capacity, count }],
        max_iterations: 12_000,
        ..PathfindingConfig::default()
    }
}

/// A synthetic world and a finder over it.
pub struct TestWorld {
    pub geodata: Arc<MemoryGeodata>,
    pub finder: PathFinder<MemoryGeodata>,
}

impl TestWorld {
    /// Open ground with a maze of walls: every eighth column is a wall with
    /// a three-cell gap, gaps alternating between the top and bottom edge,
    /// plus a raised plateau reachable by a gentle ramp.
    pub fn maze(config: PathfindingConfig) -> Self {
        let mut geo = MemoryGeodata::new(WorldGrid::new(&config.world));
        geo.fill_flat(0, 0, WORLD_SIDE - 1, WORLD_SIDE - 1, 0);
        for (i, x) in (8..WORLD_SIDE - 8).step_by(8).enumerate() {
            let gap = if i % 2 == 0 { WORLD_SIDE - 4 } else { 3 };
            for y in 0..WORLD_SIDE {
                if (y - gap).abs() > 1 {
                    geo.carve_obstacle(x, y, 0);
                }
            }
        }
        // Ramp up to a plateau in the last strip.
        for (step, x) in (WORLD_SIDE - 6..WORLD_SIDE).enumerate() {
            geo.fill_flat(x, 40, x, 56, step as i32 * 16);
        }
        Self::from_geodata(geo, config)
    }

    pub fn from_geodata(geo: MemoryGeodata, config: PathfindingConfig) -> Self {
        let geodata = Arc::new(geo);
        let finder = PathFinder::new(Arc::clone(&geodata), config)
            .unwrap_or_else(|err| panic!("test config rejected: {err}"));
        Self { geodata, finder }
    }

    pub fn grid(&self) -> &WorldGrid {
        self.finder.grid()
    }

    /// World location of a grid cell on its nearest layer to `z`.
    pub fn at(&self, x: i32, y: i32, z: i32) -> Location {
        self.grid().to_world(GridCell::new(x, y, z))
    }

    /// Deterministic spread of requests across the maze.
    pub fn requests(&self, n: usize) -> Vec<PathRequest> {
        (0..n as i32)
            .map(|i| {
                let ox = (i * 7) % 6;
                let oy = (i * 13) % WORLD_SIDE;
                let tx = WORLD_SIDE - 8 - (i * 5) % 6;
                let ty = (i * 29 + 11) % WORLD_SIDE;
                PathRequest::new(self.at(ox, oy, 0), self.at(tx, ty, 0))
            })
            .collect()
    }

    /// Route computed on a private buffer outside the pool.
    pub fn reference_path(&self, req: &PathRequest) -> Vec<Location> {
        let config = self.finder.pool().config();
        let mut buffer = NodeBuffer::new(config.max_capacity());
        let ctx = SearchContext {
            geodata: &*self.geodata,
            grid: self.grid(),
            config,
        };
        buffer.find_path(&ctx, req.origin, req.target)
    }
}
