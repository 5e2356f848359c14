// Path finding facade over a buffer pool.
//
// `PathFinder` is what a simulation loop holds: one per world, shared by
// every worker thread. Each call acquires a buffer sized for the request,
// runs one search, and releases the buffer before returning.
//
// Buffer selection uses a node estimate: the bounding box of origin and
// target, grown by `search_margin` cells on every side. Short hops take
// small buffers and leave the large ones for long routes. The estimate
// only picks a starting tier. A search that runs out of nodes is retried in
// the next larger free buffer, so an undersized estimate never turns into a
// different answer than the largest buffer would give; if no larger buffer
// is free the request reports `PoolExhausted`.
//
// Failure handling follows two levels. `find_path` answers "where do I
// walk": an empty list when there is no route, and `Err` only for
// `PoolExhausted`, which means "ask again later". `try_find_path` keeps
// every failure reason for callers that log near-misses or tune ceilings.
//
// See also: `pool.rs` for acquisition, `buffer.rs` for the search.

use crate::config::PathfindingConfig;
use crate::error::{BudgetKind, ConfigError, PathError};
use crate::geo::WorldGrid;
use crate::geodata::GeodataQuery;
use crate::pool::BufferPool;
use crate::types::Location;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One origin/target pair of a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRequest {
    pub origin: Location,
    pub target: Location,
}

impl PathRequest {
    pub const fn new(origin: Location, target: Location) -> Self {
        Self { origin, target }
    }
}

pub struct PathFinder<G: ?Sized> {
    pool: BufferPool<G>,
}

impl<G: GeodataQuery + ?Sized> PathFinder<G> {
    pub fn new(geodata: Arc<G>, config: PathfindingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            pool: BufferPool::new(geodata, config)?,
        })
    }

    pub fn pool(&self) -> &BufferPool<G> {
        &self.pool
    }

    pub fn grid(&self) -> &WorldGrid {
        self.pool.grid()
    }

    /// Waypoints from `origin` to `target`, empty when there is no route or
    /// nothing to walk. `Err` only when no buffer was free.
    pub fn find_path(&self, origin: Location, target: Location) -> Result<Vec<Location>, PathError> {
        match self.try_find_path(origin, target) {
            Err(PathError::PoolExhausted) => Err(PathError::PoolExhausted),
            other => Ok(other.unwrap_or_default()),
        }
    }

    /// Like `find_path`, but every failure keeps its reason. A node-capacity
    /// failure is only reported once the largest buffer has tried.
    pub fn try_find_path(
        &self,
        origin: Location,
        target: Location,
    ) -> Result<Vec<Location>, PathError> {
        let mut required = self.required_nodes(origin, target);
        loop {
            let mut guard = self.pool.try_acquire_for(required)?;
            match guard.try_find_path(origin, target) {
                Err(PathError::BudgetExceeded(BudgetKind::Nodes))
                    if guard.capacity() < self.pool.max_capacity() =>
                {
                    debug!(capacity = guard.capacity(), "node capacity exceeded, escalating");
                    required = guard.capacity() + 1;
                }
                result => return result,
            }
        }
    }

    /// Run a batch of requests on the rayon thread pool. Results are in
    /// request order. Requests that find every buffer busy report
    /// `PoolExhausted`; they are not retried.
    pub fn find_paths(&self, requests: &[PathRequest]) -> Vec<Result<Vec<Location>, PathError>> {
        requests
            .par_iter()
            .map(|req| self.try_find_path(req.origin, req.target))
            .collect()
    }

    /// Node budget estimate for a request. Locations outside the grid
    /// estimate to zero; their search fails before allocating anything.
    pub fn required_nodes(&self, origin: Location, target: Location) -> usize {
        let grid = self.pool.grid();
        let (Some(a), Some(b)) = (grid.to_grid(origin), grid.to_grid(target)) else {
            return 0;
        };
        let margin = self.pool.config().search_margin.max(0) as usize;
        let span_x = a.0.abs_diff(b.0) as usize + 2 * margin + 1;
        let span_y = a.1.abs_diff(b.1) as usize + 2 * margin + 1;
        span_x.saturating_mul(span_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferTier;
    use crate::geo::WorldExtents;
    use crate::memory_geodata::MemoryGeodata;
    use crate::types::GridCell;

    fn layout_config(layout: &[(usize, usize)]) -> PathfindingConfig {
        PathfindingConfig {
            world: WorldExtents::single_region(),
            buffers: layout
                .iter()
                .map(|&(capacity, count)| BufferTier { capacity, count })
                .collect(),
            search_margin: 2,
            ..PathfindingConfig::default()
        }
    }

    fn finder(layout: &[(usize, usize)]) -> PathFinder<MemoryGeodata> {
        let config = layout_config(layout);
        let mut geo = MemoryGeodata::new(WorldGrid::new(&config.world));
        geo.fill_flat(0, 0, 63, 63, 0);
        geo.fill_flat(100, 100, 103, 103, 0);
        PathFinder::new(Arc::new(geo), config).unwrap()
    }

    /// Open field split by a wall along x = 5 from y = 0 to y = 20.
    fn walled_finder(layout: &[(usize, usize)]) -> PathFinder<MemoryGeodata> {
        let config = layout_config(layout);
        let mut geo = MemoryGeodata::new(WorldGrid::new(&config.world));
        geo.fill_flat(0, 0, 63, 63, 0);
        for y in 0..=20 {
            geo.carve_obstacle(5, y, 0);
        }
        PathFinder::new(Arc::new(geo), config).unwrap()
    }

    fn at(finder: &PathFinder<MemoryGeodata>, x: i32, y: i32) -> Location {
        finder.grid().to_world(GridCell::new(x, y, 0))
    }

    #[test]
    fn no_route_is_an_empty_path() {
        let finder = finder(&[(4096, 2)]);
        let origin = at(&finder, 0, 0);
        let island = at(&finder, 101, 101);
        assert_eq!(finder.find_path(origin, island), Ok(Vec::new()));
        assert_eq!(
            finder.try_find_path(origin, island),
            Err(PathError::Unreachable)
        );
        assert_eq!(finder.find_path(origin, origin), Ok(Vec::new()));
    }

    #[test]
    fn exhausted_pool_is_distinct_from_no_route() {
        let finder = finder(&[(4096, 1)]);
        let held = finder.pool().try_acquire().unwrap();
        let result = finder.find_path(at(&finder, 0, 0), at(&finder, 5, 5));
        assert_eq!(result, Err(PathError::PoolExhausted));
        drop(held);
        assert_eq!(
            finder.find_path(at(&finder, 0, 0), at(&finder, 5, 5)),
            Ok(vec![at(&finder, 5, 5)])
        );
    }

    #[test]
    fn node_estimate_covers_bounding_box_and_margin() {
        let finder = finder(&[(4096, 1)]);
        assert_eq!(finder.required_nodes(at(&finder, 0, 0), at(&finder, 0, 0)), 25);
        assert_eq!(
            finder.required_nodes(at(&finder, 0, 0), at(&finder, 10, 3)),
            15 * 8
        );
        assert_eq!(
            finder.required_nodes(Location::new(-1, 0, 0), at(&finder, 3, 3)),
            0
        );
    }

    #[test]
    fn short_requests_use_small_buffers() {
        let finder = finder(&[(64, 1), (4096, 1)]);
        finder.find_path(at(&finder, 0, 0), at(&finder, 2, 1)).unwrap();
        finder.find_path(at(&finder, 0, 0), at(&finder, 50, 40)).unwrap();
        let stats = finder.pool().stats();
        assert_eq!(stats.tiers[0].uses, 1);
        assert_eq!(stats.tiers[1].uses, 1);
    }

    #[test]
    fn undersized_estimate_retries_in_a_larger_buffer() {
        let finder = walled_finder(&[(64, 1), (4096, 1)]);
        let (origin, target) = (at(&finder, 3, 3), at(&finder, 7, 3));
        assert!(finder.required_nodes(origin, target) <= 64);

        let escalated = finder.try_find_path(origin, target);
        let stats = finder.pool().stats();
        assert_eq!(stats.tiers[0].budget_exceeded, 1);
        assert_eq!(stats.tiers[1].found, 1);

        // Same request with the small buffer taken goes straight to the
        // large one.
        let held = finder.pool().try_acquire_for(1).unwrap();
        assert_eq!(held.capacity(), 64);
        let direct = finder.try_find_path(origin, target);
        drop(held);

        assert_eq!(escalated, direct);
        let path = escalated.unwrap();
        assert_eq!(path.last(), Some(&target));
        assert!(path.len() > 1);
    }

    #[test]
    fn escalation_stops_at_the_largest_buffer() {
        let finder = walled_finder(&[(64, 1), (96, 1)]);
        let (origin, target) = (at(&finder, 3, 3), at(&finder, 7, 3));
        assert_eq!(
            finder.try_find_path(origin, target),
            Err(PathError::BudgetExceeded(BudgetKind::Nodes))
        );
        let stats = finder.pool().stats();
        assert_eq!(stats.tiers[0].budget_exceeded, 1);
        assert_eq!(stats.tiers[1].budget_exceeded, 1);

        // With the larger buffer busy there is nowhere to escalate to.
        let held = finder.pool().try_acquire_for(96).unwrap();
        assert_eq!(
            finder.try_find_path(origin, target),
            Err(PathError::PoolExhausted)
        );
        drop(held);
    }

    #[test]
    fn batch_matches_sequential_results() {
        let finder = finder(&[(4096, 4)]);
        let requests: Vec<PathRequest> = (0..12)
            .map(|i| PathRequest::new(at(&finder, i, 0), at(&finder, 60 - i, 30 + i)))
            .collect();
        let batch = finder.find_paths(&requests);
        assert_eq!(batch.len(), requests.len());
        for (req, result) in requests.iter().zip(batch) {
            if result != Err(PathError::PoolExhausted) {
                assert_eq!(result, finder.try_find_path(req.origin, req.target));
            }
        }
    }
}
