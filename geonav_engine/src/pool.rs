// Buffer pool: a fixed set of node buffers handed out without blocking.
//
// Each buffer sits behind its own `Mutex`. Acquiring walks the buffers from
// smallest to largest capacity and `try_lock`s each one whose capacity
// covers the request; the first success wins. Nothing ever waits: if every
// eligible buffer is busy the caller gets `PathError::PoolExhausted` and
// decides its own retry policy (skip this tick, back off, ...).
//
// A successful acquire returns a `BufferGuard`, the only way to run a
// search. Dropping the guard (or calling `release`) clears the buffer
// before the lock is released, so the next holder always starts from a
// pristine arena, frontier, and closed set.
//
// A poisoned lock (a search panicked while holding it) is recovered on the
// next acquire: the buffer is cleared again and the poison flag reset.
//
// Usage counters are per tier and updated with relaxed atomics. They are
// for monitoring only; nothing in the search reads them.
//
// See also: `buffer.rs` for the search itself, `finder.rs` for the
// convenience facade, `config.rs` for the tier layout.

use crate::buffer::{FrontierEntry, NodeBuffer, SearchContext, SearchReport};
use crate::config::{BufferTier, PathfindingConfig};
use crate::error::{ConfigError, PathError};
use crate::geo::WorldGrid;
use crate::geodata::GeodataQuery;
use crate::types::Location;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;
use tracing::{info, trace};

struct Slot {
    tier: usize,
    capacity: usize,
    buffer: Mutex<NodeBuffer>,
}

#[derive(Default)]
struct TierCounters {
    in_use: AtomicUsize,
    uses: AtomicU64,
    found: AtomicU64,
    unreachable: AtomicU64,
    budget_exceeded: AtomicU64,
    exhausted: AtomicU64,
    search_micros: AtomicU64,
}

/// Snapshot of one tier's counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub capacity: usize,
    pub buffers: usize,
    pub in_use: usize,
    /// Searches run in this tier.
    pub uses: u64,
    pub found: u64,
    /// Searches that ended without a route for any reason other than a
    /// budget ceiling.
    pub unreachable: u64,
    pub budget_exceeded: u64,
    /// Acquires that wanted this tier (or larger) and found nothing free.
    pub exhausted: u64,
    /// Cumulative search time in microseconds.
    pub search_micros: u64,
}

/// Snapshot of the whole pool, tiers in ascending capacity order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub tiers: Vec<TierStats>,
}

impl PoolStats {
    pub fn total_buffers(&self) -> usize {
        self.tiers.iter().map(|t| t.buffers).sum()
    }

    pub fn in_use(&self) -> usize {
        self.tiers.iter().map(|t| t.in_use).sum()
    }

    pub fn uses(&self) -> u64 {
        self.tiers.iter().map(|t| t.uses).sum()
    }

    pub fn exhausted(&self) -> u64 {
        self.tiers.iter().map(|t| t.exhausted).sum()
    }
}

/// Fixed set of reusable node buffers sharing one geodata source.
pub struct BufferPool<G: ?Sized> {
    geodata: Arc<G>,
    grid: WorldGrid,
    config: Arc<PathfindingConfig>,
    /// Ascending by capacity; within a tier, in creation order.
    slots: Vec<Slot>,
    tiers: Vec<BufferTier>,
    counters: Vec<TierCounters>,
}

impl<G: GeodataQuery + ?Sized> BufferPool<G> {
    /// Validate `config` and allocate every buffer up front.
    pub fn new(geodata: Arc<G>, config: PathfindingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = WorldGrid::new(&config.world);

        let mut tiers = config.buffers.clone();
        tiers.sort_by_key(|tier| tier.capacity);

        let mut slots = Vec::with_capacity(config.buffer_count());
        for (tier_idx, tier) in tiers.iter().enumerate() {
            for _ in 0..tier.count {
                slots.push(Slot {
                    tier: tier_idx,
                    capacity: tier.capacity,
                    buffer: Mutex::new(NodeBuffer::new(tier.capacity)),
                });
            }
        }
        let counters = tiers.iter().map(|_| TierCounters::default()).collect();

        info!(
            buffers = slots.len(),
            tiers = ?tiers.iter().map(|t| (t.capacity, t.count)).collect::<Vec<_>>(),
            cells_x = grid.cells_x(),
            cells_y = grid.cells_y(),
            "buffer pool ready"
        );

        Ok(Self {
            geodata,
            grid,
            config: Arc::new(config),
            slots,
            tiers,
            counters,
        })
    }

    pub fn geodata(&self) -> &Arc<G> {
        &self.geodata
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn config(&self) -> &Arc<PathfindingConfig> {
        &self.config
    }

    pub fn buffer_count(&self) -> usize {
        self.slots.len()
    }

    /// Largest buffer capacity in the pool.
    pub fn max_capacity(&self) -> usize {
        self.slots.last().map_or(0, |slot| slot.capacity)
    }

    /// Any free buffer, smallest first.
    pub fn try_acquire(&self) -> Result<BufferGuard<'_, G>, PathError> {
        self.try_acquire_for(0)
    }

    /// The smallest free buffer holding at least `required_nodes` nodes. A
    /// requirement above the largest tier is capped to the largest tier.
    pub fn try_acquire_for(
        &self,
        required_nodes: usize,
    ) -> Result<BufferGuard<'_, G>, PathError> {
        let required = required_nodes.min(self.max_capacity());

        for slot in self.slots.iter().filter(|slot| slot.capacity >= required) {
            let buffer = match slot.buffer.try_lock() {
                Ok(buffer) => buffer,
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(poisoned)) => {
                    let mut buffer = poisoned.into_inner();
                    buffer.clear();
                    slot.buffer.clear_poison();
                    buffer
                }
            };
            self.counters[slot.tier].in_use.fetch_add(1, Ordering::Relaxed);
            return Ok(BufferGuard {
                pool: self,
                slot,
                buffer,
            });
        }

        let tier = self
            .tiers
            .iter()
            .position(|t| t.capacity >= required)
            .unwrap_or(self.tiers.len().saturating_sub(1));
        if let Some(counters) = self.counters.get(tier) {
            counters.exhausted.fetch_add(1, Ordering::Relaxed);
        }
        trace!(required_nodes, "no free path buffer");
        Err(PathError::PoolExhausted)
    }

    /// Return a buffer to the pool. Same as dropping the guard.
    pub fn release(&self, guard: BufferGuard<'_, G>) {
        drop(guard);
    }

    /// Wall-clock duration of the last search run through `guard`.
    pub fn last_search_duration_of(&self, guard: &BufferGuard<'_, G>) -> Option<Duration> {
        guard.last_search_duration()
    }

    pub fn stats(&self) -> PoolStats {
        let tiers = self
            .tiers
            .iter()
            .zip(&self.counters)
            .map(|(tier, c)| TierStats {
                capacity: tier.capacity,
                buffers: tier.count,
                in_use: c.in_use.load(Ordering::Relaxed),
                uses: c.uses.load(Ordering::Relaxed),
                found: c.found.load(Ordering::Relaxed),
                unreachable: c.unreachable.load(Ordering::Relaxed),
                budget_exceeded: c.budget_exceeded.load(Ordering::Relaxed),
                exhausted: c.exhausted.load(Ordering::Relaxed),
                search_micros: c.search_micros.load(Ordering::Relaxed),
            })
            .collect();
        PoolStats { tiers }
    }
}

/// Exclusive use of one pooled buffer. Cleared and returned on drop.
pub struct BufferGuard<'a, G: ?Sized> {
    pool: &'a BufferPool<G>,
    slot: &'a Slot,
    buffer: MutexGuard<'a, NodeBuffer>,
}

impl<G: GeodataQuery + ?Sized> BufferGuard<'_, G> {
    /// Route from `origin` to `target`; empty when there is none or the
    /// origin already is the target cell.
    pub fn find_path(&mut self, origin: Location, target: Location) -> Vec<Location> {
        self.try_find_path(origin, target).unwrap_or_default()
    }

    /// Like `find_path`, but keeps the failure reason.
    pub fn try_find_path(
        &mut self,
        origin: Location,
        target: Location,
    ) -> Result<Vec<Location>, PathError> {
        let pool = self.pool;
        let ctx = SearchContext {
            geodata: &*pool.geodata,
            grid: &pool.grid,
            config: &pool.config,
        };
        let result = self.buffer.search(&ctx, origin, target);

        let counters = &pool.counters[self.slot.tier];
        counters.uses.fetch_add(1, Ordering::Relaxed);
        let outcome = match &result {
            Ok(_) => &counters.found,
            Err(err) if err.is_near_miss() => &counters.budget_exceeded,
            Err(_) => &counters.unreachable,
        };
        outcome.fetch_add(1, Ordering::Relaxed);
        if let Some(elapsed) = self.buffer.last_search_duration() {
            counters
                .search_micros
                .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        }
        result
    }

    pub fn last_report(&self) -> Option<&SearchReport> {
        self.buffer.last_report()
    }

    pub fn last_search_duration(&self) -> Option<Duration> {
        self.buffer.last_search_duration()
    }

    /// Nodes touched by the last search through this guard.
    pub fn diagnostics(&self) -> Vec<FrontierEntry> {
        self.buffer.diagnostics(&self.pool.grid)
    }

    pub fn capacity(&self) -> usize {
        self.slot.capacity
    }

    pub fn release(self) {
        drop(self);
    }
}

impl<G: ?Sized> Drop for BufferGuard<'_, G> {
    fn drop(&mut self) {
        self.buffer.clear();
        self.pool.counters[self.slot.tier]
            .in_use
            .fetch_sub(1, Ordering::Relaxed);
        trace!(capacity = self.slot.capacity, "path buffer released");
    }
}
