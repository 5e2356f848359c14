// geonav_engine: grid pathfinding over packed geodata.
//
// This crate turns world positions into routes. The world is a grid of
// regions, each a square of blocks, each a square of cells; every cell holds
// one or more walkable layers with a height and a 4-bit mask of open
// directions. Searches are A* over those cells, run inside a small pool of
// preallocated node buffers so that many worker threads can path at once
// without allocating per request.
//
// Module overview:
// - `geo.rs`:            Grid constants, `Nswe` direction flags, `Direction` moves, `WorldGrid` bounds and conversion.
// - `types.rs`:          `Location` (world units) and `GridCell` (grid column + layer height).
// - `geodata.rs`:        `GeodataQuery`: the read-only walkability source a host supplies.
// - `memory_geodata.rs`: In-memory `GeodataQuery` with flat, complex, and multilayer blocks.
// - `node.rs`:           `SearchNode` and the index-addressed `NodeArena`.
// - `buffer.rs`:         `NodeBuffer`: the A* loop, path reconstruction, diagnostics.
// - `pool.rs`:           `BufferPool` / `BufferGuard`: non-blocking buffer acquisition and usage stats.
// - `finder.rs`:         `PathFinder`: one-call facade and parallel batch searches.
// - `config.rs`:         `PathfindingConfig`: every tunable, JSON-loadable and validated.
// - `error.rs`:          `PathError`, `ConfigError`.
//
// Geodata is injected, never global: a pool owns an `Arc` of any
// `GeodataQuery` and shares it read-only with every running search.
//
// **Determinism.** The same geodata, config, origin, and target always give
// the same waypoints, on any thread and any buffer. Frontier ties break on
// (f, h, discovery order), neighbours expand in a fixed order, and the only
// hash map (`FxHashMap`) is used for lookups, never iterated.

pub mod buffer;
pub mod config;
pub mod error;
pub mod finder;
pub mod geo;
pub mod geodata;
pub mod memory_geodata;
pub mod node;
pub mod pool;
pub mod types;

pub use buffer::{FrontierEntry, NodeBuffer, SearchReport};
pub use config::{BufferTier, MoveWeights, PathfindingConfig};
pub use error::{BudgetKind, ConfigError, PathError};
pub use finder::{PathFinder, PathRequest};
pub use geo::{Direction, Nswe, WorldExtents, WorldGrid};
pub use geodata::{CellLayer, GeodataQuery};
pub use memory_geodata::MemoryGeodata;
pub use pool::{BufferGuard, BufferPool, PoolStats, TierStats};
pub use types::{GridCell, Location};
