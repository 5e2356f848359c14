// A* search over geodata cells, run inside a reusable node buffer.
//
// A `NodeBuffer` owns everything one search mutates: the node arena, the
// priority frontier, the membership map, and the closed list. One search
// runs at a time per buffer; the pool's lock enforces that, not the buffer.
//
// Search outline:
// 1. Resolve origin and target to their nearest walkable layers. Same cell
//    (within `layer_threshold`) means "already there": empty route.
// 2. Pop the lowest-f node, close it, stop if it is the target cell.
// 3. Expand axial neighbours whose direction flag is open on the current
//    node, then diagonals whose two axial cells are both open towards the
//    diagonal cell (no corner cutting). A neighbour already discovered is
//    skipped: first-found cost wins, nodes are never re-opened.
// 4. The frontier running dry, the iteration ceiling, or a full arena end
//    the search without a route.
//
// Frontier order is a total order: lower f, then lower h, then lower arena
// index (discovery order). Neighbours expand in `Direction` declaration
// order. Together these make results reproducible across runs and threads.
//
// Membership is an `FxHashMap<GridCell, NodeIndex>` covering open and
// closed nodes alike, since no node is ever re-opened.
//
// See also: `node.rs` for the arena, `pool.rs` which hands buffers to
// callers, `geodata.rs` for the walkability queries.

use crate::config::{MoveWeights, PathfindingConfig};
use crate::error::{BudgetKind, PathError};
use crate::geo::{Direction, WorldGrid};
use crate::geodata::{CellLayer, GeodataQuery, Surface};
use crate::node::{NodeArena, NodeIndex, NodeState, SearchNode};
use crate::types::{GridCell, Location};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Everything a search reads but does not own.
pub struct SearchContext<'a, G: ?Sized> {
    pub geodata: &'a G,
    pub grid: &'a WorldGrid,
    pub config: &'a PathfindingConfig,
}

/// Summary of the most recent search in a buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchReport {
    /// Number of waypoints on success (0 for "already there").
    pub status: Result<usize, PathError>,
    /// g of the target node when a route was found.
    pub path_cost: Option<u32>,
    pub iterations: u32,
    pub nodes_used: usize,
    pub elapsed: Duration,
}

/// One node of the last search, for visualization tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrontierEntry {
    pub location: Location,
    pub total_cost: u32,
    pub state: NodeState,
}

/// Frontier entry (min-heap via reversed ordering).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    h: u32,
    node: NodeIndex,
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: smallest (f, h, index) is "greatest" for the max-heap.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Lower bound on the cost between two cells.
///
/// The planar part is the diagonal distance: `diag = min(dx, dy)` steps at
/// the diagonal weight plus `max(dx, dy) - diag` at the axial weight. One
/// step changes height by at most `layer_threshold`, so a height delta also
/// needs at least `ceil(dz / layer_threshold)` steps; the estimate is the
/// larger of the two. Height is never added on top of planar distance, since
/// the same steps that cover ground also climb.
pub fn heuristic(
    from: GridCell,
    to: GridCell,
    weights: &MoveWeights,
    layer_threshold: i32,
) -> u32 {
    let dx = from.x.abs_diff(to.x);
    let dy = from.y.abs_diff(to.y);
    let diagonal = dx.min(dy);
    let axial = dx.max(dy) - diagonal;
    let planar = diagonal
        .saturating_mul(weights.heuristic_diagonal)
        .saturating_add(axial.saturating_mul(weights.heuristic_axial));
    let climb_steps = match u32::try_from(layer_threshold) {
        Ok(threshold) if threshold > 0 => from.z.abs_diff(to.z).div_ceil(threshold),
        _ => 0,
    };
    planar.max(climb_steps.saturating_mul(weights.heuristic_axial))
}

/// Reusable A* workspace with a fixed node capacity.
#[derive(Debug)]
pub struct NodeBuffer {
    arena: NodeArena,
    open: BinaryHeap<OpenEntry>,
    seen: FxHashMap<GridCell, NodeIndex>,
    closed: Vec<NodeIndex>,
    goal: GridCell,
    iterations: u32,
    path_cost: Option<u32>,
    last_report: Option<SearchReport>,
}

impl NodeBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            arena: NodeArena::new(capacity),
            open: BinaryHeap::new(),
            seen: FxHashMap::default(),
            closed: Vec::new(),
            goal: GridCell::default(),
            iterations: 0,
            path_cost: None,
            last_report: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Nodes claimed by the current (or last, if not yet cleared) search.
    pub fn nodes_used(&self) -> usize {
        self.arena.used()
    }

    /// True if no state of a previous search remains.
    pub fn is_clear(&self) -> bool {
        self.arena.is_pristine()
            && self.open.is_empty()
            && self.seen.is_empty()
            && self.closed.is_empty()
    }

    pub fn last_report(&self) -> Option<&SearchReport> {
        self.last_report.as_ref()
    }

    pub fn last_search_duration(&self) -> Option<Duration> {
        self.last_report.as_ref().map(|r| r.elapsed)
    }

    /// Route from `origin` to `target`, or an empty list when there is none
    /// (or the origin already is the target cell).
    pub fn find_path<G: GeodataQuery + ?Sized>(
        &mut self,
        ctx: &SearchContext<'_, G>,
        origin: Location,
        target: Location,
    ) -> Vec<Location> {
        self.search(ctx, origin, target).unwrap_or_default()
    }

    /// Like `find_path`, but keeps the failure reason.
    ///
    /// The returned waypoints run from the first turn after the origin
    /// through the target (inclusive), with straight runs collapsed. The
    /// origin itself is never included. Waypoints are cell centres at the
    /// layer height.
    pub fn search<G: GeodataQuery + ?Sized>(
        &mut self,
        ctx: &SearchContext<'_, G>,
        origin: Location,
        target: Location,
    ) -> Result<Vec<Location>, PathError> {
        self.clear();
        let _span = tracing::debug_span!("path_search", %origin, %target).entered();
        let started = Instant::now();
        let result = self.run(ctx, origin, target);
        let report = SearchReport {
            status: result.as_ref().map(Vec::len).map_err(|e| *e),
            path_cost: self.path_cost,
            iterations: self.iterations,
            nodes_used: self.arena.used(),
            elapsed: started.elapsed(),
        };
        match &result {
            Ok(path) => debug!(
                waypoints = path.len(),
                iterations = report.iterations,
                nodes = report.nodes_used,
                elapsed_us = report.elapsed.as_micros() as u64,
                "path found"
            ),
            Err(err) if err.is_near_miss() => debug!(
                %err,
                iterations = report.iterations,
                nodes = report.nodes_used,
                "search stopped by budget before reaching target (near miss)"
            ),
            Err(err) => debug!(%err, iterations = report.iterations, "no path"),
        }
        self.last_report = Some(report);
        result
    }

    /// Snapshot of every node the last search touched, in discovery order.
    /// Must be taken before the buffer is cleared.
    pub fn diagnostics(&self, grid: &WorldGrid) -> Vec<FrontierEntry> {
        self.arena
            .iter_used()
            .map(|(_, node)| FrontierEntry {
                location: grid.to_world(node.cell),
                total_cost: node.total_cost(),
                state: node.state,
            })
            .collect()
    }

    /// Number of nodes currently waiting in the frontier.
    pub fn frontier_len(&self) -> usize {
        self.open.len()
    }

    /// Number of nodes expanded so far.
    pub fn closed_len(&self) -> usize {
        self.closed.len()
    }

    /// Reset all per-search state. The last report survives.
    pub fn clear(&mut self) {
        self.arena.reset();
        self.open.clear();
        self.seen.clear();
        self.closed.clear();
        self.goal = GridCell::default();
        self.iterations = 0;
        self.path_cost = None;
    }

    fn run<G: GeodataQuery + ?Sized>(
        &mut self,
        ctx: &SearchContext<'_, G>,
        origin: Location,
        target: Location,
    ) -> Result<Vec<Location>, PathError> {
        let start = resolve(ctx, origin)?;
        let goal = resolve(ctx, target)?;
        let threshold = ctx.config.layer_threshold;
        if start.cell.same_column_within(goal.cell, threshold) {
            self.path_cost = Some(0);
            return Ok(Vec::new());
        }
        self.goal = goal.cell;

        let h = heuristic(start.cell, goal.cell, &ctx.config.weights, threshold);
        let seed = self
            .arena
            .alloc(SearchNode {
                cell: start.cell,
                nswe: start.nswe,
                cost_from_start: 0,
                cost_to_goal: h,
                parent: None,
                state: NodeState::Open,
            })
            .ok_or(PathError::BudgetExceeded(BudgetKind::Nodes))?;
        self.seen.insert(start.cell, seed);
        self.open.push(OpenEntry { f: h, h, node: seed });

        while let Some(entry) = self.open.pop() {
            if self.iterations >= ctx.config.max_iterations {
                return Err(PathError::BudgetExceeded(BudgetKind::Iterations));
            }
            self.iterations += 1;

            let current = entry.node;
            let node = self.arena.get_mut(current);
            node.state = NodeState::Closed;
            let reached = node.cell.same_column_within(goal.cell, threshold);
            let cost = node.cost_from_start;
            self.closed.push(current);

            if reached {
                self.path_cost = Some(cost);
                return Ok(self.reconstruct(current, ctx.grid));
            }
            self.expand(ctx, current)?;
        }

        Err(PathError::Unreachable)
    }

    fn expand<G: GeodataQuery + ?Sized>(
        &mut self,
        ctx: &SearchContext<'_, G>,
        current: NodeIndex,
    ) -> Result<(), PathError> {
        let node = *self.arena.get(current);
        // Layers reached by each axial step, reused for the corner check.
        let mut axial: [Option<CellLayer>; 4] = [None; 4];

        for (slot, dir) in Direction::AXIAL.into_iter().enumerate() {
            if !node.nswe.contains(dir.flags()) {
                continue;
            }
            let Some(layer) = probe(ctx, node.cell, dir) else {
                continue;
            };
            axial[slot] = Some(layer);
            self.open_neighbour(ctx.config, current, &node, dir, layer)?;
        }

        if !ctx.config.diagonal_moves {
            return Ok(());
        }

        for dir in Direction::DIAGONAL {
            let Some((horizontal, vertical)) = dir.components() else {
                continue;
            };
            if !node.nswe.contains(dir.flags()) {
                continue;
            }
            let via_horizontal = horizontal.axial_slot().and_then(|s| axial[s]);
            let via_vertical = vertical.axial_slot().and_then(|s| axial[s]);
            let corner_open = matches!(
                (via_horizontal, via_vertical),
                (Some(h), Some(v))
                    if h.nswe.contains(vertical.flags()) && v.nswe.contains(horizontal.flags())
            );
            if !corner_open {
                continue;
            }
            let Some(layer) = probe(ctx, node.cell, dir) else {
                continue;
            };
            self.open_neighbour(ctx.config, current, &node, dir, layer)?;
        }

        Ok(())
    }

    fn open_neighbour(
        &mut self,
        config: &PathfindingConfig,
        parent: NodeIndex,
        from: &SearchNode,
        dir: Direction,
        layer: CellLayer,
    ) -> Result<(), PathError> {
        let (dx, dy) = dir.offset();
        let cell = GridCell::new(from.cell.x + dx, from.cell.y + dy, layer.height);
        if self.seen.contains_key(&cell) {
            return Ok(());
        }

        let w = &config.weights;
        let base = if dir.is_diagonal() { w.diagonal } else { w.axial };
        let step = if layer.nswe.is_all() {
            base
        } else {
            w.obstacle.max(base)
        };
        let g = from.cost_from_start.saturating_add(step);
        let h = heuristic(cell, self.goal, w, config.layer_threshold);

        let idx = self
            .arena
            .alloc(SearchNode {
                cell,
                nswe: layer.nswe,
                cost_from_start: g,
                cost_to_goal: h,
                parent: Some(parent),
                state: NodeState::Open,
            })
            .ok_or(PathError::BudgetExceeded(BudgetKind::Nodes))?;
        self.seen.insert(cell, idx);
        self.open.push(OpenEntry {
            f: g.saturating_add(h),
            h,
            node: idx,
        });
        Ok(())
    }

    /// Walk parent links back from the target, keeping only cells where the
    /// direction of travel changes, plus the target itself.
    fn reconstruct(&self, terminal: NodeIndex, grid: &WorldGrid) -> Vec<Location> {
        let mut child = *self.arena.get(terminal);
        let mut reversed = vec![grid.to_world(child.cell)];
        let mut last_dir: Option<Direction> = None;

        while let Some(parent_idx) = child.parent {
            let parent = *self.arena.get(parent_idx);
            let dir = Direction::of_step(parent.cell, child.cell);
            if last_dir.is_some() && dir != last_dir {
                reversed.push(grid.to_world(child.cell));
            }
            last_dir = dir;
            child = parent;
        }

        reversed.reverse();
        reversed
    }
}

fn resolve<G: GeodataQuery + ?Sized>(
    ctx: &SearchContext<'_, G>,
    loc: Location,
) -> Result<Surface, PathError> {
    let (gx, gy) = ctx.grid.to_grid(loc).ok_or(PathError::OutOfBounds(loc))?;
    ctx.geodata
        .nearest_walkable(gx, gy, loc.z)
        .ok_or(PathError::NoWalkableSurface(loc))
}

/// Walkable layer one step away in `dir`, on the same floor as `from`.
fn probe<G: GeodataQuery + ?Sized>(
    ctx: &SearchContext<'_, G>,
    from: GridCell,
    dir: Direction,
) -> Option<CellLayer> {
    let (dx, dy) = dir.offset();
    let (gx, gy) = (from.x + dx, from.y + dy);
    if !ctx.grid.in_bounds(gx, gy) {
        return None;
    }
    let threshold = ctx.config.layer_threshold;
    ctx.geodata
        .cell_below(gx, gy, from.z + threshold)
        .filter(|layer| (layer.height - from.z).abs() <= threshold)
}
