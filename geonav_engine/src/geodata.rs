// Geodata query interface consumed by the pathfinder.
//
// The engine never owns terrain data. The host world supplies an
// implementation of `GeodataQuery` that answers, for a grid column, which
// walkable layers exist and which axial directions are open from each. The
// engine treats it as a read-only black box: all methods take `&self`, and
// the `Send + Sync` bound lets every concurrently running search buffer
// share one instance (geodata is immutable once loaded).
//
// Handles are opaque: `BlockHandle` names a loaded block and `LayerIndex`
// names one layer of one cell inside that block. Both are only meaningful to
// the implementation that produced them.
//
// See also: `memory_geodata.rs` for the in-memory implementation used by
// tests and benchmarks, `buffer.rs` for the A* search that probes
// neighbours through `cell_below`.

use crate::geo::Nswe;
use crate::types::GridCell;

/// Opaque reference to a loaded geodata block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockHandle(pub u32);

/// Opaque reference to one layer of one cell within a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerIndex(pub u32);

/// Height and direction flags of one walkable layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellLayer {
    pub height: i32,
    pub nswe: Nswe,
}

impl CellLayer {
    pub const fn new(height: i32, nswe: Nswe) -> Self {
        Self { height, nswe }
    }
}

/// A resolved walkable surface: the cell (with its layer height) and the
/// directions open from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Surface {
    pub cell: GridCell,
    pub nswe: Nswe,
}

/// Read-only walkability queries over the world grid.
///
/// All coordinates are grid cells; callers validate them against
/// `WorldGrid::in_bounds` first. Implementations may still return `None`
/// for columns without loaded geodata.
pub trait GeodataQuery: Send + Sync {
    /// Block covering a cell.
    fn block(&self, gx: i32, gy: i32) -> Option<BlockHandle>;

    /// Highest walkable layer of the cell at or below `z_hint`, or `None` if
    /// the column has no surface at or below that height.
    fn layer_below(&self, block: BlockHandle, gx: i32, gy: i32, z_hint: i32) -> Option<LayerIndex>;

    /// World height of a layer.
    fn height(&self, block: BlockHandle, layer: LayerIndex) -> i32;

    /// Directions open from a layer.
    fn nswe(&self, block: BlockHandle, layer: LayerIndex) -> Nswe;

    /// The walkable layer of a column whose height is nearest to `z`.
    /// Used to seed searches from positions that are not grid-aligned.
    fn nearest_walkable(&self, gx: i32, gy: i32, z: i32) -> Option<Surface>;

    /// Convenience: resolve block and layer below `z_hint` in one call.
    fn cell_below(&self, gx: i32, gy: i32, z_hint: i32) -> Option<CellLayer> {
        let block = self.block(gx, gy)?;
        let layer = self.layer_below(block, gx, gy, z_hint)?;
        Some(CellLayer::new(
            self.height(block, layer),
            self.nswe(block, layer),
        ))
    }
}
