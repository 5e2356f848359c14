// In-memory geodata store implementing `GeodataQuery`.
//
// Blocks come in the three shapes found in packed geodata files:
// - `Flat`:       one height for the whole block, every direction open.
// - `Complex`:    one layer per cell, each with its own height and flags.
// - `Multilayer`: any number of layers per cell (bridges, floors of a
//                 building), stored highest first.
//
// Blocks are created on demand by the builder methods and addressed by
// block coordinates through an `FxHashMap`. Columns without a loaded block,
// and `Complex` cells left empty, have no walkable surface: searches treat
// them as void.
//
// `LayerIndex` packs the cell's index within its block and the layer's
// position within the column: `(cell << 8) | layer`.
//
// Hosts that load real geodata can supply their own `GeodataQuery`; this
// store backs the test suites, the benchmarks, and hosts that build
// synthetic worlds programmatically.
//
// See also: `geodata.rs` for the trait, `geo.rs` for block addressing.

use crate::geo::{BLOCK_CELLS, BLOCK_CELLS_X, BLOCK_CELLS_Y, Direction, Nswe, WorldGrid};
use crate::geodata::{BlockHandle, CellLayer, GeodataQuery, LayerIndex, Surface};
use crate::types::GridCell;
use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};

const LAYER_BITS: u32 = 8;
const LAYER_MASK: u32 = (1 << LAYER_BITS) - 1;

type Column = SmallVec<[CellLayer; 2]>;

#[derive(Clone, Debug)]
enum GeoBlock {
    Flat { layer: CellLayer },
    Complex { cells: Vec<Option<CellLayer>> },
    Multilayer { columns: Vec<Column> },
}

impl GeoBlock {
    fn empty_complex() -> Self {
        GeoBlock::Complex {
            cells: vec![None; BLOCK_CELLS as usize],
        }
    }

    /// Layers of one cell, highest first.
    fn column(&self, cell: usize) -> &[CellLayer] {
        match self {
            GeoBlock::Flat { layer } => std::slice::from_ref(layer),
            GeoBlock::Complex { cells } => cells[cell].as_slice(),
            GeoBlock::Multilayer { columns } => columns[cell].as_slice(),
        }
    }

    /// Rewrite a flat block as a complex one so single cells can change.
    fn make_complex(&mut self) {
        if let GeoBlock::Flat { layer } = *self {
            *self = GeoBlock::Complex {
                cells: vec![Some(layer); BLOCK_CELLS as usize],
            };
        }
    }

    fn make_multilayer(&mut self) {
        let columns = match self {
            GeoBlock::Flat { layer } => vec![smallvec![*layer]; BLOCK_CELLS as usize],
            GeoBlock::Complex { cells } => cells
                .iter()
                .map(|cell| cell.iter().copied().collect::<Column>())
                .collect(),
            GeoBlock::Multilayer { .. } => return,
        };
        *self = GeoBlock::Multilayer { columns };
    }

    /// Layer of a cell whose height is nearest to `z` (the higher one on ties).
    fn nearest_layer_mut(&mut self, cell: usize, z: i32) -> Option<&mut CellLayer> {
        self.make_complex();
        match self {
            GeoBlock::Flat { .. } => None,
            GeoBlock::Complex { cells } => cells[cell].as_mut(),
            GeoBlock::Multilayer { columns } => columns[cell]
                .iter_mut()
                .min_by_key(|layer| (layer.height - z).abs()),
        }
    }
}

/// Geodata held entirely in memory, keyed by block coordinates.
#[derive(Clone, Debug)]
pub struct MemoryGeodata {
    grid: WorldGrid,
    blocks: Vec<GeoBlock>,
    index: FxHashMap<(i32, i32), u32>,
}

impl MemoryGeodata {
    /// An empty store: every column is void until blocks are added.
    pub fn new(grid: WorldGrid) -> Self {
        Self {
            grid,
            blocks: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    /// Number of loaded blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Mutable access to the block covering a cell, creating an empty
    /// complex block if none is loaded. `None` outside the grid.
    fn block_entry(&mut self, gx: i32, gy: i32) -> Option<&mut GeoBlock> {
        if !self.grid.in_bounds(gx, gy) {
            return None;
        }
        let next = self.blocks.len() as u32;
        let idx = *self.index.entry(WorldGrid::block_of(gx, gy)).or_insert(next);
        if idx == next {
            self.blocks.push(GeoBlock::empty_complex());
        }
        Some(&mut self.blocks[idx as usize])
    }

    fn existing_block_mut(&mut self, gx: i32, gy: i32) -> Option<&mut GeoBlock> {
        if !self.grid.in_bounds(gx, gy) {
            return None;
        }
        let idx = *self.index.get(&WorldGrid::block_of(gx, gy))?;
        Some(&mut self.blocks[idx as usize])
    }

    fn column_at(&self, gx: i32, gy: i32) -> &[CellLayer] {
        match self.block(gx, gy) {
            Some(handle) => {
                self.blocks[handle.0 as usize].column(WorldGrid::cell_in_block(gx, gy))
            }
            None => &[],
        }
    }

    /// Load a flat block (every cell open at `height`). Block coordinates,
    /// not cell coordinates. Replaces any existing block.
    pub fn set_flat_block(&mut self, bx: i32, by: i32, height: i32) {
        let layer = CellLayer::new(height, Nswe::ALL);
        let gx = bx * BLOCK_CELLS_X;
        let gy = by * BLOCK_CELLS_Y;
        if let Some(block) = self.block_entry(gx, gy) {
            *block = GeoBlock::Flat { layer };
        }
    }

    /// Set a cell to exactly one layer. Out-of-bounds cells are ignored.
    pub fn set_cell(&mut self, gx: i32, gy: i32, height: i32, nswe: Nswe) {
        let cell = WorldGrid::cell_in_block(gx, gy);
        let layer = CellLayer::new(height, nswe);
        let Some(block) = self.block_entry(gx, gy) else {
            return;
        };
        block.make_complex();
        match block {
            GeoBlock::Complex { cells } => cells[cell] = Some(layer),
            GeoBlock::Multilayer { columns } => columns[cell] = smallvec![layer],
            GeoBlock::Flat { .. } => {}
        }
    }

    /// Add a layer to a cell, keeping the column ordered highest first. A
    /// layer already present at the same height is replaced.
    pub fn add_layer(&mut self, gx: i32, gy: i32, height: i32, nswe: Nswe) {
        let cell = WorldGrid::cell_in_block(gx, gy);
        let layer = CellLayer::new(height, nswe);
        let Some(block) = self.block_entry(gx, gy) else {
            return;
        };
        block.make_multilayer();
        if let GeoBlock::Multilayer { columns } = block {
            let column = &mut columns[cell];
            match column.iter().position(|l| l.height <= height) {
                Some(pos) if column[pos].height == height => column[pos] = layer,
                Some(pos) => column.insert(pos, layer),
                None => column.push(layer),
            }
        }
    }

    /// Fill an inclusive rectangle of cells with open ground at `height`.
    pub fn fill_flat(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, height: i32) {
        for gx in x0.min(x1)..=x0.max(x1) {
            for gy in y0.min(y1)..=y0.max(y1) {
                self.set_cell(gx, gy, height, Nswe::ALL);
            }
        }
    }

    /// Turn the layer nearest `z` at a cell into an obstacle: it loses all
    /// its flags, and each axial neighbour loses the flag pointing into it.
    /// Returns `false` if the column has no surface.
    pub fn carve_obstacle(&mut self, gx: i32, gy: i32, z: i32) -> bool {
        let cell = WorldGrid::cell_in_block(gx, gy);
        let height = match self
            .existing_block_mut(gx, gy)
            .and_then(|block| block.nearest_layer_mut(cell, z))
        {
            Some(layer) => {
                layer.nswe = Nswe::NONE;
                layer.height
            }
            None => return false,
        };
        for dir in Direction::AXIAL {
            let (dx, dy) = dir.offset();
            let (nx, ny) = (gx + dx, gy + dy);
            let inward = dir.opposite().flags();
            if let Some(layer) = self
                .existing_block_mut(nx, ny)
                .and_then(|block| block.nearest_layer_mut(WorldGrid::cell_in_block(nx, ny), height))
            {
                layer.nswe = layer.nswe.without(inward);
            }
        }
        true
    }

    /// Close one direction on the layer nearest `z` without touching the
    /// neighbour. Models one-way edges such as ledges.
    pub fn close_direction(&mut self, gx: i32, gy: i32, z: i32, dir: Direction) {
        let cell = WorldGrid::cell_in_block(gx, gy);
        if let Some(layer) = self
            .existing_block_mut(gx, gy)
            .and_then(|block| block.nearest_layer_mut(cell, z))
        {
            layer.nswe = layer.nswe.without(dir.flags());
        }
    }

    /// All layers of a column, highest first.
    pub fn layers(&self, gx: i32, gy: i32) -> Vec<CellLayer> {
        self.column_at(gx, gy).to_vec()
    }
}

fn decode(layer: LayerIndex) -> (usize, usize) {
    ((layer.0 >> LAYER_BITS) as usize, (layer.0 & LAYER_MASK) as usize)
}

impl GeodataQuery for MemoryGeodata {
    fn block(&self, gx: i32, gy: i32) -> Option<BlockHandle> {
        if !self.grid.in_bounds(gx, gy) {
            return None;
        }
        self.index
            .get(&WorldGrid::block_of(gx, gy))
            .map(|&idx| BlockHandle(idx))
    }

    fn layer_below(&self, block: BlockHandle, gx: i32, gy: i32, z_hint: i32) -> Option<LayerIndex> {
        let cell = WorldGrid::cell_in_block(gx, gy);
        let column = self.blocks.get(block.0 as usize)?.column(cell);
        let pos = column.iter().position(|layer| layer.height <= z_hint)?;
        Some(LayerIndex(((cell as u32) << LAYER_BITS) | pos as u32))
    }

    fn height(&self, block: BlockHandle, layer: LayerIndex) -> i32 {
        let (cell, pos) = decode(layer);
        self.blocks
            .get(block.0 as usize)
            .and_then(|b| b.column(cell).get(pos))
            .map_or(0, |l| l.height)
    }

    fn nswe(&self, block: BlockHandle, layer: LayerIndex) -> Nswe {
        let (cell, pos) = decode(layer);
        self.blocks
            .get(block.0 as usize)
            .and_then(|b| b.column(cell).get(pos))
            .map_or(Nswe::NONE, |l| l.nswe)
    }

    fn nearest_walkable(&self, gx: i32, gy: i32, z: i32) -> Option<Surface> {
        self.column_at(gx, gy)
            .iter()
            .min_by_key(|layer| (layer.height - z).abs())
            .map(|layer| Surface {
                cell: GridCell::new(gx, gy, layer.height),
                nswe: layer.nswe,
            })
    }
}
