// Spatial addressing over the geodata world grid.
//
// The world is partitioned into a fixed hierarchy:
// - **Cell**: `CELL_SIZE` x `CELL_SIZE` world units, one walkability record
//   per layer (height + `Nswe` direction flags).
// - **Block**: `BLOCK_CELLS_X` x `BLOCK_CELLS_Y` cells. May carry several
//   vertical layers per column (bridges, overhangs).
// - **Region**: `REGION_BLOCKS_X` x `REGION_BLOCKS_Y` blocks, the unit in
//   which geodata is loaded. Regions are named by "tile" coordinates; tile
//   `(tile_zero_x, tile_zero_y)` has its north-west corner at world (0, 0).
//
// All conversions are integer-only. World-to-grid uses floor division, so
// negative world coordinates map to the cell that actually contains them.
// Out-of-bounds grid coordinates are a normal "no result", never a panic.
//
// See also: `types.rs` for `Location` / `GridCell`, `geodata.rs` for the
// per-cell layer queries, `buffer.rs` which validates every probed cell
// through `WorldGrid::in_bounds` before touching geodata.

use crate::types::{GridCell, Location};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

// ---------------------------------------------------------------------------
// Grid hierarchy constants
// ---------------------------------------------------------------------------

/// Horizontal edge length of one cell, in world units.
pub const CELL_SIZE: i32 = 16;

/// Vertical world units per height step. Used to scale height deltas into
/// cell units for the heuristic.
pub const CELL_HEIGHT: i32 = 8;

pub const BLOCK_CELLS_X: i32 = 8;
pub const BLOCK_CELLS_Y: i32 = 8;
pub const BLOCK_CELLS: i32 = BLOCK_CELLS_X * BLOCK_CELLS_Y;

pub const REGION_BLOCKS_X: i32 = 256;
pub const REGION_BLOCKS_Y: i32 = 256;

pub const REGION_CELLS_X: i32 = REGION_BLOCKS_X * BLOCK_CELLS_X;
pub const REGION_CELLS_Y: i32 = REGION_BLOCKS_Y * BLOCK_CELLS_Y;

/// Edge length of one region in world units (32768).
pub const REGION_WORLD_SIZE: i32 = REGION_CELLS_X * CELL_SIZE;

// ---------------------------------------------------------------------------
// Direction flags
// ---------------------------------------------------------------------------

/// 4-bit set of axial directions open from a cell.
///
/// Bit layout: bit0 = East, bit1 = West, bit2 = South, bit3 = North.
/// Bits above the low nibble are always masked off, so every value is a
/// subset of `Nswe::ALL`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nswe(u8);

impl Nswe {
    pub const NONE: Nswe = Nswe(0x00);
    pub const EAST: Nswe = Nswe(0x01);
    pub const WEST: Nswe = Nswe(0x02);
    pub const SOUTH: Nswe = Nswe(0x04);
    pub const NORTH: Nswe = Nswe(0x08);
    pub const ALL: Nswe = Nswe(0x0F);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every direction in `other` is open here.
    pub const fn contains(self, other: Nswe) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if all four directions are open (the cell touches no obstacle).
    pub const fn is_all(self) -> bool {
        self.0 == Self::ALL.0
    }

    pub const fn without(self, other: Nswe) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for Nswe {
    type Output = Nswe;

    fn bitor(self, rhs: Nswe) -> Nswe {
        Nswe(self.0 | rhs.0)
    }
}

impl fmt::Debug for Nswe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = |flag: Nswe, c: char| if self.contains(flag) { c } else { '-' };
        write!(
            f,
            "Nswe({}{}{}{})",
            letter(Nswe::NORTH, 'N'),
            letter(Nswe::SOUTH, 'S'),
            letter(Nswe::WEST, 'W'),
            letter(Nswe::EAST, 'E'),
        )
    }
}

// ---------------------------------------------------------------------------
// Movement directions
// ---------------------------------------------------------------------------

/// One of the eight moves between neighbouring cells.
///
/// The declaration order is the fixed expansion order of the search: the four
/// axial moves first, then the four diagonals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    East,
    West,
    South,
    North,
    SouthEast,
    SouthWest,
    NorthEast,
    NorthWest,
}

impl Direction {
    pub const AXIAL: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::South,
        Direction::North,
    ];

    pub const DIAGONAL: [Direction; 4] = [
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::NorthEast,
        Direction::NorthWest,
    ];

    /// Grid offset `(dx, dy)` of this move.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::South => (0, 1),
            Direction::North => (0, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Flags that must be open on the source cell to leave in this direction.
    pub const fn flags(self) -> Nswe {
        match self {
            Direction::East => Nswe::EAST,
            Direction::West => Nswe::WEST,
            Direction::South => Nswe::SOUTH,
            Direction::North => Nswe::NORTH,
            Direction::SouthEast => Nswe(Nswe::SOUTH.0 | Nswe::EAST.0),
            Direction::SouthWest => Nswe(Nswe::SOUTH.0 | Nswe::WEST.0),
            Direction::NorthEast => Nswe(Nswe::NORTH.0 | Nswe::EAST.0),
            Direction::NorthWest => Nswe(Nswe::NORTH.0 | Nswe::WEST.0),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
        }
    }

    pub const fn is_diagonal(self) -> bool {
        !matches!(
            self,
            Direction::East | Direction::West | Direction::South | Direction::North
        )
    }

    /// Split a diagonal into its (horizontal, vertical) axial parts.
    /// Returns `None` for axial directions.
    pub const fn components(self) -> Option<(Direction, Direction)> {
        match self {
            Direction::SouthEast => Some((Direction::East, Direction::South)),
            Direction::SouthWest => Some((Direction::West, Direction::South)),
            Direction::NorthEast => Some((Direction::East, Direction::North)),
            Direction::NorthWest => Some((Direction::West, Direction::North)),
            _ => None,
        }
    }

    /// Position of an axial direction within `Direction::AXIAL`.
    pub const fn axial_slot(self) -> Option<usize> {
        match self {
            Direction::East => Some(0),
            Direction::West => Some(1),
            Direction::South => Some(2),
            Direction::North => Some(3),
            _ => None,
        }
    }

    /// Direction of a single step between two columns, from the signs of the
    /// deltas. Returns `None` when both columns coincide.
    pub fn of_step(from: GridCell, to: GridCell) -> Option<Direction> {
        match ((to.x - from.x).signum(), (to.y - from.y).signum()) {
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            (0, 1) => Some(Direction::South),
            (0, -1) => Some(Direction::North),
            (1, 1) => Some(Direction::SouthEast),
            (-1, 1) => Some(Direction::SouthWest),
            (1, -1) => Some(Direction::NorthEast),
            (-1, -1) => Some(Direction::NorthWest),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// World extents and grid bounds
// ---------------------------------------------------------------------------

/// Region tile bounds of the playable world (inclusive on both ends).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldExtents {
    pub tile_x_min: i32,
    pub tile_x_max: i32,
    pub tile_y_min: i32,
    pub tile_y_max: i32,
    /// Tile whose north-west corner sits at world X = 0.
    pub tile_zero_x: i32,
    /// Tile whose north-west corner sits at world Y = 0.
    pub tile_zero_y: i32,
}

impl WorldExtents {
    /// A one-region world whose north-west corner is the world origin.
    /// Convenient for synthetic geodata.
    pub const fn single_region() -> Self {
        Self {
            tile_x_min: 0,
            tile_x_max: 0,
            tile_y_min: 0,
            tile_y_max: 0,
            tile_zero_x: 0,
            tile_zero_y: 0,
        }
    }

    pub const fn regions_x(&self) -> i32 {
        self.tile_x_max - self.tile_x_min + 1
    }

    pub const fn regions_y(&self) -> i32 {
        self.tile_y_max - self.tile_y_min + 1
    }
}

impl Default for WorldExtents {
    fn default() -> Self {
        Self {
            tile_x_min: 16,
            tile_x_max: 26,
            tile_y_min: 10,
            tile_y_max: 25,
            tile_zero_x: 20,
            tile_zero_y: 18,
        }
    }
}

/// Grid dimensions and world origin derived once from `WorldExtents`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldGrid {
    origin_x: i32,
    origin_y: i32,
    cells_x: i32,
    cells_y: i32,
}

impl WorldGrid {
    pub fn new(extents: &WorldExtents) -> Self {
        Self {
            origin_x: (extents.tile_x_min - extents.tile_zero_x) * REGION_WORLD_SIZE,
            origin_y: (extents.tile_y_min - extents.tile_zero_y) * REGION_WORLD_SIZE,
            cells_x: extents.regions_x().max(0) * REGION_CELLS_X,
            cells_y: extents.regions_y().max(0) * REGION_CELLS_Y,
        }
    }

    /// Total grid width in cells.
    pub fn cells_x(&self) -> i32 {
        self.cells_x
    }

    /// Total grid height in cells.
    pub fn cells_y(&self) -> i32 {
        self.cells_y
    }

    /// World coordinate of the grid's north-west corner.
    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_y)
    }

    pub fn in_bounds(&self, gx: i32, gy: i32) -> bool {
        gx >= 0 && gy >= 0 && gx < self.cells_x && gy < self.cells_y
    }

    pub fn world_to_grid_x(&self, world_x: i32) -> i32 {
        world_to_cell(world_x, self.origin_x)
    }

    pub fn world_to_grid_y(&self, world_y: i32) -> i32 {
        world_to_cell(world_y, self.origin_y)
    }

    /// World X of the centre of grid column `gx`.
    pub fn grid_to_world_x(&self, gx: i32) -> i32 {
        self.origin_x + gx * CELL_SIZE + CELL_SIZE / 2
    }

    /// World Y of the centre of grid row `gy`.
    pub fn grid_to_world_y(&self, gy: i32) -> i32 {
        self.origin_y + gy * CELL_SIZE + CELL_SIZE / 2
    }

    /// Grid column containing a world location, or `None` outside the world.
    pub fn to_grid(&self, loc: Location) -> Option<(i32, i32)> {
        let gx = self.world_to_grid_x(loc.x);
        let gy = self.world_to_grid_y(loc.y);
        self.in_bounds(gx, gy).then_some((gx, gy))
    }

    /// World location at the centre of a cell, at the cell's layer height.
    pub fn to_world(&self, cell: GridCell) -> Location {
        Location::new(
            self.grid_to_world_x(cell.x),
            self.grid_to_world_y(cell.y),
            cell.z,
        )
    }

    /// Block coordinates of the block containing a cell.
    pub fn block_of(gx: i32, gy: i32) -> (i32, i32) {
        (gx.div_euclid(BLOCK_CELLS_X), gy.div_euclid(BLOCK_CELLS_Y))
    }

    /// Region coordinates (relative to `tile_x_min`/`tile_y_min`) of a cell.
    pub fn region_of(gx: i32, gy: i32) -> (i32, i32) {
        (gx.div_euclid(REGION_CELLS_X), gy.div_euclid(REGION_CELLS_Y))
    }

    /// Index of a cell within its block, column-major like the on-disk
    /// geodata layout: `(x % 8) * 8 + (y % 8)`.
    pub fn cell_in_block(gx: i32, gy: i32) -> usize {
        (gx.rem_euclid(BLOCK_CELLS_X) * BLOCK_CELLS_Y + gy.rem_euclid(BLOCK_CELLS_Y)) as usize
    }
}

/// Floor-divided cell index of a world coordinate. The difference is taken
/// in `i64`, so any `i32` input maps to some cell (usually out of bounds).
fn world_to_cell(world: i32, origin: i32) -> i32 {
    (i64::from(world) - i64::from(origin)).div_euclid(i64::from(CELL_SIZE)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_constants() {
        assert_eq!(BLOCK_CELLS, 64);
        assert_eq!(REGION_CELLS_X, 2048);
        assert_eq!(REGION_WORLD_SIZE, 32768);
    }

    #[test]
    fn nswe_masks_high_bits() {
        let flags = Nswe::from_bits(0xFF);
        assert_eq!(flags, Nswe::ALL);
        assert_eq!(Nswe::from_bits(0x30), Nswe::NONE);
    }

    #[test]
    fn nswe_contains_and_without() {
        let flags = Nswe::NORTH | Nswe::EAST;
        assert!(flags.contains(Nswe::NORTH));
        assert!(flags.contains(Nswe::NORTH | Nswe::EAST));
        assert!(!flags.contains(Nswe::SOUTH));
        assert!(!flags.is_all());
        assert!(Nswe::ALL.without(Nswe::WEST).contains(Nswe::EAST));
        assert!(!Nswe::ALL.without(Nswe::WEST).contains(Nswe::WEST));
        assert_eq!(format!("{:?}", flags), "Nswe(N--E)");
    }

    #[test]
    fn bit_layout_matches_geodata() {
        assert_eq!(Nswe::EAST.bits(), 1);
        assert_eq!(Nswe::WEST.bits(), 2);
        assert_eq!(Nswe::SOUTH.bits(), 4);
        assert_eq!(Nswe::NORTH.bits(), 8);
    }

    #[test]
    fn diagonal_components_and_flags() {
        for dir in Direction::DIAGONAL {
            let (h, v) = dir.components().unwrap();
            assert!(dir.is_diagonal());
            assert_eq!(h.flags() | v.flags(), dir.flags());
            let (dx, dy) = dir.offset();
            assert_eq!((h.offset().0, v.offset().1), (dx, dy));
        }
        for dir in Direction::AXIAL {
            assert!(!dir.is_diagonal());
            assert!(dir.components().is_none());
            assert_eq!(Direction::AXIAL[dir.axial_slot().unwrap()], dir);
        }
    }

    #[test]
    fn step_direction_from_deltas() {
        let o = GridCell::new(5, 5, 0);
        assert_eq!(Direction::of_step(o, GridCell::new(6, 4, 0)), Some(Direction::NorthEast));
        assert_eq!(Direction::of_step(o, GridCell::new(5, 9, 0)), Some(Direction::South));
        assert_eq!(Direction::of_step(o, o), None);
    }

    #[test]
    fn world_to_grid_uses_floor_division() {
        let grid = WorldGrid::new(&WorldExtents::single_region());
        assert_eq!(grid.world_to_grid_x(0), 0);
        assert_eq!(grid.world_to_grid_x(15), 0);
        assert_eq!(grid.world_to_grid_x(16), 1);
        assert_eq!(grid.world_to_grid_x(-1), -1);
        assert!(grid.to_grid(Location::new(-1, 0, 0)).is_none());
    }

    #[test]
    fn default_extents_origin() {
        let extents = WorldExtents::default();
        let grid = WorldGrid::new(&extents);
        assert_eq!(grid.origin(), (-4 * REGION_WORLD_SIZE, -8 * REGION_WORLD_SIZE));
        assert_eq!(grid.cells_x(), 11 * REGION_CELLS_X);
        assert_eq!(grid.cells_y(), 16 * REGION_CELLS_Y);
        // World (0, 0) lands on a region boundary inside the grid.
        assert_eq!(grid.to_grid(Location::new(0, 0, 0)), Some((4 * 2048, 8 * 2048)));
    }

    #[test]
    fn extreme_coordinates_are_out_of_bounds() {
        let grid = WorldGrid::new(&WorldExtents::default());
        for &(x, y) in &[
            (i32::MAX, 0),
            (i32::MIN, 0),
            (0, i32::MAX),
            (0, i32::MIN),
            (i32::MAX, i32::MIN),
        ] {
            assert!(grid.to_grid(Location::new(x, y, 0)).is_none(), "({x}, {y})");
        }
        assert_eq!(grid.world_to_grid_x(i32::MAX), (i32::MAX / 16) + 8192);
    }

    #[test]
    fn bounds_check() {
        let grid = WorldGrid::new(&WorldExtents::single_region());
        assert!(grid.in_bounds(0, 0));
        assert!(grid.in_bounds(2047, 2047));
        assert!(!grid.in_bounds(2048, 0));
        assert!(!grid.in_bounds(0, -1));
    }

    #[test]
    fn grid_world_roundtrip_hits_cell_centre() {
        let grid = WorldGrid::new(&WorldExtents::default());
        let cell = GridCell::new(1234, 567, -40);
        let loc = grid.to_world(cell);
        assert_eq!(grid.to_grid(loc), Some((1234, 567)));
        assert_eq!(loc.z, -40);
    }

    #[test]
    fn block_and_region_addressing() {
        assert_eq!(WorldGrid::block_of(17, 9), (2, 1));
        assert_eq!(WorldGrid::region_of(2049, 10), (1, 0));
        assert_eq!(WorldGrid::cell_in_block(0, 0), 0);
        assert_eq!(WorldGrid::cell_in_block(1, 0), 8);
        assert_eq!(WorldGrid::cell_in_block(9, 3), 11);
        assert_eq!(WorldGrid::cell_in_block(7, 7), 63);
    }
}
