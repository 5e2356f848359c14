// Core coordinate types shared across the engine.
//
// Two coordinate spaces meet in the pathfinder:
// - `Location`: a point in world units, as supplied by callers and returned
//   in computed routes.
// - `GridCell`: a grid column (`x`, `y` in cell units) plus the world-unit
//   height `z` of one walkable layer in that column. Two cells in the same
//   column but on different layers (a bridge above a road) are distinct.
//
// Conversion between the two lives in `geo.rs` (`WorldGrid`), since it
// depends on the world extents loaded at startup.
//
// See also: `geo.rs` for the grid hierarchy and direction flags, `node.rs`
// which stores a `GridCell` per search node.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// World space
// ---------------------------------------------------------------------------

/// A point in world space. Each component is in world units.
///
/// The horizontal axes follow the geodata convention:
/// - X: east  (positive) / west  (negative)
/// - Y: south (positive) / north (negative)
/// - Z: up    (positive) / down  (negative)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Grid space
// ---------------------------------------------------------------------------

/// One walkable layer of a grid column: grid `x`/`y`, world-unit `z`.
///
/// Equality and hashing cover all three components, which makes `GridCell`
/// the identity key for open/closed-set membership during a search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridCell {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// True if both cells share a column and their heights differ by at most
    /// `threshold` world units.
    pub fn same_column_within(self, other: Self, threshold: i32) -> bool {
        self.x == other.x && self.y == other.y && (self.z - other.z).abs() <= threshold
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {} @ {}]", self.x, self.y, self.z)
    }
}
