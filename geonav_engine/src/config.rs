// Data-driven pathfinding configuration.
//
// All tunable search parameters live in `PathfindingConfig`, loaded from
// JSON once at startup and shared read-only (behind an `Arc`) by the buffer
// pool and every search. The engine has no other magic numbers: move costs,
// heuristic weights, ceilings, and the buffer layout all come from here.
//
// The buffer layout is a list of tiers, each a node capacity and a buffer
// count. Requests pick the smallest free buffer that covers their estimated
// need, so a pool can hold many cheap buffers for short hops and a few large
// ones for long routes.
//
// `validate()` rejects layouts and weights the search cannot honor. In
// particular the heuristic must stay admissible relative to itself:
// `heuristic_diagonal <= sqrt(2) * heuristic_axial`, checked in integers as
// `hd^2 <= 2 * ha^2`. It must also never charge more per step than a real
// move costs, so each heuristic weight is capped by its move weight and
// `heuristic_axial` by the cheapest move of either kind.
//
// See also: `pool.rs` which builds buffers from `buffers`, `buffer.rs` which
// reads `weights`, `max_iterations`, `layer_threshold`, `diagonal_moves`.

use crate::error::ConfigError;
use crate::geo::WorldExtents;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Nested parameter groups
// ---------------------------------------------------------------------------

/// A group of identically sized node buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferTier {
    /// Node slots per buffer.
    pub capacity: usize,
    /// Number of buffers with this capacity.
    pub count: usize,
}

/// Integer move costs and heuristic weights, all in the same cost units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveWeights {
    /// Cost of an axial step onto a fully open cell.
    pub axial: u32,
    /// Cost of a diagonal step onto a fully open cell.
    pub diagonal: u32,
    /// Cost of any step onto a cell that is not fully open (next to an
    /// obstacle). Biases routes away from tight corners.
    pub obstacle: u32,
    /// Heuristic weight per remaining axial step (and per height step).
    pub heuristic_axial: u32,
    /// Heuristic weight per remaining diagonal step.
    pub heuristic_diagonal: u32,
}

impl Default for MoveWeights {
    fn default() -> Self {
        Self {
            axial: 10,
            diagonal: 14,
            obstacle: 30,
            heuristic_axial: 10,
            heuristic_diagonal: 14,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Complete pathfinding configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathfindingConfig {
    /// Region tile bounds of the world grid.
    pub world: WorldExtents,

    /// Buffer layout of the pool.
    pub buffers: Vec<BufferTier>,

    pub weights: MoveWeights,

    /// Maximum number of nodes expanded by one search.
    pub max_iterations: u32,

    /// Vertical distance in world units within which two layers count as
    /// the same surface. Neighbour layers further away are treated as a
    /// different floor (unreachable by a single step), and the target
    /// matches any layer of its column within this distance.
    pub layer_threshold: i32,

    /// Whether diagonal steps are considered at all. Even when enabled, a
    /// diagonal is only taken if both axial cells it passes are open.
    pub diagonal_moves: bool,

    /// Extra cells added on each side of the origin/target bounding box when
    /// estimating how many nodes a request needs.
    pub search_margin: i32,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            world: WorldExtents::default(),
            buffers: vec![
                BufferTier {
                    capacity: 1_024,
                    count: 8,
                },
                BufferTier {
                    capacity: 4_096,
                    count: 4,
                },
                BufferTier {
                    capacity: 16_384,
                    count: 2,
                },
            ],
            weights: MoveWeights::default(),
            max_iterations: 3_500,
            layer_threshold: 32,
            diagonal_moves: true,
            search_margin: 8,
        }
    }
}

impl PathfindingConfig {
    /// Parse and validate a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PathfindingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Total number of buffers across all tiers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.iter().map(|tier| tier.count).sum()
    }

    /// Largest node capacity of any tier (0 for an empty layout).
    pub fn max_capacity(&self) -> usize {
        self.buffers.iter().map(|tier| tier.capacity).max().unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.buffers.is_empty() {
            return invalid("at least one buffer tier is required".into());
        }
        if let Some(tier) = self
            .buffers
            .iter()
            .find(|tier| tier.capacity == 0 || tier.count == 0)
        {
            return invalid(format!(
                "buffer tier must have non-zero capacity and count, got {tier:?}"
            ));
        }
        let w = &self.weights;
        if w.axial == 0 || w.diagonal == 0 || w.obstacle == 0 {
            return invalid("move weights must be positive".into());
        }
        if w.heuristic_axial == 0 {
            return invalid("heuristic_axial must be positive".into());
        }
        let (hd, ha) = (u64::from(w.heuristic_diagonal), u64::from(w.heuristic_axial));
        if hd * hd > 2 * ha * ha {
            return invalid(format!(
                "heuristic_diagonal {hd} exceeds sqrt(2) * heuristic_axial {ha}"
            ));
        }
        if w.heuristic_axial > w.axial.min(w.diagonal) || w.heuristic_diagonal > w.diagonal {
            return invalid(format!(
                "heuristic weights must not exceed move weights, got {w:?}"
            ));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be positive".into());
        }
        if self.layer_threshold < 0 || self.search_margin < 0 {
            return invalid("layer_threshold and search_margin must not be negative".into());
        }
        let e = &self.world;
        if e.tile_x_max < e.tile_x_min || e.tile_y_max < e.tile_y_min {
            return invalid(format!("inverted world extents {e:?}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PathfindingConfig::default();
        config.validate().unwrap();
        assert_eq!(config.buffer_count(), 14);
        assert_eq!(config.max_capacity(), 16_384);
    }

    #[test]
    fn default_config_serializes() {
        let config = PathfindingConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = PathfindingConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn config_loads_from_json_string() {
        let json = r#"{
            "world": {
                "tile_x_min": 0, "tile_x_max": 1,
                "tile_y_min": 0, "tile_y_max": 0,
                "tile_zero_x": 0, "tile_zero_y": 0
            },
            "buffers": [
                { "capacity": 256, "count": 2 },
                { "capacity": 2048, "count": 1 }
            ],
            "weights": {
                "axial": 10, "diagonal": 14, "obstacle": 40,
                "heuristic_axial": 10, "heuristic_diagonal": 14
            },
            "max_iterations": 900,
            "layer_threshold": 24,
            "diagonal_moves": false,
            "search_margin": 4
        }"#;
        let config = PathfindingConfig::from_json(json).unwrap();
        assert_eq!(config.world.regions_x(), 2);
        assert_eq!(config.buffer_count(), 3);
        assert_eq!(config.weights.obstacle, 40);
        assert_eq!(config.max_iterations, 900);
        assert!(!config.diagonal_moves);
    }

    #[test]
    fn rejects_inadmissible_heuristic() {
        let mut config = PathfindingConfig::default();
        config.weights.heuristic_diagonal = 15;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("heuristic_diagonal"));
    }

    #[test]
    fn rejects_heuristic_above_move_cost() {
        let mut config = PathfindingConfig::default();
        config.weights.axial = 8;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must not exceed move weights"));

        let mut config = PathfindingConfig::default();
        config.weights.diagonal = 12;
        assert!(config.validate().is_err());

        // Cheap diagonals cap the axial estimate too.
        let mut config = PathfindingConfig {
            weights: MoveWeights {
                axial: 10,
                diagonal: 9,
                obstacle: 30,
                heuristic_axial: 10,
                heuristic_diagonal: 9,
            },
            ..PathfindingConfig::default()
        };
        assert!(config.validate().is_err());
        config.weights.heuristic_axial = 9;
        config.weights.heuristic_diagonal = 9;
        config.validate().unwrap();
    }

    #[test]
    fn rejects_empty_or_zero_tiers() {
        let mut config = PathfindingConfig::default();
        config.buffers.clear();
        assert!(config.validate().is_err());

        config.buffers = vec![BufferTier {
            capacity: 0,
            count: 3,
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_extents() {
        let mut config = PathfindingConfig::default();
        config.world.tile_x_max = config.world.tile_x_min - 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = PathfindingConfig::from_json("{ \"world\": 3 }").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PathfindingConfig::load(Path::new("/nonexistent/geonav.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
