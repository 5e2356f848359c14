// Error types for path searches and configuration.
//
// Nothing here is fatal. Every `PathError` except `PoolExhausted` means "no
// route" to the caller; `PathFinder::find_path` collapses those to an empty
// waypoint list, while `try_find_path` keeps the reason for logging and
// ceiling tuning. `PoolExhausted` stays distinct because it means "try again
// later", not "there is no path".
//
// `ConfigError` is only produced while loading or validating a
// `PathfindingConfig`, before any pool exists.

use crate::types::Location;
use std::fmt;

/// Which search ceiling stopped a search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BudgetKind {
    /// The configured iteration ceiling was reached.
    Iterations,
    /// The buffer's node array ran out of free slots.
    Nodes,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetKind::Iterations => f.write_str("iteration ceiling"),
            BudgetKind::Nodes => f.write_str("node capacity"),
        }
    }
}

/// Why a search produced no route.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("location {0} is outside the world grid")]
    OutOfBounds(Location),

    #[error("no walkable surface near {0}")]
    NoWalkableSurface(Location),

    #[error("target unreachable: frontier exhausted")]
    Unreachable,

    #[error("search budget exceeded: {0}")]
    BudgetExceeded(BudgetKind),

    #[error("no free path buffer")]
    PoolExhausted,
}

impl PathError {
    /// True for failures that a larger budget might have turned into a path.
    pub fn is_near_miss(&self) -> bool {
        matches!(self, PathError::BudgetExceeded(_))
    }
}

/// Failure to load or validate a `PathfindingConfig`.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            PathError::OutOfBounds(Location::new(1, 2, 3)).to_string(),
            "location (1, 2, 3) is outside the world grid"
        );
        assert_eq!(
            PathError::BudgetExceeded(BudgetKind::Nodes).to_string(),
            "search budget exceeded: node capacity"
        );
    }

    #[test]
    fn only_budget_failures_are_near_misses() {
        assert!(PathError::BudgetExceeded(BudgetKind::Iterations).is_near_miss());
        assert!(!PathError::Unreachable.is_near_miss());
        assert!(!PathError::PoolExhausted.is_near_miss());
    }
}
