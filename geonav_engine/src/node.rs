// Search nodes and the fixed-capacity arena that owns them.
//
// A `NodeBuffer` never allocates nodes during a search. It owns a
// `NodeArena`: a `Vec<SearchNode>` sized once at construction plus a bump
// cursor. Each search claims slots in order; parent links are `NodeIndex`
// values into the same arena, so they can never dangle or outlive it.
//
// Releasing a buffer resets only the slots below the cursor (the high-water
// mark of the last search). Slots above it were never written since the
// previous reset and are excluded from reads by the cursor anyway.
//
// See also: `buffer.rs` for the A* loop that allocates from the arena.

use crate::geo::Nswe;
use crate::types::GridCell;

/// Index of a node within its arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

/// Where a node sits in the search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub enum NodeState {
    /// Unclaimed slot.
    #[default]
    Free,
    /// Discovered, waiting in the frontier.
    Open,
    /// Expanded.
    Closed,
}

/// A reusable search record.
///
/// Nodes are identified by their `cell` for open/closed membership, never
/// by cost: two nodes at the same cell are the same node.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchNode {
    pub cell: GridCell,
    pub nswe: Nswe,
    /// g: cost of the cheapest known route from the seed.
    pub cost_from_start: u32,
    /// h: heuristic estimate to the target.
    pub cost_to_goal: u32,
    /// Predecessor in the same arena; `None` for the seed.
    pub parent: Option<NodeIndex>,
    pub state: NodeState,
}

impl SearchNode {
    /// f = g + h.
    pub fn total_cost(&self) -> u32 {
        self.cost_from_start.saturating_add(self.cost_to_goal)
    }

    /// True if the slot holds no trace of a previous search.
    pub fn is_blank(&self) -> bool {
        self.cell == GridCell::default()
            && self.nswe == Nswe::NONE
            && self.cost_from_start == 0
            && self.cost_to_goal == 0
            && self.parent.is_none()
            && self.state == NodeState::Free
    }
}

/// Fixed-capacity bump allocator of `SearchNode`s.
#[derive(Clone, Debug)]
pub struct NodeArena {
    nodes: Vec<SearchNode>,
    cursor: usize,
}

impl NodeArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: vec![SearchNode::default(); capacity],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Slots claimed since the last reset.
    pub fn used(&self) -> usize {
        self.cursor
    }

    pub fn is_full(&self) -> bool {
        self.cursor >= self.nodes.len()
    }

    /// Claim the next slot. Returns `None` once the arena is full.
    pub fn alloc(&mut self, node: SearchNode) -> Option<NodeIndex> {
        let slot = self.nodes.get_mut(self.cursor)?;
        *slot = node;
        let idx = NodeIndex(self.cursor as u32);
        self.cursor += 1;
        Some(idx)
    }

    pub fn get(&self, idx: NodeIndex) -> &SearchNode {
        &self.nodes[..self.cursor][idx.0 as usize]
    }

    pub fn get_mut(&mut self, idx: NodeIndex) -> &mut SearchNode {
        &mut self.nodes[..self.cursor][idx.0 as usize]
    }

    /// Claimed nodes in allocation order.
    pub fn iter_used(&self) -> impl Iterator<Item = (NodeIndex, &SearchNode)> + '_ {
        self.nodes[..self.cursor]
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i as u32), node))
    }

    /// Blank every slot below the high-water mark and rewind the cursor.
    pub fn reset(&mut self) {
        self.nodes[..self.cursor].fill(SearchNode::default());
        self.cursor = 0;
    }

    /// True if no slot carries data from an earlier search.
    pub fn is_pristine(&self) -> bool {
        self.cursor == 0 && self.nodes.iter().all(SearchNode::is_blank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_at(x: i32, y: i32, parent: Option<NodeIndex>) -> SearchNode {
        SearchNode {
            cell: GridCell::new(x, y, 0),
            nswe: Nswe::ALL,
            cost_from_start: 10,
            cost_to_goal: 5,
            parent,
            state: NodeState::Open,
        }
    }

    #[test]
    fn alloc_is_sequential_until_full() {
        let mut arena = NodeArena::new(3);
        assert_eq!(arena.alloc(node_at(0, 0, None)), Some(NodeIndex(0)));
        assert_eq!(arena.alloc(node_at(1, 0, Some(NodeIndex(0)))), Some(NodeIndex(1)));
        assert_eq!(arena.alloc(node_at(2, 0, Some(NodeIndex(1)))), Some(NodeIndex(2)));
        assert!(arena.is_full());
        assert_eq!(arena.alloc(node_at(3, 0, None)), None);
        assert_eq!(arena.used(), 3);
        assert_eq!(arena.get(NodeIndex(2)).parent, Some(NodeIndex(1)));
    }

    #[test]
    fn reset_blanks_used_slots() {
        let mut arena = NodeArena::new(8);
        for i in 0..5 {
            arena.alloc(node_at(i, i, None));
        }
        arena.reset();
        assert_eq!(arena.used(), 0);
        assert!(arena.is_pristine());
        assert_eq!(arena.capacity(), 8);
    }

    #[test]
    #[should_panic]
    fn reads_past_cursor_panic() {
        let mut arena = NodeArena::new(4);
        arena.alloc(node_at(0, 0, None));
        let _ = arena.get(NodeIndex(1));
    }

    #[test]
    fn total_cost_sums_g_and_h() {
        let node = node_at(0, 0, None);
        assert_eq!(node.total_cost(), 15);
        assert!(!node.is_blank());
        assert!(SearchNode::default().is_blank());
    }

    #[test]
    fn iter_used_follows_allocation_order() {
        let mut arena = NodeArena::new(4);
        arena.alloc(node_at(5, 0, None));
        arena.alloc(node_at(6, 0, None));
        let xs: Vec<i32> = arena.iter_used().map(|(_, n)| n.cell.x).collect();
        assert_eq!(xs, vec![5, 6]);
    }
}
