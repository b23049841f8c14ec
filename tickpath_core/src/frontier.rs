// The A* open set.
//
// A `BinaryHeap` used as a min-heap via reversed ordering. Entries are keyed
// by `(cost, h, depth)` ascending, then by `NodeId` so that equal keys still
// pop in a fixed order. `cost` is the node's `f` minus any priority boost the
// expansion applied, so it can sit below `f`.
//
// **Critical constraint: determinism.** Pop order depends only on the pushed
// keys. All float comparisons go through `total_cmp`.

use crate::node::NodeId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, Debug)]
pub struct FrontierEntry {
    pub node: NodeId,
    pub cost: f64,
    pub heuristic: f64,
    pub depth: u32,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest key is "greatest".
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.heuristic.total_cmp(&self.heuristic))
            .then_with(|| other.depth.cmp(&self.depth))
            .then_with(|| other.node.cmp(&self.node))
    }
}

#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<FrontierEntry>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: FrontierEntry) {
        self.heap.push(entry);
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
