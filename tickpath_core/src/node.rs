// Search nodes and their lazily memoized cost model.
//
// Nodes live in a per-search `NodeArena` and are addressed by `NodeId`
// handles. A node's parent is fixed when the node is allocated and never
// changes afterwards, so the parent tree can never contain a cycle and every
// memoized cost stays valid for the node's whole life.
//
// Costs (all memoized in `OnceCell`s, computed at most once per node):
// - `h` = manhattan * wM + octile * wO + perpendicular * wP
//         + |y - target.y| * wH + 0.5 * |y - start.y|
//   where `perpendicular` is the distance from the start-target line.
// - `g` = 0 for the root, else `parent.g + euclidean(node, parent)`.
// - `f` = `g + h`.
//
// See also: `frontier.rs` which orders nodes by `(f, h, depth)`,
// `search.rs` which owns the arena for one search call.

use crate::config::HeuristicWeights;
use crate::geometry::{Position, Vector};
use std::cell::OnceCell;

/// Weight of the vertical-drift-from-start term. Not configurable.
const START_HEIGHT_PENALTY: f64 = 0.5;

/// Handle into a `NodeArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct Node {
    position: Position,
    depth: u32,
    parent: Option<NodeId>,
    h: OnceCell<f64>,
    g: OnceCell<f64>,
    f: OnceCell<f64>,
}

impl Node {
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Expansion steps from the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// All nodes of one search, plus the immutable frame their costs are
/// measured against.
#[derive(Debug)]
pub struct NodeArena {
    start: Position,
    target: Position,
    weights: HeuristicWeights,
    line_start: Vector,
    line_end: Vector,
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new(start: Position, target: Position, weights: HeuristicWeights) -> Self {
        let line_start = start.to_vector();
        let line_end = target.to_vector();
        Self {
            start,
            target,
            weights,
            line_start,
            line_end,
            nodes: Vec::new(),
        }
    }

    pub fn start(&self) -> &Position {
        &self.start
    }

    pub fn target(&self) -> &Position {
        &self.target
    }

    pub fn weights(&self) -> HeuristicWeights {
        self.weights
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a parentless node at depth 0.
    pub fn alloc_root(&mut self, position: Position) -> NodeId {
        self.push(position, 0, None)
    }

    /// Allocate a node parented to `parent`, one step deeper.
    pub fn alloc_child(&mut self, parent: NodeId, position: Position) -> NodeId {
        let depth = self.node(parent).depth + 1;
        self.push(position, depth, Some(parent))
    }

    fn push(&mut self, position: Position, depth: u32, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            position,
            depth,
            parent,
            h: OnceCell::new(),
            g: OnceCell::new(),
            f: OnceCell::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn position(&self, id: NodeId) -> &Position {
        &self.node(id).position
    }

    pub fn depth(&self, id: NodeId) -> u32 {
        self.node(id).depth
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Estimated remaining cost to the target.
    pub fn heuristic(&self, id: NodeId) -> f64 {
        let node = self.node(id);
        *node.h.get_or_init(|| self.compute_heuristic(&node.position))
    }

    fn compute_heuristic(&self, position: &Position) -> f64 {
        let w = &self.weights;
        let manhattan = position.manhattan_distance(&self.target) as f64;
        let octile = position.octile_distance(&self.target);
        let perpendicular =
            Vector::distance_to_line(position.to_vector(), self.line_start, self.line_end);
        let height = (position.y() - self.target.y()).abs();
        let drift = (position.y() - self.start.y()).abs();

        manhattan * w.manhattan
            + octile * w.octile
            + perpendicular * w.perpendicular
            + height * w.height
            + drift * START_HEIGHT_PENALTY
    }

    /// Accumulated cost from the root along the parent chain.
    pub fn g_cost(&self, id: NodeId) -> f64 {
        if let Some(&g) = self.node(id).g.get() {
            return g;
        }

        // Walk up to the nearest ancestor with a known g (or the root), then
        // fill the chain top-down. Iterative so long chains can't overflow
        // the stack.
        let mut chain = vec![id];
        let mut base = 0.0;
        let mut cursor = id;
        while let Some(parent) = self.node(cursor).parent {
            if let Some(&g) = self.node(parent).g.get() {
                base = g;
                break;
            }
            chain.push(parent);
            cursor = parent;
        }

        let mut g = base;
        for &link in chain.iter().rev() {
            let node = self.node(link);
            g = match node.parent {
                None => 0.0,
                Some(parent) => g + node.position.distance(&self.node(parent).position),
            };
            let _ = node.g.set(g);
        }
        g
    }

    /// `g + h`.
    pub fn f_cost(&self, id: NodeId) -> f64 {
        let node = self.node(id);
        *node
            .f
            .get_or_init(|| self.g_cost(id) + self.heuristic(id))
    }

    /// Positions from the root to `id`, inclusive.
    pub fn retrace(&self, id: NodeId) -> Vec<Position> {
        let mut positions = Vec::with_capacity(self.depth(id) as usize + 1);
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            positions.push(node.position.clone());
            cursor = node.parent;
        }
        positions.reverse();
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Environment, EnvironmentId};
    use std::sync::Arc;

    fn env() -> Arc<Environment> {
        Environment::new(EnvironmentId(0), "test", -64, 320).shared()
    }

    fn arena(weights: HeuristicWeights) -> (Arc<Environment>, NodeArena) {
        let env = env();
        let start = Position::new(&env, 0.0, 0.0, 0.0);
        let target = Position::new(&env, 10.0, 0.0, 0.0);
        (env, NodeArena::new(start, target, weights))
    }

    #[test]
    fn root_has_zero_g_and_depth() {
        let (env, mut arena) = arena(HeuristicWeights::NATURAL);
        let root = arena.alloc_root(Position::new(&env, 0.0, 0.0, 0.0));
        assert_eq!(arena.depth(root), 0);
        assert_eq!(arena.parent(root), None);
        assert_eq!(arena.g_cost(root), 0.0);
        assert_eq!(arena.f_cost(root), arena.heuristic(root));
    }

    #[test]
    fn g_accumulates_euclidean_steps() {
        let (env, mut arena) = arena(HeuristicWeights::NATURAL);
        let root = arena.alloc_root(Position::new(&env, 0.0, 0.0, 0.0));
        let a = arena.alloc_child(root, Position::new(&env, 1.0, 0.0, 0.0));
        let b = arena.alloc_child(a, Position::new(&env, 2.0, 0.0, 1.0));
        let c = arena.alloc_child(b, Position::new(&env, 3.0, 1.0, 2.0));
        // Read the deepest node first so the whole chain fills at once.
        let expected = 1.0 + std::f64::consts::SQRT_2 + 3f64.sqrt();
        assert!((arena.g_cost(c) - expected).abs() < 1e-12);
        assert_eq!(arena.g_cost(a), 1.0);
        assert_eq!(arena.depth(c), 3);
    }

    #[test]
    fn costs_are_memoized() {
        let (env, mut arena) = arena(HeuristicWeights::NATURAL);
        let root = arena.alloc_root(Position::new(&env, 0.0, 0.0, 0.0));
        let child = arena.alloc_child(root, Position::new(&env, 1.0, 1.0, 0.0));
        let first = (arena.heuristic(child), arena.g_cost(child), arena.f_cost(child));
        let second = (arena.heuristic(child), arena.g_cost(child), arena.f_cost(child));
        assert_eq!(first, second);
        assert_eq!(first.2, first.0 + first.1);
    }

    #[test]
    fn heuristic_terms() {
        let (env, arena) = arena(HeuristicWeights::DIRECT);
        // On the start-target line, same height: only distance terms.
        let on_line = Position::new(&env, 4.0, 0.0, 0.0);
        let h = arena.compute_heuristic(&on_line);
        assert!((h - (6.0 * 0.6 + 6.0 * 0.3)).abs() < 1e-12);

        // One cell up: manhattan grows by 1, octile by sqrt(2) - 1 over the
        // straight case, plus height and drift terms.
        let above = Position::new(&env, 4.0, 1.0, 0.0);
        let octile = above.octile_distance(arena.target());
        let expected = 7.0 * 0.6 + octile * 0.3 + 1.0 * 0.1 + 0.5;
        assert!((arena.compute_heuristic(&above) - expected).abs() < 1e-12);
    }

    #[test]
    fn perpendicular_term_penalizes_deviation() {
        let weights = HeuristicWeights::new(0.0, 0.0, 1.0, 0.0).unwrap();
        let (env, arena) = arena(weights);
        assert_eq!(arena.compute_heuristic(&Position::new(&env, 5.0, 0.0, 0.0)), 0.0);
        assert_eq!(arena.compute_heuristic(&Position::new(&env, 5.0, 0.0, 3.0)), 3.0);
    }

    #[test]
    fn retrace_walks_to_root() {
        let (env, mut arena) = arena(HeuristicWeights::NATURAL);
        let root = arena.alloc_root(Position::new(&env, 0.0, 0.0, 0.0));
        let mut tip = root;
        for x in 1..=4 {
            tip = arena.alloc_child(tip, Position::new(&env, x as f64, 0.0, 0.0));
        }
        let path = arena.retrace(tip);
        assert_eq!(path.len(), arena.depth(tip) as usize + 1);
        assert_eq!(path[0], Position::new(&env, 0.0, 0.0, 0.0));
        assert_eq!(path[4], Position::new(&env, 4.0, 0.0, 0.0));
        assert_eq!(arena.retrace(root).len(), 1);
    }
}
