// The shipped search strategy: diagonal-aware A* expansion.
//
// For every offset in the configured set, the candidate cell next to the
// current node goes through, in order:
//
//   a. dedup: skip cells this search already judged or admitted
//   b. vertical bounds: strictly between the environment's min and max height
//   c. shared filters: must not fail
//   d. stages: no stage may fail
//   e. diagonal reachability (moves that change both x and z)
//
// Cells rejected by b-d are marked judged so no other parent pays for them
// again. Cells rejected only by e are not marked: they may still be reached
// along an axis.
//
// A diagonal move is reachable when at least one of the two corner cells it
// cuts past (same height as the current node) passes the shared filters and
// every stage, and, if the move also changes height, that corner shifted to
// the candidate's height is known and traversable.
//
// Admitted candidates become children of the current node. With
// prioritizing on, the stage outcomes already computed in (d) adjust the
// frontier cost: the first stage that passes takes 80% of the candidate's
// heuristic off its cost and stops the scan; a Warning takes 40% but a later
// Pass may still replace it.
//
// A Redirect outcome (from a shared filter or a stage) pointing at a
// different cell spawns an extra node there, parented to the admitted
// candidate one level deeper, pushed at its plain `f` cost.
//
// See also: `search.rs` for the loop driving `tick`, `filter/` for the
// outcome model.

use crate::filter::{FilterOutcome, PathValidationContext};
use crate::geometry::{BlockPos, Position};
use crate::node::NodeId;
use crate::offset::{Offset, OffsetSet};
use crate::search::{SearchState, SearchStrategy};
use smallvec::SmallVec;

const PASS_BOOST: f64 = 0.8;
const WARNING_BOOST: f64 = PASS_BOOST / 2.0;

#[derive(Clone, Copy, Debug, Default)]
pub struct AStar;

impl SearchStrategy for AStar {
    fn tick(&self, state: &mut SearchState<'_>, current: NodeId) {
        let config = state.config();
        let offsets = OffsetSet::for_diagonal(config.allowing_diagonal).offsets();
        let from = state.arena().position(current).clone();
        let start = state.arena().start().clone();
        let target = state.arena().target().clone();

        for &offset in offsets {
            let candidate = from.add(offset.vector());
            let block = candidate.block();
            if state.is_examined(block) {
                continue;
            }

            let Some(outcomes) = judge(state, &candidate, &from, &start, &target) else {
                state.mark_judged(block);
                continue;
            };

            if config.allowing_diagonal
                && offset.is_horizontal_diagonal()
                && !is_reachable(state, &from, offset, &start, &target)
            {
                continue;
            }

            if !state.admit(block) {
                continue;
            }
            let child = state.alloc_child(current, candidate);
            let boost = if config.prioritizing {
                boost_fraction(&outcomes.stages) * state.arena().heuristic(child)
            } else {
                0.0
            };
            state.push(child, boost);

            for redirect in outcomes.redirects() {
                spawn_redirect(state, child, block, redirect);
            }
        }
    }
}

/// Outcomes of a candidate that passed bounds, shared filters and stages.
struct Judgement {
    shared: FilterOutcome,
    stages: SmallVec<[FilterOutcome; 4]>,
}

impl Judgement {
    fn redirects(&self) -> impl Iterator<Item = &Position> {
        std::iter::once(&self.shared)
            .chain(self.stages.iter())
            .filter_map(FilterOutcome::redirect)
    }
}

/// Bounds, shared filters and stages. `None` if any rejects.
fn judge(
    state: &SearchState<'_>,
    candidate: &Position,
    parent: &Position,
    start: &Position,
    target: &Position,
) -> Option<Judgement> {
    if !candidate.environment().contains_height(candidate.block_y()) {
        return None;
    }

    let ctx = PathValidationContext {
        position: candidate,
        parent: Some(parent),
        start,
        target,
        provider: state.provider(),
    };
    let mut eval = state.filters().evaluate(ctx);
    let shared = eval.shared();
    if shared.is_fail() {
        return None;
    }
    let stages = eval.stages();
    if stages.iter().any(FilterOutcome::is_fail) {
        return None;
    }
    Some(Judgement { shared, stages })
}

fn is_reachable(
    state: &SearchState<'_>,
    from: &Position,
    offset: Offset,
    start: &Position,
    target: &Position,
) -> bool {
    let corners = [
        from.add_xyz(f64::from(offset.dx), 0.0, 0.0),
        from.add_xyz(0.0, 0.0, f64::from(offset.dz)),
    ];
    corners.iter().any(|corner| {
        if judge(state, corner, from, start, target).is_none() {
            return false;
        }
        if offset.dy == 0 {
            return true;
        }
        let shifted = corner.add_xyz(0.0, f64::from(offset.dy), 0.0);
        state
            .provider()
            .probe(&shifted)
            .is_some_and(|cell| cell.traversable)
    })
}

/// Fraction of the heuristic to subtract from a candidate's cost.
fn boost_fraction(stages: &[FilterOutcome]) -> f64 {
    let mut fraction = 0.0;
    for outcome in stages {
        if outcome.is_pass() {
            return PASS_BOOST;
        }
        if matches!(outcome, FilterOutcome::Warning) {
            fraction = WARNING_BOOST;
        }
    }
    fraction
}

fn spawn_redirect(state: &mut SearchState<'_>, parent: NodeId, origin: BlockPos, redirect: &Position) {
    let position = redirect.floor();
    let block = position.block();
    if block == origin || !position.same_environment(state.arena().position(parent)) {
        return;
    }
    if !state.admit(block) {
        return;
    }
    tracing::trace!(search = state.id().get(), redirect = %position, "spawned redirect node");
    let node = state.alloc_child(parent, position);
    state.push(node, 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Environment, EnvironmentId};

    #[test]
    fn boost_first_pass_wins() {
        use FilterOutcome::*;
        assert_eq!(boost_fraction(&[]), 0.0);
        assert_eq!(boost_fraction(&[Fail]), 0.0);
        assert_eq!(boost_fraction(&[Warning]), WARNING_BOOST);
        assert_eq!(boost_fraction(&[Warning, Pass]), PASS_BOOST);
        assert_eq!(boost_fraction(&[Pass, Warning]), PASS_BOOST);
        let env = Environment::new(EnvironmentId(0), "test", -64, 320).shared();
        let redirect = Redirect(Position::new(&env, 1.0, 0.0, 0.0));
        assert_eq!(boost_fraction(&[Warning, redirect]), PASS_BOOST);
    }
}
