// Filter framework: node-admission predicates and their aggregation.
//
// A `PathFilter` inspects one candidate cell through a `PathValidationContext`
// and reports a `FilterOutcome`. Outcomes combine two ways:
//
// - Shared filters are ANDed (`FilterOutcome::all`): any Fail rejects, a
//   Redirect is carried forward, otherwise Pass beats Warning.
// - A `FilterStage` is ORed (`FilterOutcome::any`): the first Pass or
//   Redirect wins, otherwise Warning beats Fail.
//
// The search ANDs stages against each other (every stage must not fail) and
// uses the per-stage outcomes in order for priority boosting. `Redirect`
// carries a substitute position the search should also explore; it counts as
// a pass everywhere.
//
// Filters may declare dependencies on other filters by `FilterKey`. These are
// resolved once per search by the `FilterRegistry` (see `registry.rs`), never
// per node.
//
// See also: `builtin.rs` for the shipped filters, `astar.rs` for where
// outcomes are consumed.
//
// **Critical constraint: filters are shared.** The same filter instance may
// take part in several concurrent searches, so `filter`/`assess` must not
// mutate unsynchronized state and `cleanup` must be idempotent or internally
// synchronized.

mod builtin;
mod registry;

pub use builtin::{AvoidMaterialsFilter, PassableFilter, SolidGroundFilter};
pub use registry::{Evaluation, FilterFactory, FilterRegistry, ResolvedFilters};

use crate::geometry::Position;
use crate::provider::{CellInfo, WorldProvider};
use std::fmt;
use std::sync::Arc;

/// Stable identity of a filter type, used for dependency lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterKey(pub &'static str);

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Everything a filter may look at when judging a candidate.
#[derive(Clone, Copy)]
pub struct PathValidationContext<'a> {
    /// The candidate cell.
    pub position: &'a Position,
    /// The cell the candidate would be reached from. `None` only for the
    /// root.
    pub parent: Option<&'a Position>,
    pub start: &'a Position,
    pub target: &'a Position,
    pub provider: &'a dyn WorldProvider,
}

impl<'a> PathValidationContext<'a> {
    pub fn probe(&self, position: &Position) -> Option<CellInfo> {
        self.provider.probe(position)
    }

    /// Probe the candidate cell itself.
    pub fn probe_here(&self) -> Option<CellInfo> {
        self.provider.probe(self.position)
    }

    /// The same context looking at a different candidate.
    pub fn at(&self, position: &'a Position) -> Self {
        Self { position, ..*self }
    }
}

impl fmt::Debug for PathValidationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathValidationContext")
            .field("position", self.position)
            .field("parent", &self.parent)
            .field("start", self.start)
            .field("target", self.target)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum FilterOutcome {
    /// Admit and boost strongly.
    Pass,
    /// Admit with a partial boost.
    Warning,
    /// Reject.
    Fail,
    /// Admit, and also explore the given position.
    Redirect(Position),
}

impl FilterOutcome {
    pub fn from_bool(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail)
    }

    /// Pass or Redirect.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass | Self::Redirect(_))
    }

    pub fn redirect(&self) -> Option<&Position> {
        match self {
            Self::Redirect(position) => Some(position),
            _ => None,
        }
    }

    /// AND-aggregation. Stops at the first Fail. Empty input is Pass.
    pub fn all(outcomes: impl IntoIterator<Item = Self>) -> Self {
        let mut any_pass = false;
        let mut any_warning = false;
        let mut redirect = None;
        for outcome in outcomes {
            match outcome {
                Self::Fail => return Self::Fail,
                Self::Pass => any_pass = true,
                Self::Warning => any_warning = true,
                Self::Redirect(position) => {
                    if redirect.is_none() {
                        redirect = Some(position);
                    }
                }
            }
        }
        match redirect {
            Some(position) => Self::Redirect(position),
            None if any_pass || !any_warning => Self::Pass,
            None => Self::Warning,
        }
    }

    /// OR-aggregation. Stops at the first Pass or Redirect. Empty input is
    /// Pass.
    pub fn any(outcomes: impl IntoIterator<Item = Self>) -> Self {
        let mut seen = false;
        let mut any_warning = false;
        for outcome in outcomes {
            seen = true;
            match outcome {
                Self::Pass | Self::Redirect(_) => return outcome,
                Self::Warning => any_warning = true,
                Self::Fail => {}
            }
        }
        if !seen {
            Self::Pass
        } else if any_warning {
            Self::Warning
        } else {
            Self::Fail
        }
    }
}

// ---------------------------------------------------------------------------
// Filter trait
// ---------------------------------------------------------------------------

pub trait PathFilter: Send + Sync {
    /// Whether the candidate is admissible.
    fn filter(&self, ctx: &PathValidationContext<'_>) -> bool;

    /// Graded judgement. Override to report Warning intensity or a Redirect.
    fn assess(&self, ctx: &PathValidationContext<'_>) -> FilterOutcome {
        FilterOutcome::from_bool(self.filter(ctx))
    }

    /// Called once after every search this filter took part in.
    fn cleanup(&self) {}

    fn key(&self) -> FilterKey {
        FilterKey(std::any::type_name::<Self>())
    }

    /// Filters that must pass before this one is consulted.
    fn dependencies(&self) -> &'static [FilterKey] {
        &[]
    }
}

/// An OR-group of filters.
#[derive(Clone, Default)]
pub struct FilterStage {
    filters: Vec<Arc<dyn PathFilter>>,
}

impl FilterStage {
    pub fn new(filters: Vec<Arc<dyn PathFilter>>) -> Self {
        Self { filters }
    }

    pub fn with(mut self, filter: Arc<dyn PathFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[Arc<dyn PathFilter>] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.key()))
            .finish()
    }
}
