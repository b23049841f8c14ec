// Filter dependency resolution and per-candidate evaluation.
//
// `FilterRegistry` maps a `FilterKey` to a default factory. At search setup,
// `FilterRegistry::resolve` flattens the shared filters and every stage's
// filters into one slot table (one slot per distinct filter instance) and
// turns each declared dependency into a slot index: an active filter with
// the same key if there is one, otherwise a freshly built default instance
// (whose own dependencies are resolved the same way). A dependency that can
// be satisfied neither way is a usage error reported before the search runs.
//
// `Evaluation` evaluates slots for one candidate position. Each slot is
// evaluated at most once per candidate; a slot that is reached again while
// it is still being evaluated (a dependency cycle) counts as satisfied.
// A slot whose dependency fails is itself Fail without being consulted.

use super::{FilterKey, FilterOutcome, FilterStage, PathFilter, PathValidationContext};
use super::builtin::{PassableFilter, SolidGroundFilter};
use crate::error::{PathfindingError, Result};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Builds a default instance of a filter.
pub type FilterFactory = Arc<dyn Fn() -> Arc<dyn PathFilter> + Send + Sync>;

#[derive(Clone, Default)]
pub struct FilterRegistry {
    factories: FxHashMap<FilterKey, FilterFactory>,
}

impl FilterRegistry {
    /// An empty registry. Every dependency must then be satisfied by an
    /// active filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that can build the parameterless built-in filters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PassableFilter::KEY, || Arc::new(PassableFilter));
        registry.register(SolidGroundFilter::KEY, || Arc::new(SolidGroundFilter));
        registry
    }

    pub fn register<F>(&mut self, key: FilterKey, factory: F)
    where
        F: Fn() -> Arc<dyn PathFilter> + Send + Sync + 'static,
    {
        self.factories.insert(key, Arc::new(factory));
    }

    pub fn contains(&self, key: FilterKey) -> bool {
        self.factories.contains_key(&key)
    }

    /// Build the slot table for one search.
    pub fn resolve(
        &self,
        shared: &[Arc<dyn PathFilter>],
        stages: &[FilterStage],
    ) -> Result<ResolvedFilters> {
        let mut table = SlotTable::default();

        let shared_slots: Vec<usize> = shared.iter().map(|f| table.slot_for(f)).collect();
        let stage_slots: Vec<Vec<usize>> = stages
            .iter()
            .map(|stage| {
                stage
                    .filters()
                    .iter()
                    .map(|f| table.slot_for(f))
                    .collect::<Vec<_>>()
            })
            .collect();

        // Resolve dependencies with a worklist; defaults appended to the
        // table are picked up by the same loop.
        let mut deps: Vec<SmallVec<[usize; 2]>> = Vec::new();
        let mut next = 0;
        while next < table.slots.len() {
            let filter = Arc::clone(&table.slots[next]);
            let mut resolved = SmallVec::new();
            for &dependency in filter.dependencies() {
                let existing = table.by_key.get(&dependency).copied();
                let slot = match existing {
                    Some(slot) => slot,
                    None => {
                        let factory = self.factories.get(&dependency).ok_or(
                            PathfindingError::UnresolvedDependency {
                                filter: filter.key(),
                                dependency,
                            },
                        )?;
                        table.slot_for(&factory())
                    }
                };
                resolved.push(slot);
            }
            deps.push(resolved);
            next += 1;
        }

        Ok(ResolvedFilters {
            slots: table.slots,
            deps,
            shared: shared_slots,
            stages: stage_slots,
        })
    }
}

#[derive(Default)]
struct SlotTable {
    slots: Vec<Arc<dyn PathFilter>>,
    by_key: FxHashMap<FilterKey, usize>,
}

impl SlotTable {
    fn slot_for(&mut self, filter: &Arc<dyn PathFilter>) -> usize {
        if let Some(slot) = self.slots.iter().position(|s| Arc::ptr_eq(s, filter)) {
            return slot;
        }
        let slot = self.slots.len();
        self.slots.push(Arc::clone(filter));
        self.by_key.entry(filter.key()).or_insert(slot);
        slot
    }
}

/// The filters of one search, flattened into slots with resolved
/// dependencies.
pub struct ResolvedFilters {
    slots: Vec<Arc<dyn PathFilter>>,
    deps: Vec<SmallVec<[usize; 2]>>,
    shared: Vec<usize>,
    stages: Vec<Vec<usize>>,
}

impl ResolvedFilters {
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn shared_count(&self) -> usize {
        self.shared.len()
    }

    /// Every distinct filter instance the search consults, including
    /// defaults built for dependencies.
    pub fn filters(&self) -> &[Arc<dyn PathFilter>] {
        &self.slots
    }

    pub fn evaluate<'r, 'c>(&'r self, ctx: PathValidationContext<'c>) -> Evaluation<'r, 'c> {
        Evaluation {
            resolved: self,
            ctx,
            cache: std::iter::repeat_with(|| SlotState::Pending)
                .take(self.slots.len())
                .collect(),
        }
    }

    /// Invoke `cleanup` on every slot exactly once.
    pub fn cleanup(&self) {
        for filter in &self.slots {
            filter.cleanup();
        }
    }
}

#[derive(Clone)]
enum SlotState {
    Pending,
    InProgress,
    Done(FilterOutcome),
}

/// Memoized filter evaluation for a single candidate.
pub struct Evaluation<'r, 'c> {
    resolved: &'r ResolvedFilters,
    ctx: PathValidationContext<'c>,
    cache: SmallVec<[SlotState; 8]>,
}

impl Evaluation<'_, '_> {
    pub fn slot(&mut self, slot: usize) -> FilterOutcome {
        match &self.cache[slot] {
            SlotState::Done(outcome) => return outcome.clone(),
            SlotState::InProgress => return FilterOutcome::Pass,
            SlotState::Pending => {}
        }
        self.cache[slot] = SlotState::InProgress;

        let resolved = self.resolved;
        for &dependency in &resolved.deps[slot] {
            if self.slot(dependency).is_fail() {
                self.cache[slot] = SlotState::Done(FilterOutcome::Fail);
                return FilterOutcome::Fail;
            }
        }

        let outcome = resolved.slots[slot].assess(&self.ctx);
        self.cache[slot] = SlotState::Done(outcome.clone());
        outcome
    }

    /// AND over the shared filters.
    pub fn shared(&mut self) -> FilterOutcome {
        let resolved = self.resolved;
        FilterOutcome::all(resolved.shared.iter().map(|&slot| self.slot(slot)))
    }

    /// OR over the filters of stage `index`.
    pub fn stage(&mut self, index: usize) -> FilterOutcome {
        let resolved = self.resolved;
        FilterOutcome::any(resolved.stages[index].iter().map(|&slot| self.slot(slot)))
    }

    /// Outcome of every stage, in order.
    pub fn stages(&mut self) -> SmallVec<[FilterOutcome; 4]> {
        (0..self.resolved.stage_count())
            .map(|index| self.stage(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Environment, EnvironmentId, Position};
    use crate::provider::{CellInfo, Material};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        key: FilterKey,
        deps: &'static [FilterKey],
        result: bool,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(key: &'static str, deps: &'static [FilterKey], result: bool) -> Arc<Self> {
            Arc::new(Self {
                key: FilterKey(key),
                deps,
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PathFilter for Counting {
        fn filter(&self, _ctx: &PathValidationContext<'_>) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
        }

        fn key(&self) -> FilterKey {
            self.key
        }

        fn dependencies(&self) -> &'static [FilterKey] {
            self.deps
        }
    }

    fn as_dyn(filter: &Arc<Counting>) -> Arc<dyn PathFilter> {
        filter.clone()
    }

    fn open_world(_: &Position) -> Option<CellInfo> {
        Some(CellInfo::open(Material(0)))
    }

    fn with_ctx<R>(f: impl FnOnce(PathValidationContext<'_>) -> R) -> R {
        let env = Environment::new(EnvironmentId(0), "test", -64, 320).shared();
        let here = Position::new(&env, 1.0, 0.0, 0.0);
        let start = Position::new(&env, 0.0, 0.0, 0.0);
        let target = Position::new(&env, 5.0, 0.0, 0.0);
        let provider = open_world;
        f(PathValidationContext {
            position: &here,
            parent: Some(&start),
            start: &start,
            target: &target,
            provider: &provider,
        })
    }

    #[test]
    fn dependency_on_active_filter_reuses_instance() {
        let base = Counting::new("base", &[], true);
        let dependent = Counting::new("dependent", &[FilterKey("base")], true);
        let shared: Vec<Arc<dyn PathFilter>> = vec![as_dyn(&dependent), as_dyn(&base)];
        let resolved = FilterRegistry::new().resolve(&shared, &[]).unwrap();
        assert_eq!(resolved.filters().len(), 2);

        with_ctx(|ctx| {
            let mut eval = resolved.evaluate(ctx);
            assert_eq!(eval.shared(), FilterOutcome::Pass);
        });
        // Evaluated once as a dependency, then served from the cache.
        assert_eq!(base.calls(), 1);
        assert_eq!(dependent.calls(), 1);
    }

    #[test]
    fn missing_dependency_uses_registered_default() {
        let dependent = Counting::new("dependent", &[PassableFilter::KEY], true);
        let shared = vec![as_dyn(&dependent)];
        let resolved = FilterRegistry::with_defaults().resolve(&shared, &[]).unwrap();
        assert_eq!(resolved.filters().len(), 2);
        assert_eq!(resolved.filters()[1].key(), PassableFilter::KEY);
    }

    #[test]
    fn unresolvable_dependency_is_an_error() {
        let dependent = Counting::new("dependent", &[FilterKey("nowhere")], true);
        let shared = vec![as_dyn(&dependent)];
        let err = FilterRegistry::new().resolve(&shared, &[]).err().unwrap();
        assert!(matches!(
            err,
            PathfindingError::UnresolvedDependency {
                filter: FilterKey("dependent"),
                dependency: FilterKey("nowhere"),
            }
        ));
    }

    #[test]
    fn failing_dependency_fails_dependent_without_consulting_it() {
        let base = Counting::new("base", &[], false);
        let dependent = Counting::new("dependent", &[FilterKey("base")], true);
        let shared: Vec<Arc<dyn PathFilter>> = vec![as_dyn(&base), as_dyn(&dependent)];
        let resolved = FilterRegistry::new().resolve(&shared, &[]).unwrap();
        with_ctx(|ctx| {
            // Evaluate the dependent slot directly.
            assert_eq!(resolved.evaluate(ctx).slot(1), FilterOutcome::Fail);
        });
        assert_eq!(base.calls(), 1);
        assert_eq!(dependent.calls(), 0);
    }

    #[test]
    fn dependency_cycle_terminates() {
        let a = Counting::new("a", &[FilterKey("b")], true);
        let b = Counting::new("b", &[FilterKey("a")], true);
        let shared: Vec<Arc<dyn PathFilter>> = vec![as_dyn(&a), as_dyn(&b)];
        let resolved = FilterRegistry::new().resolve(&shared, &[]).unwrap();
        with_ctx(|ctx| {
            assert_eq!(resolved.evaluate(ctx).shared(), FilterOutcome::Pass);
        });
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[test]
    fn same_instance_in_shared_and_stage_gets_one_slot() {
        let f = Counting::new("f", &[], true);
        let shared: Vec<Arc<dyn PathFilter>> = vec![as_dyn(&f)];
        let stages = vec![FilterStage::new(vec![as_dyn(&f)])];
        let resolved = FilterRegistry::new().resolve(&shared, &stages).unwrap();
        assert_eq!(resolved.filters().len(), 1);
        with_ctx(|ctx| {
            let mut eval = resolved.evaluate(ctx);
            assert_eq!(eval.shared(), FilterOutcome::Pass);
            assert_eq!(eval.stage(0), FilterOutcome::Pass);
        });
        assert_eq!(f.calls(), 1);
    }

    #[test]
    fn stages_evaluate_independently() {
        let yes = Counting::new("yes", &[], true);
        let no = Counting::new("no", &[], false);
        let stages = vec![
            FilterStage::new(vec![as_dyn(&no), as_dyn(&yes)]),
            FilterStage::new(vec![as_dyn(&no)]),
        ];
        let resolved = FilterRegistry::new().resolve(&[], &stages).unwrap();
        assert_eq!(resolved.stage_count(), 2);
        with_ctx(|ctx| {
            let outcomes = resolved.evaluate(ctx).stages();
            assert_eq!(outcomes.as_slice(), &[FilterOutcome::Pass, FilterOutcome::Fail]);
        });
    }
}
