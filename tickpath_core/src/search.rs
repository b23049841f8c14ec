// The search engine: entry points, the tick loop, and its terminal states.
//
// `Pathfinder` is a cheap `Clone` handle (an `Arc` inside) holding the
// configuration, world provider, search strategy, filter registry, region
// store and registered hooks. Each `find_path*` call is one independent
// search with its own node arena, frontier and visited set; nothing mutable
// is shared between searches except the internally synchronized region
// store.
//
// Per call:
// 1. Entry guard: endpoints in different environments or in the same cell
//    yield `InitiallyFailed` immediately. No filter is consulted or cleaned.
// 2. Filters are resolved against the registry (the only error path).
// 3. The search runs inline (sync mode) or on the worker pool (async mode).
//
// The loop, with `depth` starting at 1:
//
//   while frontier not empty and depth <= max_iterations:
//       run hooks(depth)
//       if aborted: return Aborted(path to last popped node)
//       pop node; remember it as the fallback
//       if max_length != 0 and node.depth > max_length: LengthLimited
//       if node is in the target cell: Found
//       strategy.tick(node); depth += 1
//   depth > max_iterations  -> MaxIterationsReached(path to fallback)
//   fallback allowed        -> Fallback(path to fallback)
//   otherwise               -> Failed(empty path)
//
// Cleanup runs from a drop guard: every filter the search consulted gets
// exactly one `cleanup` call and the search's regions are evicted, whether
// the search returned or panicked. In async mode a panic is caught at the
// job boundary, logged, and becomes `Failed`; in sync mode it propagates to
// the caller after cleanup.
//
// See also: `astar.rs` for the shipped `SearchStrategy`, `task.rs` for the
// completion handle, `worker_pool.rs` for async dispatch.
//
// **Critical constraint: abort is per search.** `abort()` flags only the
// searches in flight when it is called. A search started afterwards begins
// with a clear flag.

use crate::astar::AStar;
use crate::config::PathfinderConfig;
use crate::error::Result;
use crate::filter::{FilterRegistry, FilterStage, PathFilter, ResolvedFilters};
use crate::frontier::{Frontier, FrontierEntry};
use crate::geometry::{BlockPos, Position};
use crate::hook::{PathfinderHook, StepContext};
use crate::node::{NodeArena, NodeId};
use crate::path::Path;
use crate::provider::WorldProvider;
use crate::region::RegionStore;
use crate::result::{PathState, PathfinderResult};
use crate::task::PathfindingTask;
use crate::worker_pool::{self, WorkerPool};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static NEXT_SEARCH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one search call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchId(u64);

impl SearchId {
    pub fn next() -> Self {
        Self(NEXT_SEARCH_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Strategy seam
// ---------------------------------------------------------------------------

/// One expansion step of a concrete search algorithm.
pub trait SearchStrategy: Send + Sync {
    /// Expand `current`, pushing admitted successors onto the frontier.
    fn tick(&self, state: &mut SearchState<'_>, current: NodeId);
}

/// Everything a strategy may read or change during one search.
pub struct SearchState<'a> {
    id: SearchId,
    config: &'a PathfinderConfig,
    provider: &'a dyn WorldProvider,
    filters: &'a ResolvedFilters,
    regions: &'a RegionStore,
    arena: NodeArena,
    frontier: Frontier,
    examined: FxHashSet<BlockPos>,
}

impl<'a> SearchState<'a> {
    fn new(
        id: SearchId,
        config: &'a PathfinderConfig,
        provider: &'a dyn WorldProvider,
        filters: &'a ResolvedFilters,
        regions: &'a RegionStore,
        arena: NodeArena,
    ) -> Self {
        Self {
            id,
            config,
            provider,
            filters,
            regions,
            arena,
            frontier: Frontier::new(),
            examined: FxHashSet::default(),
        }
    }

    pub fn id(&self) -> SearchId {
        self.id
    }

    pub fn config(&self) -> &'a PathfinderConfig {
        self.config
    }

    pub fn provider(&self) -> &'a dyn WorldProvider {
        self.provider
    }

    pub fn filters(&self) -> &'a ResolvedFilters {
        self.filters
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn alloc_child(&mut self, parent: NodeId, position: Position) -> NodeId {
        self.arena.alloc_child(parent, position)
    }

    /// Push `node` keyed by its `f` cost minus `boost`.
    pub fn push(&mut self, node: NodeId, boost: f64) {
        let entry = FrontierEntry {
            node,
            cost: self.arena.f_cost(node) - boost,
            heuristic: self.arena.heuristic(node),
            depth: self.arena.depth(node),
        };
        self.frontier.push(entry);
    }

    /// Whether `block` was admitted by this search or judged in a region
    /// the search still holds.
    pub fn is_examined(&self, block: BlockPos) -> bool {
        self.examined.contains(&block) || self.regions.is_examined(self.id, block)
    }

    /// Record that `block` was judged, without admitting it.
    pub fn mark_judged(&self, block: BlockPos) {
        self.regions.mark_examined(self.id, block);
    }

    /// Admit `block`. Returns false if it was already admitted.
    pub fn admit(&mut self, block: BlockPos) -> bool {
        self.regions.mark_examined(self.id, block);
        self.examined.insert(block)
    }

    fn pop(&mut self) -> Option<FrontierEntry> {
        self.frontier.pop()
    }
}

// ---------------------------------------------------------------------------
// Abort registry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct AbortRegistry {
    active: Mutex<FxHashMap<SearchId, Arc<AtomicBool>>>,
}

impl AbortRegistry {
    fn register(self: &Arc<Self>, id: SearchId) -> AbortToken {
        let flag = Arc::new(AtomicBool::new(false));
        self.active.lock().insert(id, Arc::clone(&flag));
        AbortToken {
            registry: Arc::clone(self),
            id,
            flag,
        }
    }

    fn abort_all(&self) -> usize {
        let active = self.active.lock();
        for flag in active.values() {
            flag.store(true, Ordering::Release);
        }
        active.len()
    }
}

/// A search's abort flag, deregistered on drop.
struct AbortToken {
    registry: Arc<AbortRegistry>,
    id: SearchId,
    flag: Arc<AtomicBool>,
}

impl AbortToken {
    /// Consume a pending abort request.
    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}

impl Drop for AbortToken {
    fn drop(&mut self) {
        self.registry.active.lock().remove(&self.id);
    }
}

/// Aborts the in-flight searches of one pathfinder. Cloneable and usable
/// from any thread, including from inside a hook.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    registry: Arc<AbortRegistry>,
}

impl AbortHandle {
    /// Flag every search in flight right now. Returns how many were flagged.
    pub fn abort(&self) -> usize {
        self.registry.abort_all()
    }
}

// ---------------------------------------------------------------------------
// Pathfinder
// ---------------------------------------------------------------------------

struct Inner {
    config: PathfinderConfig,
    provider: Arc<dyn WorldProvider>,
    strategy: Arc<dyn SearchStrategy>,
    registry: FilterRegistry,
    regions: Arc<RegionStore>,
    pool: Option<Arc<WorkerPool>>,
    hooks: RwLock<Vec<Arc<dyn PathfinderHook>>>,
    aborts: Arc<AbortRegistry>,
}

pub struct PathfinderBuilder {
    config: PathfinderConfig,
    provider: Arc<dyn WorldProvider>,
    strategy: Arc<dyn SearchStrategy>,
    registry: FilterRegistry,
    regions: Arc<RegionStore>,
    pool: Option<Arc<WorkerPool>>,
}

impl PathfinderBuilder {
    pub fn new(config: PathfinderConfig, provider: Arc<dyn WorldProvider>) -> Self {
        Self {
            config,
            provider,
            strategy: Arc::new(AStar),
            registry: FilterRegistry::with_defaults(),
            regions: RegionStore::shared(),
            pool: None,
        }
    }

    /// Run async searches on this pool instead of the global one.
    pub fn with_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SearchStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_registry(mut self, registry: FilterRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_region_store(mut self, regions: Arc<RegionStore>) -> Self {
        self.regions = regions;
        self
    }

    pub fn build(self) -> Result<Pathfinder> {
        self.config.validate()?;
        Ok(Pathfinder {
            inner: Arc::new(Inner {
                config: self.config,
                provider: self.provider,
                strategy: self.strategy,
                registry: self.registry,
                regions: self.regions,
                pool: self.pool,
                hooks: RwLock::new(Vec::new()),
                aborts: Arc::new(AbortRegistry::default()),
            }),
        })
    }
}

#[derive(Clone)]
pub struct Pathfinder {
    inner: Arc<Inner>,
}

/// Owned inputs of one search, movable onto a worker thread.
struct SearchJob {
    id: SearchId,
    start: Position,
    target: Position,
    filters: ResolvedFilters,
    hooks: Vec<Arc<dyn PathfinderHook>>,
    abort: AbortToken,
}

impl Pathfinder {
    /// A* over `provider` with the default registry and the shared region
    /// store.
    pub fn new(config: PathfinderConfig, provider: Arc<dyn WorldProvider>) -> Result<Self> {
        PathfinderBuilder::new(config, provider).build()
    }

    pub fn builder(config: PathfinderConfig, provider: Arc<dyn WorldProvider>) -> PathfinderBuilder {
        PathfinderBuilder::new(config, provider)
    }

    pub fn config(&self) -> &PathfinderConfig {
        &self.inner.config
    }

    pub fn find_path(
        &self,
        start: &Position,
        target: &Position,
        shared_filters: &[Arc<dyn PathFilter>],
    ) -> Result<PathfindingTask> {
        self.find_path_staged(start, target, shared_filters, &[])
    }

    pub fn find_path_staged(
        &self,
        start: &Position,
        target: &Position,
        shared_filters: &[Arc<dyn PathFilter>],
        stages: &[FilterStage],
    ) -> Result<PathfindingTask> {
        if !start.same_environment(target) || start.is_in_same_block(target) {
            tracing::debug!(%start, %target, "search skipped: endpoints share a cell or environment differs");
            let result = PathfinderResult::new(
                PathState::InitiallyFailed,
                Path::empty(start.clone(), target.clone()),
            );
            return Ok(PathfindingTask::ready(start, target, result));
        }

        let filters = self.inner.registry.resolve(shared_filters, stages)?;
        let id = SearchId::next();
        let job = SearchJob {
            id,
            start: start.clone(),
            target: target.clone(),
            filters,
            hooks: self.inner.hooks.read().clone(),
            abort: self.inner.aborts.register(id),
        };

        if !self.inner.config.async_mode {
            return Ok(PathfindingTask::ready(start, target, self.execute(job)));
        }

        let pool = match &self.inner.pool {
            Some(pool) => Arc::clone(pool),
            None => worker_pool::global()?,
        };
        let (task, completion) = PathfindingTask::pending(start, target);
        let this = self.clone();
        let (fail_start, fail_target) = (start.clone(), target.clone());
        pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| this.execute(job)));
            let result = outcome.unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::warn!(search = id.get(), "async search panicked");
                tracing::error!(search = id.get(), panic = %message, "search failed");
                PathfinderResult::new(PathState::Failed, Path::empty(fail_start, fail_target))
            });
            completion.complete(result);
        });
        Ok(task)
    }

    /// Flag every search of this pathfinder that is currently in flight.
    pub fn abort(&self) -> usize {
        self.inner.aborts.abort_all()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            registry: Arc::clone(&self.inner.aborts),
        }
    }

    /// Hooks registered here apply to searches started afterwards.
    pub fn register_hook(&self, hook: impl PathfinderHook + 'static) {
        self.inner.hooks.write().push(Arc::new(hook));
    }

    fn execute(&self, job: SearchJob) -> PathfinderResult {
        let _cleanup = CleanupGuard {
            filters: &job.filters,
            regions: &self.inner.regions,
            id: job.id,
        };
        tracing::debug!(
            search = job.id.get(),
            start = %job.start,
            target = %job.target,
            shared = job.filters.shared_count(),
            stages = job.filters.stage_count(),
            "search started"
        );
        let (result, iterations) = self.run(&job);
        tracing::debug!(
            search = job.id.get(),
            state = %result.state(),
            iterations,
            length = result.path().len(),
            "search finished"
        );
        result
    }

    fn run(&self, job: &SearchJob) -> (PathfinderResult, u32) {
        let inner = &*self.inner;
        let config = &inner.config;
        let start = job.start.floor();
        let target = job.target.floor();

        let arena = NodeArena::new(start.clone(), target.clone(), config.heuristic_weights);
        let mut state = SearchState::new(
            job.id,
            config,
            inner.provider.as_ref(),
            &job.filters,
            &inner.regions,
            arena,
        );
        let root = state.arena.alloc_root(start.clone());
        state.admit(start.block());
        state.push(root, 0.0);

        let mut depth: u32 = 1;
        let mut fallback = root;
        while !state.frontier.is_empty() && depth <= config.max_iterations {
            let step = StepContext { depth };
            for hook in &job.hooks {
                hook.on_step(&step);
            }

            if job.abort.take() {
                return (retraced(&state, PathState::Aborted, fallback), depth);
            }

            let Some(entry) = state.pop() else { break };
            let current = entry.node;
            fallback = current;

            if config.max_length != 0 && state.arena.depth(current) > config.max_length {
                return (retraced(&state, PathState::LengthLimited, current), depth);
            }
            if state.arena.position(current).is_in_same_block(&target) {
                return (retraced(&state, PathState::Found, current), depth);
            }

            inner.strategy.tick(&mut state, current);
            depth += 1;
        }

        let result = if depth > config.max_iterations {
            retraced(&state, PathState::MaxIterationsReached, fallback)
        } else if config.allowing_fallback {
            retraced(&state, PathState::Fallback, fallback)
        } else {
            PathfinderResult::new(
                PathState::Failed,
                Path::empty(job.start.clone(), job.target.clone()),
            )
        };
        (result, depth)
    }
}

fn retraced(state: &SearchState<'_>, path_state: PathState, terminal: NodeId) -> PathfinderResult {
    let positions = state.arena.retrace(terminal);
    let start = state.arena.start().clone();
    let end = state.arena.position(terminal).clone();
    PathfinderResult::new(path_state, Path::new(start, end, positions))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

struct CleanupGuard<'a> {
    filters: &'a ResolvedFilters,
    regions: &'a RegionStore,
    id: SearchId,
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        self.filters.cleanup();
        self.regions.evict_search(self.id);
    }
}
