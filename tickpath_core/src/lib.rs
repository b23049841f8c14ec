// Incremental, interruptible 3D A* pathfinding (tickpath_core).
//
// This crate contains the whole search: the cost model, the tick-wise search
// loop with its terminal states, the diagonal-aware A* expansion, filter
// evaluation, regional deduplication, and path assembly. It knows nothing
// about any concrete world representation; every cell it looks at comes
// through the `WorldProvider` capability.
//
// Module overview:
// - `geometry.rs`:    Environment, Position, BlockPos, Vector and distances.
// - `node.rs`:        NodeArena / NodeId with lazily memoized h, g and f.
// - `frontier.rs`:    Min-heap open set keyed by (cost, h, depth).
// - `offset.rs`:      Straight, diagonal and merged neighbor sets.
// - `provider.rs`:    WorldProvider capability, CellInfo, Material.
// - `filter/`:        PathFilter, FilterStage, outcome aggregation, dependency registry, built-ins.
// - `bloom.rs`:       Bloom filter used by region dedup.
// - `region.rs`:      Process-wide expiring region store for visited-cell dedup.
// - `search.rs`:      Pathfinder, SearchStrategy seam, the search loop, abort handling.
// - `astar.rs`:       The shipped A* expansion step.
// - `task.rs`:        PathfindingTask completion handle.
// - `worker_pool.rs`: rayon-backed pool for async searches, process-wide lifecycle.
// - `path.rs`:        Path and its transforms (interpolate, simplify, trim, join).
// - `result.rs`:      PathState and PathfinderResult.
// - `hook.rs`:        Per-iteration step hooks.
// - `config.rs`:      PathfinderConfig and HeuristicWeights, JSON-loadable.
// - `error.rs`:       PathfindingError.
//
// The companion crate `tickpath_grid` provides voxel-grid and chunked-world
// providers.
//
// **Critical constraint: one search, one thread.** A search never spans
// threads internally. Only dispatch differs between sync and async mode.

pub mod astar;
pub mod bloom;
pub mod config;
pub mod error;
pub mod filter;
pub mod frontier;
pub mod geometry;
pub mod hook;
pub mod node;
pub mod offset;
pub mod path;
pub mod provider;
pub mod region;
pub mod result;
pub mod search;
pub mod task;
pub mod worker_pool;

pub use config::{HeuristicWeights, PathfinderConfig};
pub use error::PathfindingError;
pub use filter::{FilterOutcome, FilterStage, PathFilter, PathValidationContext};
pub use geometry::{BlockPos, Environment, EnvironmentId, Position, Vector};
pub use hook::{PathfinderHook, StepContext};
pub use path::Path;
pub use provider::{CellInfo, Material, WorldProvider};
pub use result::{PathState, PathfinderResult};
pub use search::{AbortHandle, Pathfinder, PathfinderBuilder, SearchStrategy};
pub use task::PathfindingTask;
