// Error type for every recoverable usage failure in the crate.
//
// Search non-success (unreachable target, exhausted budget, abort) is never
// an error here: it is a `PathState` on the `PathfinderResult`. What lands in
// `PathfindingError` is caller misuse detected synchronously (bad epsilon,
// bad weights, a filter dependency nobody can satisfy) and the fatal
// double-initialization of process-wide state.

use crate::filter::FilterKey;

#[derive(Debug, thiserror::Error)]
pub enum PathfindingError {
    #[error("epsilon must be in (0, 1], got {epsilon}")]
    InvalidEpsilon { epsilon: f64 },

    #[error("interpolation resolution must be positive and finite, got {resolution}")]
    InvalidResolution { resolution: f64 },

    #[error("heuristic weight `{name}` must be non-negative and finite, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("failed to parse pathfinder configuration")]
    ConfigParse(#[from] serde_json::Error),

    #[error("filter `{filter}` depends on `{dependency}`, which is neither active nor registered")]
    UnresolvedDependency {
        filter: FilterKey,
        dependency: FilterKey,
    },

    #[error("the process-wide worker pool is already initialized")]
    AlreadyInitialized,

    #[error("failed to build worker pool: {0}")]
    PoolBuild(String),
}

pub type Result<T, E = PathfindingError> = std::result::Result<T, E>;
