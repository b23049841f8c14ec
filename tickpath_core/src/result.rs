// Terminal search outcome.
//
// Running out of iterations, running dry, or being aborted are all ordinary
// outcomes of a search, not errors, so each gets its own `PathState` and
// always comes with a `Path` (possibly empty).

use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathState {
    /// Reached the target cell.
    Found,
    /// Frontier exhausted and fallback disabled. The path is empty.
    Failed,
    /// Stopped by `abort()`. The path leads to the last expanded node.
    Aborted,
    /// Frontier exhausted; the path leads to the last expanded node.
    Fallback,
    /// A node exceeded the configured maximum length.
    LengthLimited,
    /// The iteration budget ran out.
    MaxIterationsReached,
    /// The search never started: the endpoints share a cell or live in
    /// different environments.
    InitiallyFailed,
}

impl fmt::Display for PathState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Found => "FOUND",
            Self::Failed => "FAILED",
            Self::Aborted => "ABORTED",
            Self::Fallback => "FALLBACK",
            Self::LengthLimited => "LENGTH_LIMITED",
            Self::MaxIterationsReached => "MAX_ITERATIONS_REACHED",
            Self::InitiallyFailed => "INITIALLY_FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathfinderResult {
    state: PathState,
    path: Path,
}

impl PathfinderResult {
    pub fn new(state: PathState, path: Path) -> Self {
        Self { state, path }
    }

    pub fn state(&self) -> PathState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> Path {
        self.path
    }

    pub fn is_successful(&self) -> bool {
        self.state == PathState::Found
    }

    /// Failed outright or gave up on a budget.
    pub fn has_failed(&self) -> bool {
        matches!(
            self.state,
            PathState::Failed | PathState::LengthLimited | PathState::MaxIterationsReached
        )
    }

    pub fn has_fallen_back(&self) -> bool {
        self.state == PathState::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Environment, EnvironmentId, Position};

    fn result(state: PathState) -> PathfinderResult {
        let env = Environment::new(EnvironmentId(0), "test", -64, 320).shared();
        let p = Position::new(&env, 0.0, 0.0, 0.0);
        PathfinderResult::new(state, Path::empty(p.clone(), p))
    }

    #[test]
    fn state_helpers() {
        assert!(result(PathState::Found).is_successful());
        assert!(!result(PathState::Fallback).is_successful());
        for state in [
            PathState::Failed,
            PathState::LengthLimited,
            PathState::MaxIterationsReached,
        ] {
            assert!(result(state).has_failed(), "{state}");
        }
        assert!(!result(PathState::Aborted).has_failed());
        assert!(!result(PathState::InitiallyFailed).has_failed());
        assert!(result(PathState::Fallback).has_fallen_back());
    }

    #[test]
    fn state_serializes_in_screaming_case() {
        let json = serde_json::to_string(&PathState::MaxIterationsReached).unwrap();
        assert_eq!(json, "\"MAX_ITERATIONS_REACHED\"");
        assert_eq!(PathState::MaxIterationsReached.to_string(), "MAX_ITERATIONS_REACHED");
    }
}
