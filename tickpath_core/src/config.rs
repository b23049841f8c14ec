// Data-driven pathfinder configuration.
//
// Every tunable search parameter lives in `PathfinderConfig`, a plain struct
// with public fields that can be built in code or loaded from JSON. Missing
// JSON fields fall back to their defaults (`#[serde(default)]`), so a host
// config file only needs to name what it overrides.
//
// `HeuristicWeights` groups the four cost-term weights of the node heuristic.
// Two named presets exist: `NATURAL` favors straight, low-drift paths;
// `DIRECT` leans on raw distance and ignores straightness.
//
// See also: `node.rs` for the heuristic these weights feed, `search.rs` which
// reads the config once per search, `region.rs` for deduplication tuning
// (kept on the store rather than here).

use crate::error::{PathfindingError, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Heuristic weights
// ---------------------------------------------------------------------------

/// Weights of the four configurable heuristic terms.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeuristicWeights {
    /// Weight of the grid (Manhattan) distance to the target.
    pub manhattan: f64,
    /// Weight of the octile distance to the target.
    pub octile: f64,
    /// Weight of the distance from the start-target line.
    pub perpendicular: f64,
    /// Weight of the vertical distance to the target.
    pub height: f64,
}

impl HeuristicWeights {
    pub const NATURAL: Self = Self {
        manhattan: 0.3,
        octile: 0.15,
        perpendicular: 0.6,
        height: 0.3,
    };

    pub const DIRECT: Self = Self {
        manhattan: 0.6,
        octile: 0.3,
        perpendicular: 0.0,
        height: 0.1,
    };

    pub fn new(manhattan: f64, octile: f64, perpendicular: f64, height: f64) -> Result<Self> {
        let weights = Self {
            manhattan,
            octile,
            perpendicular,
            height,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("manhattan", self.manhattan),
            ("octile", self.octile),
            ("perpendicular", self.perpendicular),
            ("height", self.height),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PathfindingError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self::NATURAL
    }
}

// ---------------------------------------------------------------------------
// Pathfinder config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Upper bound on loop iterations per search.
    pub max_iterations: u32,
    /// Maximum node depth before the search gives up with `LengthLimited`.
    /// 0 means unbounded.
    pub max_length: u32,
    /// Run searches on the worker pool instead of the caller's thread.
    #[serde(rename = "async")]
    pub async_mode: bool,
    /// Return the best partial path instead of an empty one when the
    /// frontier runs dry.
    pub allowing_fallback: bool,
    /// Whether world providers may load missing world data on demand.
    /// Read by provider factories, not by the search itself.
    pub loading_chunks: bool,
    /// Expand across diagonals as well as along the axes.
    pub allowing_diagonal: bool,
    /// Lower the frontier cost of candidates that pass a filter stage.
    pub prioritizing: bool,
    pub heuristic_weights: HeuristicWeights,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            max_length: 0,
            async_mode: false,
            allowing_fallback: true,
            loading_chunks: false,
            allowing_diagonal: true,
            prioritizing: true,
            heuristic_weights: HeuristicWeights::NATURAL,
        }
    }
}

impl PathfinderConfig {
    /// Parse a config from JSON. Absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.heuristic_weights.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PathfinderConfig::default();
        assert_eq!(config.max_iterations, 5000);
        assert_eq!(config.max_length, 0);
        assert!(!config.async_mode);
        assert!(config.allowing_fallback);
        assert!(!config.loading_chunks);
        assert!(config.allowing_diagonal);
        assert!(config.prioritizing);
        assert_eq!(config.heuristic_weights, HeuristicWeights::NATURAL);
    }

    #[test]
    fn default_config_serializes() {
        let config = PathfinderConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"async\""));
        let restored: PathfinderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = PathfinderConfig::from_json(
            r#"{ "max_iterations": 200, "async": true, "heuristic_weights": {
                "manhattan": 0.6, "octile": 0.3, "perpendicular": 0.0, "height": 0.1 } }"#,
        )
        .unwrap();
        assert_eq!(config.max_iterations, 200);
        assert!(config.async_mode);
        assert!(config.allowing_fallback);
        assert_eq!(config.heuristic_weights, HeuristicWeights::DIRECT);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = PathfinderConfig::from_json("{ max_iterations: ").unwrap_err();
        assert!(matches!(err, PathfindingError::ConfigParse(_)));
    }

    #[test]
    fn negative_weight_rejected() {
        let err = HeuristicWeights::new(0.3, -0.1, 0.6, 0.3).unwrap_err();
        assert!(matches!(
            err,
            PathfindingError::InvalidWeight { name: "octile", .. }
        ));
        assert!(HeuristicWeights::new(0.3, 0.15, f64::NAN, 0.3).is_err());
    }

    #[test]
    fn json_with_bad_weight_fails_validation() {
        let err = PathfinderConfig::from_json(
            r#"{ "heuristic_weights": {
                "manhattan": -1.0, "octile": 0.3, "perpendicular": 0.0, "height": 0.1 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PathfindingError::InvalidWeight { .. }));
    }
}
