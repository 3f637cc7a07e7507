//! Engine configuration.
//!
//! Read from a JSON file (the CLI looks for `.grove/config.json`); every
//! field has a default so a partial file is fine.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// Ceilings for the traversals whose cost is not linear in graph size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalLimits {
    /// Maximum number of paths `find_all_paths` will collect.
    pub max_paths: usize,
    /// Maximum number of node visits per call.
    pub max_visits: usize,
    /// Optional wall-clock budget per call.
    pub timeout_ms: Option<u64>,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_paths: 1_000,
            max_visits: 100_000,
            timeout_ms: None,
        }
    }
}

impl TraversalLimits {
    pub fn unbounded_time(max_paths: usize, max_visits: usize) -> Self {
        Self {
            max_paths,
            max_visits,
            timeout_ms: None,
        }
    }
}

/// Defaults used by the query layer when the caller does not say otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    pub result_limit: usize,
    pub dependency_depth: usize,
    pub impact_depth: usize,
    pub path_depth: usize,
    pub similar_limit: usize,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            result_limit: 50,
            dependency_depth: 3,
            impact_depth: 5,
            path_depth: 10,
            similar_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub limits: TraversalLimits,
    pub query: QueryDefaults,
}

impl GraphConfig {
    /// Loads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GraphError::io(path, e))?;
        let config: GraphConfig = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.limits.max_paths == 0 {
            return Err(GraphError::Config("limits.max_paths must be > 0".into()));
        }
        if self.limits.max_visits == 0 {
            return Err(GraphError::Config("limits.max_visits must be > 0".into()));
        }
        if self.query.result_limit == 0 {
            return Err(GraphError::Config("query.result_limit must be > 0".into()));
        }
        Ok(())
    }
}

/// Per-call work meter derived from `TraversalLimits`.
#[derive(Debug)]
pub(crate) struct Budget {
    remaining: usize,
    deadline: Option<Instant>,
    exhausted: bool,
}

impl Budget {
    pub(crate) fn start(limits: &TraversalLimits) -> Self {
        Self {
            remaining: limits.max_visits,
            deadline: limits
                .timeout_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
            exhausted: false,
        }
    }

    /// Charges one visit. Returns `false` once the budget is used up.
    pub(crate) fn spend(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let timed_out = self.deadline.is_some_and(|d| Instant::now() >= d);
        if self.remaining == 0 || timed_out {
            self.exhausted = true;
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GraphConfig =
            serde_json::from_str(r#"{"limits": {"max_paths": 5}}"#).unwrap();
        assert_eq!(config.limits.max_paths, 5);
        assert_eq!(config.limits.max_visits, 100_000);
        assert_eq!(config.query, QueryDefaults::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"query": {{"impact_depth": 2}}}}"#).unwrap();

        let config = GraphConfig::load(file.path()).unwrap();
        assert_eq!(config.query.impact_depth, 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"limits": {{"max_visits": 0}}}}"#).unwrap();

        assert!(matches!(
            GraphConfig::load(file.path()),
            Err(GraphError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = GraphConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, GraphConfig::default());
    }

    #[test]
    fn test_budget_runs_out() {
        let mut budget = Budget::start(&TraversalLimits::unbounded_time(1, 2));
        assert!(budget.spend());
        assert!(budget.spend());
        assert!(!budget.spend());
        assert!(budget.exhausted());
    }
}
