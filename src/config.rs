use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{errors::GrayMatchError, extract::DEFAULT_MAX_HOPS, rwr::RwrConfig};

/// Knobs of a single matcher run.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchConfig {
    pub max_hops: usize,
    /// Reject results mapping two query vertices onto one data vertex.
    pub require_injective: bool,
    /// Checked between seeds, never inside a search.
    pub time_limit: Option<Duration>,
    pub max_candidates: Option<usize>,
    pub rwr: RwrConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            require_injective: false,
            time_limit: None,
            max_candidates: None,
            rwr: RwrConfig::default(),
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), GrayMatchError> {
        if self.max_hops == 0 {
            return Err(GrayMatchError::invalid_input("max_hops must be at least 1"));
        }
        if self.max_candidates == Some(0) {
            return Err(GrayMatchError::invalid_input("max_candidates must be positive"));
        }
        self.rwr.validate()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScopeConfig {
    /// Communities at least this large are split again.
    pub min_cluster_size: usize,
    pub seed: u64,
    pub resolution: f64,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 10,
            seed: 0,
            resolution: 1.0,
        }
    }
}

fn default_num_proc() -> usize {
    1
}

/// Description of a replay job, read from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub input_json: PathBuf,
    pub query: String,
    /// Seconds; zero disables the limit.
    #[serde(default)]
    pub time_limit: f64,
    #[serde(default = "default_num_proc")]
    pub num_proc: usize,
    /// Number of timestamp steps to replay; zero replays all of them.
    #[serde(default)]
    pub steps: usize,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub min_cluster_size: Option<usize>,
    #[serde(default)]
    pub max_hops: Option<usize>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, GrayMatchError> {
        let text = fs::read_to_string(path)
            .map_err(|e| GrayMatchError::io(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_json(&text)?;
        // relative paths are resolved against the config file
        if let Some(base) = path.parent() {
            if config.input_json.is_relative() {
                config.input_json = base.join(&config.input_json);
            }
            if let Some(dir) = config.cache_dir.as_mut().filter(|d| d.is_relative()) {
                *dir = base.join(&*dir);
            }
        }
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, GrayMatchError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| GrayMatchError::serialization(format!("run config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GrayMatchError> {
        if self.num_proc == 0 {
            return Err(GrayMatchError::invalid_input("num_proc must be positive"));
        }
        if !self.time_limit.is_finite() || self.time_limit < 0.0 {
            return Err(GrayMatchError::invalid_input("time_limit must be >= 0"));
        }
        if self.query.trim().is_empty() {
            return Err(GrayMatchError::invalid_input("query must not be empty"));
        }
        Ok(())
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            max_hops: self.max_hops.unwrap_or(DEFAULT_MAX_HOPS),
            time_limit: (self.time_limit > 0.0).then(|| Duration::from_secs_f64(self.time_limit)),
            ..MatchConfig::default()
        }
    }

    pub fn scope_config(&self) -> ScopeConfig {
        let defaults = ScopeConfig::default();
        ScopeConfig {
            min_cluster_size: self.min_cluster_size.unwrap_or(defaults.min_cluster_size),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_defaults() {
        let config =
            RunConfig::from_json(r#"{"input_json": "g.json", "query": "--vertex a"}"#).unwrap();
        assert_eq!(config.num_proc, 1);
        assert_eq!(config.steps, 0);
        assert!(config.match_config().time_limit.is_none());
        assert_eq!(config.scope_config().min_cluster_size, 10);
    }

    #[test]
    fn zero_workers_rejected() {
        let err = RunConfig::from_json(
            r#"{"input_json": "g.json", "query": "--vertex a", "num_proc": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GrayMatchError::InvalidInput(_)));
    }
}
