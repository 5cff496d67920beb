//! Engine configuration.
//!
//! # Environment Variables
//!
//! [`EngineConfig::from_env`] applies these overrides on top of the
//! defaults. Unparseable values are ignored.
//!
//! - `VFX_CACHE_MAX` - Maximum number of cached operations
//! - `VFX_DISABLE_CACHE` - Disable the operation cache ("1" or "true")
//! - `VFX_THREADS` - Size of a dedicated kernel thread pool

use crate::error::{FusionError, FusionResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Default operation cache size.
pub const DEFAULT_CACHE_MAX: usize = 100;

/// Settings for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Operation cache capacity; 0 disables caching.
    pub cache_max_operations: usize,
    /// Dedicated rayon pool size; `None` uses the global pool.
    pub threads: Option<usize>,
    /// Log each planned graph in Graphviz form at trace level.
    pub trace_graphs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_max_operations: DEFAULT_CACHE_MAX,
            threads: None,
            trace_graphs: false,
        }
    }
}

impl EngineConfig {
    /// Defaults with `VFX_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(max) = env_cache_max() {
            config.cache_max_operations = max;
        }
        if cache_disabled() {
            config.cache_max_operations = 0;
        }
        if let Some(threads) = env_threads() {
            config.threads = Some(threads);
        }
        config
    }

    /// Parses a YAML document; missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> FusionResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the cache capacity.
    pub fn with_cache_max_operations(mut self, max: usize) -> Self {
        self.cache_max_operations = max;
        self
    }

    /// Disables the operation cache.
    pub fn without_cache(self) -> Self {
        self.with_cache_max_operations(0)
    }

    /// Runs kernels on a dedicated pool of `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Enables Graphviz logging of planned graphs.
    pub fn with_trace_graphs(mut self, enabled: bool) -> Self {
        self.trace_graphs = enabled;
        self
    }

    /// Checks the settings.
    pub fn validate(&self) -> FusionResult<()> {
        if self.threads == Some(0) {
            return Err(FusionError::Config("threads must be > 0".into()));
        }
        Ok(())
    }
}

fn env_cache_max() -> Option<usize> {
    env::var("VFX_CACHE_MAX").ok().and_then(|v| v.parse().ok())
}

fn cache_disabled() -> bool {
    env::var("VFX_DISABLE_CACHE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_threads() -> Option<usize> {
    env::var("VFX_THREADS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&n| n > 0)
}
