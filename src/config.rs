use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::services::engine::EngineConfig;
use crate::services::training::TrainingConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Memory budget for cached artifacts, in bytes
    #[serde(default = "default_cache_memory_budget_bytes")]
    pub cache_memory_budget_bytes: usize,

    /// Fraction of the memory budget new loads must fit under
    #[serde(default = "default_cache_headroom_fraction")]
    pub cache_headroom_fraction: f64,

    /// Maximum number of resident cache entries
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Default per-load timeout in milliseconds
    #[serde(default = "default_cache_load_timeout_ms")]
    pub cache_load_timeout_ms: u64,

    /// Interval between idle-eviction sweeps in milliseconds
    #[serde(default = "default_cache_sweep_interval_ms")]
    pub cache_sweep_interval_ms: u64,

    /// Maximum idle age before a non-critical entry is swept, in milliseconds
    #[serde(default = "default_cache_max_idle_ms")]
    pub cache_max_idle_ms: u64,

    /// Number of latent factors per user/item vector
    #[serde(default = "default_factor_count")]
    pub factor_count: usize,

    /// SGD learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// L2 regularization strength
    #[serde(default = "default_regularization")]
    pub regularization: f64,

    /// Number of SGD passes over the training data
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Minimum rating count before a user gets personalized predictions
    #[serde(default = "default_min_ratings_for_personalization")]
    pub min_ratings_for_personalization: usize,

    /// Optional RNG seed for deterministic training runs
    #[serde(default)]
    pub training_seed: Option<u64>,
}

fn default_cache_memory_budget_bytes() -> usize {
    512 * 1024 * 1024 // 512 MiB
}

fn default_cache_headroom_fraction() -> f64 {
    0.8
}

fn default_cache_max_entries() -> usize {
    5
}

fn default_cache_load_timeout_ms() -> u64 {
    30_000
}

fn default_cache_sweep_interval_ms() -> u64 {
    60_000
}

fn default_cache_max_idle_ms() -> u64 {
    300_000
}

fn default_factor_count() -> usize {
    50
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_regularization() -> f64 {
    0.1
}

fn default_iterations() -> usize {
    100
}

fn default_min_ratings_for_personalization() -> usize {
    3
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Cache configuration view
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            memory_budget_bytes: self.cache_memory_budget_bytes,
            headroom_fraction: self.cache_headroom_fraction,
            max_entries: self.cache_max_entries,
            load_timeout: Duration::from_millis(self.cache_load_timeout_ms),
            sweep_interval: Duration::from_millis(self.cache_sweep_interval_ms),
            max_idle_age: Duration::from_millis(self.cache_max_idle_ms),
        }
    }

    /// Engine configuration view
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_ratings_for_personalization: self.min_ratings_for_personalization,
            training: TrainingConfig {
                factor_count: self.factor_count,
                learning_rate: self.learning_rate,
                regularization: self.regularization,
                iterations: self.iterations,
            },
            training_seed: self.training_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_memory_budget_bytes: default_cache_memory_budget_bytes(),
            cache_headroom_fraction: default_cache_headroom_fraction(),
            cache_max_entries: default_cache_max_entries(),
            cache_load_timeout_ms: default_cache_load_timeout_ms(),
            cache_sweep_interval_ms: default_cache_sweep_interval_ms(),
            cache_max_idle_ms: default_cache_max_idle_ms(),
            factor_count: default_factor_count(),
            learning_rate: default_learning_rate(),
            regularization: default_regularization(),
            iterations: default_iterations(),
            min_ratings_for_personalization: default_min_ratings_for_personalization(),
            training_seed: None,
        }
    }
}
