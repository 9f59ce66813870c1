//! Store configuration.
//!
//! All fields have defaults so a config file can specify only what it
//! overrides. Times are whole seconds, matching the tuning granularity the
//! store exposes.

use serde::{Deserialize, Serialize};

/// Which durable engine backs the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded ordered key-value engine (redb).
    #[default]
    Ordered,
    /// Relational engine (SQLite), one file with an `objects` table.
    Relational,
}

/// Tuning knobs for the hashed-object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Target number of strongly-held cache entries. 0 disables the bound.
    pub cache_target_size: usize,
    /// Age in seconds past which a strong cache entry demotes to weak on
    /// sweep. 0 demotes everything at the next sweep.
    pub cache_target_age_secs: u64,
    /// Seconds a known-missing hash stays in the negative cache.
    pub negative_cache_ttl_secs: u64,
    /// Maximum objects per backend write transaction.
    pub batch_max: usize,
    /// Which durable engine to open.
    pub backend: BackendKind,
    /// Re-verify payload digests on every backend read.
    pub paranoid_verify: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_target_size: 16_384,
            cache_target_age_secs: 300,
            negative_cache_ttl_secs: 120,
            batch_max: 128,
            backend: BackendKind::Ordered,
            paranoid_verify: false,
        }
    }
}
