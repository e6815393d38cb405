//! Cache hit-rate estimation from key patterns.

use archsim_core::CacheKey;
use serde::Serialize;

/// Distinct values assumed per dynamic pattern segment.
const VALUES_PER_DYNAMIC_SEGMENT: u64 = 1000;

/// Reuse window for keys without a TTL, in seconds.
const NO_TTL_WINDOW_SECONDS: f64 = 3600.0;

/// Estimated effectiveness of one cache key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheAnalysis {
    /// Estimated number of distinct keys matching the pattern.
    pub cardinality: u64,
    /// Fraction of lookups served from cache, in [0, 1].
    pub estimated_hit_rate: f64,
    /// Request rate that misses and reaches the backing store.
    pub effective_db_rps: f64,
}

/// Cache effectiveness model.
pub struct CacheEstimator;

impl CacheEstimator {
    /// Estimates hit rate and pass-through rate for `key` under `ambient_rps`.
    ///
    /// The hit rate grows with TTL and ambient traffic and shrinks with
    /// cardinality.
    pub fn analyze(key: &CacheKey, ambient_rps: f64) -> CacheAnalysis {
        let cardinality = key
            .estimated_cardinality
            .unwrap_or_else(|| Self::pattern_cardinality(&key.pattern))
            .max(1);
        let ambient_rps = if ambient_rps.is_finite() {
            ambient_rps.max(0.0)
        } else {
            0.0
        };

        let window = key
            .ttl_seconds
            .map(|ttl| ttl as f64)
            .unwrap_or(NO_TTL_WINDOW_SECONDS);
        let requests_per_key = ambient_rps * window / cardinality as f64;
        let hit_rate = (requests_per_key / (1.0 + requests_per_key)).clamp(0.0, 1.0);

        CacheAnalysis {
            cardinality,
            estimated_hit_rate: hit_rate,
            effective_db_rps: ambient_rps * (1.0 - hit_rate),
        }
    }

    /// Estimates distinct keys from the dynamic segments of a pattern.
    ///
    /// `{id}`, `<id>`, `*` and `$id` segments are dynamic; a pattern without
    /// any has cardinality 1.
    pub fn pattern_cardinality(pattern: &str) -> u64 {
        let dynamic = pattern
            .split(':')
            .filter(|segment| is_dynamic(segment))
            .count();
        (0..dynamic).fold(1u64, |acc, _| acc.saturating_mul(VALUES_PER_DYNAMIC_SEGMENT))
    }
}

fn is_dynamic(segment: &str) -> bool {
    segment.contains('{')
        || segment.contains('<')
        || segment.contains('*')
        || segment.starts_with('$')
}
