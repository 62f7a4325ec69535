//! Telemetry metric name constants.
//!
//! Centralised metric names for cached attribute operations. Consumers
//! install their own `metrics` recorder (e.g. prometheus, statsd); without
//! a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `cachet_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `attribute`: `<subject>::<attribute>` (e.g. "Order::total")
//! - `status`: outcome: "ok" or "error"
//! - `store`: cache store name (e.g. "memory")

/// Calls served from a memo slot without touching the store.
///
/// Labels: `attribute`.
pub const MEMO_HITS_TOTAL: &str = "cachet_memo_hits_total";

/// Store lookups that found a live entry.
///
/// Labels: `attribute`.
pub const CACHE_HITS_TOTAL: &str = "cachet_cache_hits_total";

/// Store lookups that had to recompute.
///
/// Labels: `attribute`.
pub const CACHE_MISSES_TOTAL: &str = "cachet_cache_misses_total";

/// Invocations of the wrapped computation.
///
/// Labels: `attribute`, `status` ("ok" | "error").
pub const COMPUTATIONS_TOTAL: &str = "cachet_computations_total";

/// Wrapped computation duration in seconds.
///
/// Labels: `attribute`.
pub const COMPUTE_DURATION_SECONDS: &str = "cachet_compute_duration_seconds";

/// Explicit invalidations issued against the store.
///
/// Labels: `attribute`.
pub const INVALIDATIONS_TOTAL: &str = "cachet_invalidations_total";

/// Explicit refreshes written to the store.
///
/// Labels: `attribute`.
pub const REFRESHES_TOTAL: &str = "cachet_refreshes_total";

/// Store operations that failed.
///
/// Labels: `attribute`, `store`.
pub const STORE_ERRORS_TOTAL: &str = "cachet_store_errors_total";
