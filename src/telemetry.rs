//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `namespace`: cache namespace ("model_responses" | "fact_answers" | "fact_errors")
//! - `provider`: provider name (e.g. "openai", "wolfram-alpha")
//! - `operation`: operation invoked (e.g. "chat", "fact")
//! - `step`: augmentation step name (e.g. "language_check")
//! - `outcome`: augmentation outcome ("direct" | "augmented" | "unaugmented" | "system_task")

/// Total cache lookups that returned a fresh entry.
///
/// Labels: `namespace`.
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total cache lookups that found nothing usable.
///
/// Labels: `namespace`.
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total expired entries revalidated against a live response.
///
/// Labels: `namespace`, `outcome` ("unchanged" | "changed").
pub const CACHE_REVALIDATIONS_TOTAL: &str = "muninn_cache_revalidations_total";

/// Total entries removed under size pressure.
///
/// Labels: `namespace`.
pub const CACHE_EVICTIONS_TOTAL: &str = "muninn_cache_evictions_total";

/// Total times a persisted namespace failed to load and was reset to empty.
///
/// Labels: `namespace`.
pub const CACHE_RESETS_TOTAL: &str = "muninn_cache_resets_total";

/// Total entries refused because the serialized payload alone exceeds the
/// namespace budget.
///
/// Labels: `namespace`.
pub const CACHE_REFUSALS_TOTAL: &str = "muninn_cache_refusals_total";

/// Total live calls issued by the gateway (cache miss or revalidation).
///
/// Labels: `operation` ("chat" | "fact").
pub const LIVE_CALLS_TOTAL: &str = "muninn_live_calls_total";

/// Total fact-service declines observed by the gateway.
pub const FACT_DECLINES_TOTAL: &str = "muninn_fact_declines_total";

/// Total augmentation passes started.
pub const AUGMENTATIONS_TOTAL: &str = "muninn_augmentations_total";

/// Total augmentation passes finished, by outcome.
///
/// Labels: `outcome`.
pub const AUGMENTATION_OUTCOMES_TOTAL: &str = "muninn_augmentation_outcomes_total";

/// Total augmentation steps that degraded (classifier failure, ambiguous
/// verdict, sub-dialogue error).
///
/// Labels: `step`.
pub const STEP_DEGRADATIONS_TOTAL: &str = "muninn_step_degradations_total";

/// Total requests sent by a provider implementation.
///
/// Labels: `provider`, `operation`, `status` ("ok" | "error").
pub const PROVIDER_REQUESTS_TOTAL: &str = "muninn_provider_requests_total";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`, `operation`.
pub const RETRIES_TOTAL: &str = "muninn_retries_total";
