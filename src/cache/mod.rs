//! Caching subsystem.
//!
//! A persistent key→entry store with adaptive expiry, split into three
//! independent namespaces:
//!
//! - [`Namespace::ModelResponses`]: replies from the chat model, cached for
//!   short internal queries (classifiers, sub-dialogues) where repeatability
//!   is expected.
//! - [`Namespace::FactAnswers`]: successful fact-service answers.
//! - [`Namespace::FactErrors`]: fact-service declines. "This query cannot
//!   be answered" is itself a stable, cacheable fact, so declines get their
//!   own namespace with a much longer base lifetime.
//!
//! # Architecture
//!
//! The [`RequestGateway`](crate::gateway::RequestGateway) is the only
//! writer. On a lookup it receives [`Lookup::Fresh`], [`Lookup::Stale`]
//! (expired entry retained as the revalidation baseline) or
//! [`Lookup::Miss`], issues the live call when needed, asks
//! [`policy::classify_on_write`] for the new lifetime, and writes through.
//! Each namespace persists to its own JSON file and is serialized behind
//! its own lock; namespaces are logically independent, so there is no
//! cross-namespace coordination.
//!
//! Expiry never deletes: an expired entry stays on disk until a write
//! replaces it or size pressure evicts it, because the stored value is
//! what the next live response is compared against.

pub mod entry;
pub mod fingerprint;
pub mod policy;
pub mod store;

pub use entry::{CacheEntry, Lookup};
pub use policy::WriteDecision;
pub use store::CacheStore;

use std::fmt;

use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// One cache partition with its own size bound and lifetime policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Chat-model replies to internal, context-light queries.
    ModelResponses,
    /// Successful fact-service answers.
    FactAnswers,
    /// Fact-service declines.
    FactErrors,
}

impl Namespace {
    /// All namespaces, in a fixed order usable as an index space.
    pub const ALL: [Namespace; 3] = [
        Namespace::ModelResponses,
        Namespace::FactAnswers,
        Namespace::FactErrors,
    ];

    /// Stable name used as the persistence file stem and metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::ModelResponses => "model_responses",
            Namespace::FactAnswers => "fact_answers",
            Namespace::FactErrors => "fact_errors",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Namespace::ModelResponses => 0,
            Namespace::FactAnswers => 1,
            Namespace::FactErrors => 2,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size and lifetime policy for a single namespace.
///
/// ```rust
/// # use muninn::cache::CacheSettings;
/// let settings = CacheSettings::new(1024 * 1024, 675.0).growth_factor(2.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum total payload size in bytes.
    pub max_bytes: u64,
    /// Lifetime granted to a new or changed entry, in seconds.
    pub base_lifetime_secs: f64,
    /// Multiplier applied to the previous lifetime when a revalidated
    /// value is unchanged. Must be > 1. Default: 2.0.
    #[serde(default = "default_growth_factor")]
    pub growth_factor: f64,
    /// Ceiling on lifetime growth, as a multiple of the base lifetime.
    /// Default: 16.0.
    #[serde(default = "default_max_lifetime_factor")]
    pub max_lifetime_factor: f64,
}

fn default_growth_factor() -> f64 {
    2.0
}

fn default_max_lifetime_factor() -> f64 {
    16.0
}

impl CacheSettings {
    /// Create settings with the default growth behaviour.
    pub fn new(max_bytes: u64, base_lifetime_secs: f64) -> Self {
        Self {
            max_bytes,
            base_lifetime_secs,
            growth_factor: default_growth_factor(),
            max_lifetime_factor: default_max_lifetime_factor(),
        }
    }

    /// Set the lifetime multiplier for unchanged revalidations.
    pub fn growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Set the lifetime ceiling as a multiple of the base lifetime.
    pub fn max_lifetime_factor(mut self, factor: f64) -> Self {
        self.max_lifetime_factor = factor;
        self
    }

    /// Absolute lifetime ceiling in seconds.
    pub fn max_lifetime_secs(&self) -> f64 {
        self.base_lifetime_secs * self.max_lifetime_factor
    }

    /// Defaults for [`Namespace::ModelResponses`]: 20 MiB, 7 days.
    pub fn model_defaults() -> Self {
        Self::new(20 * MIB, 7.0 * 24.0 * 3600.0)
    }

    /// Defaults for [`Namespace::FactAnswers`]: 1 MiB, 675 seconds.
    pub fn fact_answer_defaults() -> Self {
        Self::new(MIB, 675.0)
    }

    /// Defaults for [`Namespace::FactErrors`]: 1 MiB, 7 days.
    pub fn fact_error_defaults() -> Self {
        Self::new(MIB, 7.0 * 24.0 * 3600.0)
    }
}

/// Per-namespace cache settings, as configured under `[cache]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheSettings::model_defaults")]
    pub model_responses: CacheSettings,
    #[serde(default = "CacheSettings::fact_answer_defaults")]
    pub fact_answers: CacheSettings,
    #[serde(default = "CacheSettings::fact_error_defaults")]
    pub fact_errors: CacheSettings,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            model_responses: CacheSettings::model_defaults(),
            fact_answers: CacheSettings::fact_answer_defaults(),
            fact_errors: CacheSettings::fact_error_defaults(),
        }
    }
}

impl CacheConfig {
    /// Settings for the given namespace.
    pub fn settings(&self, namespace: Namespace) -> &CacheSettings {
        match namespace {
            Namespace::ModelResponses => &self.model_responses,
            Namespace::FactAnswers => &self.fact_answers,
            Namespace::FactErrors => &self.fact_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_names_are_distinct() {
        let names: Vec<_> = Namespace::ALL.iter().map(|ns| ns.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn default_settings_match_shipped_configuration() {
        let config = CacheConfig::default();
        assert_eq!(config.model_responses.max_bytes, 20 * MIB);
        assert_eq!(config.model_responses.base_lifetime_secs, 604_800.0);
        assert_eq!(config.fact_answers.max_bytes, MIB);
        assert_eq!(config.fact_answers.base_lifetime_secs, 675.0);
        assert_eq!(config.fact_errors.base_lifetime_secs, 604_800.0);
    }

    #[test]
    fn settings_setters_chain() {
        let settings = CacheSettings::new(MIB, 100.0)
            .growth_factor(3.0)
            .max_lifetime_factor(8.0);
        assert_eq!(settings.growth_factor, 3.0);
        assert_eq!(settings.max_lifetime_secs(), 800.0);
    }

    #[test]
    fn partial_cache_table_keeps_other_defaults() {
        let config: CacheConfig = toml::from_str(
            r#"
            [fact_answers]
            max_bytes = 2048
            base_lifetime_secs = 60.0
        "#,
        )
        .unwrap();
        assert_eq!(config.fact_answers.max_bytes, 2048);
        assert_eq!(config.fact_answers.growth_factor, 2.0);
        assert_eq!(config.model_responses.max_bytes, 20 * MIB);
    }
}
