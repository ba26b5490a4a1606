//! Lifetime policy applied on every cache write.
//!
//! Pure functions of (previous entry, new value) so the growth/reset rules
//! can be tested with synthetic revalidation histories, away from I/O.

use super::fingerprint::normalize_text;
use super::{CacheEntry, CacheSettings};

/// Lifetime and stability to apply on a write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteDecision {
    pub lifetime_secs: f64,
    pub stability: u32,
    /// Whether the new value matched the stored one (a revalidation that
    /// confirmed the entry).
    pub unchanged: bool,
}

/// Decide the lifetime for a value about to be written.
///
/// With no previous entry the namespace base lifetime applies. When the
/// previous (expired) entry holds an equal value, the lifetime grows by
/// `growth_factor`, capped at the namespace ceiling, and the stability
/// counter advances. A differing value resets both to their base state.
pub fn classify_on_write(
    settings: &CacheSettings,
    previous: Option<&CacheEntry>,
    new_value: &str,
) -> WriteDecision {
    match previous {
        Some(prev) if values_equal(&prev.value, new_value) => WriteDecision {
            lifetime_secs: (prev.lifetime_secs * settings.growth_factor)
                .min(settings.max_lifetime_secs()),
            stability: prev.stability.saturating_add(1),
            unchanged: true,
        },
        _ => WriteDecision {
            lifetime_secs: settings.base_lifetime_secs,
            stability: 0,
            unchanged: false,
        },
    }
}

/// Equality rule for "response unchanged": exact match after whitespace
/// normalization, for fact answers and model responses alike.
///
/// This is the single place to swap in a looser rule should free-text
/// comparison ever need one.
pub fn values_equal(stored: &str, fresh: &str) -> bool {
    normalize_text(stored) == normalize_text(fresh)
}
