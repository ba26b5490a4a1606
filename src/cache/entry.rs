//! Cache entry and lookup classification.

use serde::{Deserialize, Serialize};

/// A single cached response with its lifetime bookkeeping.
///
/// Timestamps are seconds since the Unix epoch, stored as floats so the
/// persisted form stays portable and human-inspectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The response payload.
    pub value: String,
    /// When the value was first stored (or last replaced).
    pub created_at: f64,
    /// When the entry stops being served without revalidation.
    pub expires_at: f64,
    /// Lifetime granted at the last write. Kept explicitly because an
    /// unchanged revalidation pushes `expires_at` forward without touching
    /// `created_at`, so the difference of the two is not the lifetime.
    pub lifetime_secs: f64,
    /// Consecutive revalidations that returned the same value.
    pub stability: u32,
}

impl CacheEntry {
    /// Create a fresh entry valid for `lifetime_secs` from `now`.
    pub fn new(value: impl Into<String>, now: f64, lifetime_secs: f64) -> Self {
        Self {
            value: value.into(),
            created_at: now,
            expires_at: now + lifetime_secs,
            lifetime_secs,
            stability: 0,
        }
    }

    /// Whether the entry is past its lifetime at `now`.
    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// A live entry; the value is served without any network call.
    Fresh(String),
    /// An expired entry, returned as the baseline for revalidation.
    Stale(CacheEntry),
    /// No entry stored under this key.
    Miss,
}

impl Lookup {
    /// The fresh value, if this lookup produced one.
    pub fn fresh(self) -> Option<String> {
        match self {
            Lookup::Fresh(value) => Some(value),
            _ => None,
        }
    }
}
