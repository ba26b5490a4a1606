//! Persistent per-namespace cache store.
//!
//! Each namespace owns a JSON file under the cache directory and an
//! in-memory map behind its own lock, so read-modify-write cycles
//! (insertion racing size eviction) are serialized per namespace while
//! namespaces stay independent. Files are loaded on first touch and
//! rewritten atomically (temp file + rename) after every mutation.
//!
//! Persistence is strictly best-effort: unreadable or corrupt state resets
//! the namespace to empty, and write failures are logged and swallowed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::telemetry;

use super::entry::{CacheEntry, Lookup};
use super::policy::values_equal;
use super::{CacheConfig, CacheSettings, Namespace};

/// Fixed per-entry overhead added to the size accounting, covering
/// timestamps, counters and JSON syntax around the payload.
const ENTRY_OVERHEAD: usize = 64;

/// Size-bounded, persistent key→entry store with one partition per
/// [`Namespace`].
pub struct CacheStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    shards: [Shard; 3],
}

struct Shard {
    namespace: Namespace,
    settings: CacheSettings,
    state: Mutex<ShardState>,
}

#[derive(Default)]
struct ShardState {
    loaded: bool,
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheStore {
    /// Create a store rooted at `dir`. Nothing is read or created until a
    /// namespace is first touched.
    pub fn new(dir: PathBuf, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        let shard = |namespace: Namespace| Shard {
            namespace,
            settings: config.settings(namespace).clone(),
            state: Mutex::new(ShardState::default()),
        };
        Self {
            dir,
            clock,
            shards: [
                shard(Namespace::ModelResponses),
                shard(Namespace::FactAnswers),
                shard(Namespace::FactErrors),
            ],
        }
    }

    /// Policy settings for the namespace.
    pub fn settings(&self, namespace: Namespace) -> &CacheSettings {
        &self.shard(namespace).settings
    }

    fn shard(&self, namespace: Namespace) -> &Shard {
        &self.shards[namespace.index()]
    }

    fn file_path(&self, namespace: Namespace) -> PathBuf {
        self.dir.join(format!("{}.json", namespace.as_str()))
    }

    /// Look up `key`, classifying the result against the current time.
    ///
    /// An expired entry is returned as [`Lookup::Stale`] rather than
    /// dropped; its stored value is the baseline the next live response is
    /// compared against.
    pub async fn get(&self, namespace: Namespace, key: &str) -> Lookup {
        let shard = self.shard(namespace);
        let mut state = shard.state.lock().await;
        self.ensure_loaded(shard, &mut state).await;

        match state.entries.get(key) {
            Some(entry) if !entry.is_expired(self.clock.now()) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "namespace" => namespace.as_str())
                    .increment(1);
                debug!(namespace = %namespace, key, "cache hit");
                Lookup::Fresh(entry.value.clone())
            }
            Some(entry) => {
                debug!(namespace = %namespace, key, stability = entry.stability, "cache stale");
                Lookup::Stale(entry.clone())
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "namespace" => namespace.as_str())
                    .increment(1);
                debug!(namespace = %namespace, key, "cache miss");
                Lookup::Miss
            }
        }
    }

    /// Write `value` under `key` with the lifetime and stability the policy
    /// decided, then evict if the namespace is over budget.
    ///
    /// When the stored value equals the incoming one, the entry keeps its
    /// creation time and payload and only the expiry bookkeeping moves;
    /// otherwise the entry is replaced outright. Returns `false` if the
    /// payload alone exceeds the namespace budget and was refused.
    pub async fn put(
        &self,
        namespace: Namespace,
        key: &str,
        value: &str,
        lifetime_secs: f64,
        stability: u32,
    ) -> bool {
        let shard = self.shard(namespace);
        if entry_size(key, value) > shard.settings.max_bytes {
            metrics::counter!(telemetry::CACHE_REFUSALS_TOTAL, "namespace" => namespace.as_str())
                .increment(1);
            warn!(
                namespace = %namespace,
                key,
                value_bytes = value.len(),
                max_bytes = shard.settings.max_bytes,
                "value exceeds the namespace budget, not caching"
            );
            return false;
        }

        let mut state = shard.state.lock().await;
        self.ensure_loaded(shard, &mut state).await;

        let now = self.clock.now();
        match state.entries.get_mut(key) {
            Some(prev) if values_equal(&prev.value, value) => {
                prev.expires_at = now + lifetime_secs;
                prev.lifetime_secs = lifetime_secs;
                prev.stability = stability;
            }
            _ => {
                let mut entry = CacheEntry::new(value, now, lifetime_secs);
                entry.stability = stability;
                state.entries.insert(key.to_string(), entry);
            }
        }

        self.evict_locked(shard, &mut state);
        self.save(shard, &state).await;
        true
    }

    /// Enforce the namespace size bound, persisting if anything was removed.
    pub async fn evict_if_over_capacity(&self, namespace: Namespace) {
        let shard = self.shard(namespace);
        let mut state = shard.state.lock().await;
        self.ensure_loaded(shard, &mut state).await;
        if self.evict_locked(shard, &mut state) > 0 {
            self.save(shard, &state).await;
        }
    }

    /// Drop every entry in the namespace and its persisted file.
    pub async fn clear(&self, namespace: Namespace) {
        let shard = self.shard(namespace);
        let mut state = shard.state.lock().await;
        state.loaded = true;
        state.entries.clear();
        let path = self.file_path(namespace);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(namespace = %namespace, error = %e, "failed to remove cache file");
            }
        }
        debug!(namespace = %namespace, "cache cleared");
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self, namespace: Namespace) -> usize {
        let shard = self.shard(namespace);
        let mut state = shard.state.lock().await;
        self.ensure_loaded(shard, &mut state).await;
        state.entries.len()
    }

    async fn ensure_loaded(&self, shard: &Shard, state: &mut ShardState) {
        if state.loaded {
            return;
        }
        state.loaded = true;

        let path = self.file_path(shard.namespace);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(namespace = %shard.namespace, "no persisted cache, starting empty");
                return;
            }
            Err(e) => {
                metrics::counter!(telemetry::CACHE_RESETS_TOTAL,
                    "namespace" => shard.namespace.as_str())
                .increment(1);
                warn!(
                    namespace = %shard.namespace,
                    error = %e,
                    "cache file unreadable, resetting to empty"
                );
                return;
            }
        };

        match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&text) {
            Ok(entries) => {
                debug!(
                    namespace = %shard.namespace,
                    entries = entries.len(),
                    "loaded persisted cache"
                );
                state.entries = entries;
            }
            Err(e) => {
                metrics::counter!(telemetry::CACHE_RESETS_TOTAL,
                    "namespace" => shard.namespace.as_str())
                .increment(1);
                warn!(
                    namespace = %shard.namespace,
                    error = %e,
                    "cache file corrupt, resetting to empty"
                );
            }
        }
    }

    /// Remove oldest-expiring entries (creation time breaking ties) until
    /// the namespace fits its budget. Returns the number evicted.
    fn evict_locked(&self, shard: &Shard, state: &mut ShardState) -> usize {
        let mut total: u64 = state
            .entries
            .iter()
            .map(|(k, e)| entry_size(k, &e.value))
            .sum();
        if total <= shard.settings.max_bytes {
            return 0;
        }

        let mut order: Vec<(f64, f64, String, u64)> = state
            .entries
            .iter()
            .map(|(k, e)| (e.expires_at, e.created_at, k.clone(), entry_size(k, &e.value)))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let mut evicted = 0;
        for (_, _, key, size) in order {
            if total <= shard.settings.max_bytes {
                break;
            }
            state.entries.remove(&key);
            total -= size;
            evicted += 1;
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL,
                "namespace" => shard.namespace.as_str())
            .increment(1);
            debug!(namespace = %shard.namespace, key, "evicted under size pressure");
        }
        evicted
    }

    async fn save(&self, shard: &Shard, state: &ShardState) {
        let json = match serde_json::to_string(&state.entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(namespace = %shard.namespace, error = %e, "failed to serialize cache");
                return;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(namespace = %shard.namespace, error = %e, "failed to create cache directory");
            return;
        }

        let path = self.file_path(shard.namespace);
        let tmp = path.with_extension("json.tmp");
        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            warn!(namespace = %shard.namespace, error = %e, "failed to write cache file");
            return;
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            warn!(namespace = %shard.namespace, error = %e, "failed to replace cache file");
        }
    }
}

/// Approximate serialized size of one entry.
fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len() + ENTRY_OVERHEAD) as u64
}
