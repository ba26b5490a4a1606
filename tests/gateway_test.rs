//! Tests for [`RequestGateway`]: every external call behind the cache,
//! exercised with fake providers and a manual clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use muninn::cache::{CacheConfig, CacheSettings, CacheStore};
use muninn::clock::ManualClock;
use muninn::gateway::RequestGateway;
use muninn::providers::{ChatModel, FactSource};
use muninn::types::Message;
use muninn::{MuninnError, Result};
use tempfile::TempDir;

const T0: f64 = 1_000_000.0;

/// Chat model that replies with a settable string, optionally failing first.
struct FixedChat {
    reply: Mutex<String>,
    fail_next: AtomicU32,
    calls: AtomicU32,
}

impl FixedChat {
    fn new(reply: &str) -> Self {
        Self {
            reply: Mutex::new(reply.to_string()),
            fail_next: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        }
    }

    fn fail_times(self, failures: u32) -> Self {
        self.fail_next.store(failures, Ordering::Relaxed);
        self
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChatModel for FixedChat {
    fn name(&self) -> &str {
        "fixed-chat"
    }

    fn endpoint_tag(&self) -> &str {
        "test:fixed-chat"
    }

    async fn complete(&self, _messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_next.load(Ordering::Relaxed) > 0 {
            self.fail_next.fetch_sub(1, Ordering::Relaxed);
            return Err(MuninnError::Http("connection refused".into()));
        }
        Ok(self.reply.lock().unwrap().clone())
    }
}

enum FactBehavior {
    Answer(&'static str),
    Decline(&'static str),
    Fail,
}

/// Fact source with a scripted behaviour and a call counter.
struct ScriptedFacts {
    behavior: Mutex<FactBehavior>,
    calls: AtomicU32,
}

impl ScriptedFacts {
    fn new(behavior: FactBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: AtomicU32::new(0),
        }
    }

    fn set_behavior(&self, behavior: FactBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FactSource for ScriptedFacts {
    fn name(&self) -> &str {
        "scripted-facts"
    }

    fn endpoint_tag(&self) -> &str {
        "test:scripted-facts"
    }

    async fn lookup(&self, _query: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &*self.behavior.lock().unwrap() {
            FactBehavior::Answer(text) => Ok((*text).to_string()),
            FactBehavior::Decline(message) => Err(MuninnError::FactDeclined((*message).to_string())),
            FactBehavior::Fail => Err(MuninnError::Http("connection refused".into())),
        }
    }
}

fn gateway_in(
    dir: &TempDir,
    clock: Arc<ManualClock>,
    config: &CacheConfig,
    chat: Arc<FixedChat>,
    facts: Option<Arc<ScriptedFacts>>,
) -> RequestGateway {
    let store = CacheStore::new(dir.path().to_path_buf(), clock, config);
    RequestGateway::new(store, chat, facts.map(|f| f as Arc<dyn FactSource>))
}

fn user_turn(text: &str) -> Vec<Message> {
    vec![Message::user(text)]
}

// =========================================================================
// Chat caching
// =========================================================================

#[tokio::test]
async fn repeated_chat_request_hits_the_cache() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("yes"));
    let gateway = gateway_in(&dir, clock, &CacheConfig::default(), chat.clone(), None);

    let messages = user_turn("Is the sky blue?");
    let first = gateway.cached_chat(&messages).await.unwrap();
    let second = gateway.cached_chat(&messages).await.unwrap();

    assert_eq!(first, "yes");
    assert_eq!(second, "yes");
    assert_eq!(chat.calls(), 1, "second request must be served from cache");
}

#[tokio::test]
async fn different_messages_reach_the_model() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("reply"));
    let gateway = gateway_in(&dir, clock, &CacheConfig::default(), chat.clone(), None);

    gateway.cached_chat(&user_turn("first")).await.unwrap();
    gateway.cached_chat(&user_turn("second")).await.unwrap();

    assert_eq!(chat.calls(), 2);
}

#[tokio::test]
async fn chat_failure_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("recovered").fail_times(1));
    let gateway = gateway_in(&dir, clock, &CacheConfig::default(), chat.clone(), None);

    let messages = user_turn("hello");
    let first = gateway.cached_chat(&messages).await;
    assert!(matches!(first, Err(MuninnError::Http(_))));

    let second = gateway.cached_chat(&messages).await.unwrap();
    assert_eq!(second, "recovered");
    assert_eq!(chat.calls(), 2);
}

#[tokio::test]
async fn clear_cache_forces_a_live_call() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("reply"));
    let gateway = gateway_in(&dir, clock, &CacheConfig::default(), chat.clone(), None);

    let messages = user_turn("hello");
    gateway.cached_chat(&messages).await.unwrap();
    gateway.clear_cache().await;
    gateway.cached_chat(&messages).await.unwrap();

    assert_eq!(chat.calls(), 2);
}

// =========================================================================
// Fact caching
// =========================================================================

#[tokio::test]
async fn fact_answer_is_cached() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("unused"));
    let facts = Arc::new(ScriptedFacts::new(FactBehavior::Answer("4")));
    let gateway = gateway_in(
        &dir,
        clock,
        &CacheConfig::default(),
        chat,
        Some(facts.clone()),
    );

    assert_eq!(gateway.cached_fact("2+2").await.unwrap(), "4");
    assert_eq!(gateway.cached_fact("2+2").await.unwrap(), "4");
    assert_eq!(facts.calls(), 1);
}

#[tokio::test]
async fn decline_is_cached_and_replayed() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("unused"));
    let facts = Arc::new(ScriptedFacts::new(FactBehavior::Decline(
        "query not understood",
    )));
    let gateway = gateway_in(
        &dir,
        clock,
        &CacheConfig::default(),
        chat,
        Some(facts.clone()),
    );

    for _ in 0..2 {
        match gateway.cached_fact("what should I wear").await {
            Err(MuninnError::FactDeclined(message)) => {
                assert_eq!(message, "query not understood");
            }
            other => panic!("expected FactDeclined, got {other:?}"),
        }
    }
    assert_eq!(facts.calls(), 1, "cached decline must not hit the service");
}

#[tokio::test]
async fn network_failure_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("unused"));
    let facts = Arc::new(ScriptedFacts::new(FactBehavior::Fail));
    let gateway = gateway_in(
        &dir,
        clock,
        &CacheConfig::default(),
        chat,
        Some(facts.clone()),
    );

    assert!(matches!(
        gateway.cached_fact("2+2").await,
        Err(MuninnError::Http(_))
    ));

    facts.set_behavior(FactBehavior::Answer("4"));
    assert_eq!(gateway.cached_fact("2+2").await.unwrap(), "4");
    assert_eq!(facts.calls(), 2);
}

#[tokio::test]
async fn without_fact_source_lookup_is_an_error() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("unused"));
    let gateway = gateway_in(&dir, clock, &CacheConfig::default(), chat, None);

    assert!(!gateway.has_fact_source());
    assert!(matches!(
        gateway.cached_fact("2+2").await,
        Err(MuninnError::NoFactSource)
    ));
}

#[tokio::test]
async fn fresh_answer_wins_over_an_old_decline() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    // Short decline lifetime so it can expire within the test.
    let config = CacheConfig {
        fact_errors: CacheSettings::new(1024 * 1024, 100.0),
        ..CacheConfig::default()
    };
    let chat = Arc::new(FixedChat::new("unused"));
    let facts = Arc::new(ScriptedFacts::new(FactBehavior::Decline("not yet")));
    let gateway = gateway_in(&dir, clock.clone(), &config, chat, Some(facts.clone()));

    assert!(gateway.cached_fact("population of Mars").await.is_err());

    // The service learns the answer after the decline expires.
    clock.advance(150.0);
    facts.set_behavior(FactBehavior::Answer("0"));
    assert_eq!(gateway.cached_fact("population of Mars").await.unwrap(), "0");

    // From now on the cached answer is served, stale decline and all.
    assert_eq!(gateway.cached_fact("population of Mars").await.unwrap(), "0");
    assert_eq!(facts.calls(), 2);
}

// =========================================================================
// Adaptive lifetimes
// =========================================================================

#[tokio::test]
async fn unchanged_revalidation_doubles_the_lifetime() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("unused"));
    let facts = Arc::new(ScriptedFacts::new(FactBehavior::Answer("21 °C")));
    let gateway = gateway_in(
        &dir,
        clock.clone(),
        &CacheConfig::default(),
        chat,
        Some(facts.clone()),
    );

    // First answer, valid for the 675 s base lifetime.
    gateway.cached_fact("temperature in Oslo").await.unwrap();
    assert_eq!(facts.calls(), 1);

    // Expired: revalidation confirms the value, lifetime grows to 1350 s.
    clock.advance(700.0);
    gateway.cached_fact("temperature in Oslo").await.unwrap();
    assert_eq!(facts.calls(), 2);

    // 1300 s into the grown lifetime the entry is still fresh.
    clock.advance(1300.0);
    gateway.cached_fact("temperature in Oslo").await.unwrap();
    assert_eq!(facts.calls(), 2, "grown lifetime must serve from cache");
}

#[tokio::test]
async fn changed_revalidation_resets_the_lifetime() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let chat = Arc::new(FixedChat::new("unused"));
    let facts = Arc::new(ScriptedFacts::new(FactBehavior::Answer("21 °C")));
    let gateway = gateway_in(
        &dir,
        clock.clone(),
        &CacheConfig::default(),
        chat,
        Some(facts.clone()),
    );

    gateway.cached_fact("temperature in Oslo").await.unwrap();

    // The weather moved on; the revalidated value differs.
    clock.advance(700.0);
    facts.set_behavior(FactBehavior::Answer("18 °C"));
    let answer = gateway.cached_fact("temperature in Oslo").await.unwrap();
    assert_eq!(answer, "18 °C");
    assert_eq!(facts.calls(), 2);

    // Lifetime is back at base: 700 s later the entry has expired again.
    clock.advance(700.0);
    gateway.cached_fact("temperature in Oslo").await.unwrap();
    assert_eq!(facts.calls(), 3);
}

// =========================================================================
// Metrics
// =========================================================================

/// Runs async gateway operations within a local recorder scope.
///
/// Uses `block_in_place` + `block_on` to keep `with_local_recorder` on the
/// same thread (it's a thread-local recorder).
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn live_call_and_decline_counters() {
    use metrics_util::MetricKind;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let dir = TempDir::new().unwrap();
                let clock = Arc::new(ManualClock::new(T0));
                let chat = Arc::new(FixedChat::new("yes"));
                let facts = Arc::new(ScriptedFacts::new(FactBehavior::Decline("no idea")));
                let gateway = gateway_in(
                    &dir,
                    clock,
                    &CacheConfig::default(),
                    chat,
                    Some(facts),
                );

                // One live chat call, one cache hit.
                let messages = user_turn("hello");
                gateway.cached_chat(&messages).await.unwrap();
                gateway.cached_chat(&messages).await.unwrap();

                // One live fact call ending in a decline.
                let _ = gateway.cached_fact("what should I wear").await;
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let counter_total = |name: &str| -> u64 {
        snapshot
            .iter()
            .filter(|(key, _, _, _)| {
                key.kind() == MetricKind::Counter && key.key().name() == name
            })
            .map(|(_, _, _, val)| match val {
                DebugValue::Counter(c) => *c,
                _ => 0,
            })
            .sum()
    };

    assert_eq!(counter_total("muninn_live_calls_total"), 2);
    assert_eq!(counter_total("muninn_cache_hits_total"), 1);
    assert_eq!(counter_total("muninn_fact_declines_total"), 1);
}
