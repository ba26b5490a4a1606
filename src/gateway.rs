//! Request gateway: the single path for external calls.
//!
//! Every chat completion and fact lookup the assistant issues goes through
//! [`RequestGateway`], which wraps the call in a cache lookup/update cycle:
//!
//! 1. fingerprint the outbound request into a namespace key,
//! 2. return a fresh cached value without touching the network,
//! 3. otherwise issue the live call, ask the policy for the new lifetime
//!    (growing it when a revalidated value came back unchanged), and write
//!    through.
//!
//! Network failures propagate to the caller and are never cached; a fact
//! decline is cached in [`Namespace::FactErrors`], since "this cannot be
//! answered" is stable information worth keeping.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::cache::{fingerprint, policy, CacheStore, Lookup, Namespace};
use crate::providers::{ChatModel, FactSource};
use crate::telemetry;
use crate::types::Message;
use crate::{MuninnError, Result};

/// Cache-wrapping front for the chat model and the fact service.
pub struct RequestGateway {
    store: CacheStore,
    chat_model: Arc<dyn ChatModel>,
    fact_source: Option<Arc<dyn FactSource>>,
}

impl RequestGateway {
    pub fn new(
        store: CacheStore,
        chat_model: Arc<dyn ChatModel>,
        fact_source: Option<Arc<dyn FactSource>>,
    ) -> Self {
        Self {
            store,
            chat_model,
            fact_source,
        }
    }

    /// Whether a fact service is configured.
    pub fn has_fact_source(&self) -> bool {
        self.fact_source.is_some()
    }

    /// Complete a conversation through the model-response cache.
    ///
    /// Identical message sequences (after whitespace normalization) collapse
    /// to one cache entry, so repeated internal classifier queries are
    /// answered without a network call.
    pub async fn cached_chat(&self, messages: &[Message]) -> Result<String> {
        let params = json!({ "messages": messages });
        let key = fingerprint::request_key(self.chat_model.endpoint_tag(), &params);

        let lookup = self.store.get(Namespace::ModelResponses, &key).await;
        if let Lookup::Fresh(value) = lookup {
            return Ok(value);
        }

        metrics::counter!(telemetry::LIVE_CALLS_TOTAL, "operation" => "chat").increment(1);
        let reply = self.chat_model.complete(messages).await?;

        self.write_through(Namespace::ModelResponses, &key, &reply, &lookup)
            .await;
        Ok(reply)
    }

    /// Look up a factual question through the fact caches.
    ///
    /// Answers and declines are cached in separate namespaces; a cached
    /// decline replays as [`MuninnError::FactDeclined`] without a live call.
    /// Transport failures propagate uncached.
    pub async fn cached_fact(&self, query: &str) -> Result<String> {
        let source = self
            .fact_source
            .as_ref()
            .ok_or(MuninnError::NoFactSource)?;
        let params = json!({ "query": query });
        let key = fingerprint::request_key(source.endpoint_tag(), &params);

        let answers = self.store.get(Namespace::FactAnswers, &key).await;
        if let Lookup::Fresh(value) = answers {
            return Ok(value);
        }
        let declines = self.store.get(Namespace::FactErrors, &key).await;
        if let Lookup::Fresh(message) = declines {
            return Err(MuninnError::FactDeclined(message));
        }

        metrics::counter!(telemetry::LIVE_CALLS_TOTAL, "operation" => "fact").increment(1);
        match source.lookup(query).await {
            Ok(answer) => {
                self.write_through(Namespace::FactAnswers, &key, &answer, &answers)
                    .await;
                Ok(answer)
            }
            Err(MuninnError::FactDeclined(message)) => {
                metrics::counter!(telemetry::FACT_DECLINES_TOTAL).increment(1);
                self.write_through(Namespace::FactErrors, &key, &message, &declines)
                    .await;
                Err(MuninnError::FactDeclined(message))
            }
            Err(e) => Err(e),
        }
    }

    /// Drop every entry in every namespace, including the persisted files.
    pub async fn clear_cache(&self) {
        for namespace in Namespace::ALL {
            self.store.clear(namespace).await;
        }
    }

    /// Apply the lifetime policy and write the value through to the store.
    async fn write_through(&self, namespace: Namespace, key: &str, value: &str, lookup: &Lookup) {
        let previous = match lookup {
            Lookup::Stale(entry) => Some(entry),
            _ => None,
        };
        let decision = policy::classify_on_write(self.store.settings(namespace), previous, value);
        if previous.is_some() {
            let outcome = if decision.unchanged { "unchanged" } else { "changed" };
            metrics::counter!(telemetry::CACHE_REVALIDATIONS_TOTAL,
                "namespace" => namespace.as_str(),
                "outcome" => outcome,
            )
            .increment(1);
            debug!(
                namespace = %namespace,
                key,
                outcome,
                lifetime_secs = decision.lifetime_secs,
                stability = decision.stability,
                "revalidated expired entry"
            );
        }
        self.store
            .put(namespace, key, value, decision.lifetime_secs, decision.stability)
            .await;
    }
}
