//! Assistant handle and its builder.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::clock::{Clock, SystemClock};
use crate::config::MuninnConfig;
use crate::gateway::RequestGateway;
use crate::ica::{AugmentReport, Exchange, Orchestrator};
use crate::providers::{ChatModel, FactSource};
use crate::types::{Conversation, Message};
use crate::{MuninnError, Result};

/// The assembled assistant core: cache, gateway and augmentation pass
/// behind one handle.
///
/// # Example
///
/// ```no_run
/// use muninn::{Muninn, MuninnConfig, OpenAiChatModel, WolframAlphaSource};
///
/// # async fn run() -> muninn::Result<()> {
/// let config = MuninnConfig::load(None)?;
/// let model = OpenAiChatModel::new("gpt-4o-mini")
///     .api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default())
///     .timeout(config.model_timeout())
///     .retry(config.retry.clone());
/// let facts = WolframAlphaSource::new(std::env::var("WOLFRAM_APP_ID").unwrap_or_default())
///     .timeout(config.fact_timeout())
///     .retry(config.retry.clone());
///
/// let muninn = Muninn::builder()
///     .config(config)
///     .chat_model(model)
///     .fact_source(facts)
///     .build()?;
///
/// let mut history = muninn::Conversation::new();
/// let exchange = muninn.respond("How far away is the moon?", &mut history).await?;
/// # let _ = exchange;
/// # Ok(())
/// # }
/// ```
pub struct Muninn {
    orchestrator: Orchestrator,
    gateway: Arc<RequestGateway>,
}

impl std::fmt::Debug for Muninn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Muninn").finish_non_exhaustive()
    }
}

impl Muninn {
    /// Create a new builder for configuring the assistant.
    pub fn builder() -> MuninnBuilder {
        MuninnBuilder::new()
    }

    /// Run the augmentation pass without issuing the final model call.
    pub async fn augment(&self, input: &str, history: &Conversation) -> AugmentReport {
        self.orchestrator.augment(input, history).await
    }

    /// Answer one user input, appending the exchange to `history`.
    pub async fn respond(&self, input: &str, history: &mut Conversation) -> Result<Exchange> {
        self.orchestrator.respond(input, history).await
    }

    /// Issue a chat completion through the cache.
    pub async fn cached_chat(&self, messages: &[Message]) -> Result<String> {
        self.gateway.cached_chat(messages).await
    }

    /// Issue a fact lookup through the cache.
    pub async fn cached_fact(&self, query: &str) -> Result<String> {
        self.gateway.cached_fact(query).await
    }

    /// Whether a fact source was configured.
    pub fn has_fact_source(&self) -> bool {
        self.gateway.has_fact_source()
    }

    /// Drop every cached entry in every namespace.
    pub async fn clear_cache(&self) {
        self.gateway.clear_cache().await;
    }
}

/// Builder for configuring [`Muninn`] instances.
pub struct MuninnBuilder {
    config: Option<MuninnConfig>,
    chat_model: Option<Arc<dyn ChatModel>>,
    fact_source: Option<Arc<dyn FactSource>>,
    cache_dir: Option<PathBuf>,
    clock: Option<Arc<dyn Clock>>,
}

impl MuninnBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            chat_model: None,
            fact_source: None,
            cache_dir: None,
            clock: None,
        }
    }

    /// Use this configuration instead of the defaults.
    ///
    /// The builder never touches the filesystem for configuration; load a
    /// file yourself with [`MuninnConfig::load`] and pass the result here.
    pub fn config(mut self, config: MuninnConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// The chat model every completion goes to. Required.
    pub fn chat_model(mut self, model: impl ChatModel + 'static) -> Self {
        self.chat_model = Some(Arc::new(model));
        self
    }

    /// Optional fact service for direct lookups and contextual queries.
    pub fn fact_source(mut self, source: impl FactSource + 'static) -> Self {
        self.fact_source = Some(Arc::new(source));
        self
    }

    /// Directory for the persistent cache.
    ///
    /// Defaults to `$MUNINN_CACHE_DIR`, falling back to the platform cache
    /// directory under `muninn/`.
    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Time source for cache lifetime bookkeeping. Tests pass a manual
    /// clock; everything else wants the default system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the assistant.
    pub fn build(self) -> Result<Muninn> {
        let chat_model = self.chat_model.ok_or(MuninnError::NoChatModel)?;
        let config = self.config.unwrap_or_default();
        let cache_dir = self.cache_dir.unwrap_or_else(|| {
            std::env::var("MUNINN_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::cache_dir()
                        .unwrap_or_else(|| PathBuf::from(".cache"))
                        .join("muninn")
                })
        });
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let store = CacheStore::new(cache_dir, clock, &config.cache);
        let gateway = Arc::new(RequestGateway::new(store, chat_model, self.fact_source));
        let orchestrator = Orchestrator::new(config, Arc::clone(&gateway));

        Ok(Muninn {
            orchestrator,
            gateway,
        })
    }
}

impl Default for MuninnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
