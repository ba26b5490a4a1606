//! Configuration loading and retry policy.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. Explicit path (passed by the embedding application)
//! 2. `$MUNINN_CONFIG`
//! 3. `~/.config/muninn/config.toml`
//!
//! A missing file is not an error: the assistant runs on defaults until the
//! user writes a config. A file that exists but fails to parse is an error.
//! The loaded value is immutable; every component receives the parts it
//! needs at construction time and nothing re-reads the environment later.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{MuninnError, Result};

/// Assistant configuration.
///
/// Constructible in code via chained setters or loaded from TOML:
///
/// ```rust
/// # use muninn::MuninnConfig;
/// let config = MuninnConfig::default()
///     .assume_english(true)
///     .model_timeout_secs(60);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuninnConfig {
    /// Skip the language check and treat every input as English.
    #[serde(default)]
    pub assume_english: bool,
    /// Run the augmentation pass before answering (default: true).
    /// When false, requests go straight to the chat model.
    #[serde(default = "default_true")]
    pub introspective_contextual_augmentation: bool,
    /// Route requests about the local system to the embedding application
    /// instead of answering them (default: false).
    #[serde(default)]
    pub offer_system_commands: bool,
    /// Fact-service request timeout in seconds (default: 7).
    #[serde(default = "default_fact_timeout")]
    pub fact_timeout_secs: u64,
    /// Chat-model request timeout in seconds (default: 120).
    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub cache: crate::cache::CacheConfig,
}

fn default_true() -> bool {
    true
}

fn default_fact_timeout() -> u64 {
    7
}

fn default_model_timeout() -> u64 {
    120
}

impl Default for MuninnConfig {
    fn default() -> Self {
        Self {
            assume_english: false,
            introspective_contextual_augmentation: true,
            offer_system_commands: false,
            fact_timeout_secs: default_fact_timeout(),
            model_timeout_secs: default_model_timeout(),
            retry: RetryConfig::default(),
            cache: crate::cache::CacheConfig::default(),
        }
    }
}

impl MuninnConfig {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `$MUNINN_CONFIG`
    /// 3. `~/.config/muninn/config.toml`
    ///
    /// Returns defaults if no file exists. An explicit path (argument or
    /// environment) that does not exist is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit_path)? else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path, `None` meaning "no file, use defaults".
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(MuninnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Ok(env_path) = std::env::var("MUNINN_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(MuninnError::Configuration(format!(
                "Config file not found: {path:?} (from MUNINN_CONFIG)"
            )));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("muninn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }

    /// Skip the language check and treat every input as English.
    pub fn assume_english(mut self, v: bool) -> Self {
        self.assume_english = v;
        self
    }

    /// Enable or disable the augmentation pass.
    pub fn introspective_contextual_augmentation(mut self, v: bool) -> Self {
        self.introspective_contextual_augmentation = v;
        self
    }

    /// Enable or disable routing of system-related requests to the caller.
    pub fn offer_system_commands(mut self, v: bool) -> Self {
        self.offer_system_commands = v;
        self
    }

    /// Set the fact-service request timeout in seconds.
    pub fn fact_timeout_secs(mut self, secs: u64) -> Self {
        self.fact_timeout_secs = secs;
        self
    }

    /// Set the chat-model request timeout in seconds.
    pub fn model_timeout_secs(mut self, secs: u64) -> Self {
        self.model_timeout_secs = secs;
        self
    }

    /// Set the retry policy for provider calls.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-namespace cache settings.
    pub fn cache(mut self, cache: crate::cache::CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Fact-service request timeout.
    pub fn fact_timeout(&self) -> Duration {
        Duration::from_secs(self.fact_timeout_secs)
    }

    /// Chat-model request timeout.
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff:
///
/// ```rust
/// # use muninn::RetryConfig;
/// let config = RetryConfig::new().max_attempts(5).initial_delay_ms(200);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay before the first retry in milliseconds. Default: 500.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds (caps exponential
    /// growth). Default: 30000.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry in milliseconds.
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    /// Set the maximum delay between retries in milliseconds.
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * 2^attempt`, capped at
    /// `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = Duration::from_millis(self.initial_delay_ms)
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(Duration::from_millis(self.max_delay_ms))
    }

    /// Calculate the effective delay, respecting provider `retry_after` hints.
    ///
    /// If a `retry_after` duration is provided (from a `RateLimited` error),
    /// it takes precedence over the calculated backoff.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}
