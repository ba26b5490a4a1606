//! Muninn - adaptive request caching and introspective contextual
//! augmentation for a personal assistant core.
//!
//! The crate wires two pieces together behind one handle:
//!
//! - a persistent, self-tuning cache in front of every external call
//!   (chat completions and fact-service lookups), where values that come
//!   back unchanged on revalidation earn longer lifetimes, and
//! - an augmentation pass that inspects each user input before the main
//!   model call: classify the language, spot requests that are really
//!   local system tasks, answer terse quantitative questions straight
//!   from the fact service, and otherwise distill one background question
//!   whose answer is inserted into the conversation ahead of the user
//!   turn.
//!
//! # Example
//!
//! ```rust,no_run
//! use muninn::{Conversation, Muninn, OpenAiChatModel, Reply, WolframAlphaSource};
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let muninn = Muninn::builder()
//!         .chat_model(OpenAiChatModel::new("gpt-4o-mini").api_key("sk-your-key"))
//!         .fact_source(WolframAlphaSource::new("your-app-id"))
//!         .build()?;
//!
//!     let mut history = Conversation::new();
//!     let exchange = muninn.respond("How far away is the moon?", &mut history).await?;
//!     match exchange.reply {
//!         Reply::Answer(text) => println!("{text}"),
//!         Reply::SystemTask => println!("(left to the embedding application)"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ica;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use builder::{Muninn, MuninnBuilder};
pub use error::{MuninnError, Result};

pub use cache::{CacheConfig, CacheSettings, CacheStore, Namespace};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MuninnConfig, RetryConfig};
pub use gateway::RequestGateway;
pub use ica::{AugmentOutcome, AugmentReport, Exchange, Orchestrator, Reply};
pub use providers::{ChatModel, FactSource, OpenAiChatModel, WolframAlphaSource};
pub use types::{AugmentationStep, Conversation, Message, Role};
