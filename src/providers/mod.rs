//! Provider implementations for the collaborator traits.
//!
//! [`OpenAiChatModel`] speaks the OpenAI-compatible chat completion surface;
//! [`WolframAlphaSource`] speaks the Wolfram|Alpha Short Answers API. Both
//! wrap their raw HTTP calls in the shared retry helper so transient
//! failures back off and retry before surfacing to the caller.

pub mod openai;
pub mod traits;
pub mod wolfram;

pub(crate) mod retry;

pub use openai::OpenAiChatModel;
pub use traits::{ChatModel, FactSource};
pub use wolfram::WolframAlphaSource;

use crate::telemetry;

/// Record one provider round trip.
pub(crate) fn record_request(provider: &str, operation: &'static str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::PROVIDER_REQUESTS_TOTAL,
        "provider" => provider.to_owned(),
        "operation" => operation,
        "status" => status,
    )
    .increment(1);
}
