//! Augmentation step records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One completed step of the augmentation pass.
///
/// Each variant carries the prompt (or query) the step issued and the raw
/// result it received, so callers can render a trace of what happened. Steps
/// are recorded in execution order; a step that never ran leaves no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum AugmentationStep {
    /// Classified whether the input is entirely in English.
    LanguageCheck { prompt: String, result: String },
    /// Classified whether the request targets the local computer system.
    TopicClassification { prompt: String, result: String },
    /// Classified whether the raw input suits a direct fact lookup.
    FactApiSuitability { prompt: String, result: String },
    /// Generated a self-contained factual question from the request.
    ContextualQueryGeneration { prompt: String, result: String },
    /// Answered the generated question (fact service or model fallback).
    ContextualQueryAnswering { prompt: String, result: String },
}

impl AugmentationStep {
    /// Stable identifier, used as a metric label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LanguageCheck { .. } => "language_check",
            Self::TopicClassification { .. } => "topic_classification",
            Self::FactApiSuitability { .. } => "fact_api_suitability",
            Self::ContextualQueryGeneration { .. } => "contextual_query_generation",
            Self::ContextualQueryAnswering { .. } => "contextual_query_answering",
        }
    }
}

impl fmt::Display for AugmentationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LanguageCheck { result, .. } => write!(f, "language check: {result}"),
            Self::TopicClassification { result, .. } => {
                write!(f, "topic classification: {result}")
            }
            Self::FactApiSuitability { result, .. } => write!(f, "fact suitability: {result}"),
            Self::ContextualQueryGeneration { result, .. } => {
                write!(f, "contextual query: {result}")
            }
            Self::ContextualQueryAnswering { result, .. } => {
                write!(f, "answer to contextual query: {result}")
            }
        }
    }
}
