//! Introspective contextual augmentation.
//!
//! Before the main model call, the orchestrator runs a short pass of
//! classification and generation steps over the user input: check the
//! language, decide whether the request is really a task for the local
//! system, try the fact service directly on terse quantitative questions,
//! and otherwise distill one self-contained background question, answer it,
//! and insert the exchange into the conversation ahead of the user turn.
//! The main model then answers with that grounding already in context.
//!
//! The pass is best-effort throughout: a failed or ambiguous step degrades
//! to its conservative branch (no fact usage, no system handoff, no
//! insertion) and the request still reaches the model. Only the final chat
//! call can fail.

mod machine;
mod prompts;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::MuninnConfig;
use crate::gateway::RequestGateway;
use crate::telemetry;
use crate::types::{AugmentationStep, Conversation, Message};
use crate::{MuninnError, Result};

use machine::{Flags, Machine, State, StepOutcome};
use prompts::Verdict;

/// How an augmentation pass concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AugmentOutcome {
    /// The fact service answered the raw input; no model call is needed.
    Direct { answer: String },
    /// A question/answer exchange was inserted ahead of the user turn.
    Augmented,
    /// The pass finished without adding anything.
    Unaugmented,
    /// The request targets the local computer system and is left to the
    /// embedding application.
    SystemTask,
}

impl AugmentOutcome {
    /// Stable identifier, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Augmented => "augmented",
            Self::Unaugmented => "unaugmented",
            Self::SystemTask => "system_task",
        }
    }
}

/// Result of one augmentation pass.
#[derive(Debug, Clone)]
pub struct AugmentReport {
    /// The caller's history plus any inserted turns. The user input itself
    /// is not appended; [`Orchestrator::respond`] does that for the final
    /// call.
    pub history: Conversation,
    pub outcome: AugmentOutcome,
    /// Completed steps in execution order.
    pub steps: Vec<AugmentationStep>,
}

/// The assistant's reply to one user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A conversational answer.
    Answer(String),
    /// The request was classified as a local system task and is left to the
    /// embedding application.
    SystemTask,
}

/// A reply together with the augmentation trace behind it.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub reply: Reply,
    pub steps: Vec<AugmentationStep>,
}

/// Drives the augmentation pass and the final model call.
pub struct Orchestrator {
    config: MuninnConfig,
    gateway: Arc<RequestGateway>,
}

impl Orchestrator {
    pub fn new(config: MuninnConfig, gateway: Arc<RequestGateway>) -> Self {
        Self { config, gateway }
    }

    /// Runs the augmentation pass over one user input.
    ///
    /// The pass itself never fails: a step that errors or comes back
    /// ambiguous degrades to its conservative branch and the pass carries
    /// on. `history` is only read; the returned report carries the
    /// (possibly augmented) copy.
    pub async fn augment(&self, input: &str, history: &Conversation) -> AugmentReport {
        metrics::counter!(telemetry::AUGMENTATIONS_TOTAL).increment(1);

        let input = input.trim();
        let mut steps = Vec::new();

        if input.is_empty() {
            debug!("empty input, nothing to augment");
            return self.finish(history.clone(), AugmentOutcome::Unaugmented, steps);
        }

        let mut machine = Machine::new(Flags {
            assume_english: self.config.assume_english,
            offer_system_commands: self.config.offer_system_commands,
            fact_source_available: self.gateway.has_fact_source(),
            augmentation_enabled: self.config.introspective_contextual_augmentation,
        });

        let mut augmented = history.clone();
        let mut outcome = AugmentOutcome::Unaugmented;
        let mut question: Option<String> = None;

        while machine.state() != State::Done {
            match machine.state() {
                State::LanguageCheck => {
                    let result = self.check_language(input, &mut steps).await;
                    machine.advance(result);
                }
                State::TopicClassification => {
                    let result = self.classify_topic(input, history, &mut steps).await;
                    if result == StepOutcome::SystemTask {
                        outcome = AugmentOutcome::SystemTask;
                    }
                    machine.advance(result);
                }
                State::FactApiSuitability => {
                    match self.try_direct_fact(input, history, &mut steps).await {
                        Some(answer) => {
                            outcome = AugmentOutcome::Direct { answer };
                            machine.advance(StepOutcome::DirectAnswer);
                        }
                        None => machine.advance(StepOutcome::Advance),
                    }
                }
                State::ContextualQueryGeneration => {
                    match self.generate_query(input, history, &mut steps).await {
                        Some(generated) => {
                            question = Some(generated);
                            machine.advance(StepOutcome::Advance);
                        }
                        None => machine.advance(StepOutcome::Degrade),
                    }
                }
                State::ContextualQueryAnswering => {
                    let Some(query) = question.take() else {
                        machine.advance(StepOutcome::Degrade);
                        continue;
                    };
                    let use_fact = self.gateway.has_fact_source() && machine.english();
                    match self.answer_query(input, &query, use_fact, history, &mut steps).await {
                        Some(answer) => {
                            augmented.push_user(query);
                            augmented.push_assistant(answer);
                            outcome = AugmentOutcome::Augmented;
                            machine.advance(StepOutcome::Advance);
                        }
                        None => machine.advance(StepOutcome::Degrade),
                    }
                }
                State::Done => break,
            }
        }

        self.finish(augmented, outcome, steps)
    }

    /// Answers one user input, keeping `history` as the ongoing conversation.
    ///
    /// Runs the augmentation pass, then issues the final chat call with the
    /// augmented history plus the user turn. On success the exchange is
    /// appended to `history`, including any inserted question/answer pair.
    /// A direct fact answer skips the model entirely; a system-task verdict
    /// leaves `history` untouched so the embedding application can handle
    /// the request itself.
    pub async fn respond(&self, input: &str, history: &mut Conversation) -> Result<Exchange> {
        let input = input.trim();
        let report = self.augment(input, history).await;
        let AugmentReport { history: augmented, outcome, steps } = report;

        match outcome {
            AugmentOutcome::SystemTask => Ok(Exchange { reply: Reply::SystemTask, steps }),
            AugmentOutcome::Direct { answer } => {
                history.push_user(input);
                history.push_assistant(answer.clone());
                Ok(Exchange { reply: Reply::Answer(answer), steps })
            }
            AugmentOutcome::Augmented | AugmentOutcome::Unaugmented => {
                let mut messages = augmented.turns().to_vec();
                messages.push(Message::user(input));
                let reply = self.gateway.cached_chat(&messages).await?;
                *history = augmented;
                history.push_user(input);
                history.push_assistant(reply.clone());
                Ok(Exchange { reply: Reply::Answer(reply), steps })
            }
        }
    }

    async fn check_language(&self, input: &str, steps: &mut Vec<AugmentationStep>) -> StepOutcome {
        let prompt = prompts::language_check_prompt(input);
        // One-shot sub-dialogue; earlier turns must not bias the verdict.
        let reply = match self.gateway.cached_chat(&[Message::user(prompt.clone())]).await {
            Ok(reply) => reply,
            Err(e) => {
                degrade("language_check", &e);
                return StepOutcome::NotEnglish;
            }
        };
        let verdict = prompts::parse_verdict(&reply);
        record_step(steps, AugmentationStep::LanguageCheck { prompt, result: reply });
        match verdict {
            Verdict::Yes => StepOutcome::Advance,
            Verdict::No => StepOutcome::NotEnglish,
            Verdict::Ambiguous => {
                degrade("language_check", "ambiguous classifier reply");
                StepOutcome::NotEnglish
            }
        }
    }

    async fn classify_topic(
        &self,
        input: &str,
        history: &Conversation,
        steps: &mut Vec<AugmentationStep>,
    ) -> StepOutcome {
        let prompt = prompts::system_topic_prompt(input);
        let reply = match self.gateway.cached_chat(&sub_dialogue(history, prompt.clone())).await {
            Ok(reply) => reply,
            Err(e) => {
                degrade("topic_classification", &e);
                return StepOutcome::Advance;
            }
        };
        let verdict = prompts::parse_verdict(&reply);
        record_step(steps, AugmentationStep::TopicClassification { prompt, result: reply });
        match verdict {
            Verdict::Yes => StepOutcome::SystemTask,
            Verdict::No => StepOutcome::Advance,
            Verdict::Ambiguous => {
                degrade("topic_classification", "ambiguous classifier reply");
                StepOutcome::Advance
            }
        }
    }

    /// Classifies whether the raw input suits the fact service and, when it
    /// does, attempts the lookup. Declines and failures fall through to the
    /// contextual query instead of ending the pass.
    async fn try_direct_fact(
        &self,
        input: &str,
        history: &Conversation,
        steps: &mut Vec<AugmentationStep>,
    ) -> Option<String> {
        if !prompts::is_terse_query(input) {
            debug!("input is not a terse single-sentence query, skipping the direct fact path");
            return None;
        }
        let prompt = prompts::fact_suitability_prompt(input);
        let reply = match self.gateway.cached_chat(&sub_dialogue(history, prompt.clone())).await {
            Ok(reply) => reply,
            Err(e) => {
                degrade("fact_api_suitability", &e);
                return None;
            }
        };
        let verdict = prompts::parse_verdict(&reply);
        record_step(steps, AugmentationStep::FactApiSuitability { prompt, result: reply });
        match verdict {
            Verdict::Yes => {}
            Verdict::No => return None,
            Verdict::Ambiguous => {
                degrade("fact_api_suitability", "ambiguous classifier reply");
                return None;
            }
        }
        match self.gateway.cached_fact(input).await {
            Ok(answer) => {
                info!(answer = %answer, "fact service answered the input directly");
                Some(answer)
            }
            Err(MuninnError::FactDeclined(message)) => {
                debug!(message = %message, "fact service declined the input");
                None
            }
            Err(e) => {
                warn!(error = %e, "direct fact lookup failed");
                None
            }
        }
    }

    async fn generate_query(
        &self,
        input: &str,
        history: &Conversation,
        steps: &mut Vec<AugmentationStep>,
    ) -> Option<String> {
        let prompt = prompts::query_generation_prompt(input);
        let reply = match self.gateway.cached_chat(&sub_dialogue(history, prompt.clone())).await {
            Ok(reply) => reply,
            Err(e) => {
                degrade("contextual_query_generation", &e);
                return None;
            }
        };
        let question = reply.trim().to_string();
        if question.is_empty() {
            degrade("contextual_query_generation", "model produced an empty question");
            return None;
        }
        record_step(
            steps,
            AugmentationStep::ContextualQueryGeneration { prompt, result: question.clone() },
        );
        Some(question)
    }

    /// Answers the generated question, preferring the fact service when it
    /// is usable and the question is terse enough for it.
    async fn answer_query(
        &self,
        input: &str,
        question: &str,
        use_fact: bool,
        history: &Conversation,
        steps: &mut Vec<AugmentationStep>,
    ) -> Option<String> {
        if use_fact && prompts::is_terse_query(question) {
            match self.gateway.cached_fact(question).await {
                Ok(answer) => {
                    record_step(
                        steps,
                        AugmentationStep::ContextualQueryAnswering {
                            prompt: question.to_string(),
                            result: answer.clone(),
                        },
                    );
                    return Some(answer);
                }
                Err(MuninnError::FactDeclined(message)) => {
                    debug!(message = %message, "fact service declined the contextual query");
                }
                Err(e) => {
                    warn!(error = %e, "fact lookup for the contextual query failed");
                }
            }
        }
        let prompt = prompts::fallback_answer_prompt(input, question);
        match self.gateway.cached_chat(&sub_dialogue(history, prompt.clone())).await {
            Ok(answer) => {
                record_step(
                    steps,
                    AugmentationStep::ContextualQueryAnswering { prompt, result: answer.clone() },
                );
                Some(answer)
            }
            Err(e) => {
                degrade("contextual_query_answering", &e);
                None
            }
        }
    }

    fn finish(
        &self,
        history: Conversation,
        outcome: AugmentOutcome,
        steps: Vec<AugmentationStep>,
    ) -> AugmentReport {
        metrics::counter!(telemetry::AUGMENTATION_OUTCOMES_TOTAL, "outcome" => outcome.as_str())
            .increment(1);
        info!(outcome = outcome.as_str(), steps = steps.len(), "augmentation pass finished");
        AugmentReport { history, outcome, steps }
    }
}

/// Clone of the conversation so far with `prompt` appended as the user turn.
/// Sub-dialogues never touch the caller's history.
fn sub_dialogue(history: &Conversation, prompt: String) -> Vec<Message> {
    let mut messages = history.turns().to_vec();
    messages.push(Message::user(prompt));
    messages
}

fn record_step(steps: &mut Vec<AugmentationStep>, step: AugmentationStep) {
    info!(step = step.name(), "{step}");
    steps.push(step);
}

fn degrade(step: &'static str, reason: impl std::fmt::Display) {
    warn!(step, reason = %reason, "augmentation step degraded, taking the conservative branch");
    metrics::counter!(telemetry::STEP_DEGRADATIONS_TOTAL, "step" => step).increment(1);
}
