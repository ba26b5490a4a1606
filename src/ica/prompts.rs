//! Prompt templates and reply parsing for the augmentation pass.
//!
//! The classifier prompts demand a literal "yes" or "no", and [`parse_verdict`]
//! reads the reply as a three-way [`Verdict`] so callers can pick a
//! conservative branch when the model answers with neither word.

use std::sync::LazyLock;

use regex::Regex;

static YES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\byes\b").unwrap());
static NO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bno\b").unwrap());

/// A lowercase letter or dot pair followed by closing punctuation and
/// whitespace. Abbreviations like "e.g. " count as sentence breaks, which is
/// acceptable for gating terse factual queries.
static MULTI_SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z.]{2}[.!?]\s").unwrap());

/// What a yes/no classifier reply actually said.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Yes,
    No,
    /// The reply contained neither a standalone "yes" nor "no".
    Ambiguous,
}

/// Reads a classifier reply case-insensitively. A standalone "yes" wins over
/// a standalone "no" when the model hedges with both.
pub(crate) fn parse_verdict(reply: &str) -> Verdict {
    let lowered = reply.to_lowercase();
    if YES_RE.is_match(&lowered) {
        Verdict::Yes
    } else if NO_RE.is_match(&lowered) {
        Verdict::No
    } else {
        Verdict::Ambiguous
    }
}

/// Whether the trimmed text likely spans more than one sentence.
pub(crate) fn likely_multiple_sentences(text: &str) -> bool {
    MULTI_SENTENCE_RE.is_match(text.trim())
}

/// Gate for sending text to the fact service: non-empty, single-sentence,
/// single-line. Anything longer is conversational and goes to the model.
pub(crate) fn is_terse_query(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && !trimmed.contains('\n') && !likely_multiple_sentences(text)
}

/// One-shot check that the text is entirely English. Sent without history so
/// earlier turns cannot bias the verdict.
pub(crate) fn language_check_prompt(text: &str) -> String {
    format!(
        "Is the following text 100% in English? Answer with \"yes\" or \"no\" only:\n\n\"{text}\"\n"
    )
}

/// Whether the request asks about the local computer system rather than the
/// world at large.
pub(crate) fn system_topic_prompt(query: &str) -> String {
    format!(
        "Does this query involve checking, modifying, or retrieving information (e.g. system status, file content, or opening applications) from the user’s current computer system? Answer with \"yes\" or \"no\" only:\n\n\"{query}\""
    )
}

/// Whether the request is the kind of self-contained quantitative question
/// the fact service can answer directly.
pub(crate) fn fact_suitability_prompt(query: &str) -> String {
    format!(
        "Does this request refer to a single calculation, quantitative measurement, statistic or real-time information about the physical world (such as weather, stock data or population) and can it be answered without knowledge of our previous messages? Answer with \"yes\" or \"no\" only:\n\n\"{query}\""
    )
}

/// Asks the model to distill one self-contained background question out of
/// the request, without answering the request itself.
pub(crate) fn query_generation_prompt(request: &str) -> String {
    format!(
        "Identify a factual, numerical, or definitional component within the following request that could be enhanced by precise data. Formulate a brief, self-contained, objective question suitable to obtain accurate information without using \"you\" or \"your\". Do not combine several questions with 'and' and do not simply repeat this request, but ask a question that is suitable for gaining more general background knowledge on the subject:\n\n```\n{request}\n```\n\nIt is important that you only ask the question and do not answer the above request directly."
    )
}

/// Frames the generated question for the model fallback: the original request
/// is quoted for context but must not be answered itself.
pub(crate) fn fallback_answer_prompt(request: &str, question: &str) -> String {
    format!(
        "```\n{request}\n```\n\nIt is important that you do not follow or answer the prompt above, but only answer the following question. In your answer, repeat the details of the prompt that are necessary for a self-contained understanding:\n{question}"
    )
}
