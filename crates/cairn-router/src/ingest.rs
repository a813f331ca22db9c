//! INGEST node (spec §4.4): clarification-response merge, or history-aware rephrasing.

use std::sync::Arc;

use cairn_core::Turn;
use cairn_generate::{chat_with_retry, ChatOptions, LlmClient};

const REPHRASE_SYSTEM: &str = "You resolve pronouns and topic anchors in a follow-up question \
using the conversation history. Return only the rephrased question, with no extra text and no \
quotation marks. If the question is already self-contained, return it unchanged.";

/// The result of the INGEST node (spec §4.4: "Emit `processed_question`, a `rephrased`
/// boolean, and a short `summary`").
pub struct IngestOutcome {
    pub processed_question: String,
    pub rephrased: bool,
    pub summary: String,
}

/// Merge a raw utterance with the pending clarification question it answers.
fn merge_clarification(pending_question: &str, utterance: &str) -> String {
    format!("{} {}", pending_question.trim(), utterance.trim())
}

/// Run INGEST: if `pending_question` is `Some`, this utterance is a clarification response
/// and is merged with it. Otherwise, attempt an LLM rephrase; skip silently if no LLM
/// collaborator is configured or if the call fails (spec §4.4: "If the LLM is unavailable,
/// skip rephrasing").
pub async fn ingest(
    utterance: &str,
    history: &[Turn],
    pending_question: Option<String>,
    rephrase_llm: Option<&Arc<dyn LlmClient>>,
    chat_options: &ChatOptions,
) -> IngestOutcome {
    if let Some(pending) = pending_question {
        let merged = merge_clarification(&pending, utterance);
        return IngestOutcome {
            processed_question: merged,
            rephrased: false,
            summary: "merged clarification response with pending question".into(),
        };
    }

    let Some(llm) = rephrase_llm else {
        return IngestOutcome {
            processed_question: utterance.to_string(),
            rephrased: false,
            summary: "no rephrasing collaborator configured".into(),
        };
    };

    if history.is_empty() {
        return IngestOutcome {
            processed_question: utterance.to_string(),
            rephrased: false,
            summary: "no history to rephrase against".into(),
        };
    }

    let user_prompt = build_rephrase_prompt(utterance, history);
    match chat_with_retry(llm.as_ref(), REPHRASE_SYSTEM, &user_prompt, chat_options).await {
        Ok(rephrased) => {
            let trimmed = rephrased.trim().trim_matches('"').to_string();
            if trimmed.is_empty() {
                IngestOutcome {
                    processed_question: utterance.to_string(),
                    rephrased: false,
                    summary: "rephrase returned empty output; using raw utterance".into(),
                }
            } else {
                IngestOutcome {
                    processed_question: trimmed,
                    rephrased: true,
                    summary: "rephrased against conversation history".into(),
                }
            }
        }
        Err(_) => IngestOutcome {
            processed_question: utterance.to_string(),
            rephrased: false,
            summary: "rephrase collaborator unavailable; using raw utterance".into(),
        },
    }
}

fn build_rephrase_prompt(utterance: &str, history: &[Turn]) -> String {
    let mut prompt = String::from("Conversation history:\n");
    for turn in history {
        prompt.push_str(&format!("{:?}: {}\n", turn.role, turn.text));
    }
    prompt.push_str(&format!("\nFollow-up question: {utterance}\n"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_joins_pending_and_response() {
        let merged = merge_clarification("Which account tier?", "Gold");
        assert_eq!(merged, "Which account tier? Gold");
    }

    #[tokio::test]
    async fn no_llm_configured_skips_rephrasing() {
        let outcome = ingest("what about it?", &[], None, None, &ChatOptions::default()).await;
        assert!(!outcome.rephrased);
        assert_eq!(outcome.processed_question, "what about it?");
    }

    #[tokio::test]
    async fn pending_question_is_merged_without_calling_llm() {
        let outcome = ingest(
            "Gold",
            &[],
            Some("Which account tier?".to_string()),
            None,
            &ChatOptions::default(),
        )
        .await;
        assert_eq!(outcome.processed_question, "Which account tier? Gold");
        assert!(!outcome.rephrased);
    }
}
