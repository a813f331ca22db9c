//! The Answer Generator (spec §4.3, component C3).

use std::collections::HashMap;
use std::sync::Arc;

use cairn_core::{AnswerArtifact, RetrievedPassage, Turn};
use tracing::{instrument, warn};

use crate::error::GenerateError;
use crate::grounding::{completeness_coverage, entity_grounding, idf_table, numeric_findings, per_sentence_precision, qa_alignment, supported_terms};
use crate::llm::{chat_with_retry, ChatOptions, LlmClient};
use crate::schema::{parse_structured, StructuredResponse};

const SUPPORTED_TERM_FLOOR: f64 = 0.5;
const ENTITY_COVERAGE_FLOOR: f64 = 0.5;

const SCHEMA_REMINDER: &str = "Your previous reply did not conform to the required JSON schema. \
Respond again with ONLY a single JSON object matching the schema exactly: \
{\"answer_text\": string, \"answer_kind\": \"direct\"|\"clarification\"|\"abstain\", \
\"abstained\": bool, \"faithfulness\": number or \"n/a\", \"completeness\": number or \"n/a\", \
\"missing_information\": [string], \"reasoning_notes\": string, \
\"clarification_question\": string or omitted, \"citations\": [integer]}. No prose outside the JSON.";

/// Diagnostics computed alongside an [`AnswerArtifact`] — not part of the artifact's own
/// data model (spec §3), but useful for logging and for the facade's diagnostic endpoints.
#[derive(Debug, Clone, Default)]
pub struct GenerationDiagnostics {
    pub qa_alignment: f32,
    pub sentence_precision: Vec<(String, f32)>,
    pub schema_repair_attempted: bool,
}

pub struct AnswerGenerator {
    llm: Arc<dyn LlmClient>,
    chat_options: ChatOptions,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, chat_options: ChatOptions::default() }
    }

    pub fn with_chat_options(mut self, options: ChatOptions) -> Self {
        self.chat_options = options;
        self
    }

    /// Produce an `AnswerArtifact` from an utterance, the retrieved passages (stable
    /// 1-based ordinals), and a short history excerpt (spec §4.3).
    #[instrument(skip(self, passages, history), fields(utterance_len = utterance.len(), passage_count = passages.len()))]
    pub async fn generate(
        &self,
        utterance: &str,
        passages: &[RetrievedPassage],
        history: &[Turn],
    ) -> Result<(AnswerArtifact, GenerationDiagnostics), GenerateError> {
        // Abstention hard rule 1 (spec §4.3): no passages at all.
        if passages.is_empty() {
            let artifact = AnswerArtifact::abstain(
                "no supporting passages were retrieved for this question".into(),
                vec!["no supporting evidence found".into()],
            );
            return Ok((artifact, GenerationDiagnostics::default()));
        }

        let (system, user) = build_prompt(utterance, passages, history);

        let raw = chat_with_retry(self.llm.as_ref(), &system, &user, &self.chat_options)
            .await
            .map_err(|e| GenerateError::Backend(e.to_string()))?;

        let (parsed, schema_repair_attempted) = match parse_structured(&raw) {
            Ok(p) => (p, false),
            Err(first_err) => {
                warn!(error = %first_err, "structured response malformed; retrying once with schema reminder");
                let reminder_system = format!("{system}\n\n{SCHEMA_REMINDER}");
                let raw_retry = chat_with_retry(self.llm.as_ref(), &reminder_system, &user, &self.chat_options)
                    .await
                    .map_err(|e| GenerateError::Backend(e.to_string()))?;
                (parse_structured(&raw_retry)?, true)
            }
        };

        for ordinal in &parsed.citations {
            if *ordinal > passages.len() {
                return Err(GenerateError::Malformed(format!(
                    "citation ordinal {ordinal} is out of range for {} retrieved passages",
                    passages.len()
                )));
            }
        }

        let cited_texts: Vec<String> = parsed
            .citations
            .iter()
            .filter_map(|&ord| passages.get(ord - 1))
            .map(|p| p.text.clone())
            .collect();
        let cited_ids: Vec<String> = parsed
            .citations
            .iter()
            .filter_map(|&ord| passages.get(ord - 1))
            .map(|p| p.chunk_id.to_string())
            .collect();

        let passage_corpus: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let idf = idf_table(&passage_corpus);

        let artifact = self.apply_abstention_rules(&parsed, &cited_texts, cited_ids, &idf, utterance);

        let diagnostics = GenerationDiagnostics {
            qa_alignment: qa_alignment(utterance, &artifact.answer_text, &idf),
            sentence_precision: if artifact.answer_text.is_empty() {
                Vec::new()
            } else {
                per_sentence_precision(&artifact.answer_text, &cited_texts)
            },
            schema_repair_attempted,
        };

        Ok((artifact, diagnostics))
    }

    /// Evaluate the abstention hard rules in order (spec §4.3 rules 2-4; rule 1 is handled
    /// earlier in [`Self::generate`] before the LLM is even called).
    fn apply_abstention_rules(
        &self,
        parsed: &StructuredResponse,
        cited_texts: &[String],
        cited_ids: Vec<String>,
        idf: &HashMap<String, f64>,
        utterance: &str,
    ) -> AnswerArtifact {
        use cairn_core::AnswerKind;

        if parsed.answer_kind == AnswerKind::Clarification {
            let clarification_text = parsed
                .clarification_question
                .clone()
                .unwrap_or_else(|| parsed.answer_text.clone());
            return AnswerArtifact::clarification(clarification_text, parsed.reasoning_notes.clone());
        }

        if parsed.answer_kind == AnswerKind::Abstain {
            return AnswerArtifact::abstain(parsed.reasoning_notes.clone(), parsed.missing_information.clone());
        }

        // answer_kind == Direct from here on. IDF is scored against the full retrieved
        // corpus (spec §4.3: "IDF against the corpus of retrieved passages"), not just the
        // narrower set of passages this particular reply happened to cite.
        let (terms, term_ratio) = supported_terms(&parsed.answer_text, cited_texts, idf);
        let entities = entity_grounding(&parsed.answer_text, cited_texts);
        let entity_coverage = if entities.is_empty() {
            1.0
        } else {
            entities.iter().filter(|e| e.supported).count() as f64 / entities.len() as f64
        };
        let numerics = numeric_findings(&parsed.answer_text, cited_texts);
        let any_numeric_unsupported = numerics.iter().any(|n| !n.supported);

        // Rule 2: any numeric unsupported -> abstain.
        if any_numeric_unsupported {
            let mut missing = parsed.missing_information.clone();
            missing.push("one or more numeric claims could not be verified against cited passages".into());
            return AnswerArtifact::abstain(
                format!("abstained: unsupported numeric claim ({})", parsed.reasoning_notes),
                missing,
            );
        }

        // Rule 3: supported-term ratio or entity coverage below floor -> abstain.
        if term_ratio < SUPPORTED_TERM_FLOOR || entity_coverage < ENTITY_COVERAGE_FLOOR {
            let mut missing = parsed.missing_information.clone();
            missing.push(format!(
                "insufficient grounding (supported_term_ratio={term_ratio:.2}, entity_coverage={entity_coverage:.2})"
            ));
            return AnswerArtifact::abstain(
                format!("abstained: grounding below threshold ({})", parsed.reasoning_notes),
                missing,
            );
        }

        // Rule 4: accept the model's declared kind. Faithfulness is the model's own
        // self-reported score (the spec gives no local formula for it); completeness is
        // computed locally from the question's interrogative spine, never read from the
        // model's reply.
        let faithfulness = direct_faithfulness(parsed);
        let completeness = completeness_coverage(utterance, &parsed.answer_text);
        AnswerArtifact::direct(
            parsed.answer_text.clone(),
            faithfulness,
            completeness,
            parsed.missing_information.clone(),
            parsed.reasoning_notes.clone(),
            terms,
            entities,
            numerics,
            cited_ids,
        )
    }
}

fn direct_faithfulness(parsed: &StructuredResponse) -> f64 {
    use crate::schema::NumericOrNotApplicable::Numeric;
    match parsed.faithfulness {
        Numeric(n) => n,
        _ => unreachable!("parse_structured guarantees numeric faithfulness for a direct answer_kind"),
    }
}

/// Build the system/user prompt pair (spec §4.3 prompt contract): utterance, top-ranked
/// passage texts with stable ordinal identifiers, and a short history excerpt.
fn build_prompt(utterance: &str, passages: &[RetrievedPassage], history: &[Turn]) -> (String, String) {
    let system = "You are a grounded financial-product question-answering assistant. \
Answer only from the numbered passages provided. Respond with a single JSON object matching \
the required schema exactly, with no surrounding prose.".to_string();

    let mut user = String::new();
    if !history.is_empty() {
        user.push_str("Conversation so far:\n");
        for turn in history {
            user.push_str(&format!("{:?}: {}\n", turn.role, turn.text));
        }
        user.push('\n');
    }
    user.push_str("Passages:\n");
    for (i, passage) in passages.iter().enumerate() {
        user.push_str(&format!("[{}] {}\n", i + 1, passage.text));
    }
    user.push_str(&format!("\nQuestion: {utterance}\n"));
    (system, user)
}
