//! `AnswerArtifact` (spec §3) and the invariants §8 requires of it:
//!
//! - a clarification or abstention artifact MUST carry `faithfulness`/`completeness` as
//!   n/a (`None` here);
//! - a direct artifact MUST carry numeric values for both;
//! - every grounding span MUST index into the answer text;
//! - every cited passage identifier MUST appear in the retrieval set (checked by the
//!   generator, which has the retrieval set in scope — this crate only has the answer).
//!
//! The three constructors (`direct`, `clarification`, `abstain`) are the only way to build
//! an [`AnswerArtifact`], so the faithfulness/completeness invariant is enforced by
//! construction rather than by a separate validation pass.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    Direct,
    Clarification,
    Abstain,
}

/// A term in the answer text found supported by at least one cited passage, with its
/// IDF weight against the retrieved-passage corpus (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedTerm {
    pub term: String,
    pub spans: Vec<(usize, usize)>,
    pub idf_weight: f64,
    pub supported: bool,
}

/// A named entity recognized in the answer text, with its grounding status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityGrounding {
    pub text: String,
    pub entity_type: String,
    pub spans: Vec<(usize, usize)>,
    pub supported: bool,
}

/// A numeric token (currency, percentage, integer) found in the answer text, with
/// whether it appears verbatim (after normalization) in a cited passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericFinding {
    pub token: String,
    pub span: (usize, usize),
    pub supported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerArtifact {
    pub answer_text: String,
    pub kind: AnswerKind,
    pub abstained: bool,
    faithfulness: Option<f64>,
    completeness: Option<f64>,
    pub missing_information: Vec<String>,
    pub reasoning_notes: String,
    pub clarification_text: Option<String>,
    pub supported_terms: Vec<SupportedTerm>,
    pub entities: Vec<EntityGrounding>,
    pub numeric_findings: Vec<NumericFinding>,
    pub cited_passage_ids: Vec<String>,
}

impl AnswerArtifact {
    /// A direct answer. `faithfulness`/`completeness` are clamped to `[0, 1]`.
    #[allow(clippy::too_many_arguments)]
    pub fn direct(
        answer_text: String,
        faithfulness: f64,
        completeness: f64,
        missing_information: Vec<String>,
        reasoning_notes: String,
        supported_terms: Vec<SupportedTerm>,
        entities: Vec<EntityGrounding>,
        numeric_findings: Vec<NumericFinding>,
        cited_passage_ids: Vec<String>,
    ) -> Self {
        Self {
            answer_text,
            kind: AnswerKind::Direct,
            abstained: false,
            faithfulness: Some(faithfulness.clamp(0.0, 1.0)),
            completeness: Some(completeness.clamp(0.0, 1.0)),
            missing_information,
            reasoning_notes,
            clarification_text: None,
            supported_terms,
            entities,
            numeric_findings,
            cited_passage_ids,
        }
    }

    /// A clarification request. `faithfulness`/`completeness` are always n/a.
    pub fn clarification(clarification_text: String, reasoning_notes: String) -> Self {
        Self {
            answer_text: clarification_text.clone(),
            kind: AnswerKind::Clarification,
            abstained: false,
            faithfulness: None,
            completeness: None,
            missing_information: Vec::new(),
            reasoning_notes,
            clarification_text: Some(clarification_text),
            supported_terms: Vec::new(),
            entities: Vec::new(),
            numeric_findings: Vec::new(),
            cited_passage_ids: Vec::new(),
        }
    }

    /// An abstention. `faithfulness`/`completeness` are always n/a.
    pub fn abstain(reasoning_notes: String, missing_information: Vec<String>) -> Self {
        Self {
            answer_text: String::new(),
            kind: AnswerKind::Abstain,
            abstained: true,
            faithfulness: None,
            completeness: None,
            missing_information,
            reasoning_notes,
            clarification_text: None,
            supported_terms: Vec::new(),
            entities: Vec::new(),
            numeric_findings: Vec::new(),
            cited_passage_ids: Vec::new(),
        }
    }

    pub fn faithfulness(&self) -> Option<f64> {
        self.faithfulness
    }

    pub fn completeness(&self) -> Option<f64> {
        self.completeness
    }

    /// True if every grounding span (supported-term and entity spans) indexes within
    /// `answer_text`'s byte length. Used by tests and by the generator as a sanity check
    /// before returning an artifact.
    pub fn spans_are_in_bounds(&self) -> bool {
        let len = self.answer_text.len();
        let check = |spans: &[(usize, usize)]| spans.iter().all(|&(s, e)| s <= e && e <= len);
        self.supported_terms.iter().all(|t| check(&t.spans))
            && self.entities.iter().all(|e| check(&e.spans))
            && self.numeric_findings.iter().all(|n| {
                let (s, e) = n.span;
                s <= e && e <= len
            })
    }
}
