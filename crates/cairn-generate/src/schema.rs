//! Strict parser for the LLM's structured response (spec §4.3 prompt contract).
//!
//! "Strict. Any deviation from the schema fails with `StructuredResponseMalformed`; no
//! heuristic repair." Mirrors the teacher's precise, `#[serde(deny_unknown_fields)]`-style
//! response structs (`ploke_tui::llm2::response::OpenAiResponse` et al.) rather than a
//! permissive `serde_json::Value` walk.

use cairn_core::AnswerKind;
use serde::Deserialize;

use crate::error::GenerateError;

/// `faithfulness`/`completeness` per spec §4.3: "numeric in [0,1] or the token `n/a`".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericOrNotApplicable {
    Numeric(f64),
    NotApplicable,
}

impl<'de> Deserialize<'de> for NumericOrNotApplicable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(f64),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(NumericOrNotApplicable::Numeric(n)),
            Raw::Str(s) if s == "n/a" => Ok(NumericOrNotApplicable::NotApplicable),
            Raw::Str(other) => Err(serde::de::Error::custom(format!(
                "expected a number or the literal \"n/a\", got \"{other}\""
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredResponse {
    pub answer_text: String,
    pub answer_kind: AnswerKind,
    pub abstained: bool,
    pub faithfulness: NumericOrNotApplicable,
    pub completeness: NumericOrNotApplicable,
    #[serde(default)]
    pub missing_information: Vec<String>,
    pub reasoning_notes: String,
    #[serde(default)]
    pub clarification_question: Option<String>,
    /// 1-based ordinals into the passage list handed to the prompt (spec §4.3: "citation
    /// list referencing passage ordinals").
    #[serde(default)]
    pub citations: Vec<usize>,
}

/// Parse and semantically validate raw LLM output against the schema. Semantic checks
/// beyond what serde enforces: a `direct` response must carry numeric faithfulness and
/// completeness; a `clarification`/`abstain` response must carry `n/a` for both (spec §3
/// invariant, enforced here so a malformed pairing never reaches [`cairn_core::AnswerArtifact`]).
pub fn parse_structured(raw: &str) -> Result<StructuredResponse, GenerateError> {
    let parsed: StructuredResponse =
        serde_json::from_str(raw).map_err(|e| GenerateError::Malformed(e.to_string()))?;

    let numeric_pair_ok = match parsed.answer_kind {
        AnswerKind::Direct => {
            matches!(parsed.faithfulness, NumericOrNotApplicable::Numeric(_))
                && matches!(parsed.completeness, NumericOrNotApplicable::Numeric(_))
        }
        AnswerKind::Clarification | AnswerKind::Abstain => {
            matches!(parsed.faithfulness, NumericOrNotApplicable::NotApplicable)
                && matches!(parsed.completeness, NumericOrNotApplicable::NotApplicable)
        }
    };
    if !numeric_pair_ok {
        return Err(GenerateError::Malformed(format!(
            "faithfulness/completeness n/a-vs-numeric pairing does not match answer_kind {:?}",
            parsed.answer_kind
        )));
    }

    for &ordinal in &parsed.citations {
        if ordinal == 0 {
            return Err(GenerateError::Malformed(
                "citation ordinals are 1-based; 0 is not a valid passage reference".into(),
            ));
        }
    }

    Ok(parsed)
}
