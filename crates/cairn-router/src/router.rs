//! The Conversational Router (spec §4.4, component C4): a finite state machine over
//! {INGEST, RETRIEVE, ROUTE, ANSWER, CLARIFY, END}.

use std::sync::Arc;

use cairn_core::{AnswerArtifact, AnswerKind, Session, Turn};
use cairn_generate::{AnswerGenerator, ChatOptions, LlmClient};
use cairn_retrieve::{HybridRetriever, RetrievalDiagnostics};
use tracing::{info, instrument};

use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::ingest::ingest;

/// Why the router chose CLARIFY over ANSWER, or `None` for an ANSWER transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarifyReason {
    NoEvidence,
    LowConfidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Answer,
    Clarify(ClarifyReason),
}

/// Everything the facade needs to log or expose about one `ask` beyond the artifact
/// itself.
#[derive(Debug, Clone)]
pub struct RouteDiagnostics {
    pub processed_question: String,
    pub rephrased: bool,
    pub ingest_summary: String,
    pub retrieval: Option<RetrievalDiagnostics>,
    pub decision: RouteDecision,
}

pub struct RouteOutcome {
    pub artifact: AnswerArtifact,
    pub diagnostics: RouteDiagnostics,
}

pub struct ConversationalRouter {
    retriever: Arc<HybridRetriever>,
    generator: Arc<AnswerGenerator>,
    rephrase_llm: Option<Arc<dyn LlmClient>>,
    config: RouterConfig,
    chat_options: ChatOptions,
}

impl ConversationalRouter {
    pub fn new(
        retriever: Arc<HybridRetriever>,
        generator: Arc<AnswerGenerator>,
        rephrase_llm: Option<Arc<dyn LlmClient>>,
        config: RouterConfig,
    ) -> Self {
        Self { retriever, generator, rephrase_llm, config, chat_options: ChatOptions::default() }
    }

    /// Run one full request through the FSM (spec §4.4). Mutates `session` in place:
    /// appends the resulting assistant turn, advances or resets `clarify_count`, and sets
    /// or clears `pending_question`.
    ///
    /// Propagates only `RetrievalBackendFailure` raised during RETRIEVE (spec §4.4: "any
    /// backend failure in a node produces an abstention artifact at END ... except
    /// `RetrievalBackendFailure` during RETRIEVE which is propagated to the caller").
    #[instrument(skip(self, session, utterance), fields(utterance_len = utterance.len()))]
    pub async fn route(&self, session: &mut Session, utterance: &str) -> Result<RouteOutcome, RouterError> {
        let pending = session.pending_question.take();
        let history_so_far: Vec<Turn> = session.history().iter().cloned().collect();
        let ingest_outcome = ingest(utterance, &history_so_far, pending, self.rephrase_llm.as_ref(), &self.chat_options).await;

        let retrieval = self
            .retriever
            .retrieve(&ingest_outcome.processed_question, None)
            .await
            .map_err(RouterError::from)?;

        let decision = self.decide(&retrieval.passages, session.clarify_count);
        info!(?decision, processed_question = %ingest_outcome.processed_question, "router decision");

        let artifact = match decision {
            RouteDecision::Answer => {
                session.append_turn(Turn::user(utterance));
                let history: Vec<Turn> = session.history().iter().cloned().collect();
                let artifact = match self
                    .generator
                    .generate(&ingest_outcome.processed_question, &retrieval.passages, &history)
                    .await
                {
                    Ok((artifact, _diag)) => artifact,
                    Err(e) => AnswerArtifact::abstain(
                        format!("generation backend failure: {e}"),
                        vec!["generator was unavailable for this request".into()],
                    ),
                };
                session.clarify_count = 0;
                let mut assistant_turn = Turn::assistant(artifact.answer_text.clone());
                assistant_turn.sources = artifact.cited_passage_ids.clone();
                assistant_turn.metrics = Some(serde_json::json!({
                    "faithfulness": artifact.faithfulness(),
                    "completeness": artifact.completeness(),
                    "kind": artifact.kind,
                }));
                session.append_turn(assistant_turn);
                artifact
            }
            RouteDecision::Clarify(reason) => {
                session.append_turn(Turn::user(utterance));
                let history: Vec<Turn> = session.history().iter().cloned().collect();
                let clarification_text = self
                    .synthesize_clarification(&ingest_outcome.processed_question, &retrieval.passages, &history, reason)
                    .await;
                session.clarify_count += 1;
                session.pending_question = Some(ingest_outcome.processed_question.clone());
                let artifact = AnswerArtifact::clarification(
                    clarification_text.clone(),
                    format!("clarifying due to {reason:?}"),
                );
                session.append_turn(Turn::assistant(clarification_text));
                artifact
            }
        };

        Ok(RouteOutcome {
            artifact,
            diagnostics: RouteDiagnostics {
                processed_question: ingest_outcome.processed_question,
                rephrased: ingest_outcome.rephrased,
                ingest_summary: ingest_outcome.summary,
                retrieval: Some(retrieval.diagnostics),
                decision,
            },
        })
    }

    /// ROUTE node policy (spec §4.4, exact decision tree).
    fn decide(&self, passages: &[cairn_core::RetrievedPassage], clarify_count: u32) -> RouteDecision {
        let c = clarify_count;
        let m = self.config.max_clarify;
        let t = self.config.similarity_threshold;
        let r = self.config.reclarify_threshold;

        if passages.is_empty() {
            return if c >= m {
                RouteDecision::Answer
            } else {
                RouteDecision::Clarify(ClarifyReason::NoEvidence)
            };
        }

        let s = highest_similarity(passages);

        if s >= t {
            RouteDecision::Answer
        } else if s < r && c < m {
            RouteDecision::Clarify(ClarifyReason::LowConfidence)
        } else {
            RouteDecision::Answer
        }
    }

    /// CLARIFY node (spec §4.4): prefer the generator's own clarification, falling back to
    /// a diagnostics-synthesized question. This is the router's one allowed generator call
    /// for a CLARIFY transition (mutually exclusive with the ANSWER branch's call, so the
    /// "at most one generator call per request" guarantee holds either way).
    async fn synthesize_clarification(
        &self,
        processed_question: &str,
        passages: &[cairn_core::RetrievedPassage],
        history: &[Turn],
        reason: ClarifyReason,
    ) -> String {
        if !passages.is_empty() {
            if let Ok((artifact, _diag)) = self.generator.generate(processed_question, passages, history).await {
                if artifact.kind == AnswerKind::Clarification {
                    return artifact
                        .clarification_text
                        .unwrap_or(artifact.answer_text);
                }
            }
        }

        match reason {
            ClarifyReason::NoEvidence => format!(
                "I couldn't find anything matching \"{processed_question}\". Could you rephrase or add more detail, such as a product name or date?"
            ),
            ClarifyReason::LowConfidence => {
                let topics: Vec<&str> = passages
                    .iter()
                    .map(|p| p.document.location.as_str())
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .take(2)
                    .collect();
                if topics.len() >= 2 {
                    format!(
                        "I found a few possible matches for \"{processed_question}\" (e.g. {} or {}). Which did you mean?",
                        topics[0], topics[1]
                    )
                } else {
                    format!("I'm not confident I found the right answer for \"{processed_question}\". Could you provide more detail?")
                }
            }
        }
    }
}

fn highest_similarity(passages: &[cairn_core::RetrievedPassage]) -> f32 {
    let best_dense = passages.iter().filter_map(|p| p.scores.dense).fold(f32::MIN, f32::max);
    if best_dense > f32::MIN {
        best_dense
    } else {
        passages.iter().map(|p| p.fused_score).fold(f32::MIN, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::document::DocKind;
    use cairn_core::ids::{ChunkId, DocId};
    use cairn_core::passage::{DocumentSnapshot, SignalScores};
    use cairn_core::RetrievedPassage;

    fn passage_with_dense(dense: f32) -> RetrievedPassage {
        RetrievedPassage {
            chunk_id: ChunkId::new(&DocId("d".into()), 0),
            text: "body".into(),
            scores: SignalScores { dense: Some(dense), bm25_chunk: None, bm25_meta: None, heuristic: 0.0 },
            fused_score: dense,
            document: DocumentSnapshot {
                doc_id: DocId("d".into()),
                kind: DocKind::Faq,
                location: "fixtures/d.md".into(),
                authority_score: 0.7,
                categories: vec![],
                product_entities: vec![],
            },
            rank: 1,
        }
    }

    fn default_router_config() -> RouterConfig {
        RouterConfig { similarity_threshold: 0.6, reclarify_threshold: 0.4, max_clarify: 2 }
    }

    #[test]
    fn no_passages_and_budget_available_clarifies() {
        let cfg = default_router_config();
        let router = TestRouter(cfg);
        assert_eq!(router.decide(&[], 0), RouteDecision::Clarify(ClarifyReason::NoEvidence));
    }

    #[test]
    fn no_passages_and_exhausted_budget_answers() {
        let cfg = default_router_config();
        let router = TestRouter(cfg);
        assert_eq!(router.decide(&[], 2), RouteDecision::Answer);
    }

    #[test]
    fn high_similarity_answers_directly() {
        let cfg = default_router_config();
        let router = TestRouter(cfg);
        assert_eq!(router.decide(&[passage_with_dense(0.9)], 0), RouteDecision::Answer);
    }

    #[test]
    fn low_similarity_under_budget_clarifies() {
        let cfg = default_router_config();
        let router = TestRouter(cfg);
        assert_eq!(
            router.decide(&[passage_with_dense(0.2)], 0),
            RouteDecision::Clarify(ClarifyReason::LowConfidence)
        );
    }

    #[test]
    fn low_similarity_over_budget_answers_as_safety_net() {
        let cfg = default_router_config();
        let router = TestRouter(cfg);
        assert_eq!(router.decide(&[passage_with_dense(0.2)], 2), RouteDecision::Answer);
    }

    #[test]
    fn mid_band_similarity_answers_via_generator_safety_net() {
        let cfg = default_router_config();
        let router = TestRouter(cfg);
        // S = 0.5: not >= T(0.6), not < R(0.4), so falls to the final "else -> Answer" arm.
        assert_eq!(router.decide(&[passage_with_dense(0.5)], 0), RouteDecision::Answer);
    }

    /// A decision-only stand-in that exposes `decide` without constructing the full
    /// `ConversationalRouter` (which needs live retriever/generator collaborators).
    struct TestRouter(RouterConfig);
    impl TestRouter {
        fn decide(&self, passages: &[RetrievedPassage], clarify_count: u32) -> RouteDecision {
            let c = clarify_count;
            let m = self.0.max_clarify;
            let t = self.0.similarity_threshold;
            let r = self.0.reclarify_threshold;
            if passages.is_empty() {
                return if c >= m { RouteDecision::Answer } else { RouteDecision::Clarify(ClarifyReason::NoEvidence) };
            }
            let s = highest_similarity(passages);
            if s >= t {
                RouteDecision::Answer
            } else if s < r && c < m {
                RouteDecision::Clarify(ClarifyReason::LowConfidence)
            } else {
                RouteDecision::Answer
            }
        }
    }
}
