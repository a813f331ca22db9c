//! The Query-Time Service Facade (spec §4.6, component C6): glue wiring C5 (sessions) to
//! C4 (the router), which in turn drives C2/C3. The only entry point a caller needs.

use std::sync::Arc;

use cairn_core::{SessionId, Turn};
use cairn_router::ConversationalRouter;
use cairn_session::{SessionManager, SessionRecord};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::config::CairnConfig;

pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub metrics: Value,
    pub generated_by: &'static str,
}

pub struct CairnService {
    pub sessions: Arc<SessionManager>,
    router: Arc<ConversationalRouter>,
    // `GET/POST /chat-config` (spec §6) reads and replaces this snapshot. Updating it does
    // not retune the already-constructed router/retriever/session manager, which are wired
    // once at startup from the config loaded via `CairnConfig::load` — see DESIGN.md.
    config: RwLock<CairnConfig>,
}

impl CairnService {
    pub fn new(sessions: Arc<SessionManager>, router: Arc<ConversationalRouter>, config: CairnConfig) -> Self {
        Self { sessions, router, config: RwLock::new(config) }
    }

    pub async fn config_snapshot(&self) -> CairnConfig {
        self.config.read().await.clone()
    }

    pub async fn set_config(&self, cfg: CairnConfig) -> Result<(), cairn_error::Error> {
        cfg.validate()?;
        *self.config.write().await = cfg;
        Ok(())
    }

    pub fn create_session(&self) -> SessionRecord {
        self.sessions.create()
    }

    /// Seed-only `conversation_history` (spec's resolved Open Question): only honored at
    /// creation, to pre-populate the new session's rolling window; the session's own
    /// server-side history is authoritative for every turn afterward.
    pub fn create_session_with_history(&self, history: Vec<Turn>) -> SessionRecord {
        self.sessions.create_with_history(history)
    }

    pub async fn session_info(&self, id: SessionId) -> Result<SessionRecord, cairn_error::Error> {
        self.sessions.get(id).await
    }

    pub async fn extend_session(&self, id: SessionId) -> Result<i64, cairn_error::Error> {
        self.sessions.extend(id).await
    }

    pub fn end_session(&self, id: SessionId) {
        self.sessions.end(id)
    }

    /// `ask(sessionId, utterance) -> AnswerArtifact + diagnostics` (spec §4.6), under the
    /// per-request deadline (spec §5, default 60s).
    #[instrument(skip(self, utterance))]
    pub async fn ask(&self, id: SessionId, utterance: &str) -> Result<AskResponse, cairn_error::Error> {
        let mut guard = self.sessions.lock_session(id).await?;
        let deadline = self.config.read().await.request_deadline();

        let routed = tokio::time::timeout(deadline, self.router.route(&mut guard, utterance))
            .await
            .map_err(|_| cairn_error::Error::DeadlineExceeded)?
            .map_err(cairn_error::Error::from)?;

        let artifact = &routed.artifact;
        let metrics = serde_json::json!({
            "kind": artifact.kind,
            "abstained": artifact.abstained,
            "faithfulness": artifact.faithfulness(),
            "completeness": artifact.completeness(),
            "missing_information": artifact.missing_information,
            "rephrased": routed.diagnostics.rephrased,
            "processed_question": routed.diagnostics.processed_question,
        });

        Ok(AskResponse {
            answer: artifact.answer_text.clone(),
            sources: artifact.cited_passage_ids.clone(),
            metrics,
            generated_by: "cairn",
        })
    }
}
