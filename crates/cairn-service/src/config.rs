//! `CairnConfig`: the single configuration object for the service (spec §6's
//! `GET/POST /chat-config` shape), loaded with a layered `config`/`dotenvy` stack the way
//! the teacher loads its own runtime configuration, and validated at load time per spec §7
//! (`ConfigurationInvalid`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use cairn_generate::ChatOptions;
use cairn_retrieve::{HeuristicWeights, RetrieverConfig};
use cairn_router::RouterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    Semantic,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    Intelligent,
    Simple,
}

/// Hybrid retriever tuning (spec §6: `hybrid_config{ k_embed, k_bm25_chunk,
/// k_bm25_meta_docs, k_final, k_rrf }`). Stored as `i64` rather than `usize` so a negative
/// value in a config file is a validation error, not a deserialization error that never
/// reaches spec §7's `ConfigurationInvalid` path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridConfigSection {
    pub k_embed: i64,
    pub k_bm25_chunk: i64,
    pub k_bm25_meta_docs: i64,
    pub k_final: i64,
    pub k_rrf: i64,
}

impl Default for HybridConfigSection {
    fn default() -> Self {
        let defaults = RetrieverConfig::default();
        Self {
            k_embed: defaults.k_embed as i64,
            k_bm25_chunk: defaults.k_bm25_chunk as i64,
            k_bm25_meta_docs: defaults.k_bm25_meta_docs as i64,
            k_final: defaults.k_final as i64,
            k_rrf: defaults.k_rrf as i64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CairnConfig {
    pub retrieval_method: RetrievalMethod,
    pub routing_strategy: RoutingStrategy,
    pub retrieval_top_k: i64,
    pub similarity_threshold: f32,
    pub max_clarify: u32,
    pub reclarify_threshold: f32,
    pub window_k: i64,
    pub hybrid: HybridConfigSection,
    pub session_timeout_minutes: u64,
    pub sweep_interval_secs: u64,
    pub request_deadline_secs: u64,
    pub llm_timeout_secs: u64,
    pub storage_read_timeout_secs: u64,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_chat_model: String,
    pub llm_embed_model: String,
}

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            retrieval_method: RetrievalMethod::Hybrid,
            routing_strategy: RoutingStrategy::Intelligent,
            retrieval_top_k: 8,
            similarity_threshold: 0.6,
            max_clarify: 2,
            reclarify_threshold: 0.4,
            window_k: 8,
            hybrid: HybridConfigSection::default(),
            session_timeout_minutes: 30,
            sweep_interval_secs: 60,
            request_deadline_secs: 60,
            llm_timeout_secs: 30,
            storage_read_timeout_secs: 10,
            llm_base_url: "http://localhost:11434/v1".into(),
            llm_api_key: None,
            llm_chat_model: "gpt-4o-mini".into(),
            llm_embed_model: "text-embedding-3-small".into(),
        }
    }
}

impl CairnConfig {
    /// Layered load: defaults, then `config/cairn.toml` if present, then `CAIRN_*`
    /// environment variables (via `.env` through `dotenvy`), validated before return
    /// (spec §7: "Rejected at load time").
    pub fn load() -> Result<Self, cairn_error::Error> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&CairnConfig::default()).expect("default config always serializes"))
            .add_source(config::File::with_name("config/cairn").required(false))
            .add_source(config::Environment::with_prefix("CAIRN").separator("__"));

        let built = builder
            .build()
            .map_err(|e| cairn_error::Error::ConfigurationInvalid(format!("failed to build configuration: {e}")))?;

        let cfg: CairnConfig = built
            .try_deserialize()
            .map_err(|e| cairn_error::Error::ConfigurationInvalid(format!("failed to deserialize configuration: {e}")))?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), cairn_error::Error> {
        let mut problems = Vec::new();

        if self.reclarify_threshold >= self.similarity_threshold {
            problems.push(format!(
                "reclarify_threshold ({}) must be strictly less than similarity_threshold ({})",
                self.reclarify_threshold, self.similarity_threshold
            ));
        }
        if self.window_k < 1 {
            problems.push(format!("window_k ({}) must be >= 1", self.window_k));
        }
        for (name, value) in [
            ("retrieval_top_k", self.retrieval_top_k),
            ("hybrid.k_embed", self.hybrid.k_embed),
            ("hybrid.k_bm25_chunk", self.hybrid.k_bm25_chunk),
            ("hybrid.k_bm25_meta_docs", self.hybrid.k_bm25_meta_docs),
            ("hybrid.k_final", self.hybrid.k_final),
            ("hybrid.k_rrf", self.hybrid.k_rrf),
        ] {
            if value <= 0 {
                problems.push(format!("{name} ({value}) must be a positive integer"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(cairn_error::Error::ConfigurationInvalid(problems.join("; ")))
        }
    }

    /// Build the [`RetrieverConfig`] this configuration describes. Panics if `validate`
    /// has not already succeeded (the facade always validates at load time).
    pub fn retriever_config(&self) -> RetrieverConfig {
        let defaults = RetrieverConfig::default();
        RetrieverConfig {
            k_embed: self.hybrid.k_embed as usize,
            k_bm25_chunk: self.hybrid.k_bm25_chunk as usize,
            k_bm25_meta_docs: self.hybrid.k_bm25_meta_docs as usize,
            k_final: self.hybrid.k_final as usize,
            k_rrf: self.hybrid.k_rrf as usize,
            heuristic: HeuristicWeights::default(),
            ..defaults
        }
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            similarity_threshold: self.similarity_threshold,
            reclarify_threshold: self.reclarify_threshold,
            max_clarify: self.max_clarify,
        }
    }

    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions { timeout: Duration::from_secs(self.llm_timeout_secs), temperature: 0.0 }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}
