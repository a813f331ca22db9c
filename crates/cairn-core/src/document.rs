//! `Document` and `Chunk` (spec §3).
//!
//! A `Document` is created once on ingestion and is immutable thereafter except by a
//! full re-ingestion replacement (out of scope for this crate; the out-of-scope ingestion
//! pipeline owns that lifecycle). A `Chunk` holds only a reference to its owning document,
//! never a copy of document-level metadata — the arena-plus-identifier pattern from spec §9.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChunkId, DocId};

/// The kind of source document, used both as a metadata facet and as an authority-score
/// input (spec §3: authority score is an average of domain authority and document-kind
/// authority).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    Promo,
    Disclosure,
    Terms,
    Faq,
    Landing,
    Form,
    Other,
}

impl DocKind {
    /// A fixed, coarse authority prior per kind; combined with a domain authority score
    /// (supplied by the out-of-scope ingestion pipeline) to derive [`Document::authority_score`].
    /// Disclosures and terms are the most authoritative kind of passage for a financial-product
    /// QA corpus; promotional landing copy the least.
    pub fn kind_authority(self) -> f64 {
        match self {
            DocKind::Disclosure => 1.0,
            DocKind::Terms => 0.95,
            DocKind::Faq => 0.7,
            DocKind::Form => 0.6,
            DocKind::Landing => 0.5,
            DocKind::Promo => 0.4,
            DocKind::Other => 0.3,
        }
    }
}

/// A source document. Created once on ingestion; immutable thereafter except for a
/// re-ingestion replacement performed by the out-of-scope ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub location: String,
    pub kind: DocKind,
    pub language: String,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub effective_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub geographic_scope: Option<String>,
    pub currency: Option<String>,
    pub product_entities: Vec<String>,
    pub categories: Vec<String>,
    /// Authority score in `[0, 1]`; always the average of a domain authority (supplied by
    /// ingestion) and [`DocKind::kind_authority`]. Clamped at construction so the invariant
    /// in spec §3 ("authority score MUST lie in [0,1]") can never be violated downstream.
    authority_score: f64,
    pub provenance_path: String,
}

impl Document {
    /// Construct a document, deriving `authority_score` from `domain_authority` and the
    /// document kind's fixed authority prior, clamped to `[0, 1]`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DocId,
        location: String,
        kind: DocKind,
        language: String,
        domain_authority: f64,
        provenance_path: String,
    ) -> Self {
        let authority_score = ((domain_authority.clamp(0.0, 1.0) + kind.kind_authority()) / 2.0)
            .clamp(0.0, 1.0);
        Self {
            id,
            location,
            kind,
            language,
            published_at: None,
            updated_at: None,
            effective_at: None,
            expires_at: None,
            geographic_scope: None,
            currency: None,
            product_entities: Vec::new(),
            categories: Vec::new(),
            authority_score,
            provenance_path,
        }
    }

    /// Authority score in `[0, 1]`. Guaranteed in-range by construction.
    pub fn authority_score(&self) -> f64 {
        self.authority_score
    }

    /// Concatenated title-equivalent + categories + product entities + doc kind text, used
    /// as the corpus for `bm25_meta` (spec §4.1).
    pub fn metadata_text(&self) -> String {
        format!(
            "{} {} {} {:?}",
            self.location,
            self.categories.join(" "),
            self.product_entities.join(" "),
            self.kind
        )
    }
}

/// A bounded text window of a document carrying its own metadata — the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: DocId,
    pub position: usize,
    pub text: String,
    pub token_count: usize,
    pub contains_numbers: bool,
    pub contains_currency: bool,
    pub start_line: usize,
    pub end_line: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub embedding_model_version: String,
}

impl Chunk {
    /// Heuristically detect numbers/currency markers and fill the corresponding flags.
    /// Real ingestion may compute these more precisely; this is the reference used by the
    /// in-memory store and by tests.
    pub fn with_detected_flags(mut self) -> Self {
        self.contains_numbers = self.text.chars().any(|c| c.is_ascii_digit());
        self.contains_currency = self.text.contains('$')
            || self.text.contains('€')
            || self.text.contains('£')
            || self.text.to_lowercase().contains("usd");
        self
    }
}
