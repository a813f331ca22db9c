//! Shared data model for the Cairn retrieval-augmented QA core (spec §3).
//!
//! This crate holds only plain data and the invariants that are cheap to enforce at
//! construction time (e.g. a clamped authority score). Behavior — retrieval, generation,
//! routing, session lifecycle — lives in the crates that consume these types.

pub mod answer;
pub mod document;
pub mod filter;
pub mod ids;
pub mod passage;
pub mod session;

pub use answer::{AnswerArtifact, AnswerKind, EntityGrounding, NumericFinding, SupportedTerm};
pub use document::{Chunk, DocKind, Document};
pub use filter::Filter;
pub use ids::{ChunkId, DocId, SessionId};
pub use passage::{RetrievedPassage, SignalScores};
pub use session::{Role, Session, Turn};
