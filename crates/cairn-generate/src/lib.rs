//! The Answer Generator crate (spec §4.3, component C3): turns a retrieved passage set
//! plus a user utterance into a grounded [`cairn_core::AnswerArtifact`], computing every
//! grounding metric locally rather than trusting the model's self-report.

pub mod error;
pub mod generator;
pub mod grounding;
pub mod llm;
pub mod schema;

pub use error::GenerateError;
pub use generator::{AnswerGenerator, GenerationDiagnostics};
pub use llm::{chat_with_retry, ChatOptions, LlmClient, LlmError, LlmFailure};
pub use schema::{parse_structured, NumericOrNotApplicable, StructuredResponse};
