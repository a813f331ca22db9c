//! Workspace-wide error taxonomy for the Cairn retrieval-augmented QA core.
//!
//! A single [`Error`] enum is shared across crates, mirroring the surfaced-kind taxonomy
//! in the specification (§7): callers match on variants, not on crate-local types.
//! Library code returns [`Result`] and propagates with `?`; only the facade decides how an
//! error is rendered to a caller (HTTP status, log line, etc).

use std::fmt;
use uuid::Uuid;

pub mod severity;
pub use severity::Severity;

/// Workspace-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Surfaced error kinds. Variant names match the taxonomy in spec §7 so that logs and
/// HTTP error bodies can report a stable, machine-readable `kind`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Caller's session id is unknown or has expired.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// Every sub-retriever in the hybrid retriever failed.
    #[error("retrieval backend failure: {0}")]
    RetrievalBackendFailure(String),

    /// The LLM collaborator was unavailable after the allowed retry.
    #[error("generation backend failure: {0}")]
    GenerationBackendFailure(String),

    /// The LLM's structured response did not conform to the schema after one repair
    /// attempt.
    #[error("structured response malformed: {0}")]
    StructuredResponseMalformed(String),

    /// The per-request deadline elapsed before a terminal result was produced.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Configuration failed validation at load time (e.g. `reclarify_threshold >=
    /// similarity_threshold`, negative k, `window_k < 1`).
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}

impl Error {
    /// Coarse classification for programmatic handling (logging level, HTTP status).
    pub fn severity(&self) -> Severity {
        match self {
            Error::SessionNotFound(_) => Severity::Expected,
            Error::RetrievalBackendFailure(_) => Severity::Backend,
            Error::GenerationBackendFailure(_) => Severity::Backend,
            Error::StructuredResponseMalformed(_) => Severity::Backend,
            Error::DeadlineExceeded => Severity::Expected,
            Error::ConfigurationInvalid(_) => Severity::Fatal,
        }
    }

    /// The machine-readable kind string used in HTTP error bodies and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SessionNotFound(_) => "SessionNotFound",
            Error::RetrievalBackendFailure(_) => "RetrievalBackendFailure",
            Error::GenerationBackendFailure(_) => "GenerationBackendFailure",
            Error::StructuredResponseMalformed(_) => "StructuredResponseMalformed",
            Error::DeadlineExceeded => "DeadlineExceeded",
            Error::ConfigurationInvalid(_) => "ConfigurationInvalid",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_for_matching() {
        let e = Error::SessionNotFound(Uuid::nil());
        assert_eq!(e.kind(), "SessionNotFound");
        assert_eq!(e.severity(), Severity::Expected);
    }

    #[test]
    fn configuration_invalid_is_fatal() {
        let e = Error::ConfigurationInvalid("reclarify_threshold >= similarity_threshold".into());
        assert_eq!(e.severity(), Severity::Fatal);
    }
}
