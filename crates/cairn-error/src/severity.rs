//! Coarse error severity, mirrored after the teacher workspace's own severity
//! classification (`ploke-error::Severity`), trimmed to what this crate's taxonomy needs.

/// Coarse severity classification for an [`crate::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Normal, caller-facing outcome (e.g. an expired or unknown session). Not a bug.
    Expected,
    /// A collaborator (storage engine or LLM) failed; recoverable by retry elsewhere.
    Backend,
    /// Process-level misconfiguration; must not be allowed to start serving requests.
    Fatal,
}
