//! The Conversational Router crate (spec §4.4, component C4): the FSM gluing the hybrid
//! retriever and answer generator into a turn-taking policy, including rephrasing,
//! clarification budgeting, and re-clarification thresholding.

pub mod config;
pub mod error;
pub mod ingest;
pub mod router;

pub use config::RouterConfig;
pub use error::RouterError;
pub use ingest::{ingest, IngestOutcome};
pub use router::{ClarifyReason, ConversationalRouter, RouteDecision, RouteDiagnostics, RouteOutcome};
