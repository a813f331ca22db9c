//! Library half of `cairn-service`: configuration, the HTTP-backed LLM collaborator, the
//! query-time facade (C6), and the axum HTTP surface. `main.rs` wires these with a real
//! storage adapter and serves them.

pub mod config;
pub mod error;
pub mod facade;
pub mod http;
pub mod llm_client;

pub use config::CairnConfig;
pub use facade::{AskResponse, CairnService};
pub use llm_client::HttpLlmClient;
