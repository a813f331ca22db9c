//! The chat/embedding collaborator (spec §6: "two operations — `embed`, `chat`. Both may
//! fail with a transport error or a timeout. The core wraps these in a retry policy of at
//! most one retry on transport errors, never on timeouts.").
//!
//! Object-safe via boxed futures, mirroring `cairn_store::IndexAdapter` and
//! `ploke_rag::core::Reranker` — callers hold `Arc<dyn LlmClient>`, never a concrete model
//! client type.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmFailure {
    Transport,
    Timeout,
}

#[derive(thiserror::Error, Debug)]
#[error("llm call failed: {kind:?}: {message}")]
pub struct LlmError {
    pub kind: LlmFailure,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub timeout: Duration,
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            temperature: 0.0,
        }
    }
}

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, LlmError>> + Send + 'a>>;

pub trait LlmClient: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFut<'a, Vec<f32>>;
    fn chat<'a>(&'a self, system: &'a str, user: &'a str, options: &'a ChatOptions) -> BoxFut<'a, String>;
}

/// Call `chat`, retrying once on a transport failure (never on a timeout), per spec §6.
pub async fn chat_with_retry(client: &dyn LlmClient, system: &str, user: &str, options: &ChatOptions) -> Result<String, LlmError> {
    match client.chat(system, user, options).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind == LlmFailure::Transport => client.chat(system, user, options).await,
        Err(e) => Err(e),
    }
}
