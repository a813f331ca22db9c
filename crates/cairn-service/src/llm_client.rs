//! HTTP-backed LLM collaborator (spec §6: "two operations — `embed`, `chat`"), talking to
//! an OpenAI-compatible completions API over `reqwest`. Response shapes mirror the
//! teacher's tolerant `#[serde(default)]` style (`ploke_tui::llm2::response::OpenAiResponse`)
//! rather than a strict schema, since this is a third-party wire format we don't control.

use std::future::Future;
use std::pin::Pin;

use cairn_generate::{ChatOptions, LlmClient, LlmError, LlmFailure};
use cairn_retrieve::{EmbedError, Embedder};
use serde::{Deserialize, Serialize};

pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embed_model: String,
}

impl HttpLlmClient {
    pub fn new(base_url: String, api_key: Option<String>, chat_model: String, embed_model: String) -> Self {
        Self { http: reqwest::Client::new(), base_url, api_key, chat_model, embed_model }
    }

    fn classify(err: &reqwest::Error) -> LlmFailure {
        if err.is_timeout() {
            LlmFailure::Timeout
        } else {
            LlmFailure::Transport
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Deserialize, Debug, Default)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug, Default)]
struct ChatChoice {
    #[serde(default)]
    message: ResponseMessage,
}

#[derive(Deserialize, Debug, Default)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize, Debug, Default)]
struct EmbeddingDatum {
    #[serde(default)]
    embedding: Vec<f32>,
}

impl LlmClient for HttpLlmClient {
    fn embed<'a>(&'a self, text: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            let body = EmbeddingRequest { model: &self.embed_model, input: text };
            let req = self.authed(self.http.post(format!("{}/embeddings", self.base_url)).json(&body));
            let resp = req.send().await.map_err(|e| LlmError { kind: Self::classify(&e), message: e.to_string() })?;
            let resp = resp
                .error_for_status()
                .map_err(|e| LlmError { kind: Self::classify(&e), message: e.to_string() })?;
            let parsed: EmbeddingResponse = resp
                .json()
                .await
                .map_err(|e| LlmError { kind: LlmFailure::Transport, message: format!("malformed embedding response: {e}") })?;
            parsed
                .data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .ok_or_else(|| LlmError { kind: LlmFailure::Transport, message: "embedding response had no data".into() })
        })
    }

    fn chat<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        options: &'a ChatOptions,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            let body = ChatRequest {
                model: &self.chat_model,
                temperature: options.temperature,
                messages: [ChatMessage { role: "system", content: system }, ChatMessage { role: "user", content: user }],
            };
            let req = self
                .authed(self.http.post(format!("{}/chat/completions", self.base_url)).json(&body))
                .timeout(options.timeout);
            let resp = req.send().await.map_err(|e| LlmError { kind: Self::classify(&e), message: e.to_string() })?;
            let resp = resp
                .error_for_status()
                .map_err(|e| LlmError { kind: Self::classify(&e), message: e.to_string() })?;
            let parsed: ChatResponse = resp
                .json()
                .await
                .map_err(|e| LlmError { kind: LlmFailure::Transport, message: format!("malformed chat response: {e}") })?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| LlmError { kind: LlmFailure::Transport, message: "chat response had no content".into() })
        })
    }
}

/// Bridges `HttpLlmClient`'s embedding operation into `cairn_retrieve`'s narrower
/// `Embedder` seam, so the same collaborator configuration serves both the retriever and
/// the generator without a second HTTP client.
impl Embedder for HttpLlmClient {
    fn embed<'a>(&'a self, text: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, EmbedError>> + Send + 'a>> {
        Box::pin(async move { LlmClient::embed(self, text).await.map_err(|e| EmbedError::Unavailable(e.to_string())) })
    }
}
