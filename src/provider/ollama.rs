use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{endpoint, CompletionBackend, ProviderError};
use crate::wire::{Completion, CompletionRequest};

pub const OLLAMA_BASE: &str = "http://localhost:11434";

pub struct Ollama {
    model: String,
    url: String,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Msg<'a>; 2],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: String,
}

impl Ollama {
    pub fn new(client: Client, model: String, url: Option<String>) -> Self {
        Self { model, url: url.unwrap_or_else(|| OLLAMA_BASE.into()), client }
    }
}

#[async_trait]
impl CompletionBackend for Ollama {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError> {
        let url = endpoint(&self.url, "api/chat");
        let body = ChatRequest {
            model: &self.model,
            messages: [
                Msg { role: "system", content: &req.system },
                Msg { role: "user", content: &req.user },
            ],
            stream: false,
            options: OllamaOptions { temperature: req.temperature, num_predict: req.max_tokens },
        };

        debug!(%url, "POST ollama chat");
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status { provider: "ollama", status: status.as_u16(), body: text });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("ollama: {e}")))?;
        Ok(Completion { text: parsed.message.content })
    }
}
