use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{endpoint, key_from_env, CompletionBackend, ProviderError};
use crate::wire::{Completion, CompletionRequest};

pub const ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    model: String,
    api_key: Option<String>,
    api_base: String,
    client: Client,
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Msg<'a>; 1],
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    r#type: String,
    #[serde(default)]
    text: String,
}

impl Anthropic {
    pub fn from_env(client: Client, model: String, api_base: Option<String>) -> Self {
        Self {
            model,
            api_key: key_from_env("ANTHROPIC_API_KEY"),
            api_base: api_base.unwrap_or_else(|| ANTHROPIC_BASE.into()),
            client,
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }
}

#[async_trait]
impl CompletionBackend for Anthropic {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials("ANTHROPIC_API_KEY"))?;

        let url = endpoint(&self.api_base, "v1/messages");
        let body = MsgRequest {
            model: &self.model,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            system: &req.system,
            messages: [Msg { role: "user", content: &req.user }],
        };

        debug!(%url, max_tokens = req.max_tokens, "POST anthropic message");
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status { provider: "anthropic", status: status.as_u16(), body: text });
        }

        let parsed: MsgResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("anthropic: {e}")))?;

        let joined: String = parsed
            .content
            .into_iter()
            .filter(|b| b.r#type == "text")
            .map(|b| b.text)
            .collect();
        if joined.is_empty() {
            return Err(ProviderError::Malformed("anthropic: no text blocks".into()));
        }
        Ok(Completion { text: joined })
    }
}
