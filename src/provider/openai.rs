use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{endpoint, key_from_env, CompletionBackend, ProviderError};
use crate::wire::{Completion, CompletionRequest};

pub const TOGETHER_BASE: &str = "https://api.together.xyz/v1";
pub const OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Chat-completions client for OpenAI and for services speaking the same
/// wire format (Together).
pub struct OpenAiCompatible {
    label: &'static str,
    key_var: &'static str,
    api_key: Option<String>,
    base: String,
    model: String,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Msg<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatible {
    pub fn together(client: Client, model: String, base: Option<String>) -> Self {
        Self::new("together", "TOGETHER_API_KEY", client, model, base.unwrap_or_else(|| TOGETHER_BASE.into()))
    }

    pub fn openai(client: Client, model: String, base: Option<String>) -> Self {
        Self::new("openai", "OPENAI_API_KEY", client, model, base.unwrap_or_else(|| OPENAI_BASE.into()))
    }

    fn new(label: &'static str, key_var: &'static str, client: Client, model: String, base: String) -> Self {
        Self { label, key_var, api_key: key_from_env(key_var), base, model, client }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatible {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials(self.key_var))?;

        let url = endpoint(&self.base, "chat/completions");
        let body = ChatRequest {
            model: &self.model,
            messages: [
                Msg { role: "system", content: &req.system },
                Msg { role: "user", content: &req.user },
            ],
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        };

        debug!(provider = self.label, %url, max_tokens = req.max_tokens, "POST chat completion");
        let resp = self.client.post(&url).bearer_auth(api_key).json(&body).send().await?;

        let status = resp.status();
        let text = resp.text().await?;
        debug!(provider = self.label, status = status.as_u16(), bytes = text.len(), "chat completion answered");

        if !status.is_success() {
            return Err(ProviderError::Status { provider: self.label, status: status.as_u16(), body: text });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("{}: {e}", self.label)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| Completion { text })
            .ok_or_else(|| ProviderError::Malformed(format!("{}: no choices in response", self.label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{bearer_token, body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "You are an expert web developer.".into(),
            user: "landing page for a bakery".into(),
            max_tokens: 300,
            temperature: 0.7,
        }
    }

    fn backend(server: &MockServer, key: Option<&str>) -> OpenAiCompatible {
        OpenAiCompatible::together(Client::new(), "test-model".into(), Some(server.uri()))
            .with_api_key(key.map(String::from))
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "max_tokens": 300,
                "messages": [
                    { "role": "system", "content": "You are an expert web developer." },
                    { "role": "user", "content": "landing page for a bakery" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "<html></html>" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = backend(&server, Some("sk-test")).complete(&request()).await.unwrap();
        assert_eq!(out.text, "<html></html>");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = backend(&server, Some("sk-test")).complete(&request()).await.unwrap_err();
        match err {
            ProviderError::Status { status, body, .. } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = backend(&server, Some("sk-test")).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = backend(&server, None).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredentials("TOGETHER_API_KEY")));
    }
}
