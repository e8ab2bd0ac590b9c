use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::wire::{Completion, CompletionRequest};

pub mod anthropic;
pub mod ollama;
pub mod openai;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} env var is not set")]
    MissingCredentials(&'static str),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{provider} API error ({status}): {body}")]
    Status { provider: &'static str, status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A text-completion service: one system prompt, one user message, one answer.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError>;
}

pub type DynBackend = Arc<dyn CompletionBackend>;

pub fn make_backend(cfg: &Config) -> Result<DynBackend, ProviderError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;
    let base = cfg.api_base.clone();
    let model = cfg.model.clone();

    let backend: DynBackend = match cfg.provider {
        ProviderKind::Together => Arc::new(openai::OpenAiCompatible::together(client, model, base)),
        ProviderKind::OpenAI => Arc::new(openai::OpenAiCompatible::openai(client, model, base)),
        ProviderKind::Anthropic => Arc::new(anthropic::Anthropic::from_env(client, model, base)),
        ProviderKind::Ollama => Arc::new(ollama::Ollama::new(client, model, base)),
    };
    Ok(backend)
}

/// Reads an API key, treating an empty value like a missing one.
pub(crate) fn key_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.trim().is_empty())
}

pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
