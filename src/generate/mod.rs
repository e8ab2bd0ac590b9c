//! Turns generation requests into backend calls and sanitized results.
//!
//! A full page is three calls in a fixed order: markup, stylesheet, script.
//! The first failing call aborts the whole page; nothing generated before it
//! is returned.

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{Config, TokenLimits};
use crate::errors::{Result, WebmindError};
use crate::instruct::{self, Intent};
use crate::prompt::{self, EditTemplate};
use crate::provider::{DynBackend, ProviderError};
use crate::sanitize::{sanitize, SanitizeMode};
use crate::wire::{
    ArtifactKind, CompletionRequest, GeneratedDocument, GenerationKind, GenerationOutput, GenerationRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    Started(ArtifactKind),
    Finished { stage: ArtifactKind, bytes: usize },
}

pub const PAGE_STAGES: [ArtifactKind; 3] = [ArtifactKind::Markup, ArtifactKind::Stylesheet, ArtifactKind::Script];

pub struct GenerationClient {
    backend: DynBackend,
    limits: TokenLimits,
    temperature: f32,
}

impl GenerationClient {
    pub fn new(backend: DynBackend, limits: TokenLimits, temperature: f32) -> Self {
        Self { backend, limits, temperature }
    }

    pub fn from_config(backend: DynBackend, cfg: &Config) -> Self {
        Self::new(backend, cfg.limits.clone(), cfg.temperature)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn generate(&self, req: &GenerationRequest) -> Result<GenerationOutput> {
        req.validate()?;
        match req.kind {
            GenerationKind::FullPage => self
                .generate_page(&req.prompt, req.category.as_deref(), req.theme_color.as_deref())
                .await
                .map(GenerationOutput::Document),
            GenerationKind::SectionEdit => self
                .edit_section(
                    req.existing_content.as_deref().unwrap_or_default(),
                    req.instructions.as_deref().unwrap_or_default(),
                    req.category.as_deref(),
                )
                .await
                .map(GenerationOutput::Text),
            GenerationKind::TextImprovement => self
                .improve_text(&req.prompt, req.category.as_deref())
                .await
                .map(GenerationOutput::Text),
        }
    }

    pub async fn generate_page(
        &self,
        prompt: &str,
        category: Option<&str>,
        theme_color: Option<&str>,
    ) -> Result<GeneratedDocument> {
        self.generate_page_observed(prompt, category, theme_color, |_| {}).await
    }

    pub async fn generate_page_observed<F>(
        &self,
        prompt: &str,
        category: Option<&str>,
        theme_color: Option<&str>,
        mut observe: F,
    ) -> Result<GeneratedDocument>
    where
        F: FnMut(StageEvent),
    {
        GenerationRequest::full_page(prompt, category.map(String::from), theme_color.map(String::from))
            .validate()?;

        let span = info_span!("generate_page", backend = self.backend.name(), category = category.unwrap_or("-"));
        async {
            info!(prompt_len = prompt.len(), theme = theme_color.unwrap_or("-"), "generating page");
            let mut artifacts = Vec::with_capacity(PAGE_STAGES.len());
            for stage in PAGE_STAGES {
                observe(StageEvent::Started(stage));
                let (system, ceiling) = match stage {
                    ArtifactKind::Markup => (prompt::system_prompt_markup(prompt, theme_color), self.limits.markup),
                    ArtifactKind::Stylesheet => {
                        (prompt::system_prompt_stylesheet(prompt, theme_color), self.limits.stylesheet)
                    }
                    _ => (prompt::system_prompt_script(prompt, theme_color), self.limits.script),
                };
                let text = self.call(stage, system, prompt.to_string(), ceiling).await?;
                observe(StageEvent::Finished { stage, bytes: text.len() });
                artifacts.push(text);
            }
            let [markup, styles, script]: [String; 3] = artifacts
                .try_into()
                .map_err(|_| WebmindError::generation(ArtifactKind::Script, "incomplete page"))?;
            info!(markup = markup.len(), styles = styles.len(), script = script.len(), "page generated");
            Ok::<_, WebmindError>(GeneratedDocument::new(markup, styles, script))
        }
        .instrument(span)
        .await
    }

    pub async fn edit_section(&self, existing: &str, instructions: &str, category: Option<&str>) -> Result<String> {
        GenerationRequest::section_edit(existing, instructions, category.map(String::from)).validate()?;

        let budget = instruct::derive_budget(instructions, category);
        let (template, stage) = match instruct::classify(instructions, category) {
            Intent::Code if category.map(|c| c.trim().eq_ignore_ascii_case("js")).unwrap_or(false) => {
                (EditTemplate::Js, ArtifactKind::Script)
            }
            Intent::Code => (EditTemplate::Css, ArtifactKind::Stylesheet),
            Intent::Heading => (EditTemplate::Heading, ArtifactKind::Prose),
            Intent::Body => (EditTemplate::Text, ArtifactKind::Prose),
        };
        debug!(?template, max_tokens = budget.max_tokens(), "section edit");

        let system = prompt::system_prompt_section_edit(template, category, existing, instructions);
        self.call(stage, system, existing.to_string(), budget.max_tokens()).await
    }

    pub async fn improve_text(&self, text: &str, category: Option<&str>) -> Result<String> {
        GenerationRequest::text_improvement(text, category.map(String::from)).validate()?;
        let system = prompt::system_prompt_improve_text(category);
        self.call(ArtifactKind::Prose, system, text.to_string(), self.limits.improve_text).await
    }

    async fn call(&self, stage: ArtifactKind, system: String, user: String, max_tokens: u32) -> Result<String> {
        let req = CompletionRequest { system, user, max_tokens, temperature: self.temperature };
        debug!(%stage, max_tokens, "backend call");

        let completion = self.backend.complete(&req).await.map_err(|e| {
            warn!(%stage, error = %e, "backend call failed");
            match e {
                ProviderError::MissingCredentials(var) => {
                    WebmindError::BackendUnavailable(format!("{var} is not configured"))
                }
                ProviderError::Status { provider, status: status @ (401 | 403), body } => {
                    WebmindError::BackendUnavailable(format!("{provider} rejected the credentials ({status}): {body}"))
                }
                other => WebmindError::generation(stage, other),
            }
        })?;

        let cleaned = sanitize(&completion.text, SanitizeMode::from(stage));
        if cleaned.len() != completion.text.len() {
            debug!(%stage, raw = completion.text.len(), kept = cleaned.len(), "sanitizer trimmed response");
        }
        if cleaned.is_empty() {
            warn!(%stage, "response empty after sanitizing");
            return Err(WebmindError::generation(stage, "backend returned no usable content"));
        }
        Ok(cleaned)
    }
}
