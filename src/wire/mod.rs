use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Result, WebmindError};

/// ========================================
/// Generation requests and results
/// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    FullPage,
    SectionEdit,
    TextImprovement,
}

/// One of the outputs a backend call can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Markup,
    Stylesheet,
    Script,
    Prose,
}

impl ArtifactKind {
    /// Code-bearing artifacts must never go through the prose character filter.
    pub fn is_code(self) -> bool {
        !matches!(self, ArtifactKind::Prose)
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Markup => "index.html",
            ArtifactKind::Stylesheet => "styles.css",
            ArtifactKind::Script => "script.js",
            ArtifactKind::Prose => "text.txt",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactKind::Markup => "markup",
            ArtifactKind::Stylesheet => "stylesheet",
            ArtifactKind::Script => "script",
            ArtifactKind::Prose => "text",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    #[serde(default)]
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl GenerationRequest {
    pub fn full_page(
        prompt: impl Into<String>,
        category: Option<String>,
        theme_color: Option<String>,
    ) -> Self {
        Self {
            kind: GenerationKind::FullPage,
            prompt: prompt.into(),
            category,
            theme_color,
            existing_content: None,
            instructions: None,
        }
    }

    pub fn section_edit(
        existing_content: impl Into<String>,
        instructions: impl Into<String>,
        category: Option<String>,
    ) -> Self {
        Self {
            kind: GenerationKind::SectionEdit,
            prompt: String::new(),
            category,
            theme_color: None,
            existing_content: Some(existing_content.into()),
            instructions: Some(instructions.into()),
        }
    }

    pub fn text_improvement(text: impl Into<String>, category: Option<String>) -> Self {
        Self {
            kind: GenerationKind::TextImprovement,
            prompt: text.into(),
            category,
            theme_color: None,
            existing_content: None,
            instructions: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.kind {
            GenerationKind::FullPage | GenerationKind::TextImprovement => {
                if is_blank(Some(&self.prompt)) {
                    let field = if self.kind == GenerationKind::FullPage { "prompt" } else { "text" };
                    return Err(WebmindError::validation(format!("{field} is required")));
                }
            }
            GenerationKind::SectionEdit => {
                if is_blank(self.existing_content.as_deref()) || is_blank(self.instructions.as_deref()) {
                    return Err(WebmindError::validation(
                        "existing content and instructions are required",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn is_blank(s: Option<&str>) -> bool {
    s.map(|v| v.trim().is_empty()).unwrap_or(true)
}

/// The three artifacts of a full page. Fields are sanitized on construction
/// by the generation client and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDocument {
    markup: String,
    styles: String,
    script: String,
}

impl GeneratedDocument {
    pub(crate) fn new(markup: String, styles: String, script: String) -> Self {
        Self { markup, styles, script }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn styles(&self) -> &str {
        &self.styles
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Markup => Some(&self.markup),
            ArtifactKind::Stylesheet => Some(&self.styles),
            ArtifactKind::Script => Some(&self.script),
            ArtifactKind::Prose => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutput {
    Document(GeneratedDocument),
    Text(String),
}

/// ========================================
/// Backend wire protocol
/// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
}

/// ========================================
/// HTTP surface
/// ========================================
///
/// Every field is optional on the way in so that a missing value turns into a
/// 400 with our own message instead of a deserializer rejection.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImproveTextBody {
    pub text: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiChangesBody {
    pub existing_text: Option<String>,
    pub instructions: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateWebsiteBody {
    pub prompt: Option<String>,
    pub category: Option<String>,
    pub theme_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovedTextReply {
    pub improved_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteReply {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl From<GeneratedDocument> for WebsiteReply {
    fn from(doc: GeneratedDocument) -> Self {
        Self { html: doc.markup, css: doc.styles, js: doc.script }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
