use thiserror::Error;

use crate::wire::ArtifactKind;

#[derive(Error, Debug)]
pub enum WebmindError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("generation failed at {stage} stage: {cause}")]
    Generation { stage: ArtifactKind, cause: String },
    #[error("target lost: {0}")]
    TargetLost(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = WebmindError> = std::result::Result<T, E>;

impl WebmindError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn generation(stage: ArtifactKind, cause: impl ToString) -> Self {
        Self::Generation { stage, cause: cause.to_string() }
    }

    /// Machine-readable code surfaced to API clients next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::Generation { .. } => "generation_failure",
            Self::TargetLost(_) => "target_lost",
            Self::Config(_) => "config_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Short sentence meant for a person looking at the editor.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::BackendUnavailable(_) => "The generation backend is not configured.".to_string(),
            Self::Generation { stage, .. } => format!("Failed to generate the {stage}."),
            Self::TargetLost(_) => "The selected component no longer exists; the result was discarded.".to_string(),
            Self::Config(msg) => format!("Invalid configuration: {msg}"),
            Self::Io(e) => format!("I/O failure: {e}"),
        }
    }

    pub fn is_user_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::TargetLost(_))
    }
}
