//! JSON API over the generation client, mounted under `/api`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::errors::WebmindError;
use crate::generate::GenerationClient;
use crate::wire::{
    AiChangesBody, ErrorReply, GenerateWebsiteBody, ImproveTextBody, ImprovedTextReply, WebsiteReply,
};

#[derive(Clone)]
pub struct AppState {
    client: Arc<GenerationClient>,
}

impl AppState {
    pub fn new(client: Arc<GenerationClient>) -> Self {
        Self { client }
    }
}

pub struct ApiError(WebmindError);

impl From<WebmindError> for ApiError {
    fn from(e: WebmindError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        Self(WebmindError::validation(format!("invalid JSON body: {}", r.body_text())))
    }
}

pub fn status_for(e: &WebmindError) -> StatusCode {
    match e {
        WebmindError::Validation(_) => StatusCode::BAD_REQUEST,
        WebmindError::TargetLost(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let details = match &self.0 {
            WebmindError::Validation(_) => None,
            other => {
                error!(code = other.code(), error = %other, "request failed");
                Some(other.to_string())
            }
        };
        let body = ErrorReply { error: self.0.user_message(), code: self.0.code().to_string(), details };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(WebmindError::validation(message).into()),
    }
}

async fn improve_text(
    State(state): State<AppState>,
    body: Result<Json<ImproveTextBody>, JsonRejection>,
) -> ApiResult<ImprovedTextReply> {
    let Json(body) = body?;
    let text = required(body.text, "Text is required")?;
    info!(len = text.len(), "improve-text request");
    let improved_text = state.client.improve_text(&text, body.category.as_deref()).await?;
    Ok(Json(ImprovedTextReply { improved_text }))
}

async fn ai_changes(
    State(state): State<AppState>,
    body: Result<Json<AiChangesBody>, JsonRejection>,
) -> ApiResult<ImprovedTextReply> {
    let Json(body) = body?;
    let message = "Existing text and instructions are required";
    let existing = required(body.existing_text, message)?;
    let instructions = required(body.instructions, message)?;
    info!(len = existing.len(), category = body.category.as_deref().unwrap_or("-"), "ai-changes request");
    let improved_text = state.client.edit_section(&existing, &instructions, body.category.as_deref()).await?;
    Ok(Json(ImprovedTextReply { improved_text }))
}

async fn generate_website(
    State(state): State<AppState>,
    body: Result<Json<GenerateWebsiteBody>, JsonRejection>,
) -> ApiResult<WebsiteReply> {
    let Json(body) = body?;
    let prompt = required(body.prompt, "Prompt is required")?;
    info!(len = prompt.len(), "generate-website request");
    let doc = state
        .client
        .generate_page(&prompt, body.category.as_deref(), body.theme_color.as_deref())
        .await?;
    Ok(Json(WebsiteReply::from(doc)))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "backend": state.client.backend_name() }))
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/improve-text", post(improve_text))
        .route("/ai-changes", post(ai_changes))
        .route("/generate-website", post(generate_website))
        .route("/health", get(health));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `addr` and serves until ctrl-c.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}
