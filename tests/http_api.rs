mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{client, Scripted, YOGA_MARKUP};
use webmind::provider::ProviderError;
use webmind::server::{router, AppState};

async fn call(backend: Arc<Scripted>, path: &str, body: &str) -> (StatusCode, Value) {
    let app = router(AppState::new(client(backend)));
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn generate_website_returns_three_artifacts() {
    let backend = Scripted::new(vec![
        Ok(YOGA_MARKUP.into()),
        Ok("body { color: green; }".into()),
        Ok("console.log(1);".into()),
    ]);
    let (status, body) = call(
        backend.clone(),
        "/api/generate-website",
        r#"{"prompt":"landing page for a yoga studio","themeColor":"green"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["html"].as_str().unwrap().starts_with("<!DOCTYPE html>"));
    assert_eq!(body["css"], "body { color: green; }");
    assert_eq!(body["js"], "console.log(1);");
    assert_eq!(backend.calls(), 3);
    assert!(backend.seen.lock()[0].system.contains("based on green"));
}

#[tokio::test]
async fn missing_fields_are_rejected_without_backend_calls() {
    let backend = Scripted::new(vec![]);
    for (path, body) in [
        ("/api/generate-website", r#"{"category":"yoga"}"#),
        ("/api/improve-text", r#"{"text":"   "}"#),
        ("/api/ai-changes", r#"{"existingText":"<p>x</p>"}"#),
    ] {
        let (status, reply) = call(backend.clone(), path, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(reply["code"], "validation_error");
    }
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (status, reply) = call(Scripted::new(vec![]), "/api/improve-text", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["code"], "validation_error");
}

#[tokio::test]
async fn ai_changes_uses_code_budget_for_css() {
    let backend = Scripted::new(vec![Ok(".hero { padding: 2rem; }".into())]);
    let (status, reply) = call(
        backend.clone(),
        "/api/ai-changes",
        &json!({
            "existingText": ".hero { padding: 1rem; }",
            "instructions": "double the padding, 80 tokens",
            "category": "CSS"
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({ "improvedText": ".hero { padding: 2rem; }" }));
    assert_eq!(backend.seen.lock()[0].max_tokens, 80);
}

#[tokio::test]
async fn backend_failures_are_server_errors() {
    let backend = Scripted::new(vec![Err(ProviderError::MissingCredentials("TOGETHER_API_KEY"))]);
    let (status, reply) = call(backend, "/api/improve-text", r#"{"text":"we sell bread"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply["code"], "backend_unavailable");
    assert!(reply["details"].as_str().unwrap().contains("TOGETHER_API_KEY"));

    let backend = Scripted::new(vec![Err(ProviderError::Status {
        provider: "together",
        status: 401,
        body: "invalid api key".into(),
    })]);
    let (status, reply) = call(backend, "/api/generate-website", r#"{"prompt":"bakery"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply["code"], "backend_unavailable");

    let backend = Scripted::new(vec![Ok("<html></html>".into()), Ok("<think>only thoughts</think>".into())]);
    let (status, reply) = call(backend.clone(), "/api/generate-website", r#"{"prompt":"bakery"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply["code"], "generation_failure");
    assert_eq!(reply["error"], "Failed to generate the stylesheet.");
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn health_names_backend() {
    let app = router(AppState::new(client(Scripted::new(vec![]))));
    let resp = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "status": "ok", "backend": "scripted" }));
}
