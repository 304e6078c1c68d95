//! HTTP surface of the generation proxy.
//!
//! One JSON endpoint, `POST /generate-image`, plus a health probe. Each
//! request is stateless and independent; the only shared state is the
//! generator handle.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::gemini::{GenerateError, ImageGenerator};

/// Shared state for the proxy
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn ImageGenerator>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the router with CORS for cross-origin requests
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate-image", post(generate_image))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Bind and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, generator: Arc<dyn ImageGenerator>) -> anyhow::Result<()> {
    let app = router(AppState { generator });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("image-studio listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

/// Simple health endpoint for quick checks
async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "healthy": true,
        "service": "image-studio",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn generate_image(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.prompt.trim().is_empty() {
        return Err(error_response(&GenerateError::EmptyPrompt));
    }

    match state.generator.generate(&req.prompt).await {
        Ok(image_url) => {
            info!("Image generated: {} bytes", image_url.len());
            Ok(Json(GenerateResponse { image_url }))
        }
        Err(e) => {
            error!("Image generation failed: {}", e);
            Err(error_response(&e))
        }
    }
}

fn error_response(err: &GenerateError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, error) = match err {
        GenerateError::EmptyPrompt => (StatusCode::BAD_REQUEST, err.to_string()),
        GenerateError::NoImage => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        GenerateError::Upstream { .. }
        | GenerateError::Proxy(_)
        | GenerateError::Transport(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to generate image: {}", err),
        ),
    };
    (status, Json(ErrorResponse { error }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::util::ServiceExt;

    enum StubReply {
        Url(String),
        NoImage,
        Upstream(u16),
    }

    struct StubGenerator {
        reply: StubReply,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageGenerator for StubGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                StubReply::Url(url) => Ok(url.clone()),
                StubReply::NoImage => Err(GenerateError::NoImage),
                StubReply::Upstream(status) => Err(GenerateError::Upstream {
                    status: *status,
                    body: "upstream said no".to_string(),
                }),
            }
        }
    }

    fn make_app(reply: StubReply) -> (Router, Arc<StubGenerator>) {
        let generator = Arc::new(StubGenerator {
            reply,
            calls: AtomicUsize::new(0),
        });
        let state = AppState {
            generator: generator.clone(),
        };
        (router(state), generator)
    }

    fn generate_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/generate-image")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_success_returns_data_url() {
        let (app, _) = make_app(StubReply::Url(
            "data:image/png;base64,iVBORw0KGgo=".to_string(),
        ));

        let response = app
            .oneshot(generate_request(r#"{"prompt":"a red fox"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["imageUrl"], "data:image/png;base64,iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn test_empty_prompt_is_400_without_generator_call() {
        let (app, generator) = make_app(StubReply::Url("url".to_string()));

        let response = app
            .oneshot(generate_request(r#"{"prompt":"   "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Prompt is required");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_prompt_field_is_400() {
        let (app, generator) = make_app(StubReply::Url("url".to_string()));

        let response = app.oneshot(generate_request(r#"{}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Prompt is required");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_image_is_500_with_exact_message() {
        let (app, _) = make_app(StubReply::NoImage);

        let response = app
            .oneshot(generate_request(r#"{"prompt":"a red fox"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No image data received from the API.");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500_embedding_status() {
        let (app, _) = make_app(StubReply::Upstream(429));

        let response = app
            .oneshot(generate_request(r#"{"prompt":"a red fox"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("429"), "message was: {}", message);
        assert!(message.contains("upstream said no"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = make_app(StubReply::Url("url".to_string()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["healthy"], true);
        assert_eq!(json["service"], "image-studio");
    }
}
