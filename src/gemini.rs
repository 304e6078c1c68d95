//! Google Gemini API client for AI image generation
//!
//! Thin wrapper around the Gemini `generateContent` endpoint. One upstream
//! call per generation, no retries; the first inline image part of the
//! response is returned as a base64 data URL.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-preview-image-generation";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Upstream error bodies are truncated to this many characters before being
/// echoed back to the caller.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Failure modes of a single generation attempt.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Prompt is required")]
    EmptyPrompt,
    #[error("API error: {status}. Details: {body}")]
    Upstream { status: u16, body: String },
    #[error("No image data received from the API.")]
    NoImage,
    /// Error relayed verbatim from the generation proxy (client side only).
    #[error("{0}")]
    Proxy(String),
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

/// The seam between the HTTP/controller layers and actual image synthesis.
///
/// Implemented by [`GeminiClient`] for real generation and by HTTP-backed or
/// stub generators elsewhere.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for `prompt`, returned as a `data:image/png;base64,`
    /// URL.
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: HeaderValue,
    model: String,
}

// -- Response types --

#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponsePart {
    inline_data: Option<GeminiInlineData>,
    #[allow(dead_code)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

/// Wrap a raw base64 payload as a data URL, without decoding it.
pub fn to_data_url(base64_payload: &str) -> String {
    format!("data:image/png;base64,{}", base64_payload)
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("Gemini API key is required");
        }

        let api_key = HeaderValue::from_str(api_key.trim())
            .context("API key contains characters not valid in a header")?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model: model.to_string(),
        })
    }

    pub fn build_request_body(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"]
            }
        })
    }

    /// First part whose declared media type is an image, scanned in order.
    pub fn extract_image_base64(response: &GeminiResponse) -> Option<String> {
        response
            .candidates
            .first()
            .and_then(|c| {
                c.content.parts.iter().find_map(|p| {
                    p.inline_data
                        .as_ref()
                        .filter(|d| d.mime_type.starts_with("image/"))
                })
            })
            .map(|d| d.data.clone())
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<String, GenerateError> {
        if prompt.trim().is_empty() {
            return Err(GenerateError::EmptyPrompt);
        }

        let url = format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model);
        let body = Self::build_request_body(prompt);

        info!("Gemini image generation: prompt={} chars", prompt.len());

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header("x-goog-api-key", self.api_key.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let truncated: String = error_body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(GenerateError::Upstream {
                status: status.as_u16(),
                body: truncated,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        Self::extract_image_base64(&gemini_response)
            .map(|b64| to_data_url(&b64))
            .ok_or(GenerateError::NoImage)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        self.generate_image(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_body() {
        let body = GeminiClient::build_request_body("A red fox in the snow");
        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            "A red fox in the snow"
        );
        assert_eq!(body["generationConfig"]["responseModalities"][0], "TEXT");
        assert_eq!(body["generationConfig"]["responseModalities"][1], "IMAGE");
    }

    #[test]
    fn test_to_data_url() {
        assert_eq!(
            to_data_url("iVBORw0KGgo="),
            "data:image/png;base64,iVBORw0KGgo="
        );
    }

    #[test]
    fn test_parse_response_valid() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": "image/png",
                            "data": "iVBORw0KGgo="
                        }
                    }]
                }
            }]
        });
        let response: GeminiResponse = serde_json::from_value(response_json).unwrap();
        let base64 = GeminiClient::extract_image_base64(&response);
        assert_eq!(base64, Some("iVBORw0KGgo=".to_string()));
    }

    #[test]
    fn test_parse_response_skips_text_parts() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your image:" },
                        {
                            "inlineData": {
                                "mimeType": "image/png",
                                "data": "QUJDRA=="
                            }
                        }
                    ]
                }
            }]
        });
        let response: GeminiResponse = serde_json::from_value(response_json).unwrap();
        let base64 = GeminiClient::extract_image_base64(&response);
        assert_eq!(base64, Some("QUJDRA==".to_string()));
    }

    #[test]
    fn test_parse_response_ignores_non_image_inline_data() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": "text/plain",
                            "data": "bm90IGFuIGltYWdl"
                        }
                    }]
                }
            }]
        });
        let response: GeminiResponse = serde_json::from_value(response_json).unwrap();
        assert!(GeminiClient::extract_image_base64(&response).is_none());
    }

    #[test]
    fn test_parse_response_no_image() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "I cannot generate that image"
                    }]
                }
            }]
        });
        let response: GeminiResponse = serde_json::from_value(response_json).unwrap();
        assert!(GeminiClient::extract_image_base64(&response).is_none());
    }

    #[test]
    fn test_parse_response_empty_candidates() {
        let response_json = serde_json::json!({ "candidates": [] });
        let response: GeminiResponse = serde_json::from_value(response_json).unwrap();
        assert!(GeminiClient::extract_image_base64(&response).is_none());
    }

    #[test]
    fn test_new_empty_api_key() {
        assert!(GeminiClient::new("", DEFAULT_MODEL).is_err());
        assert!(GeminiClient::new("   ", DEFAULT_MODEL).is_err());
    }

    #[test]
    fn test_new_valid_api_key() {
        assert!(GeminiClient::new("test-key-123", DEFAULT_MODEL).is_ok());
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_prompt_without_network() {
        let client = GeminiClient::new("test-key-123", DEFAULT_MODEL).unwrap();
        let err = client.generate_image("   ").await.unwrap_err();
        assert!(matches!(err, GenerateError::EmptyPrompt));
        assert_eq!(err.to_string(), "Prompt is required");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GenerateError::NoImage.to_string(),
            "No image data received from the API."
        );
        let upstream = GenerateError::Upstream {
            status: 429,
            body: "quota exceeded".to_string(),
        };
        assert!(upstream.to_string().contains("429"));
        assert!(upstream.to_string().contains("quota exceeded"));
    }
}
