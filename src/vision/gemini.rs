//! Gemini `generateContent` client.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{PromptSpec, VisionClient, VisionError};
use crate::config::VisionConfig;
use crate::images::EncodedImage;

pub struct GeminiVisionClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl GeminiVisionClient {
    pub fn new(config: &VisionConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build vision http client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn build_request<'a>(
        &self,
        image: &'a EncodedImage,
        prompt: &'a PromptSpec,
    ) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: &prompt.instructions,
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type,
                            data: &image.data_base64,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: "application/json",
            },
        }
    }
}

#[async_trait]
impl VisionClient for GeminiVisionClient {
    async fn analyze(
        &self,
        image: &EncodedImage,
        prompt: &PromptSpec,
    ) -> Result<String, VisionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| VisionError::Config("VISION_API_KEY is not set".into()))?;

        let started = Instant::now();
        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", api_key)
            .json(&self.build_request(image, prompt))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        info!(
            model = %self.model,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "vision request finished"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let envelope: GenerateContentResponse =
            response.json().await.map_err(|e| VisionError::Transport {
                status: Some(status.as_u16()),
                message: format!("undecodable response envelope: {}", e),
            })?;

        let candidate = envelope.candidates.into_iter().next();
        if let Some(reason) = candidate.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            if reason != "STOP" {
                warn!(finish_reason = reason, "vision candidate did not finish normally");
            }
        }
        let text: String = candidate
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        debug!(len = text.len(), "vision text received");
        Ok(text)
    }
}

fn transport_error(e: reqwest::Error) -> VisionError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };
    VisionError::Transport {
        status: e.status().map(|s| s.as_u16()),
        message,
    }
}

fn classify_failure(status: StatusCode, body: &str) -> VisionError {
    let key_rejected = body.contains("API_KEY_INVALID") || body.contains("API key not valid");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            VisionError::Config(format!("vision api rejected request: {}", status))
        }
        StatusCode::BAD_REQUEST if key_rejected => {
            VisionError::Config("vision api key rejected".into())
        }
        _ => VisionError::Transport {
            status: Some(status.as_u16()),
            message: truncate(body, 512),
        },
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'static str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod gemini_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;

    #[derive(Clone)]
    struct Upstream {
        status: StatusCode,
        body: String,
        hits: Arc<AtomicUsize>,
        last: Arc<std::sync::Mutex<Option<(HeaderMap, Value)>>>,
    }

    async fn handler(
        State(up): State<Upstream>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, String) {
        up.hits.fetch_add(1, Ordering::SeqCst);
        *up.last.lock().unwrap() = Some((headers, body));
        (up.status, up.body.clone())
    }

    async fn spawn_upstream(status: StatusCode, body: &str) -> (String, Upstream) {
        let up = Upstream {
            status,
            body: body.to_string(),
            hits: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(std::sync::Mutex::new(None)),
        };
        let app = Router::new()
            .route("/models/:call", post(handler))
            .with_state(up.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), up)
    }

    fn client(base: &str, key: Option<&str>) -> GeminiVisionClient {
        GeminiVisionClient::new(&VisionConfig {
            api_key: key.map(str::to_string),
            model: "test-model".into(),
            api_base: base.into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn image() -> EncodedImage {
        EncodedImage {
            mime_type: "image/jpeg",
            data_base64: "/9j/4A==".into(),
        }
    }

    #[tokio::test]
    async fn returns_candidate_text_and_sends_inline_image() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"message\":" }, { "text": "\"noFood\"}" }] },
                "finishReason": "STOP"
            }]
        })
        .to_string();
        let (base, up) = spawn_upstream(StatusCode::OK, &body).await;

        let text = client(&base, Some("k-123"))
            .analyze(&image(), &PromptSpec::default())
            .await
            .unwrap();
        assert_eq!(text, r#"{"message":"noFood"}"#);
        assert_eq!(up.hits.load(Ordering::SeqCst), 1);

        let (headers, sent) = up.last.lock().unwrap().clone().unwrap();
        assert_eq!(
            headers.get("x-goog-api-key").unwrap().to_str().unwrap(),
            "k-123"
        );
        let parts = &sent["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("noFood"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "/9j/4A==");
        assert_eq!(sent["generationConfig"]["responseMimeType"], "application/json");
    }

    #[tokio::test]
    async fn missing_key_is_config_error_without_network_call() {
        let (base, up) = spawn_upstream(StatusCode::OK, "{}").await;
        let err = client(&base, None)
            .analyze(&image(), &PromptSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::Config(_)));
        assert_eq!(up.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn auth_failures_are_config_errors() {
        let (base, _) = spawn_upstream(StatusCode::FORBIDDEN, "denied").await;
        let err = client(&base, Some("bad"))
            .analyze(&image(), &PromptSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::Config(_)));

        let (base, _) = spawn_upstream(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#,
        )
        .await;
        let err = client(&base, Some("bad"))
            .analyze(&image(), &PromptSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::Config(_)));
    }

    #[tokio::test]
    async fn server_error_is_transport_with_status_and_single_attempt() {
        let (base, up) = spawn_upstream(StatusCode::SERVICE_UNAVAILABLE, "overloaded").await;
        let err = client(&base, Some("k"))
            .analyze(&image(), &PromptSpec::default())
            .await
            .unwrap_err();
        match err {
            VisionError::Transport { status, .. } => assert_eq!(status, Some(503)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(up.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_without_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}", addr), Some("k"))
            .analyze(&image(), &PromptSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::Transport { status: None, .. }));
    }

    #[tokio::test]
    async fn empty_candidates_yield_empty_text() {
        let (base, _) = spawn_upstream(StatusCode::OK, r#"{"candidates":[]}"#).await;
        let text = client(&base, Some("k"))
            .analyze(&image(), &PromptSpec::default())
            .await
            .unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn garbage_envelope_is_transport_error() {
        let (base, _) = spawn_upstream(StatusCode::OK, "<html>proxy</html>").await;
        let err = client(&base, Some("k"))
            .analyze(&image(), &PromptSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::Transport { status: Some(200), .. }));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("ééé", 2), "éé...");
    }
}
