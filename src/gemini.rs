//! Client for the Gemini `generateContent` endpoint.
//!
//! Every request disables extended reasoning (`thinkingBudget = 0`). Requests
//! that carry a response schema also ask for JSON output, so the reply can be
//! parsed directly instead of scanned for something JSON-shaped.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::{FeedbackError, Result};

/// A prompt, optionally constrained to a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: None,
        }
    }

    pub fn structured(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: Some(schema),
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model's text reply to `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

// *************** Request/Response Types ***************

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    thinking_config: ThinkingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
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

// *************** Client ***************

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| FeedbackError::Config(config::ConfigError::NotFound("gemini.api_key".to_string())))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

fn build_request(request: &GenerationRequest) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        generation_config: GenerationConfig {
            thinking_config: ThinkingConfig { thinking_budget: 0 },
            response_mime_type: request.response_schema.as_ref().map(|_| "application/json"),
            response_schema: request.response_schema.as_ref(),
        },
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            model = %self.model,
            structured = request.response_schema.is_some(),
            prompt_chars = request.prompt.chars().count(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedbackError::ModelApi(format!("status {}: {}", status, body)));
        }

        let reply: GenerateContentResponse = response.json().await?;
        let candidate = reply
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| FeedbackError::ModelApi("response contained no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const ENDPOINT: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn client_for(server: &Server) -> GeminiClient {
        let config = GeminiConfig {
            api_key: Some("test-key".to_string()),
            base_url: format!("{}/", server.url()),
            ..GeminiConfig::default()
        };
        GeminiClient::new(&config).unwrap()
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let config = GeminiConfig {
            api_key: Some("   ".to_string()),
            ..GeminiConfig::default()
        };
        let err = GeminiClient::new(&config).err().unwrap();
        assert!(matches!(err, FeedbackError::Config(_)));
        assert_eq!(err.status_code(), actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("gemini.api_key"));
        assert!(GeminiClient::new(&GeminiConfig::default()).is_err());
    }

    #[test]
    fn text_request_only_disables_thinking() {
        let request = GenerationRequest::text("Summarize");
        let body = serde_json::to_value(build_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Summarize" }] }],
                "generationConfig": { "thinkingConfig": { "thinkingBudget": 0 } }
            })
        );
    }

    #[test]
    fn structured_request_asks_for_json() {
        let schema = json!({ "type": "ARRAY" });
        let request = GenerationRequest::structured("Classify", schema.clone());
        let body = serde_json::to_value(build_request(&request)).unwrap();

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], schema);
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
    }

    #[tokio::test]
    async fn generate_joins_candidate_parts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", ENDPOINT)
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": { "thinkingConfig": { "thinkingBudget": 0 } }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {
                            "parts": [{ "text": "- Labs are popular\n" }, { "text": "- Pace is fast" }],
                            "role": "model"
                        },
                        "finishReason": "STOP"
                    }]
                }"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let text = client.generate(&GenerationRequest::text("Summarize")).await.unwrap();

        assert_eq!(text, "- Labs are popular\n- Pace is fast");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_becomes_model_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", ENDPOINT)
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let err = client_for(&server)
            .generate(&GenerationRequest::text("Summarize"))
            .await
            .unwrap_err();

        match err {
            FeedbackError::ModelApi(message) => {
                assert!(message.contains("429"));
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", ENDPOINT)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "candidates": [] }"#)
            .create_async()
            .await;

        let result = client_for(&server).generate(&GenerationRequest::text("hi")).await;
        assert!(matches!(result, Err(FeedbackError::ModelApi(_))));
    }
}
