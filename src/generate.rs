//! Text-generation collaborator.
//!
//! [`TextGenerator`] accepts a prompt and returns the first candidate's text
//! together with its finish reason. [`GeminiClient`] implements it over the
//! Gemini `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::config::GenerationConfig;
use crate::errors::{from_transport, AnalysisError};

const SERVICE: &str = "Gemini";

/// Sampling parameters sent with each request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub candidate_count: Option<u32>,
}

impl GenerationOptions {
    /// Deterministic settings used for repository summaries.
    pub fn for_repo(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            top_k: Some(1),
            top_p: Some(0.7),
            candidate_count: Some(1),
        }
    }

    pub fn for_project(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.project_temperature,
            max_output_tokens: config.max_output_tokens,
            top_k: None,
            top_p: None,
            candidate_count: None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let mut config = json!({
            "temperature": self.temperature,
            "maxOutputTokens": self.max_output_tokens,
        });
        if let Some(k) = self.top_k {
            config["topK"] = json!(k);
        }
        if let Some(p) = self.top_p {
            config["topP"] = json!(p);
        }
        if let Some(n) = self.candidate_count {
            config["candidateCount"] = json!(n);
        }
        config
    }
}

/// Text of the first candidate plus the reason generation stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub finish_reason: Option<String>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, AnalysisError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Gemini REST client.
///
/// Built without a key, every request fails with `AccessDenied` and no
/// network call is made; callers degrade the same way as for a rejected key.
pub struct GeminiClient {
    http: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl GeminiClient {
    pub fn new(config: &GenerationConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, AnalysisError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AnalysisError::AccessDenied {
                message: format!("{} API key not configured ({} is unset)", SERVICE, self.api_key_env),
            });
        };
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": options.to_json(),
        });

        let resp = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| from_transport(SERVICE, "generateContent", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &body_text));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| from_transport(SERVICE, "generateContent", e))?;
        extract_generation(parsed)
    }
}

fn classify_status(status: StatusCode, body: &str) -> AnalysisError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AnalysisError::RateLimited { reset_hint: None },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AnalysisError::AccessDenied {
            message: format!("{} rejected the API key (HTTP {})", SERVICE, status.as_u16()),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            AnalysisError::timeout(format!("{} generateContent", SERVICE))
        }
        other => {
            let snippet: String = body.chars().take(200).collect();
            AnalysisError::upstream(SERVICE, format!("HTTP {}: {}", other.as_u16(), snippet))
        }
    }
}

fn extract_generation(resp: GenerateResponse) -> Result<Generation, AnalysisError> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        let reason = resp
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(AnalysisError::Generation(format!(
            "response contained no candidates ({})",
            reason
        )));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AnalysisError::Generation(format!(
            "candidate had no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(Generation {
        text,
        finish_reason: candidate.finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(v: serde_json::Value) -> Result<Generation, AnalysisError> {
        extract_generation(serde_json::from_value(v).unwrap())
    }

    #[test]
    fn joins_candidate_parts() {
        let gen = parse(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(gen.text, "{\"a\":1}");
        assert_eq!(gen.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn blocked_candidate_reports_finish_reason() {
        let err = parse(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Generation(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn blocked_prompt_reports_block_reason() {
        let err = parse(json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "OTHER" }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("OTHER"));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            AnalysisError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            AnalysisError::AccessDenied { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            AnalysisError::Upstream { .. }
        ));
    }

    #[test]
    fn repo_options_are_deterministic() {
        let opts = GenerationOptions::for_repo(&GenerationConfig::default());
        let v = opts.to_json();
        assert_eq!(v["topK"], 1);
        assert_eq!(v["candidateCount"], 1);
        assert_eq!(v["maxOutputTokens"], 1000);

        let v = GenerationOptions::for_project(&GenerationConfig::default()).to_json();
        assert!(v.get("topK").is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let config = GenerationConfig {
            api_url: "http://127.0.0.1:9".into(),
            ..GenerationConfig::default()
        };
        let client = GeminiClient::new(&config, None).unwrap();
        let err = client
            .generate("prompt", &GenerationOptions::for_project(&config))
            .await
            .unwrap_err();
        match err {
            AnalysisError::AccessDenied { message } => assert!(message.contains("GEMINI_API_KEY")),
            other => panic!("expected AccessDenied, got {other:?}"),
        }
    }
}
