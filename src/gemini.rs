//! Remote generation API client (Gemini `generateContent`).
//!
//! One POST per analysis, fixed generation parameters, a hard client-side
//! deadline, and no retry — a transient failure is surfaced to the user,
//! who resends manually. A completion that carries no text but a
//! non-normal finish reason (safety block, truncation) is not an error:
//! the reason is surfaced as the displayed text.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AiError;

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Client-side deadline for the whole request.
pub const REQUEST_TIMEOUT_SECS: u64 = 45;

const TEMPERATURE: f64 = 0.6;
const MAX_OUTPUT_TOKENS: u32 = 1500;
const TOP_P: f64 = 0.95;
const TOP_K: u32 = 40;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
    top_p: f64,
    top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            top_p: TOP_P,
            top_k: TOP_K,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Option<Value>,
}

/// Client for the generation endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    model: String,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(AiError::Transport)?;
        Ok(Self {
            http,
            model: model.into(),
        })
    }

    /// Send one prompt and return the displayed analysis text.
    ///
    /// Fire-and-forget: no retry on any failure path.
    pub async fn analyze(&self, api_key: &str, prompt: &str) -> Result<String, AiError> {
        let url = format!(
            "{API_BASE_URL}/{}:generateContent?key={}",
            self.model, api_key
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig::default(),
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "sending generateContent request");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AiError::Timeout(REQUEST_TIMEOUT_SECS)
                } else {
                    AiError::Transport(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                detail: describe_error_body(status, &raw),
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                AiError::Timeout(REQUEST_TIMEOUT_SECS)
            } else {
                AiError::Decode(err)
            }
        })?;
        Ok(extract_analysis(&parsed))
    }
}

/// Pull the displayed text out of a parsed response.
///
/// Order: first candidate's text; then a non-normal finish reason (with
/// safety ratings when present); then a generic empty-response message.
pub fn extract_analysis(response: &GenerateResponse) -> String {
    if let Some(candidate) = response.candidates.first() {
        if let Some(text) = candidate
            .content
            .as_ref()
            .and_then(|content| content.parts.first())
            .map(|part| part.text.as_str())
        {
            if !text.is_empty() {
                return text.to_string();
            }
        }
        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason != "STOP" {
                let mut message = format!("AI response generation stopped. Reason: {reason}");
                if let Some(ratings) = &candidate.safety_ratings {
                    message.push_str(&format!("\nSafety Ratings: {ratings}"));
                }
                return message;
            }
        }
    }
    "AI returned an empty response or the structure was unexpected.".to_string()
}

/// Build the human-readable error text for a failed HTTP response:
/// structured `{error: ...}` body, then raw text, then status only.
fn describe_error_body(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(parsed) => {
            let detail = parsed.get("error").cloned().unwrap_or(parsed);
            let pretty =
                serde_json::to_string_pretty(&detail).unwrap_or_else(|_| detail.to_string());
            format!("API Error: {status}\nDetails:\n{pretty}")
        }
        Err(_) if !body.trim().is_empty() => {
            format!("API Error: {status}\nResponse Text:\n{}", body.trim())
        }
        Err(_) => format!("API Error: {status}. Could not retrieve detailed error message."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_wire_format() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig::default(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["temperature"], 0.6);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1500);
        assert_eq!(json["generationConfig"]["topP"], 0.95);
        assert_eq!(json["generationConfig"]["topK"], 40);
    }

    #[test]
    fn extract_prefers_candidate_text() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "The bug is in checkout.js" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_analysis(&response), "The bug is in checkout.js");
    }

    #[test]
    fn safety_block_surfaces_finish_reason_not_blank() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "finishReason": "SAFETY",
                "safetyRatings": [{ "category": "HARM_CATEGORY_X", "probability": "HIGH" }]
            }]
        }))
        .unwrap();
        let text = extract_analysis(&response);
        assert!(text.contains("Reason: SAFETY"));
        assert!(text.contains("Safety Ratings:"));
        assert!(text.contains("HARM_CATEGORY_X"));
    }

    #[test]
    fn empty_candidates_get_generic_message() {
        let response: GenerateResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(extract_analysis(&response).contains("empty response"));
    }

    #[test]
    fn normal_stop_with_no_text_is_not_reported_as_blocked() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "finishReason": "STOP" }]
        }))
        .unwrap();
        assert!(extract_analysis(&response).contains("empty response"));
    }

    #[test]
    fn error_body_with_structured_error_field() {
        let detail = describe_error_body(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": {"code": 400, "message": "API key not valid"}}"#,
        );
        assert!(detail.starts_with("API Error: 400 Bad Request"));
        assert!(detail.contains("API key not valid"));
    }

    #[test]
    fn error_body_with_plain_text_falls_back_to_raw() {
        let detail = describe_error_body(reqwest::StatusCode::BAD_GATEWAY, "upstream exploded");
        assert!(detail.contains("Response Text:\nupstream exploded"));
    }

    #[test]
    fn empty_error_body_falls_back_to_status_only() {
        let detail = describe_error_body(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(detail.contains("Could not retrieve detailed error message"));
    }
}
