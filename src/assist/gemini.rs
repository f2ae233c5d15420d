use thiserror::Error;

use crate::config::DroidPlanConfig;
use crate::core::suggestion::{Breakdown, SuggestedTask};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SYSTEM_INSTRUCTION: &str =
    "You are a helpful productivity assistant. Provide output in JSON format.";

/// Failures inside the breakdown request. Never returned to callers; they
/// are logged and turned into an empty suggestion list.
#[derive(Debug, Error)]
enum BreakdownError {
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("No text in API response")]
    EmptyResponse,
    #[error("Failed to parse suggestions: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Resolved credentials and model for breakdown requests.
#[derive(Debug, Clone)]
pub struct BreakdownClient {
    api_key: Option<String>,
    model: String,
}

impl BreakdownClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
        }
    }

    /// Look up the API key (environment, then keyring) and take the model from config.
    pub async fn from_config(config: &DroidPlanConfig) -> Self {
        let api_key = super::keyring::resolve_api_key().await;
        Self::new(api_key, config.breakdown_model.clone())
    }

    pub fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub async fn suggest(&self, goal: &str) -> Breakdown {
        suggest_breakdown(self.api_key.as_deref(), &self.model, goal).await
    }
}

/// Ask Gemini to split `goal` into 3-5 concrete tasks.
///
/// Returns `Unavailable` without an API key. Blank goals and every kind of
/// request failure yield an empty suggestion list.
pub async fn suggest_breakdown(api_key: Option<&str>, model: &str, goal: &str) -> Breakdown {
    let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
        log::warn!("No API key provided, breakdown unavailable");
        return Breakdown::Unavailable;
    };

    let goal = goal.trim();
    if goal.is_empty() {
        return Breakdown::Suggestions(Vec::new());
    }

    match request_breakdown(api_key, model, goal).await {
        Ok(suggestions) => {
            log::info!("Breakdown returned {} suggestions", suggestions.len());
            Breakdown::Suggestions(suggestions)
        }
        Err(e) => {
            log::error!("Gemini breakdown failed: {}", e);
            Breakdown::Suggestions(Vec::new())
        }
    }
}

async fn request_breakdown(
    api_key: &str,
    model: &str,
    goal: &str,
) -> Result<Vec<SuggestedTask>, BreakdownError> {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/{}:generateContent", API_BASE, model))
        .header("x-goog-api-key", api_key)
        .header("content-type", "application/json")
        .json(&build_request(goal))
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(BreakdownError::Status { status, body });
    }

    let api_resp: serde_json::Value = resp.json().await?;
    let text = extract_text(&api_resp).ok_or(BreakdownError::EmptyResponse)?;
    Ok(parse_suggestions(text)?)
}

/// `generateContent` body with a JSON response schema for the suggestion list.
fn build_request(goal: &str) -> serde_json::Value {
    let prompt = format!(
        "Break down the following goal into 3-5 concrete, actionable tasks: \"{}\". Keep descriptions concise.",
        goal
    );

    serde_json::json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "contents": [
            { "role": "user", "parts": [{ "text": prompt }] }
        ],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "content": {
                            "type": "STRING",
                            "description": "The specific actionable task content"
                        },
                        "estimatedDurationHours": {
                            "type": "NUMBER",
                            "description": "Estimated time in hours"
                        },
                        "priority": {
                            "type": "STRING",
                            "enum": ["high", "medium", "low"]
                        }
                    },
                    "required": ["content", "estimatedDurationHours", "priority"],
                    "propertyOrdering": ["content", "estimatedDurationHours", "priority"]
                }
            }
        }
    })
}

/// Text of the first part of the first candidate.
fn extract_text(api_resp: &serde_json::Value) -> Option<&str> {
    api_resp["candidates"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|cand| cand["content"]["parts"].as_array())
        .and_then(|parts| parts.first())
        .and_then(|part| part["text"].as_str())
        .filter(|text| !text.trim().is_empty())
}

fn parse_suggestions(text: &str) -> Result<Vec<SuggestedTask>, serde_json::Error> {
    // Strip markdown code fences if present
    let json_str = text
        .trim()
        .strip_prefix("```json")
        .or_else(|| text.trim().strip_prefix("```"))
        .unwrap_or(text.trim());
    let json_str = json_str.strip_suffix("```").unwrap_or(json_str).trim();

    serde_json::from_str(json_str)
}
