//! Gemini `generateContent` client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use helpermatch_types::api::MatchCriteria;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// The key value shipped in sample env files; treated as unconfigured.
pub const PLACEHOLDER_KEY: &str = "PLACEHOLDER_API_KEY";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    /// Returns `None` for a blank or placeholder key.
    pub fn from_key(api_key: Option<String>, model: String, api_base: String) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = api_key.filter(|k| !k.trim().is_empty() && k != PLACEHOLDER_KEY) else {
            return Ok(None);
        };
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Some(Self {
            client,
            api_key,
            model,
            api_base: api_base.trim_end_matches('/').to_string(),
        }))
    }

    /// Turns a free-text request into structured search criteria.
    pub async fn match_criteria(&self, query: &str) -> anyhow::Result<MatchCriteria> {
        let prompt = format!(
            "User is looking for a domestic helper with these criteria: \"{query}\". \
             Analyze the request and return a JSON object with predicted filter parameters: \
             nationality (one of: Filipino, Indonesian, Thai, Myanmar, Local), \
             experience (one of: New to HK, Finished Contract, Ex-HK, Overseas Experience), \
             and a list of key skills mentioned."
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": criteria_schema(),
            }
        });

        let text = self.generate(body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn job_description(&self, details: &str) -> anyhow::Result<String> {
        let prompt = format!(
            "Generate a professional domestic helper job description in English based on these notes: \"{details}\". \
             Include sections for: Job Overview, Main Responsibilities, Requirements, and Compensation. \
             Ensure it sounds encouraging and professional."
        );
        self.generate(json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .await
    }

    async fn generate(&self, body: Value) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.api_base, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Gemini request failed: HTTP {}", status);
        }

        let parsed: GenerateResponse = resp.json().await?;
        first_text(parsed).ok_or_else(|| anyhow::anyhow!("Empty response from Gemini"))
    }
}

fn criteria_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "nationality": { "type": "STRING" },
            "experience": { "type": "STRING" },
            "skills": { "type": "ARRAY", "items": { "type": "STRING" } },
            "summary": {
                "type": "STRING",
                "description": "A friendly summary of what they are looking for in English."
            }
        },
        "required": ["nationality", "experience", "skills", "summary"]
    })
}

fn first_text(resp: GenerateResponse) -> Option<String> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_key_means_unconfigured() {
        let client = GeminiClient::from_key(
            Some(PLACEHOLDER_KEY.to_string()),
            DEFAULT_MODEL.to_string(),
            DEFAULT_API_BASE.to_string(),
        )
        .unwrap();
        assert!(client.is_none());

        let client = GeminiClient::from_key(None, DEFAULT_MODEL.to_string(), DEFAULT_API_BASE.to_string()).unwrap();
        assert!(client.is_none());
    }

    #[test]
    fn first_text_joins_parts() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        }))
        .unwrap();
        assert_eq!(first_text(resp).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn empty_candidates_yield_nothing() {
        let resp: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(first_text(resp).is_none());
    }
}
