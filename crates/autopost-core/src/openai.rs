use crate::config::OpenAiSettings;
use crate::error::GenerationError;
use crate::generation::TextGenerator;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Per-call timeout for every remote request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the OpenAI Responses API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsesPayload {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesPayload {
    /// Concatenated `output_text` parts, preferring the flattened field when present.
    pub(crate) fn text(&self) -> Option<String> {
        if let Some(text) = self.output_text.as_ref().filter(|t| !t.trim().is_empty()) {
            return Some(text.clone());
        }

        let joined = self
            .output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if joined.trim().is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

impl OpenAiClient {
    pub fn new(settings: &OpenAiSettings) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("autopost/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_key: settings.api_key.trim().to_string(),
            model: settings.model.trim().to_string(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl TextGenerator for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/responses", self.base_url);
        debug!(model = %self.model, prompt_chars = prompt.len(), "Requesting completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ResponsesRequest {
                model: &self.model,
                input: prompt,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ResponsesPayload = response.json().await?;
        payload.text().ok_or(GenerationError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_from_output_items() {
        let payload: ResponsesPayload = serde_json::from_str(
            r#"{
                "id": "resp_1",
                "output": [
                    {"type": "reasoning", "content": []},
                    {"type": "message", "content": [
                        {"type": "output_text", "text": "{\"title\":"},
                        {"type": "output_text", "text": "\"T\"}"}
                    ]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.text().as_deref(), Some("{\"title\":\"T\"}"));
    }

    #[test]
    fn test_text_prefers_flattened_output_text() {
        let payload: ResponsesPayload =
            serde_json::from_str(r#"{"output_text": "hello", "output": []}"#).unwrap();
        assert_eq!(payload.text().as_deref(), Some("hello"));
    }

    #[test]
    fn test_empty_payload_has_no_text() {
        let payload: ResponsesPayload = serde_json::from_str(
            r#"{"output": [{"content": [{"type": "refusal", "refusal": "no"}]}]}"#,
        )
        .unwrap();
        assert!(payload.text().is_none());
    }

    #[test]
    fn test_client_normalizes_settings() {
        let settings = OpenAiSettings {
            api_key: " sk-test ".to_string(),
            model: " gpt-4.1 ".to_string(),
            base_url: "https://api.openai.com/v1/".to_string(),
        };
        let client = OpenAiClient::new(&settings).unwrap();
        assert_eq!(client.model, "gpt-4.1");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }
}
