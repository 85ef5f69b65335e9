use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::PipelineError;
use crate::llm_manager::LLMProvider;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Gemini API provider over the OpenAI-compatible endpoint
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: usize,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl GeminiProvider {
    /// Create a provider from the environment credential and config
    pub fn from_env(config: &LlmConfig) -> Result<Self> {
        let api_key = env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(PipelineError::MissingCredential(API_KEY_VAR))?;
        Self::with_config(api_key, config)
    }

    pub fn with_config(api_key: String, config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for Gemini")?;
        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client,
        })
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: Some(self.max_tokens),
            temperature: self.temperature,
            stream: false,
        }
    }
}

fn extract_content(response_text: &str) -> Result<(String, Option<String>)> {
    let gemini_response: GeminiResponse =
        serde_json::from_str(response_text).context("Failed to parse Gemini response")?;

    if let Some(usage) = &gemini_response.usage {
        debug!(
            "Gemini token usage - Prompt: {}, Completion: {}, Total: {}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }

    let choice = gemini_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No response choices from Gemini"))?;

    Ok((choice.message.content, choice.finish_reason))
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            // The compatibility layer wraps errors in a one-element array
            let parsed = serde_json::from_str::<GeminiError>(&response_text).or_else(|_| {
                serde_json::from_str::<Vec<GeminiError>>(&response_text)
                    .map_err(|e| anyhow!(e))
                    .and_then(|mut errors| errors.pop().ok_or_else(|| anyhow!("empty error list")))
            });
            return match parsed {
                Ok(error_response) => Err(anyhow!(
                    "Gemini API error: {} (status: {:?}, code: {:?})",
                    error_response.error.message,
                    error_response.error.status,
                    error_response.error.code
                )),
                Err(_) => Err(anyhow!(
                    "Gemini API error (status {}): {}",
                    status,
                    response_text
                )),
            };
        }

        let (content, finish_reason) = extract_content(&response_text)?;

        if finish_reason.as_deref() == Some("length") {
            warn!(
                "Gemini response was truncated at max_tokens ({}). Response may be incomplete.",
                self.max_tokens
            );
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let provider =
            GeminiProvider::with_config("test_key".to_string(), &LlmConfig::default()).unwrap();
        let request = serde_json::to_value(provider.build_request("안녕")).unwrap();
        assert_eq!(request["model"], "gemini-1.5-flash");
        assert_eq!(request["messages"][0]["role"], "user");
        assert_eq!(request["messages"][0]["content"], "안녕");
        assert_eq!(request["stream"], false);
        assert_eq!(provider.model_name(), "gemini-1.5-flash");
    }

    #[test]
    fn test_extract_first_choice() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "첫 번째"}, "finish_reason": "stop"},
                {"message": {"role": "assistant", "content": "두 번째"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let (content, finish) = extract_content(body).unwrap();
        assert_eq!(content, "첫 번째");
        assert_eq!(finish.as_deref(), Some("stop"));
    }

    #[test]
    fn test_no_choices_is_an_error() {
        assert!(extract_content(r#"{"choices": []}"#).is_err());
    }
}
