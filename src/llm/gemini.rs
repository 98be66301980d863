//! Google Gemini LLM client implementation.
//!
//! Implements the LlmClient trait against the Gemini generateContent REST
//! API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AskdbError, Result};
use crate::llm::LlmClient;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gemini API base URL; the model name and API key are appended per request.
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model when none is configured.
const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Maximum number of retry attempts for transient errors.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model to use (e.g., "gemini-1.5-pro").
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Google Gemini LLM client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    /// Creates a new Gemini client with the given configuration.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AskdbError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `GOOGLE_API_KEY` for the API key.
    /// Optionally reads `GEMINI_MODEL` for the model (defaults to
    /// "gemini-1.5-pro").
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| AskdbError::llm("GOOGLE_API_KEY environment variable not set"))?;

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self::new(GeminiConfig::new(api_key, model))
    }

    fn request_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_URL, self.config.model, self.config.api_key
        )
    }

    /// Parses an API error response and returns (error, is_retryable).
    fn parse_error(status: reqwest::StatusCode, body: &str) -> (AskdbError, bool) {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return (
                AskdbError::llm("Authentication failed. Check your GOOGLE_API_KEY."),
                false,
            );
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return (
                AskdbError::llm("Rate limited. Please wait and try again."),
                true,
            );
        }

        let is_retryable = status.is_server_error();

        if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(body) {
            return (
                AskdbError::llm(format!("Gemini API error: {}", error_response.error.message)),
                is_retryable,
            );
        }

        (
            AskdbError::llm(format!("Gemini API error ({}): {}", status, body)),
            is_retryable,
        )
    }

    /// Determines if a request error is retryable.
    fn is_retryable_request_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }

    /// Extracts the text of the first candidate from a parsed response.
    fn extract_text(response: GeminiResponse) -> Result<String> {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AskdbError::llm("No response from Gemini"))
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = self.request_url();
        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!(
                "Gemini API request attempt {} of {}",
                attempt, MAX_RETRY_ATTEMPTS
            );

            let result = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| AskdbError::llm(format!("Failed to read response: {}", e)))?;

                    if status.is_success() {
                        let response: GeminiResponse =
                            serde_json::from_str(&body).map_err(|e| {
                                AskdbError::llm(format!("Failed to parse response: {}", e))
                            })?;
                        return Self::extract_text(response);
                    }

                    let (error, is_retryable) = Self::parse_error(status, &body);
                    last_error = Some(error);

                    if !is_retryable || attempt >= MAX_RETRY_ATTEMPTS {
                        break;
                    }

                    warn!(
                        "Gemini API request failed (attempt {}), retrying in {:?}: {}",
                        attempt, delay, status
                    );
                }
                Err(e) => {
                    let is_retryable = Self::is_retryable_request_error(&e);
                    let error = if e.is_timeout() {
                        AskdbError::llm("Request timed out. Try again.")
                    } else if e.is_connect() {
                        AskdbError::llm("Failed to connect to Gemini API. Check your network.")
                    } else {
                        AskdbError::llm(format!("Request failed: {}", e))
                    };
                    last_error = Some(error);

                    if !is_retryable || attempt >= MAX_RETRY_ATTEMPTS {
                        break;
                    }

                    warn!(
                        "Gemini API request failed (attempt {}), retrying in {:?}",
                        attempt, delay
                    );
                }
            }

            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        Err(last_error.unwrap_or_else(|| AskdbError::llm("Request failed")))
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = GeminiConfig::new("key-test", "gemini-1.5-pro");
        assert_eq!(config.api_key, "key-test");
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_with_timeout() {
        let config = GeminiConfig::new("key-test", "gemini-1.5-pro").with_timeout(60);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_request_url_contains_model_and_key() {
        let client = GeminiClient::new(GeminiConfig::new("secret", "gemini-1.5-flash")).unwrap();
        let url = client.request_url();
        assert!(url.contains("/gemini-1.5-flash:generateContent"));
        assert!(url.ends_with("key=secret"));
    }

    #[test]
    fn test_parse_error_unauthorized() {
        let (error, is_retryable) =
            GeminiClient::parse_error(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(error.to_string().contains("Authentication failed"));
        assert!(!is_retryable);
    }

    #[test]
    fn test_parse_error_rate_limited() {
        let (error, is_retryable) =
            GeminiClient::parse_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(error.to_string().contains("Rate limited"));
        assert!(is_retryable);
    }

    #[test]
    fn test_parse_error_with_message() {
        let body = r#"{"error":{"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let (error, _) = GeminiClient::parse_error(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(error.to_string().contains("API key not valid"));
    }

    #[test]
    fn test_parse_error_server_error_is_retryable() {
        let (_, is_retryable) =
            GeminiClient::parse_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(is_retryable);
    }

    #[test]
    fn test_extract_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"SELECT 1"}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(GeminiClient::extract_text(response).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(GeminiClient::extract_text(response).is_err());
    }
}
