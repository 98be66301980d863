//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, without
//! making real API calls.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::Result;
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Fixed response returned for every prompt, if set.
    fixed_response: Option<String>,
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Prompts received, in order.
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed response returned for every prompt.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Adds a custom response mapping.
    ///
    /// When the prompt contains `pattern`, the mock will return `response`.
    pub fn with_pattern(mut self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Generates a mock response based on the prompt.
    fn mock_response(&self, prompt: &str) -> String {
        if let Some(ref fixed) = self.fixed_response {
            return fixed.clone();
        }

        let prompt_lower = prompt.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if prompt_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if prompt_lower.contains("how many") || prompt_lower.contains("count") {
            return "```sql\nSELECT COUNT(*) FROM customers;\n```".to_string();
        }

        if prompt_lower.contains("all customers") || prompt_lower.contains("show customers") {
            return "```sql\nSELECT * FROM customers;\n```".to_string();
        }

        "SELECT 1".to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.mock_response(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fixed_response() {
        let client = MockLlmClient::new().with_response("SELECT 42");

        let response = client.complete("anything at all").await.unwrap();
        assert_eq!(response, "SELECT 42");
    }

    #[tokio::test]
    async fn test_mock_pattern_response() {
        let client =
            MockLlmClient::new().with_pattern("orders", "```sql\nSELECT * FROM orders;\n```");

        let response = client.complete("show me the ORDERS table").await.unwrap();
        assert!(response.contains("SELECT * FROM orders"));
    }

    #[tokio::test]
    async fn test_mock_default_count_response() {
        let client = MockLlmClient::new();

        let response = client.complete("How many customers are there?").await.unwrap();
        assert!(response.contains("SELECT COUNT(*)"));
    }

    #[tokio::test]
    async fn test_mock_records_prompts() {
        let client = MockLlmClient::new();
        client.complete("first").await.unwrap();
        client.complete("second").await.unwrap();

        assert_eq!(client.prompts(), vec!["first", "second"]);
    }
}
