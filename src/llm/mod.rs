//! LLM integration for askdb.
//!
//! Provides the client trait, the Gemini implementation, prompt
//! construction, and response cleanup for natural-language-to-SQL
//! translation.

pub mod gemini;
pub mod mock;
pub mod parser;
pub mod prompt;

pub use gemini::{GeminiClient, GeminiConfig};
pub use mock::MockLlmClient;
pub use parser::strip_sql_fence;
pub use prompt::build_prompt;

use async_trait::async_trait;
use std::str::FromStr;
use tracing::warn;

use crate::db::Dialect;
use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async
/// operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given prompt.
    ///
    /// Returns the complete response as a single string.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Google Gemini.
    #[default]
    Gemini,
    /// Mock client for testing (no API key required).
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Translates natural-language questions into SQL using an LLM client.
pub struct SqlGenerator {
    client: Box<dyn LlmClient>,
}

impl SqlGenerator {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Generates a SQL query for the question against the given schema.
    ///
    /// On LLM failure the error is folded into the returned string in SQL
    /// position, `Error generating SQL query: <cause>`, so the caller can
    /// show it where the query would have gone. Executing it fails like any
    /// other invalid SQL.
    pub async fn generate(&self, question: &str, schema_report: &str, dialect: Dialect) -> String {
        let prompt = build_prompt(question, schema_report, dialect);

        match self.client.complete(&prompt).await {
            Ok(response) => strip_sql_fence(&response),
            Err(e) => {
                warn!("SQL generation failed: {e}");
                format!("Error generating SQL query: {e}")
            }
        }
    }
}
