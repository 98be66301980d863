//! In-memory database clients for tests.
//!
//! `MockDatabaseClient` returns canned schema and query results;
//! `FailingDatabaseClient` fails every operation with a fixed message.

use crate::db::{DatabaseClient, QueryResult, Schema};
use crate::error::{AskdbError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock client that serves canned responses and records the SQL it sees.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    result: QueryResult,
    closed: AtomicBool,
    close_count: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.result = result;
        self
    }

    /// SQL strings passed to `execute_query`, in order.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn describe_schema(&self) -> Result<Schema> {
        if self.is_closed() {
            return Err(AskdbError::introspection("connection is closed"));
        }
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if self.is_closed() {
            return Err(AskdbError::execution("connection is closed"));
        }
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(self.result.clone())
    }

    async fn test_connection(&self) -> (bool, String) {
        if self.is_closed() {
            (false, "Connection failed: connection is closed".to_string())
        } else {
            (true, "Connection successful.".to_string())
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock client whose every operation fails with the configured message.
#[derive(Debug)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingDatabaseClient {
    fn default() -> Self {
        Self::new("simulated failure")
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn describe_schema(&self) -> Result<Schema> {
        Err(AskdbError::introspection(self.message.clone()))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(AskdbError::execution(self.message.clone()))
    }

    async fn test_connection(&self) -> (bool, String) {
        (false, format!("Connection failed: {}", self.message))
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Column, Table};

    #[tokio::test]
    async fn test_mock_records_queries() {
        let client = MockDatabaseClient::new();
        client.execute_query("SELECT 1").await.unwrap();
        client.execute_query("SELECT 2").await.unwrap();

        assert_eq!(client.executed_queries(), vec!["SELECT 1", "SELECT 2"]);
    }

    #[tokio::test]
    async fn test_mock_close_invalidates_and_counts() {
        let client = MockDatabaseClient::new().with_schema(Schema {
            tables: vec![Table {
                name: "t".to_string(),
                columns: vec![Column::new("id", "INTEGER").primary_key(true)],
                row_count: 0,
            }],
        });

        assert!(client.describe_schema().await.is_ok());

        client.close().await;
        client.close().await;
        assert_eq!(client.close_count(), 2);

        assert!(client.describe_schema().await.is_err());
        let (ok, _) = client.test_connection().await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_failing_client_fails_everything() {
        let client = FailingDatabaseClient::new("disk on fire");

        let err = client.execute_query("SELECT 1").await.unwrap_err();
        assert!(err.to_string().contains("disk on fire"));

        let (ok, message) = client.test_connection().await;
        assert!(!ok);
        assert!(message.contains("disk on fire"));
    }
}
