//! Connection lifecycle and question-answering session.
//!
//! `ConnectionManager` owns the active database handle and any staged
//! database file; `Session` layers SQL generation and query history on
//! top of it.

use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::ConnectionProfile;
use crate::db::{self, DatabaseClient, QueryResult, Schema};
use crate::error::{AskdbError, Result};
use crate::llm::SqlGenerator;

/// An active database connection with its profile.
pub struct ActiveConnection {
    /// The profile this connection was opened from.
    pub profile: ConnectionProfile,
    /// Database client.
    pub db: Box<dyn DatabaseClient>,
}

/// Manages the active database connection and staged database files.
///
/// At most one connection is active at a time; opening a new one closes
/// the previous one first. A staged file (an uploaded SQLite database
/// written to a temp file) lives exactly as long as the connection opened
/// from it: it is removed when replaced, when the manager closes, or when
/// the manager is dropped.
#[derive(Default)]
pub struct ConnectionManager {
    active: Option<ActiveConnection>,
    staged: Option<NamedTempFile>,
}

impl ConnectionManager {
    /// Creates a new connection manager with no active connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection for the given profile, closing any previous one.
    ///
    /// Opening only constructs the handle; use `test_connection` to probe
    /// liveness.
    pub async fn connect(&mut self, profile: ConnectionProfile) -> Result<()> {
        let db = db::connect(&profile)?;

        if let Some(old) = self.active.take() {
            old.db.close().await;
        }

        info!("Connected: {}", profile.display_string());
        self.active = Some(ActiveConnection { profile, db });
        Ok(())
    }

    /// Writes raw SQLite database bytes to a managed temp file and connects
    /// to it.
    ///
    /// The previous staged file, if any, is removed once the new connection
    /// is in place.
    pub async fn connect_staged(&mut self, bytes: &[u8]) -> Result<()> {
        let staged = NamedTempFile::new()
            .map_err(|e| AskdbError::connection(format!("Failed to create temp file: {e}")))?;
        std::fs::write(staged.path(), bytes)
            .map_err(|e| AskdbError::connection(format!("Failed to write temp file: {e}")))?;

        debug!("Staged database at {}", staged.path().display());
        let profile = ConnectionProfile::sqlite(staged.path());
        self.connect(profile).await?;

        // Replacing the guard unlinks the previous staged file.
        self.staged = Some(staged);
        Ok(())
    }

    /// Path of the currently staged database file, if any.
    pub fn staged_path(&self) -> Option<&Path> {
        self.staged.as_ref().map(NamedTempFile::path)
    }

    /// Get the active database client.
    pub fn db(&self) -> Option<&dyn DatabaseClient> {
        self.active.as_ref().map(|c| c.db.as_ref())
    }

    /// Get the active connection's profile.
    pub fn profile(&self) -> Option<&ConnectionProfile> {
        self.active.as_ref().map(|c| &c.profile)
    }

    /// Check if there's an active connection.
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Close the active connection and remove any staged file.
    ///
    /// Closing with nothing active is a no-op, as is closing twice.
    pub async fn close(&mut self) {
        if let Some(conn) = self.active.take() {
            conn.db.close().await;
        }
        self.staged = None;
    }
}

/// One executed query in the session history.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// The natural-language question, when the SQL was generated.
    pub question: Option<String>,
    /// The SQL that was executed.
    pub sql: String,
    /// Rows returned, or None if execution failed.
    pub row_count: Option<usize>,
}

/// A question-answering session over one database connection.
pub struct Session {
    manager: ConnectionManager,
    generator: SqlGenerator,
    history: Vec<HistoryEntry>,
}

impl Session {
    /// Creates a session with no active connection.
    pub fn new(generator: SqlGenerator) -> Self {
        Self {
            manager: ConnectionManager::new(),
            generator,
            history: Vec::new(),
        }
    }

    /// Opens a connection for the given profile, closing any previous one.
    pub async fn connect(&mut self, profile: ConnectionProfile) -> Result<()> {
        self.manager.connect(profile).await
    }

    /// Connects to raw SQLite database bytes via a managed temp file.
    pub async fn connect_staged(&mut self, bytes: &[u8]) -> Result<()> {
        self.manager.connect_staged(bytes).await
    }

    fn db(&self) -> Result<&dyn DatabaseClient> {
        self.manager
            .db()
            .ok_or_else(|| AskdbError::connection("No active connection"))
    }

    /// Probes the active connection with the dialect's liveness query.
    pub async fn test_connection(&self) -> (bool, String) {
        match self.manager.db() {
            Some(db) => db.test_connection().await,
            None => (false, "Connection failed: no active connection".to_string()),
        }
    }

    /// Introspects the connected database.
    pub async fn schema(&self) -> Result<Schema> {
        self.db()?.describe_schema().await
    }

    /// Renders the textual schema report for the connected database.
    pub async fn schema_report(&self) -> Result<String> {
        Ok(self.schema().await?.render_report())
    }

    /// Lists user tables in catalog order.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self
            .schema()
            .await?
            .table_names()
            .into_iter()
            .map(String::from)
            .collect())
    }

    /// Generates SQL for a natural-language question.
    ///
    /// LLM failures come back as an error string in SQL position; only
    /// introspection failures are errors here.
    pub async fn generate_sql(&self, question: &str) -> Result<String> {
        let profile = self
            .manager
            .profile()
            .ok_or_else(|| AskdbError::connection("No active connection"))?;
        let report = self.schema_report().await?;
        Ok(self
            .generator
            .generate(question, &report, profile.dialect)
            .await)
    }

    /// Executes SQL against the active connection and records it in the
    /// history.
    pub async fn run_sql(&mut self, sql: &str) -> Result<QueryResult> {
        self.run_recorded(None, sql).await
    }

    /// Generates SQL for the question, executes it, and returns both.
    pub async fn ask(&mut self, question: &str) -> Result<(String, QueryResult)> {
        let sql = self.generate_sql(question).await?;
        let result = self.run_recorded(Some(question.to_string()), &sql).await?;
        Ok((sql, result))
    }

    async fn run_recorded(&mut self, question: Option<String>, sql: &str) -> Result<QueryResult> {
        let result = self.db()?.execute_query(sql).await;
        self.history.push(HistoryEntry {
            question,
            sql: sql.to_string(),
            row_count: result.as_ref().ok().map(|r| r.row_count),
        });
        result
    }

    /// Executed queries, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Whether a connection is active.
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Closes the connection and removes any staged file. Idempotent.
    pub async fn close(&mut self) {
        self.manager.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockDatabaseClient, Value};
    use crate::llm::MockLlmClient;

    fn mock_session() -> Session {
        Session::new(SqlGenerator::new(Box::new(MockLlmClient::new())))
    }

    #[tokio::test]
    async fn test_manager_starts_disconnected() {
        let manager = ConnectionManager::new();
        assert!(!manager.is_connected());
        assert!(manager.db().is_none());
        assert!(manager.profile().is_none());
        assert!(manager.staged_path().is_none());
    }

    #[tokio::test]
    async fn test_manager_connect_and_close() {
        let mut manager = ConnectionManager::new();
        manager
            .connect(ConnectionProfile::sqlite(":memory:"))
            .await
            .unwrap();
        assert!(manager.is_connected());

        manager.close().await;
        assert!(!manager.is_connected());
        // Closing again is a no-op.
        manager.close().await;
    }

    #[tokio::test]
    async fn test_manager_staged_file_removed_on_close() {
        let mut manager = ConnectionManager::new();
        // A zero-length file is a valid, empty SQLite database.
        manager.connect_staged(&[]).await.unwrap();

        let path = manager.staged_path().unwrap().to_path_buf();
        assert!(path.exists());

        manager.close().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_manager_restaging_removes_previous_file() {
        let mut manager = ConnectionManager::new();
        manager.connect_staged(&[]).await.unwrap();
        let first = manager.staged_path().unwrap().to_path_buf();

        manager.connect_staged(&[]).await.unwrap();
        let second = manager.staged_path().unwrap().to_path_buf();

        assert_ne!(first, second);
        assert!(!first.exists());
        assert!(second.exists());

        manager.close().await;
    }

    #[tokio::test]
    async fn test_session_errors_without_connection() {
        let session = mock_session();

        let err = session.schema_report().await.unwrap_err();
        assert!(matches!(err, AskdbError::Connection(_)));

        let (ok, message) = session.test_connection().await;
        assert!(!ok);
        assert!(message.starts_with("Connection failed:"));
    }

    #[tokio::test]
    async fn test_session_end_to_end_on_sqlite() {
        let mut session = mock_session();
        session
            .connect(ConnectionProfile::sqlite(":memory:"))
            .await
            .unwrap();

        let (ok, message) = session.test_connection().await;
        assert!(ok);
        assert_eq!(message, "Connection successful.");

        session
            .run_sql("CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();
        session
            .run_sql("INSERT INTO customers (name) VALUES ('Ada'), ('Grace')")
            .await
            .unwrap();

        assert_eq!(session.list_tables().await.unwrap(), vec!["customers"]);

        let report = session.schema_report().await.unwrap();
        assert!(report.contains("Table: customers"));
        assert!(report.contains("  - id (INTEGER) PRIMARY KEY"));
        assert!(report.contains("Total rows: 2"));

        // Mock LLM answers count questions with SELECT COUNT(*).
        let (sql, result) = session.ask("How many customers are there?").await.unwrap();
        assert!(sql.contains("COUNT(*)"));
        assert_eq!(result.rows[0][0], Value::Int(2));

        assert_eq!(session.history().len(), 3);
        assert_eq!(
            session.history()[2].question.as_deref(),
            Some("How many customers are there?")
        );
        assert_eq!(session.history()[2].row_count, Some(1));

        session.close().await;
        session.close().await;
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_history_records_failed_queries() {
        let mut session = mock_session();
        session
            .connect(ConnectionProfile::sqlite(":memory:"))
            .await
            .unwrap();

        assert!(session.run_sql("SELEC nonsense").await.is_err());
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].row_count, None);

        session.close().await;
    }

    #[tokio::test]
    async fn test_connect_replaces_previous_connection() {
        let mut manager = ConnectionManager::new();

        let first = Box::new(MockDatabaseClient::new());
        manager.active = Some(ActiveConnection {
            profile: ConnectionProfile::sqlite(":memory:"),
            db: first,
        });

        manager
            .connect(ConnectionProfile::sqlite(":memory:"))
            .await
            .unwrap();
        assert!(manager.is_connected());
    }
}
