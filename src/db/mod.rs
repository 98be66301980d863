//! Database abstraction layer for askdb.
//!
//! Provides a trait-based interface for database operations, allowing
//! the three supported backends to be used interchangeably.

mod mock;
mod mysql;
mod postgres;
mod schema;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use postgres::PostgresClient;
pub use schema::{Column, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionProfile;
use crate::error::Result;
use async_trait::async_trait;

/// Supported database dialects.
///
/// The dialect is selected once when the connection profile is built;
/// all catalog and liveness queries are derived from it here so the
/// introspector and the lifecycle code can never drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    MySql,
    Postgres,
}

impl Dialect {
    /// Returns the dialect as a string for persistence and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Parses a dialect from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "mysql" => Some(Self::MySql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }

    /// Returns the default port for server dialects, or None for SQLite.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Sqlite => None,
            Self::MySql => Some(3306),
            Self::Postgres => Some(5432),
        }
    }

    /// Returns the URL scheme used in sqlx connection strings.
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Returns the catalog query that lists user tables for this dialect.
    ///
    /// Table order is whatever the backend returns; callers must not rely
    /// on a specific ordering across dialects.
    pub fn list_tables_query(&self) -> &'static str {
        match self {
            Self::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
            }
            Self::MySql => "SHOW TABLES",
            Self::Postgres => {
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = 'public' AND table_type = 'BASE TABLE'"
            }
        }
    }

    /// Returns the minimal liveness query used by `test_connection`.
    pub fn liveness_query(&self) -> &'static str {
        match self {
            Self::Sqlite => "SELECT sqlite_version()",
            Self::MySql => "SELECT VERSION()",
            Self::Postgres => "SELECT version()",
        }
    }

    /// Quotes an identifier for interpolation into a statement.
    ///
    /// Identifiers interpolated this way must come from the catalog query,
    /// never from free-form user input.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Self::Sqlite | Self::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
            Self::MySql => format!("`{}`", name.replace('`', "``")),
        }
    }

    /// Builds the row-count query for a table enumerated by the catalog.
    pub fn count_query(&self, table: &str) -> String {
        format!("SELECT COUNT(*) FROM {}", self.quote_identifier(table))
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creates a database client for the dialect named in the profile.
///
/// This is the central factory function for database connections. The
/// profile is validated first (missing fields are a configuration error,
/// not a connection error), and opening only constructs the handle; no
/// test query runs until the caller asks for one.
pub fn connect(profile: &ConnectionProfile) -> Result<Box<dyn DatabaseClient>> {
    profile.validate()?;
    match profile.dialect {
        Dialect::Sqlite => Ok(Box::new(SqliteClient::open(profile)?)),
        Dialect::MySql => Ok(Box::new(MySqlClient::open(profile)?)),
        Dialect::Postgres => Ok(Box::new(PostgresClient::open(profile)?)),
    }
}

/// Trait defining the interface for database clients.
///
/// All database operations are async and convert backend failures into
/// AskdbError values; nothing here panics past the boundary.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Walks the backend's catalog and returns tables, columns and row counts.
    async fn describe_schema(&self) -> Result<Schema>;

    /// Executes a SQL string verbatim and returns the materialized results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Runs the dialect's liveness query.
    ///
    /// Returns `(true, "Connection successful.")` on success, or
    /// `(false, "Connection failed: <cause>")` on any failure, including
    /// a handle that has already been closed.
    async fn test_connection(&self) -> (bool, String);

    /// Closes the database connection. Idempotent.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_parse() {
        assert_eq!(Dialect::parse("sqlite"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::parse("SQLite3"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::parse("mysql"), Some(Dialect::MySql));
        assert_eq!(Dialect::parse("postgres"), Some(Dialect::Postgres));
        assert_eq!(Dialect::parse("postgresql"), Some(Dialect::Postgres));
        assert_eq!(Dialect::parse("oracle"), None);
    }

    #[test]
    fn test_dialect_default_port() {
        assert_eq!(Dialect::Sqlite.default_port(), None);
        assert_eq!(Dialect::MySql.default_port(), Some(3306));
        assert_eq!(Dialect::Postgres.default_port(), Some(5432));
    }

    #[test]
    fn test_liveness_queries_differ_per_dialect() {
        assert_eq!(Dialect::Sqlite.liveness_query(), "SELECT sqlite_version()");
        assert_eq!(Dialect::MySql.liveness_query(), "SELECT VERSION()");
        assert_eq!(Dialect::Postgres.liveness_query(), "SELECT version()");
    }

    #[test]
    fn test_list_tables_query_filters_system_tables() {
        assert!(Dialect::Sqlite
            .list_tables_query()
            .contains("NOT LIKE 'sqlite_%'"));
        assert!(Dialect::Postgres
            .list_tables_query()
            .contains("table_schema = 'public'"));
        assert_eq!(Dialect::MySql.list_tables_query(), "SHOW TABLES");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::Sqlite.quote_identifier("orders"), "\"orders\"");
        assert_eq!(Dialect::Postgres.quote_identifier("or\"der"), "\"or\"\"der\"");
        assert_eq!(Dialect::MySql.quote_identifier("orders"), "`orders`");
        assert_eq!(Dialect::MySql.quote_identifier("or`der"), "`or``der`");
    }

    #[test]
    fn test_count_query_quotes_table() {
        assert_eq!(
            Dialect::Sqlite.count_query("order_items"),
            "SELECT COUNT(*) FROM \"order_items\""
        );
        assert_eq!(
            Dialect::MySql.count_query("order_items"),
            "SELECT COUNT(*) FROM `order_items`"
        );
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::MySql.to_string(), "mysql");
    }
}
