//! SQLite database client implementation.
//!
//! Implements the `DatabaseClient` trait for SQLite files using sqlx.
//! Table metadata comes from `sqlite_master` and `PRAGMA table_info`.

use crate::config::ConnectionProfile;
use crate::db::{Column, ColumnInfo, DatabaseClient, Dialect, QueryResult, Row, Schema, Table, Value};
use crate::error::{AskdbError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

const DIALECT: Dialect = Dialect::Sqlite;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens a handle for the profile's database file.
    ///
    /// Opening only constructs the handle; the file is not touched until
    /// the first query, so a missing file surfaces from `test_connection`
    /// or the first statement rather than from here.
    pub fn open(profile: &ConnectionProfile) -> Result<Self> {
        let conn_str = profile.to_connection_string()?;
        debug!("Opening SQLite handle: {conn_str}");

        // A single connection keeps ":memory:" databases coherent and
        // matches the one-handle-per-session model.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(&conn_str)
            .map_err(|e| AskdbError::connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Creates a client from an existing pool. Primarily useful for testing.
    #[allow(dead_code)]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetches column metadata for one enumerated table.
    async fn fetch_columns(&self, table: &str) -> Result<Vec<Column>> {
        let pragma = format!("PRAGMA table_info({})", DIALECT.quote_identifier(table));
        let rows = sqlx::query(&pragma).fetch_all(&self.pool).await.map_err(|e| {
            AskdbError::introspection(format!("Failed to fetch columns for {table}: {e}"))
        })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("name")
                .map_err(|e| AskdbError::introspection(e.to_string()))?;
            let declared_type: String = row
                .try_get("type")
                .map_err(|e| AskdbError::introspection(e.to_string()))?;
            // Non-zero pk is the 1-based ordinal of the column within the key.
            let pk_ordinal: i64 = row
                .try_get("pk")
                .map_err(|e| AskdbError::introspection(e.to_string()))?;

            columns.push(Column {
                name,
                declared_type,
                is_primary_key: pk_ordinal != 0,
            });
        }
        Ok(columns)
    }

    /// Fetches the row-count snapshot for one enumerated table.
    async fn fetch_row_count(&self, table: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&DIALECT.count_query(table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AskdbError::introspection(format!("Failed to count rows in {table}: {e}"))
            })?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn describe_schema(&self) -> Result<Schema> {
        let table_names: Vec<String> = sqlx::query_scalar(DIALECT.list_tables_query())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AskdbError::introspection(format!("Failed to list tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            let columns = self.fetch_columns(&name).await?;
            let row_count = self.fetch_row_count(&name).await?;
            tables.push(Table {
                name,
                columns,
                row_count,
            });
        }

        Ok(Schema { tables })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            AskdbError::execution(format!("Query timed out after {QUERY_TIMEOUT_SECS} seconds"))
        })?
        .map_err(|e| AskdbError::execution(e.to_string()))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Row> = result.iter().map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            row_count,
            execution_time,
        })
    }

    async fn test_connection(&self) -> (bool, String) {
        match sqlx::query(DIALECT.liveness_query()).fetch_one(&self.pool).await {
            Ok(_) => (true, "Connection successful.".to_string()),
            Err(e) => (false, format!("Connection failed: {e}")),
        }
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a SqliteRow to our Value type.
///
/// SQLite reports storage-class names; anything unrecognized falls through
/// a decode cascade so expression columns still come out usable.
fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BOOLEAN" | "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "TEXT" | "VARCHAR" | "DATE" | "DATETIME" => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),

        _ => decode_cascade(row, index),
    }
}

/// Decode attempt order for columns whose declared type is unknown,
/// e.g. bare expressions like `SELECT 1 + 1`.
fn decode_cascade(row: &SqliteRow, index: usize) -> Value {
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(index) {
        return Value::Int(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(index) {
        return Value::Float(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(index) {
        return Value::String(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return Value::Bytes(v);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_client() -> SqliteClient {
        SqliteClient::open(&ConnectionProfile::sqlite(":memory:")).unwrap()
    }

    #[tokio::test]
    async fn test_execute_select_literal() {
        let client = memory_client().await;

        let result = client.execute_query("SELECT 1 AS x").await.unwrap();

        assert_eq!(result.columns.len(), 1);
        assert_eq!(result.columns[0].name, "x");
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0][0], Value::Int(1));

        client.close().await;
    }

    #[tokio::test]
    async fn test_execute_invalid_sql_returns_execution_error() {
        let client = memory_client().await;

        let err = client.execute_query("SELEC nonsense").await.unwrap_err();
        assert!(matches!(err, AskdbError::Execution(_)));
        assert!(!err.to_string().is_empty());

        client.close().await;
    }

    #[tokio::test]
    async fn test_describe_schema_reports_pk_and_counts() {
        let client = memory_client().await;
        client
            .execute_query("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT)")
            .await
            .unwrap();
        client
            .execute_query("INSERT INTO items (label) VALUES ('a'), ('b'), ('c')")
            .await
            .unwrap();

        let schema = client.describe_schema().await.unwrap();

        assert_eq!(schema.tables.len(), 1);
        let items = &schema.tables[0];
        assert_eq!(items.name, "items");
        assert_eq!(items.row_count, 3);
        assert!(items.columns[0].is_primary_key);
        assert_eq!(items.columns[0].declared_type, "INTEGER");
        assert!(!items.columns[1].is_primary_key);

        client.close().await;
    }

    #[tokio::test]
    async fn test_describe_schema_skips_sqlite_internal_tables() {
        let client = memory_client().await;
        // AUTOINCREMENT creates sqlite_sequence, which must not be reported.
        client
            .execute_query("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT)")
            .await
            .unwrap();
        client
            .execute_query("INSERT INTO t DEFAULT VALUES")
            .await
            .unwrap();

        let schema = client.describe_schema().await.unwrap();
        assert_eq!(schema.table_names(), vec!["t"]);

        client.close().await;
    }

    #[tokio::test]
    async fn test_test_connection_on_missing_file() {
        let client =
            SqliteClient::open(&ConnectionProfile::sqlite("/nonexistent/dir/missing.db")).unwrap();

        let (ok, message) = client.test_connection().await;
        assert!(!ok);
        assert!(message.starts_with("Connection failed:"));

        client.close().await;
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_invalidates_handle() {
        let client = memory_client().await;
        client.close().await;
        client.close().await;

        let err = client.execute_query("SELECT 1").await.unwrap_err();
        assert!(matches!(err, AskdbError::Execution(_)));

        let (ok, _) = client.test_connection().await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_null_values_decode() {
        let client = memory_client().await;
        let result = client.execute_query("SELECT NULL AS \"nothing\"").await.unwrap();
        assert!(result.rows[0][0].is_null());
        client.close().await;
    }
}
