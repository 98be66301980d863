//! PostgreSQL database client implementation.
//!
//! Implements the `DatabaseClient` trait for PostgreSQL using sqlx. Table
//! metadata comes from `information_schema`, with primary-key columns
//! resolved through `table_constraints`/`key_column_usage`.

use crate::config::ConnectionProfile;
use crate::db::{Column, ColumnInfo, DatabaseClient, Dialect, QueryResult, Row, Schema, Table, Value};
use crate::error::{AskdbError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

const DIALECT: Dialect = Dialect::Postgres;

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Opens a handle for the profile's server.
    ///
    /// Opening only constructs the handle; connectivity problems surface
    /// from `test_connection` or the first statement.
    pub fn open(profile: &ConnectionProfile) -> Result<Self> {
        let conn_str = profile.to_connection_string()?;
        debug!("Opening PostgreSQL handle: {}", profile.display_string());

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(&conn_str)
            .map_err(|e| AskdbError::connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Creates a client from an existing pool. Primarily useful for testing.
    #[allow(dead_code)]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches column metadata for one enumerated table, in ordinal order.
    async fn fetch_columns(&self, table: &str) -> Result<Vec<Column>> {
        let rows: Vec<(String, String, bool)> = sqlx::query_as(
            r#"
            SELECT
                c.column_name::text,
                c.data_type::text,
                EXISTS (
                    SELECT 1
                    FROM information_schema.table_constraints tc
                    JOIN information_schema.key_column_usage kcu
                        ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                    WHERE tc.constraint_type = 'PRIMARY KEY'
                        AND tc.table_schema = 'public'
                        AND tc.table_name = c.table_name
                        AND kcu.column_name = c.column_name
                ) AS is_primary_key
            FROM information_schema.columns c
            WHERE c.table_schema = 'public' AND c.table_name = $1
            ORDER BY c.ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AskdbError::introspection(format!("Failed to fetch columns for {table}: {e}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|(name, declared_type, is_primary_key)| Column {
                name,
                declared_type,
                is_primary_key,
            })
            .collect())
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
impl DatabaseClient for PostgresClient {
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
        .map_err(|e| AskdbError::execution(format_query_error(e)))?;

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

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // For all other types, try to get as string.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Formats a query error with the server's DETAIL/HINT fields if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }
        if let Some(constraint) = pg_error.constraint() {
            result.push_str("\n  CONSTRAINT: ");
            result.push_str(constraint);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests that need a live server are in tests/server_backends.rs and
    // skip themselves when POSTGRES_TEST_URL is unset.

    #[test]
    fn test_open_rejects_incomplete_profile() {
        let profile = ConnectionProfile {
            dialect: Dialect::Postgres,
            database: Some("testdb".to_string()),
            ..Default::default()
        };

        let err = PostgresClient::open(&profile).unwrap_err();
        assert!(matches!(err, AskdbError::Config(_)));
    }

    #[tokio::test]
    async fn test_open_constructs_handle_without_io() {
        let profile = ConnectionProfile {
            dialect: Dialect::Postgres,
            host: Some("nonexistent.invalid".to_string()),
            database: Some("testdb".to_string()),
            user: Some("testuser".to_string()),
            password: Some("testpass".to_string()),
            ..Default::default()
        };

        assert!(PostgresClient::open(&profile).is_ok());
    }
}
