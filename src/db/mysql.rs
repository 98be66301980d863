//! MySQL database client implementation.
//!
//! Implements the `DatabaseClient` trait for MySQL using sqlx. Table
//! metadata comes from `SHOW TABLES` and `DESCRIBE`.

use crate::config::ConnectionProfile;
use crate::db::{Column, ColumnInfo, DatabaseClient, Dialect, QueryResult, Row, Schema, Table, Value};
use crate::error::{AskdbError, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

const DIALECT: Dialect = Dialect::MySql;

/// MySQL database client.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Opens a handle for the profile's server.
    ///
    /// Opening only constructs the handle; connectivity problems surface
    /// from `test_connection` or the first statement.
    pub fn open(profile: &ConnectionProfile) -> Result<Self> {
        let conn_str = profile.to_connection_string()?;
        debug!("Opening MySQL handle: {}", profile.display_string());

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(&conn_str)
            .map_err(|e| AskdbError::connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Creates a client from an existing pool. Primarily useful for testing.
    #[allow(dead_code)]
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Fetches column metadata for one enumerated table.
    ///
    /// `DESCRIBE` yields Field, Type, Null, Key, Default, Extra; a Key of
    /// "PRI" marks a primary-key column.
    async fn fetch_columns(&self, table: &str) -> Result<Vec<Column>> {
        let describe = format!("DESCRIBE {}", DIALECT.quote_identifier(table));
        let rows = sqlx::query(&describe)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AskdbError::introspection(format!("Failed to fetch columns for {table}: {e}"))
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name = get_text(&row, 0)
                .ok_or_else(|| AskdbError::introspection("DESCRIBE row missing Field"))?;
            let declared_type = get_text(&row, 1)
                .ok_or_else(|| AskdbError::introspection("DESCRIBE row missing Type"))?;
            let key = get_text(&row, 3).unwrap_or_default();

            columns.push(Column {
                name,
                declared_type,
                is_primary_key: key == "PRI",
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
impl DatabaseClient for MySqlClient {
    async fn describe_schema(&self) -> Result<Schema> {
        // SHOW TABLES returns one column named after the connected database;
        // read it positionally.
        let rows = sqlx::query(DIALECT.list_tables_query())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AskdbError::introspection(format!("Failed to list tables: {e}")))?;

        // A name cell that fails to decode aborts the whole report; no
        // partial schema.
        let mut table_names = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = get_text(row, 0)
                .ok_or_else(|| AskdbError::introspection("SHOW TABLES row missing table name"))?;
            table_names.push(name);
        }

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

/// Decodes a text cell, tolerating VARBINARY results from metadata
/// statements like SHOW and DESCRIBE.
fn get_text(row: &MySqlRow, index: usize) -> Option<String> {
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Some(v);
    }
    row.try_get::<Vec<u8>, _>(index)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow to our Value type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let upper = type_name.to_uppercase();

    if upper.contains("UNSIGNED") {
        return row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v.min(i64::MAX as u64) as i64))
            .unwrap_or(Value::Null);
    }

    match upper.as_str() {
        "BOOLEAN" | "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "DOUBLE" => row
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

        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // CHAR/VARCHAR/TEXT/ENUM/SET/DECIMAL/JSON and anything else.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
