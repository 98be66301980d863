//! Sample database for demos and integration tests.
//!
//! Builds a small web-shop SQLite database: customers, categories,
//! products, orders, and order items.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::error::{AskdbError, Result};

const SCHEMA_SQL: &[&str] = &[
    "CREATE TABLE customers (
        customer_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT,
        registration_date DATE
    )",
    "CREATE TABLE categories (
        category_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT
    )",
    "CREATE TABLE products (
        product_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        category_id INTEGER,
        price REAL NOT NULL,
        stock INTEGER NOT NULL,
        FOREIGN KEY (category_id) REFERENCES categories (category_id)
    )",
    "CREATE TABLE orders (
        order_id INTEGER PRIMARY KEY,
        customer_id INTEGER,
        order_date DATE,
        total_amount REAL,
        FOREIGN KEY (customer_id) REFERENCES customers (customer_id)
    )",
    "CREATE TABLE order_items (
        order_item_id INTEGER PRIMARY KEY,
        order_id INTEGER,
        product_id INTEGER,
        quantity INTEGER NOT NULL,
        price REAL NOT NULL,
        FOREIGN KEY (order_id) REFERENCES orders (order_id),
        FOREIGN KEY (product_id) REFERENCES products (product_id)
    )",
];

const DATA_SQL: &[&str] = &[
    "INSERT INTO customers VALUES
        (1, 'John Doe', 'john@example.com', '2023-01-15'),
        (2, 'Jane Smith', 'jane@example.com', '2023-02-20'),
        (3, 'Bob Johnson', 'bob@example.com', '2023-03-10'),
        (4, 'Alice Brown', 'alice@example.com', '2023-04-05'),
        (5, 'Charlie Wilson', 'charlie@example.com', '2023-05-22')",
    "INSERT INTO categories VALUES
        (1, 'Electronics', 'Electronic devices and accessories'),
        (2, 'Clothing', 'Apparel and fashion items'),
        (3, 'Books', 'Books and publications'),
        (4, 'Home & Kitchen', 'Home and kitchen products')",
    "INSERT INTO products VALUES
        (1, 'Smartphone', 1, 799.99, 50),
        (2, 'Laptop', 1, 1299.99, 30),
        (3, 'T-shirt', 2, 19.99, 100),
        (4, 'Jeans', 2, 49.99, 75),
        (5, 'Novel', 3, 14.99, 200),
        (6, 'Cookbook', 3, 24.99, 60),
        (7, 'Blender', 4, 89.99, 40),
        (8, 'Coffee Maker', 4, 69.99, 35),
        (9, 'Headphones', 1, 149.99, 80),
        (10, 'Tablet', 1, 399.99, 45)",
    "INSERT INTO orders VALUES
        (1, 1, '2023-06-10', 849.98),
        (2, 2, '2023-06-15', 1349.98),
        (3, 3, '2023-06-20', 64.98),
        (4, 4, '2023-06-25', 114.98),
        (5, 5, '2023-06-30', 159.98),
        (6, 1, '2023-07-05', 399.99),
        (7, 2, '2023-07-10', 149.99),
        (8, 3, '2023-07-15', 89.99)",
    "INSERT INTO order_items VALUES
        (1, 1, 1, 1, 799.99),
        (2, 1, 3, 2, 19.99),
        (3, 2, 2, 1, 1299.99),
        (4, 2, 4, 1, 49.99),
        (5, 3, 5, 2, 14.99),
        (6, 3, 6, 1, 24.99),
        (7, 4, 7, 1, 89.99),
        (8, 4, 5, 1, 14.99),
        (9, 5, 9, 1, 149.99),
        (10, 6, 10, 1, 399.99),
        (11, 7, 9, 1, 149.99),
        (12, 8, 7, 1, 89.99)",
];

/// Creates the sample database at the given path, overwriting nothing.
///
/// Fails if the file already contains any of the sample tables.
pub async fn create_sample_database(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AskdbError::config(format!("Failed to create {}: {e}", parent.display())))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| AskdbError::connection(e.to_string()))?;

    for statement in SCHEMA_SQL.iter().chain(DATA_SQL) {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .map_err(|e| AskdbError::execution(e.to_string()))?;
    }

    pool.close().await;
    info!("Created sample database at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionProfile;
    use crate::db::{DatabaseClient, SqliteClient};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sample_database_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample_db.sqlite");

        create_sample_database(&path).await.unwrap();

        let client = SqliteClient::open(&ConnectionProfile::sqlite(&path)).unwrap();
        let schema = client.describe_schema().await.unwrap();

        let counts: Vec<(&str, u64)> = schema
            .tables
            .iter()
            .map(|t| (t.name.as_str(), t.row_count))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("customers", 5),
                ("categories", 4),
                ("products", 10),
                ("orders", 8),
                ("order_items", 12),
            ]
        );

        client.close().await;
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample_db.sqlite");

        create_sample_database(&path).await.unwrap();
        let err = create_sample_database(&path).await.unwrap_err();
        assert!(matches!(err, crate::error::AskdbError::Execution(_)));
    }
}
