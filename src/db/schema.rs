//! Database schema types for askdb.
//!
//! Represents the introspected structure of a database and renders the
//! textual schema report handed to the LLM as prompt context.

/// The introspected schema of a database.
///
/// Table order matches the order returned by the backend's catalog query;
/// it is never re-sorted here and is not guaranteed stable across dialects.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// All user tables, in catalog order.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table names in catalog order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Renders the textual schema report.
    ///
    /// One block per table, blocks separated by a blank line:
    ///
    /// ```text
    /// Table: customers
    /// Columns:
    ///   - customer_id (INTEGER) PRIMARY KEY
    ///   - name (TEXT)
    /// Total rows: 5
    /// ```
    ///
    /// The report is a rendering artifact consumed as-is by the LLM prompt,
    /// not a queryable structure.
    pub fn render_report(&self) -> String {
        self.tables
            .iter()
            .map(Table::render_block)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A single introspected table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in the backend's natural order.
    pub columns: Vec<Column>,

    /// Row count snapshot taken at introspection time.
    pub row_count: u64,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Renders this table's block of the schema report.
    ///
    /// A table with zero columns still produces a block with an empty
    /// column list and its row count.
    fn render_block(&self) -> String {
        let mut block = format!("Table: {}\nColumns:\n", self.name);
        for column in &self.columns {
            block.push_str(&column.render_line());
            block.push('\n');
        }
        block.push_str(&format!("Total rows: {}", self.row_count));
        block
    }
}

/// A single introspected column.
#[derive(Debug, Clone, Default)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// The backend's native type name, not normalized.
    pub declared_type: String,

    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,
}

impl Column {
    /// Creates a new column with the given name and declared type.
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            is_primary_key: false,
        }
    }

    /// Marks the column as part of the primary key.
    pub fn primary_key(self, is_primary_key: bool) -> Self {
        Self {
            is_primary_key,
            ..self
        }
    }

    fn render_line(&self) -> String {
        if self.is_primary_key {
            format!("  - {} ({}) PRIMARY KEY", self.name, self.declared_type)
        } else {
            format!("  - {} ({})", self.name, self.declared_type)
        }
    }
}
