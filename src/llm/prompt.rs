//! Prompt construction for SQL generation.

use crate::db::Dialect;

/// Dialect name as it appears in the prompt.
fn dialect_label(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => "SQLITE",
        Dialect::MySql => "MYSQL",
        Dialect::Postgres => "POSTGRESQL",
    }
}

/// Builds the single-shot translation prompt.
///
/// The schema report is included verbatim as context; the model is asked
/// for bare SQL with no prose or markdown.
pub fn build_prompt(question: &str, schema_report: &str, dialect: Dialect) -> String {
    let label = dialect_label(dialect);
    format!(
        "You are an expert SQL query generator.\n\
         Your task is to convert natural language questions into correct SQL queries for {label} databases.\n\
         \n\
         Database Schema Information:\n\
         {schema_report}\n\
         \n\
         User Question: {question}\n\
         \n\
         Provide ONLY the SQL query without any additional text, explanation, or markdown formatting.\n\
         The SQL query should be valid {label} syntax.\n"
    )
}
