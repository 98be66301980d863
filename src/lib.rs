//! askdb: ask questions about your database in plain English.
//!
//! Connects to SQLite, MySQL, or PostgreSQL, introspects the schema into
//! a textual report, and uses an LLM to translate natural-language
//! questions into SQL that it can then execute.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod sample;
pub mod session;

pub use config::{Config, ConnectionProfile};
pub use db::{DatabaseClient, Dialect, QueryResult, Schema};
pub use error::{AskdbError, Result};
pub use session::{ConnectionManager, Session};
