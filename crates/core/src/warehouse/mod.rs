//! Warehouse access.
//!
//! Loads are delegated entirely to the warehouse: this module only issues
//! `TRUNCATE` and `COPY INTO` statements through a `Warehouse` and waits for
//! them to finish.

mod snowflake;
mod sql;

pub use snowflake::SnowflakeClient;
pub use sql::{copy_into, truncate_table, CopyIntoOptions};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from statement execution.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Warehouse error {status} (code {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Statement {handle} did not finish within {secs}s")]
    Timeout { handle: String, secs: u64 },
}

/// A finished statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementOutcome {
    /// Warehouse-assigned statement id.
    pub handle: String,
    #[serde(default)]
    pub message: String,
    /// Result rows, when the statement returns any.
    #[serde(default)]
    pub rows: Vec<Vec<Option<String>>>,
}

/// Something that executes SQL statements.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Returns the name of this warehouse implementation.
    fn name(&self) -> &str;

    /// Execute one statement and wait for it to finish. Autocommits.
    async fn execute(&self, sql: &str) -> Result<StatementOutcome, WarehouseError>;
}
