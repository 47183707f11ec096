//! Mock warehouse for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::warehouse::{StatementOutcome, Warehouse, WarehouseError};

/// Mock implementation of the Warehouse trait.
///
/// Records every statement. Statements containing a registered substring
/// fail with an API error.
#[derive(Debug, Default)]
pub struct MockWarehouse {
    statements: Arc<RwLock<Vec<String>>>,
    failing: Arc<RwLock<Vec<String>>>,
    next_handle: AtomicU64,
}

impl MockWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement containing `needle`.
    pub async fn fail_matching(&self, needle: &str) {
        self.failing.write().await.push(needle.to_string());
    }

    /// Executed statements in submission order, failed ones included.
    pub async fn statements(&self) -> Vec<String> {
        self.statements.read().await.clone()
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, sql: &str) -> Result<StatementOutcome, WarehouseError> {
        self.statements.write().await.push(sql.to_string());

        if self.failing.read().await.iter().any(|n| sql.contains(n.as_str())) {
            return Err(WarehouseError::Api {
                status: 422,
                code: "002003".to_string(),
                message: "SQL compilation error: object does not exist".to_string(),
            });
        }

        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        Ok(StatementOutcome {
            handle: format!("mock-{}", handle),
            message: "Statement executed successfully.".to_string(),
            rows: Vec::new(),
        })
    }
}
