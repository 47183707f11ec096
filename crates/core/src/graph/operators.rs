//! Task execution against the external systems.

use object_store::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::TransformConfig;
use crate::metrics;
use crate::staging::StageJob;
use crate::transform::{CommandRunner, TransformStep};
use crate::warehouse::{
    copy_into, truncate_table, CopyIntoOptions, StatementOutcome, Warehouse, WarehouseError,
};

use super::types::{TaskError, TaskKind, TaskSpec};

/// The backends every task kind needs.
pub struct Operators {
    stage_job: Arc<StageJob>,
    store: Arc<dyn ObjectStore>,
    warehouse: Arc<dyn Warehouse>,
    commands: Arc<dyn CommandRunner>,
    transform: TransformConfig,
}

impl Operators {
    pub fn new(
        stage_job: Arc<StageJob>,
        store: Arc<dyn ObjectStore>,
        warehouse: Arc<dyn Warehouse>,
        commands: Arc<dyn CommandRunner>,
        transform: TransformConfig,
    ) -> Self {
        Self {
            stage_job,
            store,
            warehouse,
            commands,
            transform,
        }
    }

    /// Run one task to completion.
    pub async fn execute(&self, task: &TaskSpec) -> Result<(), TaskError> {
        match &task.kind {
            TaskKind::Empty => Ok(()),
            TaskKind::Stage => {
                let report = self.stage_job.run().await?;
                info!(
                    task = %task.id,
                    uploaded = report.upload.uploaded.len(),
                    complete = report.upload.is_complete(),
                    "Stage job finished"
                );
                Ok(())
            }
            TaskKind::Shell(spec) => {
                self.commands.run(spec).await?;
                Ok(())
            }
            TaskKind::KeySensor {
                key,
                poke_interval,
                timeout,
            } => self.wait_for_key(key, *poke_interval, *timeout).await,
            TaskKind::Truncate { table } => {
                self.statement(&truncate_table(table)?).await?;
                info!(table = table.as_str(), "Truncated table");
                Ok(())
            }
            TaskKind::CopyInto { table, options } => self.copy(table, options).await,
            TaskKind::Transform(step) => self.transform(*step).await,
        }
    }

    async fn wait_for_key(
        &self,
        key: &str,
        poke_interval: Duration,
        timeout: Duration,
    ) -> Result<(), TaskError> {
        let path = object_store::path::Path::from(key);
        let started = Instant::now();

        loop {
            match self.store.head(&path).await {
                Ok(meta) => {
                    info!(key = key, size = meta.size, "Key present");
                    return Ok(());
                }
                Err(object_store::Error::NotFound { .. }) => {
                    debug!(key = key, "Key not present yet");
                }
                Err(e) => {
                    warn!(key = key, error = %e, "Sensor check failed");
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(TaskError::SensorTimeout {
                    key: key.to_string(),
                    waited_secs: elapsed.as_secs(),
                });
            }
            sleep(poke_interval.min(timeout - elapsed)).await;
        }
    }

    async fn copy(&self, table: &str, options: &CopyIntoOptions) -> Result<(), TaskError> {
        let outcome = self.statement(&copy_into(table, options)?).await?;
        info!(
            table = table,
            handle = %outcome.handle,
            rows = outcome.rows.len(),
            "Loaded table from stage"
        );
        Ok(())
    }

    async fn statement(&self, sql: &str) -> Result<StatementOutcome, WarehouseError> {
        let result = self.warehouse.execute(sql).await;
        let label = if result.is_ok() { "success" } else { "failure" };
        metrics::WAREHOUSE_STATEMENTS.with_label_values(&[label]).inc();
        result
    }

    async fn transform(&self, step: TransformStep) -> Result<(), TaskError> {
        let output = self.commands.run(&step.command(&self.transform)).await?;
        info!(step = %step, lines = output.stdout_lines, "Transform step finished");
        Ok(())
    }
}
