//! Types for task graphs and their runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::staging::StagingError;
use crate::transform::{CommandError, CommandSpec, TransformStep};
use crate::warehouse::{CopyIntoOptions, WarehouseError};

/// Task identifier, unique within a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a task does when it runs.
#[derive(Debug, Clone)]
pub enum TaskKind {
    /// No-op join point.
    Empty,
    /// The in-process fetch-and-stage job.
    Stage,
    /// A shell command.
    Shell(CommandSpec),
    /// Wait until an object key exists.
    KeySensor {
        key: String,
        poke_interval: Duration,
        timeout: Duration,
    },
    /// Empty a warehouse table.
    Truncate { table: String },
    /// Bulk load from the external stage.
    CopyInto {
        table: String,
        options: CopyIntoOptions,
    },
    /// One dbt step.
    Transform(TransformStep),
}

impl TaskKind {
    /// Short operator name for listings.
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Stage => "stage",
            Self::Shell(_) => "shell",
            Self::KeySensor { .. } => "key_sensor",
            Self::Truncate { .. } => "truncate",
            Self::CopyInto { .. } => "copy_into",
            Self::Transform(_) => "transform",
        }
    }

    /// One-line description for listings.
    pub fn describe(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Stage => "fetch stats, write CSVs, upload".to_string(),
            Self::Shell(spec) => spec.command.clone(),
            Self::KeySensor {
                key,
                poke_interval,
                timeout,
            } => format!(
                "{} (poke {}s, timeout {}s)",
                key,
                poke_interval.as_secs(),
                timeout.as_secs()
            ),
            Self::Truncate { table } => table.clone(),
            Self::CopyInto { table, options } => {
                format!("{} <- @{} {:?}", table, options.stage, options.files)
            }
            Self::Transform(step) => step.to_string(),
        }
    }
}

/// A node in the graph.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub id: TaskId,
    pub kind: TaskKind,
}

impl TaskSpec {
    pub fn new(id: impl Into<TaskId>, kind: TaskKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Errors in graph construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("unknown task id: {0}")]
    UnknownTask(TaskId),

    #[error("task {0} cannot depend on itself")]
    SelfLoop(TaskId),

    #[error("edge {0} -> {1} already exists")]
    DuplicateEdge(TaskId, TaskId),

    #[error("cycle through tasks: {0:?}")]
    Cycle(Vec<TaskId>),
}

/// Errors from running a single task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("staging failed: {0}")]
    Stage(#[from] StagingError),

    #[error("warehouse statement failed: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("command failed: {0}")]
    Command(#[from] CommandError),

    #[error("sensor timed out after {waited_secs}s waiting for {key}")]
    SensorTimeout { key: String, waited_secs: u64 },
}

/// Lifecycle of a task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Success,
    Failed,
    /// Not run because an upstream task failed.
    UpstreamFailed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::UpstreamFailed => "upstream_failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

/// Per-task outcome within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one graph run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub dag_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// In topological order.
    pub tasks: Vec<TaskRecord>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.state == TaskState::Success)
    }

    pub fn task(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id.as_str() == id)
    }

    pub fn count(&self, state: TaskState) -> usize {
        self.tasks.iter().filter(|t| t.state == state).count()
    }
}
