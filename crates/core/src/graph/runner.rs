//! Runs a graph to completion.

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;

use super::dag::Graph;
use super::operators::Operators;
use super::types::{GraphError, RunReport, TaskError, TaskRecord, TaskSpec, TaskState};

/// Executes every task of a graph once, respecting dependencies.
///
/// Independent tasks run concurrently. A task starts only after all of its
/// upstream tasks succeeded; when a task fails, every task downstream of it
/// is marked `UpstreamFailed` and never started.
pub struct GraphRunner {
    operators: Arc<Operators>,
}

struct Finished {
    idx: usize,
    result: Result<(), TaskError>,
    elapsed: Duration,
}

async fn execute(operators: Arc<Operators>, idx: usize, task: TaskSpec) -> Finished {
    let started = Instant::now();
    let result = operators.execute(&task).await;
    Finished {
        idx,
        result,
        elapsed: started.elapsed(),
    }
}

impl GraphRunner {
    pub fn new(operators: Arc<Operators>) -> Self {
        Self { operators }
    }

    /// Run the graph. Task failures are reported in the returned report;
    /// only an invalid graph is an error.
    pub async fn run(&self, graph: &Graph) -> Result<RunReport, GraphError> {
        let order = graph.topological_indices()?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        info!(
            dag_id = graph.dag_id(),
            run_id = %run_id,
            tasks = graph.len(),
            "Starting graph run"
        );

        let mut records: Vec<TaskRecord> = graph
            .tasks()
            .iter()
            .map(|task| TaskRecord {
                id: task.id.clone(),
                state: TaskState::Pending,
                started_at: None,
                finished_at: None,
                error: None,
            })
            .collect();
        let mut remaining: Vec<usize> = (0..graph.len())
            .map(|i| graph.upstream_indices(i).len())
            .collect();
        let mut running = FuturesUnordered::new();

        for &idx in &order {
            if remaining[idx] == 0 {
                running.push(self.launch(graph, idx, &mut records));
            }
        }

        while let Some(finished) = running.next().await {
            let idx = finished.idx;
            let task = &graph.tasks()[idx];
            records[idx].finished_at = Some(Utc::now());

            metrics::TASK_DURATION
                .with_label_values(&[task.kind.operator()])
                .observe(finished.elapsed.as_secs_f64());

            match finished.result {
                Ok(()) => {
                    records[idx].state = TaskState::Success;
                    info!(
                        task = %task.id,
                        elapsed_ms = finished.elapsed.as_millis() as u64,
                        "Task succeeded"
                    );
                    for &next in graph.downstream_indices(idx) {
                        remaining[next] -= 1;
                        if remaining[next] == 0 && records[next].state == TaskState::Pending {
                            running.push(self.launch(graph, next, &mut records));
                        }
                    }
                }
                Err(e) => {
                    error!(task = %task.id, error = %e, "Task failed");
                    records[idx].state = TaskState::Failed;
                    records[idx].error = Some(e.to_string());
                    mark_upstream_failed(graph, idx, &mut records);
                }
            }
            metrics::TASK_RUNS
                .with_label_values(&[task.id.as_str(), records[idx].state.as_str()])
                .inc();
        }

        let records: Vec<TaskRecord> = order.iter().map(|&i| records[i].clone()).collect();
        let report = RunReport {
            run_id,
            dag_id: graph.dag_id().to_string(),
            started_at,
            finished_at: Utc::now(),
            tasks: records,
        };

        if report.succeeded() {
            info!(dag_id = graph.dag_id(), run_id = %run_id, "Graph run succeeded");
        } else {
            warn!(
                dag_id = graph.dag_id(),
                run_id = %run_id,
                failed = report.count(TaskState::Failed),
                upstream_failed = report.count(TaskState::UpstreamFailed),
                "Graph run finished with failures"
            );
        }

        Ok(report)
    }

    fn launch(
        &self,
        graph: &Graph,
        idx: usize,
        records: &mut [TaskRecord],
    ) -> impl std::future::Future<Output = Finished> + 'static {
        let task = graph.tasks()[idx].clone();
        info!(task = %task.id, operator = task.kind.operator(), "Starting task");
        records[idx].state = TaskState::Running;
        records[idx].started_at = Some(Utc::now());
        execute(Arc::clone(&self.operators), idx, task)
    }
}

/// Mark every pending task reachable from `failed` as `UpstreamFailed`.
fn mark_upstream_failed(graph: &Graph, failed: usize, records: &mut [TaskRecord]) {
    let mut stack: Vec<usize> = graph.downstream_indices(failed).to_vec();
    while let Some(idx) = stack.pop() {
        if records[idx].state != TaskState::Pending {
            continue;
        }
        records[idx].state = TaskState::UpstreamFailed;
        metrics::TASK_RUNS
            .with_label_values(&[records[idx].id.as_str(), TaskState::UpstreamFailed.as_str()])
            .inc();
        stack.extend_from_slice(graph.downstream_indices(idx));
    }
}
