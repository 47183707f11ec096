//! Task graphs: declaration, validation and a single-run executor.
//!
//! A [`Graph`] holds [`TaskSpec`]s and the edges between them. The
//! [`GraphRunner`] executes one run, dispatching each task to
//! [`Operators`], and returns a [`RunReport`] with per-task states.

mod dag;
mod nba;
mod operators;
mod runner;
mod types;

pub use dag::Graph;
pub use nba::{nba_graph, LOAD_COMPLETE, STAGE_TASK, WAIT_COMPLETE};
pub use operators::Operators;
pub use runner::GraphRunner;
pub use types::{
    GraphError, RunReport, TaskError, TaskId, TaskKind, TaskRecord, TaskSpec, TaskState,
};
