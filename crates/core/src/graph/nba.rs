//! The weekly NBA pipeline graph.
//!
//! ```text
//! run_python_job
//!   >> [4 object-key sensors] >> wait_complete
//!   >> [truncate_x >> load_x_to_snowflake] x4 >> load_complete
//!   >> dbt_deps >> dbt_snapshot >> dbt_seed >> dbt_run >> dbt_test >> dbt_docs_generate
//! ```

use std::time::Duration;

use crate::config::Config;
use crate::staging::object_key;
use crate::tables::TableKind;
use crate::transform::{CommandSpec, TransformStep};
use crate::warehouse::CopyIntoOptions;

use super::dag::Graph;
use super::types::{GraphError, TaskKind, TaskSpec};

pub const STAGE_TASK: &str = "run_python_job";
pub const WAIT_COMPLETE: &str = "wait_complete";
pub const LOAD_COMPLETE: &str = "load_complete";

/// Sensor task ids, in declaration order.
const SENSORS: [(&str, TableKind); 4] = [
    ("wait_for_nba_data_team", TableKind::DimTeams),
    ("wait_for_nba_data_player", TableKind::DimPlayers),
    ("wait_for_nba_data_f_player", TableKind::FactPlayerStats),
    ("wait_for_nba_data_coach", TableKind::DimCoaches),
];

fn truncate_task_id(kind: TableKind) -> &'static str {
    match kind {
        TableKind::FactPlayerStats => "truncate_fact_table",
        TableKind::DimPlayers => "truncate_dim_players",
        TableKind::DimTeams => "truncate_dim_teams",
        TableKind::DimCoaches => "truncate_dim_coaches",
    }
}

fn load_task_id(kind: TableKind) -> String {
    format!("load_{}_to_snowflake", kind.task_suffix())
}

/// Build the pipeline graph from configuration.
pub fn nba_graph(config: &Config) -> Result<Graph, GraphError> {
    let mut graph = Graph::new(config.graph.dag_id.clone());

    let stage_kind = match &config.graph.stage_command {
        Some(command) => TaskKind::Shell(CommandSpec {
            command: command.clone(),
            cwd: None,
            timeout: None,
        }),
        None => TaskKind::Stage,
    };
    graph.add_task(TaskSpec::new(STAGE_TASK, stage_kind))?;
    graph.add_task(TaskSpec::new(WAIT_COMPLETE, TaskKind::Empty))?;
    graph.add_task(TaskSpec::new(LOAD_COMPLETE, TaskKind::Empty))?;

    let poke_interval = Duration::from_secs(config.sensors.poke_interval_secs);
    let timeout = Duration::from_secs(config.sensors.timeout_secs);
    for (id, kind) in SENSORS {
        graph.add_task(TaskSpec::new(
            id,
            TaskKind::KeySensor {
                key: object_key(&config.staging.prefix, &kind.file_name()).to_string(),
                poke_interval,
                timeout,
            },
        ))?;
        graph.add_edge(STAGE_TASK, id)?;
        graph.add_edge(id, WAIT_COMPLETE)?;
    }

    for kind in TableKind::ALL {
        let truncate_id = truncate_task_id(kind);
        let load_id = load_task_id(kind);

        graph.add_task(TaskSpec::new(
            truncate_id,
            TaskKind::Truncate {
                table: kind.table_name().to_string(),
            },
        ))?;
        graph.add_task(TaskSpec::new(
            load_id.as_str(),
            TaskKind::CopyInto {
                table: kind.table_name().to_string(),
                options: CopyIntoOptions::csv(config.warehouse.stage.clone(), kind.file_name()),
            },
        ))?;

        graph.chain(&[WAIT_COMPLETE, truncate_id, &load_id, LOAD_COMPLETE])?;
    }

    let mut downstream: Vec<String> = vec![LOAD_COMPLETE.to_string()];
    for step in TransformStep::ALL {
        let id = step.task_id();
        graph.add_task(TaskSpec::new(id.as_str(), TaskKind::Transform(step)))?;
        downstream.push(id);
    }
    let chain: Vec<&str> = downstream.iter().map(String::as_str).collect();
    graph.chain(&chain)?;

    graph.validate()?;
    Ok(graph)
}
