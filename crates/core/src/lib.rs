pub mod config;
pub mod graph;
pub mod metrics;
pub mod staging;
pub mod stats;
pub mod tables;
pub mod testing;
pub mod transform;
pub mod warehouse;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config,
    validate_stage_config, Config, ConfigError, SanitizedConfig,
};
pub use graph::{nba_graph, Graph, GraphError, GraphRunner, Operators, RunReport, TaskState};
pub use staging::{create_object_store, StageJob, StageJobConfig, StageReport, StagingError};
pub use stats::{NbaStatsClient, Season, SeasonType, StatsError, StatsSource};
pub use transform::{CommandRunner, ShellRunner, TransformStep};
pub use warehouse::{SnowflakeClient, Warehouse, WarehouseError};
