//! Graph run integration tests.
//!
//! These tests run the full weekly graph with mock backends:
//! - Happy path: every task succeeds, loads and dbt steps in order
//! - Sensor timeouts when nothing was staged
//! - Failure propagation from loads and transform steps

use std::sync::Arc;

use object_store::memory::InMemory;
use object_store::ObjectStore;
use tempfile::TempDir;

use hoopline_core::{
    graph::{LOAD_COMPLETE, STAGE_TASK, WAIT_COMPLETE},
    nba_graph,
    stats::{RetryPolicy, StatsSource},
    testing::{MockCommandRunner, MockStatsSource, MockWarehouse},
    CommandRunner, Config, GraphRunner, Operators, RunReport, StageJob, StageJobConfig, TaskState,
    Warehouse,
};

struct TestHarness {
    config: Config,
    warehouse: Arc<MockWarehouse>,
    commands: Arc<MockCommandRunner>,
    _dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.staging.local_dir = dir.path().to_path_buf();
        config.warehouse.stage = "NBA_STAGE".to_string();
        config.sensors.poke_interval_secs = 1;
        config.sensors.timeout_secs = 1;
        config.transform.project_dir = "/opt/dbt".into();

        Self {
            config,
            warehouse: Arc::new(MockWarehouse::new()),
            commands: Arc::new(MockCommandRunner::new()),
            _dir: dir,
        }
    }

    async fn run(&self) -> RunReport {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let stats: Arc<dyn StatsSource> = Arc::new(MockStatsSource::new());

        let mut job_config = StageJobConfig::from(&self.config);
        job_config.retry = RetryPolicy::immediate();
        let job = StageJob::new(job_config, stats, Arc::clone(&store));

        let operators = Operators::new(
            Arc::new(job),
            store,
            Arc::clone(&self.warehouse) as Arc<dyn Warehouse>,
            Arc::clone(&self.commands) as Arc<dyn CommandRunner>,
            self.config.transform.clone(),
        );

        let graph = nba_graph(&self.config).unwrap();
        let report = GraphRunner::new(Arc::new(operators))
            .run(&graph)
            .await
            .unwrap();

        // No task is left pending or running once the run returns
        assert_eq!(report.tasks.len(), graph.len());
        assert!(report.tasks.iter().all(|t| t.state.is_finished()));
        report
    }

    fn state(report: &RunReport, id: &str) -> TaskState {
        report
            .task(id)
            .unwrap_or_else(|| panic!("no task {}", id))
            .state
    }
}

fn position(statements: &[String], prefix: &str) -> usize {
    statements
        .iter()
        .position(|s| s.starts_with(prefix))
        .unwrap_or_else(|| panic!("no statement starting with {:?}", prefix))
}

#[tokio::test]
async fn test_full_run_succeeds() {
    let harness = TestHarness::new();
    let report = harness.run().await;

    assert!(report.succeeded(), "{:#?}", report.tasks);
    assert_eq!(report.dag_id, "NBA");
    assert_eq!(report.tasks.len(), 21);
    assert_eq!(report.tasks[0].id.as_str(), STAGE_TASK);
    assert_eq!(report.tasks[20].id.as_str(), "dbt_docs_generate");
    assert!(report.tasks.iter().all(|t| t.started_at.is_some()));
}

#[tokio::test]
async fn test_each_table_truncated_before_load() {
    let harness = TestHarness::new();
    harness.run().await;

    let statements = harness.warehouse.statements().await;
    assert_eq!(statements.len(), 8);

    for table in [
        "fact_nba_player_stats",
        "dim_nba_players",
        "dim_nba_teams",
        "dim_coaches",
    ] {
        let truncate = position(&statements, &format!("TRUNCATE TABLE {};", table));
        let load = position(&statements, &format!("COPY INTO {}\n", table));
        assert!(truncate < load, "{} loaded before truncate", table);
    }

    let load = &statements[position(&statements, "COPY INTO dim_coaches\n")];
    assert!(load.contains("FROM @NBA_STAGE"));
    assert!(load.contains("FILES=('dim_coaches.csv')"));
    assert!(load.contains("FILE_FORMAT=(TYPE=CSV, SKIP_HEADER=1)"));
}

#[tokio::test]
async fn test_transform_steps_run_in_order() {
    let harness = TestHarness::new();
    harness.run().await;

    let commands: Vec<String> = harness
        .commands
        .commands()
        .await
        .into_iter()
        .map(|c| c.command)
        .collect();
    assert_eq!(
        commands,
        vec![
            "dbt deps",
            "dbt snapshot --profiles-dir /opt/dbt",
            "dbt seed --profiles-dir /opt/dbt",
            "dbt run --profiles-dir /opt/dbt",
            "dbt test --profiles-dir /opt/dbt",
            "dbt docs generate --profiles-dir /opt/dbt",
        ]
    );
}

#[tokio::test]
async fn test_sensors_time_out_when_nothing_staged() {
    let mut harness = TestHarness::new();
    harness.config.graph.stage_command = Some("true".to_string());
    let report = harness.run().await;

    assert!(!report.succeeded());
    assert_eq!(TestHarness::state(&report, STAGE_TASK), TaskState::Success);
    assert_eq!(report.count(TaskState::Failed), 4);
    assert_eq!(report.count(TaskState::UpstreamFailed), 16);

    let sensor = report.task("wait_for_nba_data_coach").unwrap();
    assert!(sensor
        .error
        .as_deref()
        .unwrap()
        .contains("raw/dim_coaches.csv"));
    assert_eq!(
        TestHarness::state(&report, WAIT_COMPLETE),
        TaskState::UpstreamFailed
    );

    assert!(harness.warehouse.statements().await.is_empty());
    assert_eq!(harness.commands.commands().await.len(), 1);
}

#[tokio::test]
async fn test_failed_load_blocks_transform() {
    let harness = TestHarness::new();
    harness.warehouse.fail_matching("COPY INTO dim_coaches").await;
    let report = harness.run().await;

    assert_eq!(
        TestHarness::state(&report, "load_dc_to_snowflake"),
        TaskState::Failed
    );
    for id in [
        "load_fct_to_snowflake",
        "load_dp_to_snowflake",
        "load_dt_to_snowflake",
    ] {
        assert_eq!(TestHarness::state(&report, id), TaskState::Success);
    }
    assert_eq!(
        TestHarness::state(&report, LOAD_COMPLETE),
        TaskState::UpstreamFailed
    );
    assert_eq!(report.count(TaskState::UpstreamFailed), 7);
    assert!(harness.commands.commands().await.is_empty());
}

#[tokio::test]
async fn test_failed_dbt_test_skips_docs() {
    let harness = TestHarness::new();
    harness.commands.fail_matching("dbt test").await;
    let report = harness.run().await;

    assert_eq!(TestHarness::state(&report, "dbt_run"), TaskState::Success);
    assert_eq!(TestHarness::state(&report, "dbt_test"), TaskState::Failed);
    assert_eq!(
        TestHarness::state(&report, "dbt_docs_generate"),
        TaskState::UpstreamFailed
    );
    assert!(report.task("dbt_docs_generate").unwrap().started_at.is_none());
}
