//! Hoopline CLI
//!
//! Runs the weekly NBA stats pipeline: fetch, stage, load, transform.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use object_store::ObjectStore;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hoopline_core::{
    create_object_store, load_config, load_config_from_env, metrics, nba_graph, validate_config,
    validate_stage_config, CommandRunner, Config, GraphRunner, NbaStatsClient, Operators,
    SanitizedConfig, ShellRunner, SnowflakeClient, StageJob, StageJobConfig, StatsSource,
    Warehouse,
};

#[derive(Parser)]
#[command(name = "hoopline", version)]
#[command(about = "Weekly NBA stats pipeline", long_about = None)]
struct Cli {
    /// Path to configuration file (environment only when unset)
    #[arg(short, long, env = "HOOPLINE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch stats, write the CSVs and upload them
    Stage,

    /// Run the whole graph once
    Run {
        /// Write Prometheus metrics here when the run ends
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },

    /// Print the graph's tasks in dependency order
    Graph,

    /// Print the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() {
    // Before parsing, so `.env` can supply HOOPLINE_CONFIG
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.log_json);

    match dotenv {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => {}
        Err(e) => {
            error!("Fatal error: failed to read .env: {}", e);
            std::process::exit(1);
        }
    }

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Returns whether the command succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_config_from_env().context("Failed to load config from environment")?,
    };
    check_config(&cli.command, &config)?;

    match cli.command {
        Commands::Stage => stage_command(&config).await,
        Commands::Run { metrics_file } => run_command(&config, metrics_file).await,
        Commands::Graph => graph_command(&config),
        Commands::Config => {
            let sanitized = SanitizedConfig::from(&config);
            println!("{}", serde_json::to_string_pretty(&sanitized)?);
            Ok(true)
        }
    }
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Run { .. } => "run",
            Self::Graph => "graph",
            Self::Config => "config",
        }
    }
}

/// Validate only what `command` needs. Inspection commands warn instead
/// of failing, so a partial config can still be printed.
fn check_config(command: &Commands, config: &Config) -> Result<()> {
    let result = match command {
        Commands::Stage => validate_stage_config(config),
        Commands::Run { .. } => validate_config(config),
        Commands::Graph | Commands::Config => {
            if let Err(e) = validate_config(config) {
                warn!("{} (a full run would fail)", e);
            }
            Ok(())
        }
    };
    result.with_context(|| format!("Cannot run `{}`", command.name()))
}

fn stage_job(config: &Config, store: Arc<dyn ObjectStore>) -> Result<StageJob> {
    let stats: Arc<dyn StatsSource> = Arc::new(
        NbaStatsClient::new(&config.stats).context("Failed to create stats client")?,
    );
    info!(
        "Staging {} {} to {:?} under {}/",
        config.stats.season, config.stats.season_type, config.storage.backend, config.staging.prefix
    );
    Ok(StageJob::new(StageJobConfig::from(config), stats, store))
}

async fn stage_command(config: &Config) -> Result<bool> {
    let store = create_object_store(&config.storage).context("Failed to create object store")?;
    let report = stage_job(config, store)?
        .run()
        .await
        .context("Stage job failed")?;

    if !report.upload.is_complete() {
        warn!("Some staged files were not uploaded");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(true)
}

async fn run_command(config: &Config, metrics_file: Option<PathBuf>) -> Result<bool> {
    let graph = nba_graph(config).context("Failed to build graph")?;

    let store = create_object_store(&config.storage).context("Failed to create object store")?;
    let job = stage_job(config, Arc::clone(&store))?;
    let warehouse: Arc<dyn Warehouse> = Arc::new(
        SnowflakeClient::new(config.warehouse.clone())
            .context("Failed to create warehouse client")?,
    );
    let commands: Arc<dyn CommandRunner> = Arc::new(ShellRunner::new());
    info!("Using warehouse: {}", warehouse.name());

    let operators = Operators::new(
        Arc::new(job),
        store,
        warehouse,
        commands,
        config.transform.clone(),
    );
    let report = GraphRunner::new(Arc::new(operators))
        .run(&graph)
        .await
        .context("Graph run failed")?;

    if let Some(path) = metrics_file {
        let text = metrics::encode_metrics().context("Failed to encode metrics")?;
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to write metrics to {:?}", path))?;
        info!("Wrote metrics to {:?}", path);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.succeeded())
}

fn graph_command(config: &Config) -> Result<bool> {
    let graph = nba_graph(config).context("Failed to build graph")?;
    println!(
        "{} (schedule {}, start {})",
        graph.dag_id(),
        config.graph.schedule,
        config.graph.start_date
    );

    for task in graph.topological_order()? {
        let upstream: Vec<String> = graph
            .upstream(task.id.as_str())?
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        println!(
            "  {:<28} {:<11} {}",
            task.id.as_str(),
            task.kind.operator(),
            task.kind.describe()
        );
        if !upstream.is_empty() {
            println!("  {:<28} <- {}", "", upstream.join(", "));
        }
    }
    Ok(true)
}
