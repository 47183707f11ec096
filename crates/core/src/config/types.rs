use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::stats::{Season, SeasonType};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub staging: StagingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Stats API client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsConfig {
    /// Base URL (default: https://stats.nba.com/stats)
    #[serde(default = "default_stats_base_url")]
    pub base_url: String,
    #[serde(default = "default_season")]
    pub season: Season,
    #[serde(default = "default_season_type")]
    pub season_type: SeasonType,
    /// Timeout for the league-wide stats call in seconds (default: 30)
    #[serde(default = "default_stats_timeout")]
    pub timeout_secs: u64,
    /// Timeout for each per-team roster call in seconds (default: 90)
    #[serde(default = "default_roster_timeout")]
    pub roster_timeout_secs: u64,
    /// Delay before retrying after a timeout (default: 10)
    #[serde(default = "default_timeout_retry_delay")]
    pub timeout_retry_delay_secs: u64,
    /// Delay before retrying after any other error (default: 15)
    #[serde(default = "default_error_retry_delay")]
    pub error_retry_delay_secs: u64,
    /// Attempts per roster call before giving up. Unset retries forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            base_url: default_stats_base_url(),
            season: default_season(),
            season_type: default_season_type(),
            timeout_secs: default_stats_timeout(),
            roster_timeout_secs: default_roster_timeout(),
            timeout_retry_delay_secs: default_timeout_retry_delay(),
            error_retry_delay_secs: default_error_retry_delay(),
            max_attempts: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_stats_base_url() -> String {
    "https://stats.nba.com/stats".to_string()
}

fn default_season() -> Season {
    Season::from_start_year(2025)
}

fn default_season_type() -> SeasonType {
    SeasonType::PreSeason
}

fn default_stats_timeout() -> u64 {
    30
}

fn default_roster_timeout() -> u64 {
    90
}

fn default_timeout_retry_delay() -> u64 {
    10
}

fn default_error_retry_delay() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}

/// Local CSV output and object key layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StagingConfig {
    /// Directory the CSV files are written to (default: current directory)
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    /// Object key prefix the files are uploaded under (default: "raw")
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            local_dir: default_local_dir(),
            prefix: default_prefix(),
        }
    }
}

fn default_local_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_prefix() -> String {
    "raw".to_string()
}

/// Object storage backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Bucket name (also read from AWS_BUCKET_NAME)
    #[serde(default)]
    pub bucket: String,
    /// Region override; the AWS env chain is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Root directory for the local backend
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: String::new(),
            region: None,
            local_root: default_local_root(),
        }
    }
}

fn default_local_root() -> PathBuf {
    PathBuf::from("lake")
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
}

/// Warehouse (Snowflake SQL API) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WarehouseConfig {
    /// Account URL, e.g. "https://myorg-myaccount.snowflakecomputing.com"
    #[serde(default)]
    pub account_url: String,
    /// Bearer token (OAuth or programmatic access token)
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// External stage pointing at the staging prefix (also read from SNOWFLAKE_STAGE)
    #[serde(default)]
    pub stage: String,
    /// Statement timeout in seconds (default: 300)
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,
    /// Interval between async statement status polls in milliseconds
    #[serde(default = "default_status_poll")]
    pub status_poll_interval_ms: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            account_url: String::new(),
            token: String::new(),
            token_type: default_token_type(),
            database: None,
            schema: None,
            warehouse: None,
            role: None,
            stage: String::new(),
            statement_timeout_secs: default_statement_timeout(),
            status_poll_interval_ms: default_status_poll(),
        }
    }
}

fn default_token_type() -> String {
    "PROGRAMMATIC_ACCESS_TOKEN".to_string()
}

fn default_statement_timeout() -> u64 {
    300
}

fn default_status_poll() -> u64 {
    1000
}

/// Object-key sensor timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorConfig {
    /// Seconds between checks (default: 60)
    #[serde(default = "default_poke_interval")]
    pub poke_interval_secs: u64,
    /// Seconds before the sensor fails (default: 480)
    #[serde(default = "default_sensor_timeout")]
    pub timeout_secs: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            poke_interval_secs: default_poke_interval(),
            timeout_secs: default_sensor_timeout(),
        }
    }
}

fn default_poke_interval() -> u64 {
    60
}

fn default_sensor_timeout() -> u64 {
    60 * 8
}

/// dbt invocation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransformConfig {
    /// dbt project directory (default: "dbt")
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,
    /// Directory holding profiles.yml; defaults to the project directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,
    #[serde(default = "default_dbt_executable")]
    pub executable: String,
    /// Per-step timeout in seconds (default: 3600)
    #[serde(default = "default_step_timeout")]
    pub timeout_secs: u64,
}

impl TransformConfig {
    pub fn profiles_dir(&self) -> &std::path::Path {
        self.profiles_dir.as_deref().unwrap_or(&self.project_dir)
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            project_dir: default_project_dir(),
            profiles_dir: None,
            executable: default_dbt_executable(),
            timeout_secs: default_step_timeout(),
        }
    }
}

fn default_project_dir() -> PathBuf {
    PathBuf::from("dbt")
}

fn default_dbt_executable() -> String {
    "dbt".to_string()
}

fn default_step_timeout() -> u64 {
    3600
}

/// Graph metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    #[serde(default = "default_dag_id")]
    pub dag_id: String,
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_start_date")]
    pub start_date: chrono::NaiveDate,
    /// Run this shell command as the first task instead of the in-process
    /// stage job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_command: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            dag_id: default_dag_id(),
            schedule: default_schedule(),
            start_date: default_start_date(),
            stage_command: None,
        }
    }
}

fn default_dag_id() -> String {
    "NBA".to_string()
}

fn default_schedule() -> String {
    "@weekly".to_string()
}

fn default_start_date() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2025, 10, 12).unwrap_or_default()
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub stats: StatsConfig,
    pub staging: StagingConfig,
    pub storage: StorageConfig,
    pub warehouse: SanitizedWarehouseConfig,
    pub sensors: SensorConfig,
    pub transform: TransformConfig,
    pub graph: GraphConfig,
}

/// Sanitized warehouse config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedWarehouseConfig {
    pub account_url: String,
    pub token_configured: bool,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub stage: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let wh = &config.warehouse;
        Self {
            stats: config.stats.clone(),
            staging: config.staging.clone(),
            storage: config.storage.clone(),
            warehouse: SanitizedWarehouseConfig {
                account_url: wh.account_url.clone(),
                token_configured: !wh.token.is_empty(),
                token_type: wh.token_type.clone(),
                database: wh.database.clone(),
                schema: wh.schema.clone(),
                warehouse: wh.warehouse.clone(),
                role: wh.role.clone(),
                stage: wh.stage.clone(),
            },
            sensors: config.sensors.clone(),
            transform: config.transform.clone(),
            graph: config.graph.clone(),
        }
    }
}
