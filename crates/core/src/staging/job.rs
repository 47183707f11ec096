//! The fetch-and-stage job.

use object_store::ObjectStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::metrics;
use crate::stats::{retry_until_ok, RetryPolicy, Season, SeasonType, StatsSource};
use crate::tables::{self, Frame, TableKind};

use super::uploader::{upload_tables, StagedFile, UploadReport};
use super::writer::write_table;
use super::StagingError;

/// Settings for one job run.
#[derive(Debug, Clone)]
pub struct StageJobConfig {
    pub season: Season,
    pub season_type: SeasonType,
    pub local_dir: PathBuf,
    pub prefix: String,
    pub retry: RetryPolicy,
}

impl From<&Config> for StageJobConfig {
    fn from(config: &Config) -> Self {
        Self {
            season: config.stats.season.clone(),
            season_type: config.stats.season_type,
            local_dir: config.staging.local_dir.clone(),
            prefix: config.staging.prefix.clone(),
            retry: RetryPolicy::from(&config.stats),
        }
    }
}

/// Result of a job run.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Rows written per table.
    pub rows: BTreeMap<String, usize>,
    /// Local files, in upload order.
    pub files: Vec<PathBuf>,
    pub upload: UploadReport,
}

/// Fetches league stats and rosters, writes the four CSVs and uploads them.
pub struct StageJob {
    config: StageJobConfig,
    source: Arc<dyn StatsSource>,
    store: Arc<dyn ObjectStore>,
}

impl StageJob {
    pub fn new(
        config: StageJobConfig,
        source: Arc<dyn StatsSource>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            source,
            store,
        }
    }

    /// Run the job to completion.
    ///
    /// Fails on a league stats error, a reshaping error or a local write
    /// error. Roster calls are retried per the policy; upload failures are
    /// reported, not returned.
    pub async fn run(&self) -> Result<StageReport, StagingError> {
        let season = &self.config.season;
        info!(
            source = self.source.name(),
            season = %season,
            season_type = %self.config.season_type,
            "Fetching league player stats"
        );

        let response = self
            .source
            .league_player_stats(season, self.config.season_type)
            .await?;
        let source_frame = tables::player_stats_frame(&response)?;
        let player_tables = tables::derive_player_tables(&source_frame)?;

        let mut written: Vec<(TableKind, PathBuf, usize)> = Vec::new();
        for kind in [
            TableKind::FactPlayerStats,
            TableKind::DimPlayers,
            TableKind::DimTeams,
        ] {
            if let Some(frame) = player_tables.get(kind) {
                written.push(self.write(kind, frame).await?);
            }
        }

        let coaches = self.fetch_coaches(&tables::team_ids(&player_tables.teams)?).await?;
        written.push(self.write(TableKind::DimCoaches, &coaches).await?);

        let files: Vec<StagedFile> = written
            .iter()
            .map(|(kind, path, _)| StagedFile {
                kind: *kind,
                path: path.clone(),
            })
            .collect();
        let upload = upload_tables(self.store.as_ref(), &self.config.prefix, &files).await;

        Ok(StageReport {
            rows: written
                .iter()
                .map(|(kind, _, rows)| (kind.table_name().to_string(), *rows))
                .collect(),
            files: written.into_iter().map(|(_, path, _)| path).collect(),
            upload,
        })
    }

    /// Write one table on the blocking pool.
    async fn write(
        &self,
        kind: TableKind,
        frame: &Frame,
    ) -> Result<(TableKind, PathBuf, usize), StagingError> {
        let dir = self.config.local_dir.clone();
        let owned = frame.clone();
        let path = tokio::task::spawn_blocking(move || write_table(&dir, kind, &owned))
            .await
            .map_err(|source| StagingError::WriteTask {
                table: kind.table_name().to_string(),
                source,
            })??;
        metrics::ROWS_STAGED
            .with_label_values(&[kind.table_name()])
            .inc_by(frame.len() as u64);
        info!(table = %kind, rows = frame.len(), path = %path.display(), "Wrote table");
        Ok((kind, path, frame.len()))
    }

    async fn fetch_coaches(&self, team_ids: &[i64]) -> Result<Frame, StagingError> {
        let season = &self.config.season;
        let mut responses = Vec::with_capacity(team_ids.len());

        for &team_id in team_ids {
            let label = format!("team {}", team_id);
            let source = Arc::clone(&self.source);
            let response = retry_until_ok(&label, &self.config.retry, || {
                let source = Arc::clone(&source);
                async move { source.team_roster(team_id, season).await }
            })
            .await?;
            responses.push(response);
        }

        info!(teams = team_ids.len(), "Fetched team rosters");
        let combined = tables::collect_coaches(&responses)?;
        Ok(tables::derive_coach_table(combined.as_ref())?)
    }
}
