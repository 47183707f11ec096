//! Mock stats source for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::stats::{Season, SeasonType, StatsError, StatsResponse, StatsSource};

use super::fixtures;

/// A recorded stats API call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsCall {
    LeaguePlayerStats {
        season: String,
        season_type: SeasonType,
    },
    TeamRoster {
        team_id: i64,
        season: String,
    },
}

/// Mock implementation of the StatsSource trait.
///
/// Provides controllable behavior for testing:
/// - League stats default to `fixtures::league_player_stats()`
/// - Rosters default to `fixtures::team_roster` with a coach named after the team
/// - Queued roster errors are returned before any roster succeeds
/// - All calls are recorded
pub struct MockStatsSource {
    league: Arc<RwLock<StatsResponse>>,
    league_error: Arc<RwLock<Option<StatsError>>>,
    rosters: Arc<RwLock<HashMap<i64, StatsResponse>>>,
    roster_errors: Arc<RwLock<VecDeque<StatsError>>>,
    calls: Arc<RwLock<Vec<StatsCall>>>,
}

impl std::fmt::Debug for MockStatsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStatsSource")
            .field("league", &"<response>")
            .field("rosters", &"<responses>")
            .field("calls", &"<calls>")
            .finish()
    }
}

impl Default for MockStatsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStatsSource {
    pub fn new() -> Self {
        Self {
            league: Arc::new(RwLock::new(fixtures::league_player_stats())),
            league_error: Arc::new(RwLock::new(None)),
            rosters: Arc::new(RwLock::new(HashMap::new())),
            roster_errors: Arc::new(RwLock::new(VecDeque::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Replace the league stats response.
    pub async fn set_league_response(&self, response: StatsResponse) {
        *self.league.write().await = response;
    }

    /// Make the next league stats call fail.
    pub async fn fail_league(&self, error: StatsError) {
        *self.league_error.write().await = Some(error);
    }

    /// Set the roster response for one team.
    pub async fn set_roster(&self, team_id: i64, response: StatsResponse) {
        self.rosters.write().await.insert(team_id, response);
    }

    /// Errors to return, in order, from the next roster calls.
    pub async fn queue_roster_errors(&self, errors: Vec<StatsError>) {
        self.roster_errors.write().await.extend(errors);
    }

    pub async fn recorded_calls(&self) -> Vec<StatsCall> {
        self.calls.read().await.clone()
    }

    /// Number of roster calls made, failed ones included.
    pub async fn roster_call_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, StatsCall::TeamRoster { .. }))
            .count()
    }
}

#[async_trait]
impl StatsSource for MockStatsSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn league_player_stats(
        &self,
        season: &Season,
        season_type: SeasonType,
    ) -> Result<StatsResponse, StatsError> {
        self.calls.write().await.push(StatsCall::LeaguePlayerStats {
            season: season.to_string(),
            season_type,
        });

        if let Some(error) = self.league_error.write().await.take() {
            return Err(error);
        }
        Ok(self.league.read().await.clone())
    }

    async fn team_roster(
        &self,
        team_id: i64,
        season: &Season,
    ) -> Result<StatsResponse, StatsError> {
        self.calls.write().await.push(StatsCall::TeamRoster {
            team_id,
            season: season.to_string(),
        });

        if let Some(error) = self.roster_errors.write().await.pop_front() {
            return Err(error);
        }
        Ok(self
            .rosters
            .read()
            .await
            .get(&team_id)
            .cloned()
            .unwrap_or_else(|| fixtures::team_roster(team_id, "Coach", &team_id.to_string())))
    }
}
