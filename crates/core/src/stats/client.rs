//! stats.nba.com client.
//!
//! The API rejects requests that don't look like they come from the nba.com
//! site, so every request carries browser-style headers plus the
//! `x-nba-stats-*` pair.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::StatsConfig;

use super::{Season, SeasonType, StatsError, StatsResponse, StatsSource};

const LEAGUE_ID: &str = "00";

/// HTTP implementation of `StatsSource`.
pub struct NbaStatsClient {
    client: Client,
    base_url: String,
    roster_timeout: Duration,
}

impl NbaStatsClient {
    /// Create a new client from configuration.
    pub fn new(config: &StatsConfig) -> Result<Self, StatsError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(default_headers())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StatsError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            roster_timeout: Duration::from_secs(config.roster_timeout_secs),
        })
    }

    async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<StatsResponse, StatsError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint = endpoint, "Requesting stats endpoint");

        let mut request = self.client.get(&url).query(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StatsError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        response
            .json::<StatsResponse>()
            .await
            .map_err(|e| match StatsError::from(e) {
                StatsError::Timeout => StatsError::Timeout,
                other => StatsError::Parse(other.to_string()),
            })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
    headers.insert("x-nba-stats-origin", HeaderValue::from_static("stats"));
    headers.insert("x-nba-stats-token", HeaderValue::from_static("true"));
    headers
}

/// Query parameters for `leaguedashplayerstats`.
///
/// The endpoint 400s when any parameter is absent, so the blank filters are
/// sent explicitly.
fn league_player_stats_params(season: &Season, season_type: SeasonType) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = vec![
        ("LastNGames", "0".into()),
        ("LeagueID", LEAGUE_ID.into()),
        ("MeasureType", "Base".into()),
        ("Month", "0".into()),
        ("OpponentTeamID", "0".into()),
        ("PaceAdjust", "N".into()),
        ("PerMode", "Totals".into()),
        ("Period", "0".into()),
        ("PlusMinus", "N".into()),
        ("Rank", "N".into()),
        ("Season", season.to_string()),
        ("SeasonType", season_type.as_str().into()),
        ("TeamID", "0".into()),
    ];

    for blank in [
        "College",
        "Conference",
        "Country",
        "DateFrom",
        "DateTo",
        "Division",
        "DraftPick",
        "DraftYear",
        "GameScope",
        "GameSegment",
        "Height",
        "ISTRound",
        "Location",
        "Outcome",
        "PORound",
        "PlayerExperience",
        "PlayerPosition",
        "SeasonSegment",
        "ShotClockRange",
        "StarterBench",
        "TwoWay",
        "VsConference",
        "VsDivision",
        "Weight",
    ] {
        params.push((blank, String::new()));
    }

    params
}

fn team_roster_params(team_id: i64, season: &Season) -> Vec<(&'static str, String)> {
    vec![
        ("LeagueID", LEAGUE_ID.into()),
        ("Season", season.to_string()),
        ("TeamID", team_id.to_string()),
    ]
}

#[async_trait]
impl StatsSource for NbaStatsClient {
    fn name(&self) -> &str {
        "stats.nba.com"
    }

    async fn league_player_stats(
        &self,
        season: &Season,
        season_type: SeasonType,
    ) -> Result<StatsResponse, StatsError> {
        self.get(
            "leaguedashplayerstats",
            &league_player_stats_params(season, season_type),
            None,
        )
        .await
    }

    async fn team_roster(
        &self,
        team_id: i64,
        season: &Season,
    ) -> Result<StatsResponse, StatsError> {
        self.get(
            "commonteamroster",
            &team_roster_params(team_id, season),
            Some(self.roster_timeout),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(&str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_league_params_carry_season_and_type() {
        let params = league_player_stats_params(&Season::from_start_year(2025), SeasonType::PreSeason);
        assert_eq!(param(&params, "Season"), Some("2025-26"));
        assert_eq!(param(&params, "SeasonType"), Some("Pre Season"));
        assert_eq!(param(&params, "PerMode"), Some("Totals"));
        assert_eq!(param(&params, "DateFrom"), Some(""));
    }

    #[test]
    fn test_roster_params() {
        let params = team_roster_params(1610612747, &Season::from_start_year(2025));
        assert_eq!(param(&params, "TeamID"), Some("1610612747"));
        assert_eq!(param(&params, "LeagueID"), Some("00"));
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = StatsConfig {
            base_url: "http://localhost:9999/stats/".to_string(),
            ..StatsConfig::default()
        };
        let client = NbaStatsClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:9999/stats");
        assert_eq!(client.roster_timeout, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_a_timeout() {
        let config = StatsConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 5,
            ..StatsConfig::default()
        };
        let client = NbaStatsClient::new(&config).unwrap();
        let err = client
            .team_roster(1610612737, &Season::from_start_year(2025))
            .await
            .unwrap_err();
        assert!(!err.is_timeout());
    }
}
