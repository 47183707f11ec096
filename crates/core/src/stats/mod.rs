//! NBA stats API access.
//!
//! This module provides a `StatsSource` trait for the two endpoints the
//! pipeline reads (league-wide player stats and per-team rosters), an HTTP
//! implementation against stats.nba.com, and the fixed-delay retry loop used
//! around roster calls.

mod client;
mod retry;
mod types;

pub use client::NbaStatsClient;
pub use retry::{retry_until_ok, RetryPolicy};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the stats API.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Could not connect.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The response lacked an expected result set.
    #[error("Missing result set: {0}")]
    MissingResultSet(String),

    /// Gave up after the configured number of attempts.
    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl StatsError {
    /// Whether this error was a timeout (retried with the shorter delay).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<reqwest::Error> for StatsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StatsError::Timeout
        } else if e.is_connect() {
            StatsError::Connection(e.to_string())
        } else if e.is_decode() {
            StatsError::Parse(e.to_string())
        } else {
            StatsError::Api {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            }
        }
    }
}

/// A source of NBA statistics.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Returns the name of this source.
    fn name(&self) -> &str;

    /// League-wide per-player season statistics.
    async fn league_player_stats(
        &self,
        season: &Season,
        season_type: SeasonType,
    ) -> Result<StatsResponse, StatsError>;

    /// Roster and coaching staff for one team.
    async fn team_roster(&self, team_id: i64, season: &Season)
        -> Result<StatsResponse, StatsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timeout() {
        assert!(StatsError::Timeout.is_timeout());
        assert!(!StatsError::Connection("refused".to_string()).is_timeout());
    }

    #[test]
    fn test_error_display() {
        let err = StatsError::Api {
            status: 403,
            message: "Forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 403 - Forbidden");

        let err = StatsError::Exhausted {
            attempts: 3,
            last_error: "Request timed out".to_string(),
        };
        assert_eq!(err.to_string(), "Gave up after 3 attempts: Request timed out");
    }
}
