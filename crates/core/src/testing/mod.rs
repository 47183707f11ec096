//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits
//! (`StatsSource`, `Warehouse`, `CommandRunner`), allowing the stage job and
//! full graph runs to be tested without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use hoopline_core::testing::{MockStatsSource, MockWarehouse, MockCommandRunner};
//!
//! let stats = MockStatsSource::new();
//! let warehouse = MockWarehouse::new();
//! let commands = MockCommandRunner::new();
//!
//! // Make the first two roster calls time out
//! stats.queue_roster_errors(vec![StatsError::Timeout, StatsError::Timeout]).await;
//! warehouse.fail_matching("dim_coaches").await;
//! ```

mod mock_commands;
mod mock_stats;
mod mock_warehouse;

pub use mock_commands::MockCommandRunner;
pub use mock_stats::{MockStatsSource, StatsCall};
pub use mock_warehouse::MockWarehouse;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::stats::{ResultSet, StatsResponse};

    pub const LAKERS: i64 = 1610612747;
    pub const WARRIORS: i64 = 1610612744;
    pub const CELTICS: i64 = 1610612738;

    const LEAGUE_HEADERS: [&str; 18] = [
        "PLAYER_ID",
        "PLAYER_NAME",
        "NICKNAME",
        "TEAM_ID",
        "TEAM_ABBREVIATION",
        "AGE",
        "W_PCT",
        "MIN",
        "FG_PCT",
        "FG3_PCT",
        "FT_PCT",
        "REB",
        "AST",
        "STL",
        "BLK",
        "TOV",
        "PTS",
        "PLUS_MINUS",
    ];

    fn player_row(
        player_id: i64,
        name: &str,
        nickname: &str,
        team_id: i64,
        team: &str,
        age: f64,
        pts: f64,
    ) -> Vec<Value> {
        vec![
            json!(player_id),
            json!(name),
            json!(nickname),
            json!(team_id),
            json!(team),
            json!(age),
            json!(0.5),
            json!(34.2),
            json!(0.51),
            json!(0.38),
            json!(0.77),
            json!(7.1),
            json!(8.2),
            json!(1.1),
            json!(0.6),
            json!(3.4),
            json!(pts),
            json!(4.5),
        ]
    }

    /// A `leaguedashplayerstats` response.
    ///
    /// Five rows: player 2544 twice on the Lakers, 201939 on the Warriors and
    /// 99 on both the Celtics and the Lakers. That yields 3 players, 3 teams
    /// (Lakers, Warriors, Celtics) and 4 fact rows.
    pub fn league_player_stats() -> StatsResponse {
        StatsResponse {
            resource: Some("leaguedashplayerstats".to_string()),
            result_sets: vec![ResultSet {
                name: "LeagueDashPlayerStats".to_string(),
                headers: LEAGUE_HEADERS.iter().map(|h| h.to_string()).collect(),
                row_set: vec![
                    player_row(2544, "LeBron James", "LeBron", LAKERS, "LAL", 40.0, 24.4),
                    player_row(201939, "Stephen Curry", "Stephen", WARRIORS, "GSW", 37.0, 26.1),
                    player_row(2544, "LeBron James", "LeBron", LAKERS, "LAL", 40.0, 24.4),
                    player_row(99, "John Doe", "John", CELTICS, "BOS", 25.0, 3.0),
                    player_row(99, "John Doe", "John", LAKERS, "LAL", 25.0, 5.0),
                ],
            }],
        }
    }

    /// A `commonteamroster` response with one head coach and one assistant.
    ///
    /// Coach ids derive from the team id, so the same team always yields the
    /// same coaches.
    pub fn team_roster(team_id: i64, first_name: &str, last_name: &str) -> StatsResponse {
        let coach = |id: i64, first: &str, last: &str, coach_type: &str| {
            vec![
                json!(team_id),
                json!("2025"),
                json!(id),
                json!(first),
                json!(last),
                json!(format!("{} {}", first, last)),
                json!(if coach_type == "Head Coach" { 0 } else { 1 }),
                json!(coach_type),
            ]
        };

        StatsResponse {
            resource: Some("commonteamroster".to_string()),
            result_sets: vec![
                ResultSet {
                    name: "CommonTeamRoster".to_string(),
                    headers: vec![
                        "TeamID".to_string(),
                        "PLAYER".to_string(),
                        "PLAYER_ID".to_string(),
                    ],
                    row_set: vec![vec![json!(team_id), json!("Some Player"), json!(1)]],
                },
                ResultSet {
                    name: "Coaches".to_string(),
                    headers: [
                        "TEAM_ID",
                        "SEASON",
                        "COACH_ID",
                        "FIRST_NAME",
                        "LAST_NAME",
                        "COACH_NAME",
                        "IS_ASSISTANT",
                        "COACH_TYPE",
                    ]
                    .iter()
                    .map(|h| h.to_string())
                    .collect(),
                    row_set: vec![
                        coach(team_id * 10 + 1, first_name, last_name, "Head Coach"),
                        coach(team_id * 10 + 2, "Assistant", "Coach", "Assistant Coach"),
                    ],
                },
            ],
        }
    }

    /// A roster response without a `Coaches` set.
    pub fn roster_without_coaches(team_id: i64) -> StatsResponse {
        let mut response = team_roster(team_id, "", "");
        response.result_sets.truncate(1);
        response
    }
}
