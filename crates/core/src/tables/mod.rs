//! Reshaping stats responses into the warehouse tables.
//!
//! Every table is a projection of a source result set followed by a
//! first-occurrence dedup on the table's key. Row order follows the source.

mod frame;
mod schema;

pub use frame::Frame;
pub use schema::TableKind;

use serde_json::Value;
use thiserror::Error;

use crate::stats::StatsResponse;

/// Name of the roster result set that carries coaching staff.
pub const COACHES_RESULT_SET: &str = "Coaches";

const HEAD_COACH: &str = "Head Coach";

/// Errors while reshaping tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Row {index} has {actual} values, expected {expected}")]
    RaggedRow {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Header mismatch: expected {expected:?}, got {actual:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Response has no result sets")]
    NoResultSets,

    #[error("Invalid team id: {0}")]
    InvalidTeamId(String),
}

/// The three tables derived from league player stats.
#[derive(Debug, Clone)]
pub struct PlayerTables {
    pub players: Frame,
    pub teams: Frame,
    pub fact: Frame,
}

impl PlayerTables {
    pub fn get(&self, kind: TableKind) -> Option<&Frame> {
        match kind {
            TableKind::DimPlayers => Some(&self.players),
            TableKind::DimTeams => Some(&self.teams),
            TableKind::FactPlayerStats => Some(&self.fact),
            TableKind::DimCoaches => None,
        }
    }
}

/// First result set of a league stats response as a frame.
pub fn player_stats_frame(response: &StatsResponse) -> Result<Frame, TableError> {
    let result_set = response.result_sets.first().ok_or(TableError::NoResultSets)?;
    Frame::from_result_set(result_set)
}

fn project(source: &Frame, kind: TableKind) -> Result<Frame, TableError> {
    source
        .select(kind.source_columns())?
        .dedup_by(kind.unique_key())
}

/// Derive players, teams and the per-player fact table.
pub fn derive_player_tables(source: &Frame) -> Result<PlayerTables, TableError> {
    Ok(PlayerTables {
        players: project(source, TableKind::DimPlayers)?,
        teams: project(source, TableKind::DimTeams)?,
        fact: project(source, TableKind::FactPlayerStats)?.with_null_column("loaded_at"),
    })
}

/// Distinct team ids in first-seen order.
pub fn team_ids(teams: &Frame) -> Result<Vec<i64>, TableError> {
    let mut ids: Vec<i64> = Vec::new();
    for value in teams.column_values("TEAM_ID")? {
        let id = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| TableError::InvalidTeamId(value.to_string()))?;

        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Concatenate the `Coaches` result sets of several roster responses.
///
/// Headers come from the first response that has the set. Returns `None`
/// when no response carried it.
pub fn collect_coaches(responses: &[StatsResponse]) -> Result<Option<Frame>, TableError> {
    let mut combined: Option<Frame> = None;

    for result_set in responses
        .iter()
        .filter_map(|r| r.result_set(COACHES_RESULT_SET))
    {
        match combined.as_mut() {
            None => combined = Some(Frame::from_result_set(result_set)?),
            Some(frame) => {
                let headers = frame.headers().to_vec();
                frame.extend(Frame::new(headers, result_set.row_set.clone())?)?;
            }
        }
    }

    Ok(combined)
}

/// Head coaches, unique by (coach, team).
pub fn derive_coach_table(coaches: Option<&Frame>) -> Result<Frame, TableError> {
    let kind = TableKind::DimCoaches;
    match coaches {
        None => Ok(Frame::empty(kind.source_columns())),
        Some(frame) => {
            let head_coaches =
                frame.filter_eq("COACH_TYPE", &Value::String(HEAD_COACH.to_string()))?;
            project(&head_coaches, kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use serde_json::json;

    #[test]
    fn test_derive_player_tables() {
        let source = player_stats_frame(&fixtures::league_player_stats()).unwrap();
        let tables = derive_player_tables(&source).unwrap();

        // LeBron appears twice with the same team, Doe on two teams
        assert_eq!(tables.players.len(), 3);
        assert_eq!(tables.teams.len(), 3);
        assert_eq!(tables.fact.len(), 4);

        assert_eq!(
            tables.players.headers(),
            &["PLAYER_ID", "PLAYER_NAME", "NICKNAME", "AGE"]
        );
        assert_eq!(tables.fact.headers().len(), 15);
        assert_eq!(tables.fact.headers()[14], "loaded_at");
        assert!(tables.fact.rows().iter().all(|r| r[14].is_null()));
    }

    #[test]
    fn test_missing_source_column_is_reported() {
        let source = Frame::new(
            vec!["PLAYER_ID".into(), "TEAM_ID".into()],
            vec![vec![json!(1), json!(2)]],
        )
        .unwrap();
        let err = derive_player_tables(&source).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(ref c) if c == "PLAYER_NAME"));
    }

    #[test]
    fn test_empty_response_rejected() {
        let response = StatsResponse {
            resource: None,
            result_sets: vec![],
        };
        assert!(matches!(
            player_stats_frame(&response),
            Err(TableError::NoResultSets)
        ));
    }

    #[test]
    fn test_team_ids_in_first_seen_order() {
        let source = player_stats_frame(&fixtures::league_player_stats()).unwrap();
        let tables = derive_player_tables(&source).unwrap();
        assert_eq!(
            team_ids(&tables.teams).unwrap(),
            vec![1610612747, 1610612744, 1610612738]
        );
    }

    #[test]
    fn test_team_ids_rejects_non_numeric() {
        let teams = Frame::new(vec!["TEAM_ID".into()], vec![vec![json!(null)]]).unwrap();
        assert!(matches!(team_ids(&teams), Err(TableError::InvalidTeamId(_))));
    }

    #[test]
    fn test_coach_table_keeps_head_coaches_only() {
        let responses = vec![
            fixtures::team_roster(1610612747, "JJ", "Redick"),
            fixtures::team_roster(1610612744, "Steve", "Kerr"),
        ];
        let combined = collect_coaches(&responses).unwrap().unwrap();
        assert_eq!(combined.len(), 4);

        let coaches = derive_coach_table(Some(&combined)).unwrap();
        assert_eq!(coaches.len(), 2);
        assert_eq!(
            coaches.headers(),
            &["TEAM_ID", "COACH_ID", "FIRST_NAME", "LAST_NAME"]
        );
        assert_eq!(coaches.rows()[1][3], json!("Kerr"));
    }

    #[test]
    fn test_coach_table_dedups_repeated_team() {
        let responses = vec![
            fixtures::team_roster(1610612747, "JJ", "Redick"),
            fixtures::team_roster(1610612747, "JJ", "Redick"),
        ];
        let combined = collect_coaches(&responses).unwrap();
        let coaches = derive_coach_table(combined.as_ref()).unwrap();
        assert_eq!(coaches.len(), 1);
    }

    #[test]
    fn test_coach_table_without_coaches_set_is_empty() {
        let response = StatsResponse {
            resource: None,
            result_sets: vec![],
        };
        let combined = collect_coaches(&[response]).unwrap();
        assert!(combined.is_none());

        let coaches = derive_coach_table(None).unwrap();
        assert!(coaches.is_empty());
        assert_eq!(coaches.headers().len(), 4);
    }
}
