use serde::{Deserialize, Serialize};
use std::fmt;

/// The four staged warehouse tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    FactPlayerStats,
    DimPlayers,
    DimTeams,
    DimCoaches,
}

impl TableKind {
    /// Upload and load order.
    pub const ALL: [TableKind; 4] = [
        TableKind::FactPlayerStats,
        TableKind::DimPlayers,
        TableKind::DimTeams,
        TableKind::DimCoaches,
    ];

    /// Warehouse table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::FactPlayerStats => "fact_nba_player_stats",
            Self::DimPlayers => "dim_nba_players",
            Self::DimTeams => "dim_nba_teams",
            Self::DimCoaches => "dim_coaches",
        }
    }

    /// Local CSV file name, also the object name under the staging prefix.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.table_name())
    }

    /// Columns projected from the source, in output order.
    ///
    /// `fact_nba_player_stats` additionally gets a trailing null `loaded_at`.
    pub fn source_columns(&self) -> &'static [&'static str] {
        match self {
            Self::FactPlayerStats => &[
                "PLAYER_ID",
                "TEAM_ID",
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
            ],
            Self::DimPlayers => &["PLAYER_ID", "PLAYER_NAME", "NICKNAME", "AGE"],
            Self::DimTeams => &["TEAM_ID", "TEAM_ABBREVIATION"],
            Self::DimCoaches => &["TEAM_ID", "COACH_ID", "FIRST_NAME", "LAST_NAME"],
        }
    }

    /// Columns that identify a row.
    pub fn unique_key(&self) -> &'static [&'static str] {
        match self {
            Self::FactPlayerStats => &["PLAYER_ID", "TEAM_ID"],
            Self::DimPlayers => &["PLAYER_ID"],
            Self::DimTeams => &["TEAM_ID"],
            Self::DimCoaches => &["COACH_ID", "TEAM_ID"],
        }
    }

    /// Short suffix used in task ids (`load_fct_to_snowflake` etc).
    pub fn task_suffix(&self) -> &'static str {
        match self {
            Self::FactPlayerStats => "fct",
            Self::DimPlayers => "dp",
            Self::DimTeams => "dt",
            Self::DimCoaches => "dc",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
