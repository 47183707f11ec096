//! Types for the stats API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An NBA season in the API's `"2025-26"` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Season(String);

impl Season {
    /// Parse and validate a season string.
    ///
    /// The second half must be the two-digit year following the first.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid season '{}': expected YYYY-YY", s))?;

        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if start.len() != 4 || end.len() != 2 || !digits(start) || !digits(end) {
            return Err(format!("invalid season '{}': expected YYYY-YY", s));
        }

        let start_year: u32 = start
            .parse()
            .map_err(|_| format!("invalid season '{}': start year is not a number", s))?;
        let end_year: u32 = end
            .parse()
            .map_err(|_| format!("invalid season '{}': end year is not a number", s))?;

        if (start_year + 1) % 100 != end_year {
            return Err(format!(
                "invalid season '{}': {} does not follow {}",
                s, end, start
            ));
        }

        Ok(Self(s.to_string()))
    }

    /// Build the season that starts in the given year.
    pub fn from_start_year(year: u32) -> Self {
        Self(format!("{}-{:02}", year, (year + 1) % 100))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Season {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Season> for String {
    fn from(season: Season) -> Self {
        season.0
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Season segment accepted by the `SeasonType` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeasonType {
    #[serde(rename = "Regular Season")]
    RegularSeason,
    #[serde(rename = "Pre Season")]
    PreSeason,
    #[serde(rename = "Playoffs")]
    Playoffs,
    #[serde(rename = "All Star")]
    AllStar,
    #[serde(rename = "PlayIn")]
    PlayIn,
}

impl SeasonType {
    /// Value sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegularSeason => "Regular Season",
            Self::PreSeason => "Pre Season",
            Self::Playoffs => "Playoffs",
            Self::AllStar => "All Star",
            Self::PlayIn => "PlayIn",
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope returned by every stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(rename = "resultSets")]
    pub result_sets: Vec<ResultSet>,
}

impl StatsResponse {
    /// Find a result set by name.
    pub fn result_set(&self, name: &str) -> Option<&ResultSet> {
        self.result_sets.iter().find(|rs| rs.name == name)
    }
}

/// A named table inside a stats response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    pub name: String,
    pub headers: Vec<String>,
    #[serde(rename = "rowSet")]
    pub row_set: Vec<Vec<serde_json::Value>>,
}
