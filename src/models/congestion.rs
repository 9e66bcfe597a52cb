//! Congestion status model and its source rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How crowded a store currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CongestionLevel {
    Empty,
    SomewhatCrowded,
    Full,
}

impl CongestionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionLevel::Empty => "empty",
            CongestionLevel::SomewhatCrowded => "somewhat-crowded",
            CongestionLevel::Full => "full",
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string outside the three known levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCongestionLevel(pub String);

impl fmt::Display for InvalidCongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown congestion status {:?}", self.0)
    }
}

impl std::error::Error for InvalidCongestionLevel {}

impl FromStr for CongestionLevel {
    type Err = InvalidCongestionLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(CongestionLevel::Empty),
            "somewhat-crowded" => Ok(CongestionLevel::SomewhatCrowded),
            "full" => Ok(CongestionLevel::Full),
            other => Err(InvalidCongestionLevel(other.to_string())),
        }
    }
}

/// A `congestion_statuses` row, as returned by inserts and history reads
/// and as carried by change feed payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionStatusRow {
    pub id: String,
    pub store_id: String,
    pub status: String,
    pub user_id: String,
    pub created_at: String,
}

/// One row of the latest-status-per-store aggregate. The aggregate carries no row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestStatusRow {
    pub store_id: String,
    pub status: String,
    pub created_at: String,
    pub user_id: String,
}

/// A single congestion report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CongestionStatus {
    pub id: String,
    pub store_id: String,
    pub status: CongestionLevel,
    pub user_id: String,
    pub timestamp: String,
}

impl TryFrom<CongestionStatusRow> for CongestionStatus {
    type Error = InvalidCongestionLevel;

    fn try_from(row: CongestionStatusRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.status.parse()?,
            id: row.id,
            store_id: row.store_id,
            user_id: row.user_id,
            timestamp: row.created_at,
        })
    }
}

impl TryFrom<LatestStatusRow> for CongestionStatus {
    type Error = InvalidCongestionLevel;

    fn try_from(row: LatestStatusRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.status.parse()?,
            id: format!("{}-{}", row.store_id, row.created_at),
            store_id: row.store_id,
            user_id: row.user_id,
            timestamp: row.created_at,
        })
    }
}

/// Request body for `POST /api/stores/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitStatusRequest {
    pub status: CongestionLevel,
}

/// Query parameters for `GET /api/stores/{id}/status/history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}
