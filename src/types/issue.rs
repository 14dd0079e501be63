use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{Label, RepoRef};

// ---------------------------------------------------------------------------
// Issue-specific enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueState {
    Open,
    Closed,
    #[serde(other)]
    Unknown,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Issue domain types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// GraphQL node id, used for single-issue lookups.
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub state: IssueState,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub repo: Option<RepoRef>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Issue {
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.name.as_str())
    }
}

/// One search hit: the issue plus the cursor positioned right after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueEdge {
    #[serde(default)]
    pub cursor: String,
    pub node: Issue,
}
