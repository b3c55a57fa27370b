use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A content origin users can subscribe to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub source_id: i64,
    pub source_name: String,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Source {
    /// Key used to derive item guids: the url when there is one, the name otherwise.
    pub fn ingest_key(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.source_name)
    }
}

/// Listing row for sources. `priority` is only set on a user's subscription list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source_id: i64,
    pub source_name: String,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

/// Fetch bookkeeping written back after a refresh.
#[derive(Debug, Clone, Default)]
pub struct SourceUpdate {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}
