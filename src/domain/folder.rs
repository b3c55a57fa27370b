use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-owned named grouping of subscribed sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub folder_id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
