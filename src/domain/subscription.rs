use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// "This user subscribes to this source." Lower `priority` sorts first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSource {
    pub user_id: i64,
    pub source_id: i64,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
}

/// "This source is filed under this folder for this user."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSourceFolder {
    pub user_id: i64,
    pub folder_id: i64,
    pub source_id: i64,
}
