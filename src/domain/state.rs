use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user engagement with one item. A missing row means unread and unsaved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemState {
    pub user_id: i64,
    pub item_id: i64,
    pub read: bool,
    pub read_time: Option<DateTime<Utc>>,
    pub saved: bool,
    pub saved_time: Option<DateTime<Utc>>,
}
