//! Records returned by the mutating store operations.
//!
//! Field names are part of the serialized contract; `readCount` is the one
//! camel-cased field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Folder, Source, UserSourceFolder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSourceResult {
    #[serde(flatten)]
    pub source: Source,
    /// False when an existing source with the same url (or name) was reused
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSourceResult {
    pub source_id: i64,
    pub source_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddUserSourceResult {
    pub user_id: i64,
    pub source_id: i64,
    pub priority: i64,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveUserSourceResult {
    pub user_id: i64,
    pub source_id: i64,
    /// False when there was no subscription to remove
    pub removed: bool,
    pub folder_links_removed: usize,
}

pub type CreateFolderResult = Folder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFolderResult {
    pub folder_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSourceToFolderResult {
    #[serde(flatten)]
    pub link: UserSourceFolder,
    pub added: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveSourceFromFolderResult {
    #[serde(flatten)]
    pub link: UserSourceFolder,
    pub removed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkItemReadResult {
    pub user_id: i64,
    pub item_id: i64,
    pub read: bool,
    pub read_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkHomeItemsReadResult {
    #[serde(rename = "readCount")]
    pub read_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveItemResult {
    pub user_id: i64,
    pub item_id: i64,
    pub saved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_count_field_name() {
        let json = serde_json::to_string(&MarkHomeItemsReadResult { read_count: 2 }).unwrap();
        assert_eq!(json, r#"{"readCount":2}"#);
    }

    #[test]
    fn test_folder_link_result_is_flat() {
        let result = AddSourceToFolderResult {
            link: UserSourceFolder {
                user_id: 1,
                folder_id: 2,
                source_id: 3,
            },
            added: true,
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user_id": 1, "folder_id": 2, "source_id": 3, "added": true})
        );
    }

    #[test]
    fn test_mark_item_read_serializes_null_read_time() {
        let result = MarkItemReadResult {
            user_id: 1,
            item_id: 5,
            read: false,
            read_time: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["read"], false);
        assert!(json["read_time"].is_null());
    }
}
