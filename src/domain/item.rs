use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A syndicated entry as stored. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: i64,
    pub source_id: i64,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
}

impl Item {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }
}

/// An entry handed over by the ingestion side, not yet assigned an `item_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub source_id: i64,
    pub guid: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
}

impl NewItem {
    pub fn new(source_id: i64, source_key: &str, entry_id: &str) -> Self {
        Self {
            source_id,
            guid: Self::generate_guid(source_key, entry_id),
            title: None,
            link: None,
            description: None,
            pub_date: None,
        }
    }

    /// Generate a deterministic dedupe key from the source key and entry ID
    pub fn generate_guid(source_key: &str, entry_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_key.as_bytes());
        hasher.update(entry_id.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// An item as shown in a feed view: the stored item plus per-user annotations.
///
/// Which rows appear is decided by the query (home, folder, read, saved);
/// the record shape is the same for all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub item: Item,
    pub source_name: String,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<DateTime<Utc>>,
    pub saved: bool,
}

impl FeedItem {
    pub fn item_id(&self) -> i64 {
        self.item.item_id
    }
}

pub type HomeItem = FeedItem;
pub type FolderItem = FeedItem;
pub type ReadItem = FeedItem;
pub type SavedItem = FeedItem;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_generation_deterministic() {
        let id1 = NewItem::generate_guid("https://example.com/feed.xml", "entry-123");
        let id2 = NewItem::generate_guid("https://example.com/feed.xml", "entry-123");
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_guid_generation_different_inputs() {
        let id1 = NewItem::generate_guid("https://example.com/feed.xml", "entry-123");
        let id2 = NewItem::generate_guid("https://example.com/feed.xml", "entry-456");
        let id3 = NewItem::generate_guid("https://other.com/feed.xml", "entry-123");
        assert_ne!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_guid_is_hex_sha256() {
        let id = NewItem::generate_guid("https://example.com/feed.xml", "entry-123");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_display_title_without_title() {
        let item = Item {
            item_id: 1,
            source_id: 1,
            title: None,
            link: None,
            description: None,
            pub_date: None,
        };
        assert_eq!(item.display_title(), "(Untitled)");
    }

    #[test]
    fn test_feed_item_serializes_flat() {
        let feed_item = FeedItem {
            item: Item {
                item_id: 9,
                source_id: 2,
                title: Some("Hello".into()),
                link: Some("https://example.com/hello".into()),
                description: None,
                pub_date: None,
            },
            source_name: "Example".into(),
            read: false,
            read_time: None,
            saved: true,
        };

        let json = serde_json::to_value(&feed_item).unwrap();
        assert_eq!(json["item_id"], 9);
        assert_eq!(json["source_id"], 2);
        assert_eq!(json["title"], "Hello");
        assert_eq!(json["source_name"], "Example");
        assert_eq!(json["saved"], true);
        assert!(json.get("item").is_none());
        assert!(json.get("read_time").is_none());
    }
}
