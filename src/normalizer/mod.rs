use chrono::Utc;
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{FeedshelfError, Result};
use crate::domain::NewItem;

/// Turns RSS/Atom/JSON Feed documents into items ready for ingestion.
#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(
        &self,
        source_id: i64,
        source_key: &str,
        body: &[u8],
    ) -> Result<Vec<NewItem>> {
        let feed = parser::parse(body).map_err(|e| FeedshelfError::FeedParse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .map(|entry| {
                let link = entry.links.first().map(|l| l.href.clone());
                let entry_key = if entry.id.is_empty() {
                    link.clone().unwrap_or_default()
                } else {
                    entry.id.clone()
                };

                let mut item = NewItem::new(source_id, source_key, &entry_key);
                item.title = entry.title.map(|t| decode(&t.content));
                item.link = link;
                // Prefer the short summary; fall back to the full body
                item.description = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .map(|d| decode(&d));
                item.pub_date = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&Utc));
                item
            })
            .collect();

        Ok(items)
    }
}

fn decode(s: &str) -> String {
    decode_html_entities(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <description>A test feed</description>
    <item>
      <title>Fish &amp; Chips</title>
      <link>https://example.com/item1</link>
      <guid>item-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <description>This is item 1</description>
    </item>
    <item>
      <title>Test Item 2</title>
      <link>https://example.com/item2</link>
      <guid>item-2</guid>
      <description>This is item 2</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <subtitle>An Atom test feed</subtitle>
  <entry>
    <title>Atom Entry 1</title>
    <link href="https://example.com/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <summary>This is Atom entry 1</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let normalizer = Normalizer::new();
        let items = normalizer
            .normalize(1, "https://example.com/feed.xml", RSS_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source_id, 1);
        assert_eq!(items[0].title, Some("Fish & Chips".into()));
        assert_eq!(items[0].link, Some("https://example.com/item1".into()));
        assert_eq!(items[0].description, Some("This is item 1".into()));
        assert!(items[0].pub_date.is_some());
    }

    #[test]
    fn test_parse_atom() {
        let normalizer = Normalizer::new();
        let items = normalizer
            .normalize(1, "https://example.com/feed.atom", ATOM_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, Some("Atom Entry 1".into()));
        assert_eq!(items[0].link, Some("https://example.com/atom1".into()));
        assert_eq!(items[0].description, Some("This is Atom entry 1".into()));
        assert_eq!(
            items[0].pub_date.map(|d| d.to_rfc3339()),
            Some("2024-01-01T00:00:00+00:00".into())
        );
    }

    #[test]
    fn test_guid_determinism() {
        let normalizer = Normalizer::new();
        let items1 = normalizer
            .normalize(1, "https://example.com/feed.xml", RSS_SAMPLE.as_bytes())
            .unwrap();
        let items2 = normalizer
            .normalize(1, "https://example.com/feed.xml", RSS_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(items1[0].guid, items2[0].guid);
        assert_ne!(items1[0].guid, items1[1].guid);
    }

    #[test]
    fn test_invalid_document() {
        let normalizer = Normalizer::new();
        let err = normalizer
            .normalize(1, "https://example.com/feed.xml", b"not a feed")
            .unwrap_err();
        assert!(matches!(err, FeedshelfError::FeedParse(_)));
    }
}
