//! OPML subscription lists.
//!
//! Outlines carrying an `xmlUrl` are sources. An enclosing outline without
//! one is treated as the folder the source is filed under.

use opml::{Outline, OPML};

use crate::app::Result;

/// One source found in an OPML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpmlEntry {
    pub title: String,
    pub url: String,
    pub folder: Option<String>,
}

/// Parse OPML content and extract sources with their folder names
pub fn parse_opml(content: &str) -> Result<Vec<OpmlEntry>> {
    let document = OPML::from_str(content)?;
    let mut entries = Vec::new();
    collect(&document.body.outlines, None, &mut entries);
    Ok(entries)
}

fn collect(outlines: &[Outline], folder: Option<&str>, entries: &mut Vec<OpmlEntry>) {
    for outline in outlines {
        match non_empty(outline.xml_url.as_deref()) {
            Some(url) => {
                let title = non_empty(outline.title.as_deref())
                    .or_else(|| non_empty(Some(outline.text.as_str())))
                    .unwrap_or(url);
                entries.push(OpmlEntry {
                    title: title.to_string(),
                    url: url.to_string(),
                    folder: folder.map(String::from),
                });
                collect(&outline.outlines, folder, entries);
            }
            None => {
                let name = non_empty(outline.title.as_deref())
                    .or_else(|| non_empty(Some(outline.text.as_str())));
                collect(&outline.outlines, name.or(folder), entries);
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>Subscriptions</title></head>
  <body>
    <outline text="Tech" title="Tech">
      <outline type="rss" text="Rust Blog" title="Rust Blog" xmlUrl="https://blog.rust-lang.org/feed.xml"/>
      <outline type="rss" text="Q &amp; A" xmlUrl="https://qa.example.com/rss?a=1&amp;b=2"/>
    </outline>
    <outline type="rss" text="Loose" xmlUrl="https://loose.example.com/feed"/>
    <outline text="Empty folder"></outline>
  </body>
</opml>"#;

    fn document(outlines: &str) -> String {
        format!(
            r#"<opml version="2.0"><head><title>t</title></head><body>{}</body></opml>"#,
            outlines
        )
    }

    #[test]
    fn test_parse_entries_with_folders() {
        let entries = parse_opml(SAMPLE).unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].title, "Rust Blog");
        assert_eq!(entries[0].url, "https://blog.rust-lang.org/feed.xml");
        assert_eq!(entries[0].folder.as_deref(), Some("Tech"));

        assert_eq!(entries[1].title, "Q & A");
        assert_eq!(entries[1].url, "https://qa.example.com/rss?a=1&b=2");
        assert_eq!(entries[1].folder.as_deref(), Some("Tech"));

        assert_eq!(entries[2].title, "Loose");
        assert_eq!(entries[2].folder, None);
    }

    #[test]
    fn test_nested_folders_use_nearest() {
        let entries = parse_opml(&document(
            r#"<outline text="Outer"><outline text="Inner"><outline text="Deep" xmlUrl="https://deep.example.com/rss"/></outline></outline>"#,
        ))
        .unwrap();
        assert_eq!(entries[0].folder.as_deref(), Some("Inner"));
    }

    #[test]
    fn test_angle_bracket_inside_attribute() {
        let entries = parse_opml(&document(
            r#"<outline text="News > World" xmlUrl="https://w.example.com/rss"/>"#,
        ))
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "News > World");
        assert_eq!(entries[0].url, "https://w.example.com/rss");
    }

    #[test]
    fn test_single_quoted_attributes() {
        let entries = parse_opml(&document(
            "<outline text='Quoted' xmlUrl='https://q.example.com/rss'/>",
        ))
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Quoted");
        assert_eq!(entries[0].url, "https://q.example.com/rss");
    }

    #[test]
    fn test_title_falls_back_to_url() {
        let entries =
            parse_opml(&document(r#"<outline text="" xmlUrl="https://x.example.com/feed"/>"#))
                .unwrap();
        assert_eq!(entries[0].title, "https://x.example.com/feed");
    }

    #[test]
    fn test_folder_without_sources() {
        let entries = parse_opml(&document(r#"<outline text="Empty"/>"#)).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_invalid_document() {
        assert!(parse_opml("not opml at all").is_err());
    }
}
