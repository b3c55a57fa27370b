use serde::Serialize;

use crate::app::Result;
use crate::domain::FeedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Human
        }
    }

    /// Print `value` as pretty JSON, or hand it to `human` for plain text.
    pub fn emit<T, F>(&self, value: &T, human: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T),
    {
        match self {
            Self::Json => println!("{}", serde_json::to_string_pretty(value)?),
            Self::Human => human(value),
        }
        Ok(())
    }
}

pub fn print_feed_items(items: &[FeedItem]) {
    if items.is_empty() {
        println!("No items");
        return;
    }

    for entry in items {
        let read_marker = if entry.read { " " } else { "●" };
        let saved_marker = if entry.saved { "*" } else { " " };
        println!(
            "{}{} {:>6} {} {} [{}]",
            read_marker,
            saved_marker,
            entry.item_id(),
            format_date(entry),
            entry.item.display_title(),
            entry.source_name
        );
    }
}

fn format_date(entry: &FeedItem) -> String {
    entry
        .item
        .pub_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| " ".repeat(10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flag() {
        assert_eq!(OutputFormat::from_flag(true), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flag(false), OutputFormat::Human);
    }

    #[test]
    fn test_human_output_calls_formatter() {
        let mut called = false;
        OutputFormat::Human
            .emit(&vec![1, 2, 3], |v| called = v.len() == 3)
            .unwrap();
        assert!(called);
    }

    #[test]
    fn test_json_output_skips_formatter() {
        let mut called = false;
        OutputFormat::Json.emit(&"x", |_| called = true).unwrap();
        assert!(!called);
    }
}
