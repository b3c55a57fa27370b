use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::app::{AppContext, Result};
use crate::cli::output::{print_feed_items, OutputFormat};
use crate::opml::{parse_opml, OpmlEntry};
use crate::store::Store;

// Source catalogue

pub fn add_source(ctx: &AppContext, name: &str, url: Option<&str>, out: OutputFormat) -> Result<()> {
    let result = ctx.store.create_source(name, url)?;
    out.emit(&result, |r| {
        if r.created {
            println!("Added source {}: {}", r.source.source_id, r.source.source_name);
        } else {
            println!(
                "Source already exists {}: {}",
                r.source.source_id, r.source.source_name
            );
        }
    })
}

pub fn list_sources(ctx: &AppContext, out: OutputFormat) -> Result<()> {
    let sources = ctx.store.list_sources()?;
    out.emit(&sources, |sources| {
        if sources.is_empty() {
            println!("No sources");
            return;
        }
        for source in sources {
            println!(
                "{:>4} {}\n     {}",
                source.source_id,
                source.source_name,
                source.url.as_deref().unwrap_or("(no url)")
            );
        }
    })
}

pub fn remove_source(ctx: &AppContext, source_id: i64, out: OutputFormat) -> Result<()> {
    let result = ctx.store.delete_source(source_id)?;
    out.emit(&result, |r| {
        println!("Removed source {}: {}", r.source_id, r.source_name)
    })
}

// Subscriptions

pub fn subscribe(
    ctx: &AppContext,
    user_id: i64,
    source_id: i64,
    priority: i64,
    out: OutputFormat,
) -> Result<()> {
    let result = ctx.store.add_user_source(user_id, source_id, priority)?;
    out.emit(&result, |r| {
        let verb = if r.created { "Subscribed to" } else { "Updated" };
        println!("{} source {} (priority {})", verb, r.source_id, r.priority);
    })
}

pub fn unsubscribe(ctx: &AppContext, user_id: i64, source_id: i64, out: OutputFormat) -> Result<()> {
    let result = ctx.store.remove_user_source(user_id, source_id)?;
    out.emit(&result, |r| {
        if r.removed {
            println!(
                "Unsubscribed from source {} ({} folder links removed)",
                r.source_id, r.folder_links_removed
            );
        } else {
            println!("Not subscribed to source {}", r.source_id);
        }
    })
}

pub fn list_subscriptions(ctx: &AppContext, user_id: i64, out: OutputFormat) -> Result<()> {
    let sources = ctx.store.list_user_sources(user_id)?;

    if out == OutputFormat::Json {
        return out.emit(&sources, |_| {});
    }

    if sources.is_empty() {
        println!("No subscriptions");
        return Ok(());
    }

    for source in sources {
        let unread = ctx.store.unread_count(user_id, source.source_id)?;
        println!(
            "{:>4} {} ({} unread, priority {})",
            source.source_id,
            source.source_name,
            unread,
            source.priority.unwrap_or_default()
        );
    }

    Ok(())
}

// Folders

pub fn create_folder(ctx: &AppContext, user_id: i64, name: &str, out: OutputFormat) -> Result<()> {
    let folder = ctx.store.create_folder(user_id, name)?;
    out.emit(&folder, |f| println!("Created folder {}: {}", f.folder_id, f.name))
}

pub fn delete_folder(ctx: &AppContext, user_id: i64, folder_id: i64, out: OutputFormat) -> Result<()> {
    let result = ctx.store.delete_folder(user_id, folder_id)?;
    out.emit(&result, |r| println!("Deleted folder {}: {}", r.folder_id, r.name))
}

pub fn rename_folder(
    ctx: &AppContext,
    user_id: i64,
    folder_id: i64,
    name: &str,
    out: OutputFormat,
) -> Result<()> {
    let folder = ctx.store.rename_folder(user_id, folder_id, name)?;
    out.emit(&folder, |f| println!("Renamed folder {} to {}", f.folder_id, f.name))
}

pub fn list_folders(ctx: &AppContext, user_id: i64, out: OutputFormat) -> Result<()> {
    let folders = ctx.store.list_folders(user_id)?;
    out.emit(&folders, |folders| {
        if folders.is_empty() {
            println!("No folders");
            return;
        }
        for folder in folders {
            println!("{:>4} {}", folder.folder_id, folder.name);
        }
    })
}

pub fn add_to_folder(
    ctx: &AppContext,
    user_id: i64,
    folder_id: i64,
    source_id: i64,
    out: OutputFormat,
) -> Result<()> {
    let result = ctx.store.add_source_to_folder(user_id, folder_id, source_id)?;
    out.emit(&result, |r| {
        if r.added {
            println!("Filed source {} under folder {}", r.link.source_id, r.link.folder_id);
        } else {
            println!(
                "Source {} is already in folder {}",
                r.link.source_id, r.link.folder_id
            );
        }
    })
}

pub fn remove_from_folder(
    ctx: &AppContext,
    user_id: i64,
    folder_id: i64,
    source_id: i64,
    out: OutputFormat,
) -> Result<()> {
    let result = ctx
        .store
        .remove_source_from_folder(user_id, folder_id, source_id)?;
    out.emit(&result, |r| {
        if r.removed {
            println!("Removed source {} from folder {}", r.link.source_id, r.link.folder_id);
        } else {
            println!("Source {} was not in folder {}", r.link.source_id, r.link.folder_id);
        }
    })
}

pub fn list_folder_sources(
    ctx: &AppContext,
    user_id: i64,
    folder_id: i64,
    out: OutputFormat,
) -> Result<()> {
    let sources = ctx.store.list_folder_sources(user_id, folder_id)?;
    out.emit(&sources, |sources| {
        if sources.is_empty() {
            println!("No sources in folder");
            return;
        }
        for source in sources {
            println!("{:>4} {}", source.source_id, source.source_name);
        }
    })
}

// Read/save state

pub fn mark_read(ctx: &AppContext, user_id: i64, item_id: i64, read: bool, out: OutputFormat) -> Result<()> {
    let result = ctx.store.mark_item_read(user_id, item_id, read)?;
    out.emit(&result, |r| {
        let state = if r.read { "read" } else { "unread" };
        println!("Marked item {} {}", r.item_id, state);
    })
}

pub fn mark_all_read(ctx: &AppContext, user_id: i64, item_ids: &[i64], out: OutputFormat) -> Result<()> {
    let result = ctx.store.mark_home_items_read(user_id, item_ids)?;
    out.emit(&result, |r| println!("Marked {} items read", r.read_count))
}

pub fn save_item(ctx: &AppContext, user_id: i64, item_id: i64, save: bool, out: OutputFormat) -> Result<()> {
    let result = ctx.store.save_item(user_id, item_id, save)?;
    out.emit(&result, |r| {
        let state = if r.saved { "Saved" } else { "Unsaved" };
        println!("{} item {}", state, r.item_id);
    })
}

// Feed views

pub fn home_feed(ctx: &AppContext, user_id: i64, out: OutputFormat) -> Result<()> {
    let items = ctx.store.get_home_feed(user_id)?;
    out.emit(items.as_slice(), print_feed_items)
}

pub fn folder_feed(ctx: &AppContext, user_id: i64, folder_id: i64, out: OutputFormat) -> Result<()> {
    let items = ctx.store.get_folder_feed(user_id, folder_id)?;
    out.emit(items.as_slice(), print_feed_items)
}

pub fn read_list(ctx: &AppContext, user_id: i64, out: OutputFormat) -> Result<()> {
    let items = ctx.store.get_read_items(user_id)?;
    out.emit(items.as_slice(), print_feed_items)
}

pub fn saved_items(ctx: &AppContext, user_id: i64, out: OutputFormat) -> Result<()> {
    let items = ctx.store.get_saved_items(user_id)?;
    out.emit(items.as_slice(), print_feed_items)
}

// Refresh

#[derive(Debug, Default, Serialize)]
pub struct RefreshSummary {
    pub sources: usize,
    pub new_items: usize,
    pub errors: Vec<RefreshError>,
}

#[derive(Debug, Serialize)]
pub struct RefreshError {
    pub source_id: i64,
    pub source_name: String,
    pub error: String,
}

pub async fn refresh_sources(ctx: &AppContext) -> Result<RefreshSummary> {
    let mut sources = Vec::new();
    for listed in ctx.store.list_sources()? {
        if listed.url.is_none() {
            continue;
        }
        if let Some(source) = ctx.store.get_source(listed.source_id)? {
            sources.push(source);
        }
    }

    let names: HashMap<i64, String> = sources
        .iter()
        .map(|s| (s.source_id, s.source_name.clone()))
        .collect();

    let mut summary = RefreshSummary {
        sources: sources.len(),
        ..Default::default()
    };

    let results = ctx
        .parallel_fetcher
        .refresh_all(sources, ctx.store.clone(), &ctx.normalizer)
        .await;

    for (source_id, result) in results {
        match result {
            Ok(count) => summary.new_items += count,
            Err(e) => {
                tracing::warn!("Refresh failed for source {}: {}", source_id, e);
                summary.errors.push(RefreshError {
                    source_id,
                    source_name: names.get(&source_id).cloned().unwrap_or_default(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

pub async fn refresh(ctx: &AppContext, out: OutputFormat) -> Result<()> {
    let summary = refresh_sources(ctx).await?;
    out.emit(&summary, |s| {
        if s.sources == 0 {
            println!("No sources to refresh");
            return;
        }
        for err in &s.errors {
            eprintln!("  Error refreshing {}: {}", err.source_name, err.error);
        }
        println!(
            "Refresh complete: {} sources, {} new items, {} errors",
            s.sources,
            s.new_items,
            s.errors.len()
        );
    })
}

// OPML import

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub found: usize,
    pub sources_created: usize,
    pub subscribed: usize,
    pub already_subscribed: usize,
    pub folders_created: usize,
    pub filed: usize,
    pub errors: usize,
}

/// Register OPML entries for `user_id`: sources, subscriptions, folders and
/// folder links. Nothing is fetched; `refresh` does that.
pub fn import_entries(ctx: &AppContext, user_id: i64, entries: &[OpmlEntry]) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        found: entries.len(),
        ..Default::default()
    };

    let mut next_priority = ctx
        .store
        .list_user_sources(user_id)?
        .iter()
        .filter_map(|s| s.priority)
        .max()
        .map_or(0, |p| p + 1);

    // First folder with a given name wins
    let mut folders: HashMap<String, i64> = HashMap::new();
    for folder in ctx.store.list_folders(user_id)? {
        folders.entry(folder.name).or_insert(folder.folder_id);
    }

    for entry in entries {
        let source = match ctx.store.create_source(&entry.title, Some(&entry.url)) {
            Ok(result) => {
                if result.created {
                    summary.sources_created += 1;
                }
                result.source
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", entry.url, e);
                summary.errors += 1;
                continue;
            }
        };

        if ctx.store.get_user_source(user_id, source.source_id)?.is_some() {
            summary.already_subscribed += 1;
        } else {
            ctx.store
                .add_user_source(user_id, source.source_id, next_priority)?;
            next_priority += 1;
            summary.subscribed += 1;
        }

        let Some(folder_name) = entry.folder.as_deref().map(str::trim) else {
            continue;
        };
        if folder_name.is_empty() {
            continue;
        }

        let folder_id = match folders.get(folder_name) {
            Some(id) => *id,
            None => {
                let folder = ctx.store.create_folder(user_id, folder_name)?;
                summary.folders_created += 1;
                folders.insert(folder.name.clone(), folder.folder_id);
                folder.folder_id
            }
        };

        if ctx
            .store
            .add_source_to_folder(user_id, folder_id, source.source_id)?
            .added
        {
            summary.filed += 1;
        }
    }

    Ok(summary)
}

pub fn import_opml(ctx: &AppContext, user_id: i64, path: &Path, out: OutputFormat) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let entries = parse_opml(&content)?;

    if entries.is_empty() && out == OutputFormat::Human {
        println!("No feeds found in OPML file");
        return Ok(());
    }

    let summary = import_entries(ctx, user_id, &entries)?;
    out.emit(&summary, |s| {
        println!("Found {} feeds in OPML file", s.found);
        println!(
            "Import complete: {} new sources, {} subscribed, {} already subscribed, {} folders created, {} filed, {} errors",
            s.sources_created,
            s.subscribed,
            s.already_subscribed,
            s.folders_created,
            s.filed,
            s.errors
        );
        println!("Run 'feedshelf refresh' to fetch items");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn ctx() -> AppContext {
        AppContext::in_memory(&Config::default()).unwrap()
    }

    fn entry(title: &str, url: &str, folder: Option<&str>) -> OpmlEntry {
        OpmlEntry {
            title: title.into(),
            url: url.into(),
            folder: folder.map(String::from),
        }
    }

    #[test]
    fn test_import_creates_sources_subscriptions_and_folders() {
        let ctx = ctx();
        let entries = vec![
            entry("Rust Blog", "https://blog.rust-lang.org/feed.xml", Some("Tech")),
            entry("This Week", "https://this-week-in-rust.org/rss.xml", Some("Tech")),
            entry("Loose", "https://loose.example.com/feed", None),
        ];

        let summary = import_entries(&ctx, 1, &entries).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                found: 3,
                sources_created: 3,
                subscribed: 3,
                already_subscribed: 0,
                folders_created: 1,
                filed: 2,
                errors: 0,
            }
        );

        let subs = ctx.store.list_user_sources(1).unwrap();
        let names: Vec<_> = subs.iter().map(|s| s.source_name.as_str()).collect();
        assert_eq!(names, vec!["Rust Blog", "This Week", "Loose"]);
        assert_eq!(subs[0].priority, Some(0));
        assert_eq!(subs[2].priority, Some(2));

        let folders = ctx.store.list_folders(1).unwrap();
        assert_eq!(folders.len(), 1);
        let filed = ctx.store.list_folder_sources(1, folders[0].folder_id).unwrap();
        assert_eq!(filed.len(), 2);
    }

    #[test]
    fn test_import_twice_is_idempotent() {
        let ctx = ctx();
        let entries = vec![entry(
            "Rust Blog",
            "https://blog.rust-lang.org/feed.xml",
            Some("Tech"),
        )];

        import_entries(&ctx, 1, &entries).unwrap();
        let second = import_entries(&ctx, 1, &entries).unwrap();

        assert_eq!(second.sources_created, 0);
        assert_eq!(second.subscribed, 0);
        assert_eq!(second.already_subscribed, 1);
        assert_eq!(second.folders_created, 0);
        assert_eq!(second.filed, 0);
        assert_eq!(ctx.store.list_folders(1).unwrap().len(), 1);
    }

    #[test]
    fn test_import_appends_after_existing_priorities() {
        let ctx = ctx();
        let existing = ctx.store.create_source("Existing", None).unwrap().source;
        ctx.store.add_user_source(1, existing.source_id, 10).unwrap();

        import_entries(&ctx, 1, &[entry("New", "https://new.example.com/feed", None)]).unwrap();

        let subs = ctx.store.list_user_sources(1).unwrap();
        assert_eq!(subs.last().map(|s| s.priority), Some(Some(11)));
    }

    #[test]
    fn test_import_reuses_existing_folder_and_skips_bad_urls() {
        let ctx = ctx();
        let tech = ctx.store.create_folder(1, "Tech").unwrap();

        let summary = import_entries(
            &ctx,
            1,
            &[
                entry("Broken", "not a url", Some("Tech")),
                entry("Rust Blog", "https://blog.rust-lang.org/feed.xml", Some("Tech")),
            ],
        )
        .unwrap();

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.folders_created, 0);
        assert_eq!(ctx.store.list_folder_sources(1, tech.folder_id).unwrap().len(), 1);
    }

    #[test]
    fn test_import_is_per_user() {
        let ctx = ctx();
        let entries = vec![entry("Rust Blog", "https://blog.rust-lang.org/feed.xml", None)];

        import_entries(&ctx, 1, &entries).unwrap();
        let summary = import_entries(&ctx, 2, &entries).unwrap();

        assert_eq!(summary.sources_created, 0);
        assert_eq!(summary.subscribed, 1);
        assert_eq!(ctx.store.list_user_sources(2).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_with_only_local_sources() {
        let ctx = ctx();
        ctx.store.create_source("Notes", None).unwrap();

        let summary = refresh_sources(&ctx).await.unwrap();
        assert_eq!(summary.sources, 0);
        assert_eq!(summary.new_items, 0);
        assert!(summary.errors.is_empty());
    }
}
