pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

#[derive(Parser)]
#[command(name = "feedshelf")]
#[command(about = "Personal feed reader with folders and read tracking", long_about = None)]
pub struct Cli {
    /// Act as this user (default: `default_user` from the config file)
    #[arg(short, long, global = true)]
    pub user: Option<i64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Database file (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<std::path::PathBuf>,

    /// Number of parallel workers for refreshing sources
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the source catalogue
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },
    /// Subscribe to a source, or change its priority
    Subscribe {
        source_id: i64,
        /// Ordering weight, lower values are listed first
        #[arg(short, long, default_value_t = 0)]
        priority: i64,
    },
    /// Unsubscribe from a source
    Unsubscribe { source_id: i64 },
    /// List subscribed sources in priority order
    Subscriptions,
    /// Manage folders
    Folder {
        #[command(subcommand)]
        action: FolderAction,
    },
    /// Mark an item read (or unread)
    Read {
        item_id: i64,
        #[arg(long)]
        unread: bool,
    },
    /// Mark several items read
    ReadAll {
        #[arg(required = true)]
        item_ids: Vec<i64>,
    },
    /// Save an item (or unsave it)
    Save {
        item_id: i64,
        #[arg(long)]
        unsave: bool,
    },
    /// Items from every subscribed source
    Home,
    /// Items from the sources filed in one folder
    FolderFeed { folder_id: i64 },
    /// Items read so far, most recent first
    ReadList,
    /// Saved items
    Saved,
    /// Fetch all sources that have a url
    Refresh,
    /// Import sources and folders from an OPML file
    Import {
        /// Path to the OPML file
        path: std::path::PathBuf,
    },
}

#[derive(Subcommand)]
pub enum SourceAction {
    /// Add a source (reuses an existing one with the same url)
    Add {
        name: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// List all known sources
    List,
    /// Delete a source with its items and subscriptions
    Remove { source_id: i64 },
}

#[derive(Subcommand)]
pub enum FolderAction {
    /// Create a folder
    Create { name: String },
    /// Delete a folder (subscriptions are kept)
    Delete { folder_id: i64 },
    /// Rename a folder
    Rename { folder_id: i64, name: String },
    /// List folders
    List,
    /// File a subscribed source under a folder
    Add { folder_id: i64, source_id: i64 },
    /// Take a source out of a folder
    Remove { folder_id: i64, source_id: i64 },
    /// List the sources filed under a folder
    Sources { folder_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["feedshelf", "folder", "add", "3", "7", "--user", "2", "--json"])
            .unwrap();
        assert_eq!(cli.user, Some(2));
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Folder {
                action: FolderAction::Add {
                    folder_id: 3,
                    source_id: 7
                }
            }
        ));
    }

    #[test]
    fn test_read_all_requires_ids() {
        assert!(Cli::try_parse_from(["feedshelf", "read-all"]).is_err());
        let cli = Cli::try_parse_from(["feedshelf", "read-all", "1", "2", "1"]).unwrap();
        assert!(matches!(cli.command, Commands::ReadAll { ref item_ids } if item_ids == &[1, 2, 1]));
    }
}
