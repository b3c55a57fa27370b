use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedshelf::app::AppContext;
use feedshelf::config::Config;
use feedshelf::cli::{commands, Cli, Commands, FolderAction, OutputFormat, SourceAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }
    if let Some(workers) = cli.workers {
        config.fetcher.workers = workers;
    }

    let user = cli.user.unwrap_or(config.default_user);
    let out = OutputFormat::from_flag(cli.json);
    let ctx = AppContext::new(&config)?;

    match cli.command {
        Commands::Source { action } => match action {
            SourceAction::Add { name, url } => {
                commands::add_source(&ctx, &name, url.as_deref(), out)?;
            }
            SourceAction::List => commands::list_sources(&ctx, out)?,
            SourceAction::Remove { source_id } => commands::remove_source(&ctx, source_id, out)?,
        },
        Commands::Subscribe {
            source_id,
            priority,
        } => {
            commands::subscribe(&ctx, user, source_id, priority, out)?;
        }
        Commands::Unsubscribe { source_id } => commands::unsubscribe(&ctx, user, source_id, out)?,
        Commands::Subscriptions => commands::list_subscriptions(&ctx, user, out)?,
        Commands::Folder { action } => match action {
            FolderAction::Create { name } => commands::create_folder(&ctx, user, &name, out)?,
            FolderAction::Delete { folder_id } => {
                commands::delete_folder(&ctx, user, folder_id, out)?;
            }
            FolderAction::Rename { folder_id, name } => {
                commands::rename_folder(&ctx, user, folder_id, &name, out)?;
            }
            FolderAction::List => commands::list_folders(&ctx, user, out)?,
            FolderAction::Add {
                folder_id,
                source_id,
            } => {
                commands::add_to_folder(&ctx, user, folder_id, source_id, out)?;
            }
            FolderAction::Remove {
                folder_id,
                source_id,
            } => {
                commands::remove_from_folder(&ctx, user, folder_id, source_id, out)?;
            }
            FolderAction::Sources { folder_id } => {
                commands::list_folder_sources(&ctx, user, folder_id, out)?;
            }
        },
        Commands::Read { item_id, unread } => commands::mark_read(&ctx, user, item_id, !unread, out)?,
        Commands::ReadAll { item_ids } => commands::mark_all_read(&ctx, user, &item_ids, out)?,
        Commands::Save { item_id, unsave } => commands::save_item(&ctx, user, item_id, !unsave, out)?,
        Commands::Home => commands::home_feed(&ctx, user, out)?,
        Commands::FolderFeed { folder_id } => commands::folder_feed(&ctx, user, folder_id, out)?,
        Commands::ReadList => commands::read_list(&ctx, user, out)?,
        Commands::Saved => commands::saved_items(&ctx, user, out)?,
        Commands::Refresh => commands::refresh(&ctx, out).await?,
        Commands::Import { path } => commands::import_opml(&ctx, user, &path, out)?,
    }

    Ok(())
}
