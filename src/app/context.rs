use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{FeedshelfError, Result};
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::parallel::ParallelFetcher;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub parallel_fetcher: ParallelFetcher,
    pub normalizer: Normalizer,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        let db_path = match config.database.path.clone() {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::with_config(&db_path, &config.database)?);
        tracing::debug!("Opened database at {}", db_path.display());
        Self::with_store(config, store)
    }

    pub fn in_memory(config: &Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: &Config, store: Arc<SqliteStore>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.fetcher)?);
        let parallel_fetcher = ParallelFetcher::with_workers(fetcher, config.fetcher.workers);

        Ok(Self {
            store,
            parallel_fetcher,
            normalizer: Normalizer::new(),
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| FeedshelfError::Config("Could not find data directory".into()))?;
        let feedshelf_dir = data_dir.join("feedshelf");
        std::fs::create_dir_all(&feedshelf_dir)?;
        Ok(feedshelf_dir.join("feedshelf.db"))
    }
}
