use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::app::{FeedshelfError, Result};
use crate::domain::{Source, SourceUpdate};
use crate::fetcher::{FetchResult, Fetcher};
use crate::normalizer::Normalizer;
use crate::store::Store;

pub const DEFAULT_WORKERS: usize = 10;

pub struct ParallelFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    semaphore: Arc<Semaphore>,
}

impl ParallelFetcher {
    pub fn with_workers(fetcher: Arc<dyn Fetcher + Send + Sync>, workers: usize) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Fetch every source that has a url and ingest its entries.
    ///
    /// Returns `(source_id, new item count or error)` per attempted source.
    pub async fn refresh_all<S: Store + Send + Sync + 'static>(
        &self,
        sources: Vec<Source>,
        store: Arc<S>,
        normalizer: &Normalizer,
    ) -> Vec<(i64, Result<usize>)> {
        let mut handles = Vec::new();

        for source in sources.into_iter().filter(|s| s.url.is_some()) {
            let fetcher = self.fetcher.clone();
            let semaphore = self.semaphore.clone();
            let store = store.clone();
            let normalizer = normalizer.clone();

            let handle = tokio::spawn(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => refresh_source(&fetcher, &source, &store, &normalizer).await,
                    Err(e) => Err(FeedshelfError::Config(e.to_string())),
                };
                (source.source_id, result)
            });

            handles.push(handle);
        }

        join_all(handles)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                    None
                }
            })
            .collect()
    }
}

async fn refresh_source<S: Store + Send + Sync + 'static>(
    fetcher: &Arc<dyn Fetcher + Send + Sync>,
    source: &Source,
    store: &Arc<S>,
    normalizer: &Normalizer,
) -> Result<usize> {
    let Some(url) = source.url.as_deref() else {
        return Ok(0);
    };

    let result = fetcher
        .fetch(
            url,
            source.etag.as_deref(),
            source.last_modified.as_deref(),
        )
        .await?;

    let (items, update) = match result {
        FetchResult::NotModified => {
            tracing::debug!("Source {} not modified", url);
            let update = SourceUpdate {
                etag: source.etag.clone(),
                last_modified: source.last_modified.clone(),
                last_fetched_at: Some(Utc::now()),
            };
            (Vec::new(), update)
        }
        FetchResult::Content {
            body,
            etag,
            last_modified,
        } => {
            let items = normalizer.normalize(source.source_id, source.ingest_key(), &body)?;
            let update = SourceUpdate {
                etag,
                last_modified,
                last_fetched_at: Some(Utc::now()),
            };
            (items, update)
        }
    };

    // Store calls may sleep between retries; keep them off the runtime threads.
    // Validators are written only after ingestion succeeds, so a failed
    // ingest is retried in full on the next refresh.
    let store = store.clone();
    let source_id = source.source_id;
    let new_count = tokio::task::spawn_blocking(move || -> Result<usize> {
        let new_count = store.ingest_items(&items)?;
        store.update_source_fetch_state(source_id, &update)?;
        Ok(new_count)
    })
    .await??;

    if new_count > 0 {
        tracing::info!("Added {} new items from {}", new_count, url);
    }
    Ok(new_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use async_trait::async_trait;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Alpha</title>
    <item><title>One</title><link>https://alpha.example.com/1</link><guid>1</guid></item>
    <item><title>Two</title><link>https://alpha.example.com/2</link><guid>2</guid></item>
  </channel>
</rss>"#;

    struct StaticFetcher;

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(
            &self,
            url: &str,
            _etag: Option<&str>,
            _last_modified: Option<&str>,
        ) -> Result<FetchResult> {
            match url {
                "https://alpha.example.com/feed.xml" => Ok(FetchResult::Content {
                    body: RSS.as_bytes().to_vec(),
                    etag: Some("\"v1\"".into()),
                    last_modified: None,
                }),
                "https://bravo.example.com/feed.xml" => Ok(FetchResult::NotModified),
                _ => Ok(FetchResult::Content {
                    body: b"<html>not a feed</html>".to_vec(),
                    etag: None,
                    last_modified: None,
                }),
            }
        }
    }

    fn source(store: &SqliteStore, name: &str, url: Option<&str>) -> Source {
        store.create_source(name, url).unwrap().source
    }

    #[tokio::test]
    async fn test_refresh_all_ingests_and_reports_per_source() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let alpha = source(&store, "alpha", Some("https://alpha.example.com/feed.xml"));
        let bravo = source(&store, "bravo", Some("https://bravo.example.com/feed.xml"));
        let broken = source(&store, "broken", Some("https://broken.example.com/feed.xml"));
        let local = source(&store, "local", None);

        let parallel = ParallelFetcher::with_workers(Arc::new(StaticFetcher), 2);
        let mut results = parallel
            .refresh_all(
                vec![alpha.clone(), bravo.clone(), broken.clone(), local],
                store.clone(),
                &Normalizer::new(),
            )
            .await;
        results.sort_by_key(|(id, _)| *id);

        // The url-less source is not attempted
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, alpha.source_id);
        assert_eq!(*results[0].1.as_ref().unwrap(), 2);
        assert_eq!(*results[1].1.as_ref().unwrap(), 0);
        assert!(matches!(results[2].1, Err(FeedshelfError::FeedParse(_))));

        let refreshed = store.get_source(alpha.source_id).unwrap().unwrap();
        assert_eq!(refreshed.etag, Some("\"v1\"".into()));
        assert!(refreshed.last_fetched_at.is_some());
        assert_eq!(store.unread_count(1, alpha.source_id).unwrap(), 2);

        // Second pass finds nothing new
        let results = parallel
            .refresh_all(vec![alpha.clone()], store.clone(), &Normalizer::new())
            .await;
        assert_eq!(*results[0].1.as_ref().unwrap(), 0);
    }

    /// Answers `NotModified` once the caller presents the current etag.
    struct ConditionalFetcher;

    #[async_trait]
    impl Fetcher for ConditionalFetcher {
        async fn fetch(
            &self,
            _url: &str,
            etag: Option<&str>,
            _last_modified: Option<&str>,
        ) -> Result<FetchResult> {
            if etag == Some("\"v1\"") {
                return Ok(FetchResult::NotModified);
            }
            Ok(FetchResult::Content {
                body: RSS.as_bytes().to_vec(),
                etag: Some("\"v1\"".into()),
                last_modified: Some("Mon, 01 Jan 2024 00:00:00 GMT".into()),
            })
        }
    }

    #[tokio::test]
    async fn test_failed_ingest_keeps_previous_validators() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let alpha = source(&store, "alpha", Some("https://alpha.example.com/feed.xml"));
        let parallel = ParallelFetcher::with_workers(Arc::new(ConditionalFetcher), DEFAULT_WORKERS);

        store
            .execute_batch(
                "CREATE TRIGGER reject_items BEFORE INSERT ON items
                 BEGIN SELECT RAISE(ABORT, 'disk trouble'); END;",
            )
            .unwrap();
        let results = parallel
            .refresh_all(vec![alpha.clone()], store.clone(), &Normalizer::new())
            .await;
        assert!(results[0].1.is_err());

        let after_failure = store.get_source(alpha.source_id).unwrap().unwrap();
        assert_eq!(after_failure.etag, None);
        assert_eq!(after_failure.last_modified, None);

        store.execute_batch("DROP TRIGGER reject_items;").unwrap();
        let results = parallel
            .refresh_all(vec![after_failure], store.clone(), &Normalizer::new())
            .await;
        assert_eq!(*results[0].1.as_ref().unwrap(), 2);
        assert_eq!(store.unread_count(1, alpha.source_id).unwrap(), 2);

        // Validators are in place now, so the next pass is conditional
        let refreshed = store.get_source(alpha.source_id).unwrap().unwrap();
        assert_eq!(refreshed.etag, Some("\"v1\"".into()));
        let results = parallel
            .refresh_all(vec![refreshed], store.clone(), &Normalizer::new())
            .await;
        assert_eq!(*results[0].1.as_ref().unwrap(), 0);
    }

    #[test]
    fn test_refresh_with_no_sources() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let parallel = ParallelFetcher::with_workers(Arc::new(StaticFetcher), DEFAULT_WORKERS);
        let results = tokio_test::block_on(parallel.refresh_all(
            Vec::new(),
            store,
            &Normalizer::new(),
        ));
        assert!(results.is_empty());
    }
}
