//! # Feedshelf
//!
//! A multi-user feed reader core: a shared catalogue of sources, per-user
//! subscriptions with priorities, folders, and per-user read/saved state.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Store ← CLI
//! ```
//!
//! - [`fetcher`]: HTTP client with ETag/conditional request support
//! - [`normalizer`]: Converts RSS/Atom feeds to items ready for ingestion
//! - [`store`]: SQLite persistence, associations and read state
//! - [`cli`]: Command-line front end
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a source and subscribe to it
//! feedshelf source add "Rust Blog" --url https://blog.rust-lang.org/feed.xml
//! feedshelf subscribe 1
//!
//! # Fetch items and read the home feed
//! feedshelf refresh
//! feedshelf home
//!
//! # Same, as another user, in JSON
//! feedshelf --user 2 --json home
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// config, store, fetcher, normalizer.
pub mod app;

/// Command-line interface using clap.
///
/// Subcommands map one-to-one onto [`Store`](store::Store) operations, plus
/// `refresh` and `import`.
pub mod cli;

/// Configuration loaded from `~/.config/feedshelf/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Source`](domain::Source): a shared feed source
/// - [`Folder`](domain::Folder): a user-owned grouping of subscriptions
/// - [`FeedItem`](domain::FeedItem): an item annotated with one user's state
/// - Result records returned by every mutating operation
pub mod domain;

/// HTTP fetching with conditional request support.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`ParallelFetcher`](fetcher::parallel::ParallelFetcher): Concurrent refresh with semaphore
pub mod fetcher;

/// Feed parsing and normalization.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0
/// into [`NewItem`](domain::NewItem) records.
pub mod normalizer;

pub mod opml;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`RetryPolicy`](store::RetryPolicy): backoff on busy/locked databases
pub mod store;
