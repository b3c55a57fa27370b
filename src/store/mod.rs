pub mod retry;
pub mod sqlite;

use crate::app::Result;
use crate::domain::{
    AddSourceToFolderResult, AddUserSourceResult, CreateFolderResult, CreateSourceResult,
    DeleteFolderResult, DeleteSourceResult, FeedItem, Folder, ItemState, MarkHomeItemsReadResult,
    MarkItemReadResult, NewItem, RemoveSourceFromFolderResult, RemoveUserSourceResult,
    SaveItemResult, Source, SourceSummary, SourceUpdate, UserSource,
};

pub use retry::RetryPolicy;
pub use sqlite::SqliteStore;

/// Users, sources, folders and per-user item state.
///
/// Every operation takes the acting `user_id` explicitly. Mutating operations
/// are atomic; feed queries return a fully materialized, ordered `Vec`.
pub trait Store {
    // Source catalogue
    fn create_source(&self, source_name: &str, url: Option<&str>) -> Result<CreateSourceResult>;
    fn get_source(&self, source_id: i64) -> Result<Option<Source>>;
    fn list_sources(&self) -> Result<Vec<SourceSummary>>;
    fn delete_source(&self, source_id: i64) -> Result<DeleteSourceResult>;
    fn update_source_fetch_state(&self, source_id: i64, update: &SourceUpdate) -> Result<()>;

    // Subscriptions
    fn add_user_source(
        &self,
        user_id: i64,
        source_id: i64,
        priority: i64,
    ) -> Result<AddUserSourceResult>;
    fn remove_user_source(&self, user_id: i64, source_id: i64) -> Result<RemoveUserSourceResult>;
    fn get_user_source(&self, user_id: i64, source_id: i64) -> Result<Option<UserSource>>;
    fn list_user_sources(&self, user_id: i64) -> Result<Vec<SourceSummary>>;
    fn unread_count(&self, user_id: i64, source_id: i64) -> Result<i64>;

    // Folders
    fn create_folder(&self, user_id: i64, name: &str) -> Result<CreateFolderResult>;
    fn delete_folder(&self, user_id: i64, folder_id: i64) -> Result<DeleteFolderResult>;
    fn rename_folder(&self, user_id: i64, folder_id: i64, name: &str) -> Result<Folder>;
    fn list_folders(&self, user_id: i64) -> Result<Vec<Folder>>;
    fn add_source_to_folder(
        &self,
        user_id: i64,
        folder_id: i64,
        source_id: i64,
    ) -> Result<AddSourceToFolderResult>;
    fn remove_source_from_folder(
        &self,
        user_id: i64,
        folder_id: i64,
        source_id: i64,
    ) -> Result<RemoveSourceFromFolderResult>;
    fn list_folder_sources(&self, user_id: i64, folder_id: i64) -> Result<Vec<SourceSummary>>;

    // Item ingestion
    fn ingest_items(&self, items: &[NewItem]) -> Result<usize>;

    // Read/save state
    fn mark_item_read(&self, user_id: i64, item_id: i64, read: bool) -> Result<MarkItemReadResult>;
    fn mark_home_items_read(&self, user_id: i64, item_ids: &[i64])
        -> Result<MarkHomeItemsReadResult>;
    fn save_item(&self, user_id: i64, item_id: i64, save: bool) -> Result<SaveItemResult>;
    fn get_item_state(&self, user_id: i64, item_id: i64) -> Result<Option<ItemState>>;

    // Feed views
    fn get_home_feed(&self, user_id: i64) -> Result<Vec<FeedItem>>;
    fn get_folder_feed(&self, user_id: i64, folder_id: i64) -> Result<Vec<FeedItem>>;
    fn get_read_items(&self, user_id: i64) -> Result<Vec<FeedItem>>;
    fn get_saved_items(&self, user_id: i64) -> Result<Vec<FeedItem>>;
}
