pub mod folder;
pub mod item;
pub mod results;
pub mod source;
pub mod state;
pub mod subscription;

pub use folder::Folder;
pub use item::{FeedItem, FolderItem, HomeItem, Item, NewItem, ReadItem, SavedItem};
pub use results::{
    AddSourceToFolderResult, AddUserSourceResult, CreateFolderResult, CreateSourceResult,
    DeleteFolderResult, DeleteSourceResult, MarkHomeItemsReadResult, MarkItemReadResult,
    RemoveSourceFromFolderResult, RemoveUserSourceResult, SaveItemResult,
};
pub use source::{Source, SourceSummary, SourceUpdate};
pub use state::ItemState;
pub use subscription::{UserSource, UserSourceFolder};
