use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedshelfError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("OPML error: {0}")]
    Opml(#[from] opml::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FeedshelfError {
    /// Busy/locked database errors that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedshelfError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    pub fn not_found(what: &str, id: i64) -> Self {
        FeedshelfError::NotFound(format!("{} {}", what, id))
    }
}

impl From<rusqlite::Error> for FeedshelfError {
    fn from(err: rusqlite::Error) -> Self {
        // Unique/primary-key violations that slipped past an upsert path.
        if let rusqlite::Error::SqliteFailure(e, ref msg) = err {
            if matches!(
                e.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            ) {
                let detail = msg.clone().unwrap_or_else(|| e.to_string());
                return FeedshelfError::Conflict(detail);
            }
        }
        FeedshelfError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, FeedshelfError>;
