use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use rusqlite_migration::{Migrations, M};
use tracing::{debug, info, warn};

use crate::app::{FeedshelfError, Result};
use crate::config::DatabaseConfig;
use crate::domain::{
    AddSourceToFolderResult, AddUserSourceResult, CreateFolderResult, CreateSourceResult,
    DeleteFolderResult, DeleteSourceResult, FeedItem, Folder, Item, ItemState,
    MarkHomeItemsReadResult, MarkItemReadResult, NewItem, RemoveSourceFromFolderResult,
    RemoveUserSourceResult, SaveItemResult, Source, SourceSummary, SourceUpdate, UserSource,
    UserSourceFolder,
};
use crate::store::{RetryPolicy, Store};

const SOURCE_COLUMNS: &str =
    "source_id, source_name, url, etag, last_modified, last_fetched_at, created_at";

const FOLDER_COLUMNS: &str = "folder_id, user_id, name, created_at";

/// Base projection for every feed view. `?1` is always the acting user.
const FEED_SELECT: &str =
    "SELECT i.item_id, i.source_id, i.title, i.link, i.description, i.pub_date,
            s.source_name, COALESCE(st.read, 0), st.read_time, COALESCE(st.saved, 0)
     FROM items i
     JOIN sources s ON s.source_id = i.source_id";

const FEED_STATE_JOIN: &str =
    "LEFT JOIN item_state st ON st.item_id = i.item_id AND st.user_id = ?1";

const ORDER_BY_PUB_DATE: &str = "ORDER BY i.pub_date IS NULL, i.pub_date DESC, i.item_id DESC";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    retry: RetryPolicy,
}

impl SqliteStore {
    pub fn with_config<P: AsRef<Path>>(path: P, config: &DatabaseConfig) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(config.busy_timeout())?;
        Self::from_connection(conn, RetryPolicy::from_config(config))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, RetryPolicy::default())
    }

    fn from_connection(conn: Connection, retry: RetryPolicy) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            retry,
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| FeedshelfError::Migration(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            FeedshelfError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn mark_item_read_at(
        &self,
        user_id: i64,
        item_id: i64,
        read: bool,
        now: DateTime<Utc>,
    ) -> Result<MarkItemReadResult> {
        self.retry.run("mark_item_read", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            if !item_exists(&tx, item_id)? {
                return Err(FeedshelfError::not_found("item", item_id));
            }
            let (result, changed) = apply_read(&tx, user_id, item_id, read, now)?;

            tx.commit()?;
            if changed {
                debug!("User {} marked item {} read={}", user_id, item_id, read);
            }
            Ok(result)
        })
    }

    fn mark_home_items_read_at(
        &self,
        user_id: i64,
        item_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<MarkHomeItemsReadResult> {
        let unique: BTreeSet<i64> = item_ids.iter().copied().collect();

        self.retry.run("mark_home_items_read", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let mut read_count = 0;

            for &item_id in &unique {
                if !item_exists(&tx, item_id)? {
                    warn!("Skipping unknown item {} in bulk mark-read", item_id);
                    continue;
                }
                let (_, changed) = apply_read(&tx, user_id, item_id, true, now)?;
                if changed {
                    read_count += 1;
                }
            }

            tx.commit()?;
            debug!(
                "User {} marked {} of {} items read",
                user_id,
                read_count,
                unique.len()
            );
            Ok(MarkHomeItemsReadResult { read_count })
        })
    }
}

impl Store for SqliteStore {
    fn create_source(&self, source_name: &str, url: Option<&str>) -> Result<CreateSourceResult> {
        let source_name = source_name.trim();
        if source_name.is_empty() {
            return Err(FeedshelfError::InvalidInput(
                "source name must not be empty".into(),
            ));
        }
        let url = url.map(str::trim).filter(|u| !u.is_empty());
        if let Some(u) = url {
            url::Url::parse(u)?;
        }

        // Dedupe keys (url, or name among url-less sources) make this safe to repeat.
        self.retry.run("create_source", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            let existing = match url {
                Some(u) => tx
                    .query_row(
                        &format!("SELECT {} FROM sources WHERE url = ?1", SOURCE_COLUMNS),
                        params![u],
                        source_from_row,
                    )
                    .optional()?,
                None => tx
                    .query_row(
                        &format!(
                            "SELECT {} FROM sources WHERE url IS NULL AND source_name = ?1",
                            SOURCE_COLUMNS
                        ),
                        params![source_name],
                        source_from_row,
                    )
                    .optional()?,
            };

            if let Some(source) = existing {
                tx.commit()?;
                return Ok(CreateSourceResult {
                    source,
                    created: false,
                });
            }

            tx.execute(
                "INSERT INTO sources (source_name, url, created_at) VALUES (?1, ?2, ?3)",
                params![source_name, url, format_datetime(&Utc::now())],
            )?;
            let source_id = tx.last_insert_rowid();
            let source = tx.query_row(
                &format!("SELECT {} FROM sources WHERE source_id = ?1", SOURCE_COLUMNS),
                params![source_id],
                source_from_row,
            )?;

            tx.commit()?;
            info!("Created source {} ({})", source.source_name, source_id);
            Ok(CreateSourceResult {
                source,
                created: true,
            })
        })
    }

    fn get_source(&self, source_id: i64) -> Result<Option<Source>> {
        self.retry.run("get_source", || {
            let conn = self.conn()?;
            let result = conn
                .query_row(
                    &format!("SELECT {} FROM sources WHERE source_id = ?1", SOURCE_COLUMNS),
                    params![source_id],
                    source_from_row,
                )
                .optional()?;
            Ok(result)
        })
    }

    fn list_sources(&self) -> Result<Vec<SourceSummary>> {
        self.retry.run("list_sources", || {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT source_id, source_name, url, NULL FROM sources
                 ORDER BY source_name, source_id",
            )?;
            let sources = stmt
                .query_map([], summary_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(sources)
        })
    }

    fn delete_source(&self, source_id: i64) -> Result<DeleteSourceResult> {
        self.retry.run("delete_source", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            let source_name: String = tx
                .query_row(
                    "SELECT source_name FROM sources WHERE source_id = ?1",
                    params![source_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| FeedshelfError::not_found("source", source_id))?;

            let links = tx.execute(
                "DELETE FROM user_source_folders WHERE source_id = ?1",
                params![source_id],
            )?;
            let subscriptions = tx.execute(
                "DELETE FROM user_sources WHERE source_id = ?1",
                params![source_id],
            )?;
            tx.execute(
                "DELETE FROM item_state
                 WHERE item_id IN (SELECT item_id FROM items WHERE source_id = ?1)",
                params![source_id],
            )?;
            let items = tx.execute("DELETE FROM items WHERE source_id = ?1", params![source_id])?;
            tx.execute("DELETE FROM sources WHERE source_id = ?1", params![source_id])?;

            tx.commit()?;
            info!(
                "Deleted source {} ({} items, {} subscriptions, {} folder links)",
                source_id, items, subscriptions, links
            );
            Ok(DeleteSourceResult {
                source_id,
                source_name,
            })
        })
    }

    fn update_source_fetch_state(&self, source_id: i64, update: &SourceUpdate) -> Result<()> {
        self.retry.run("update_source_fetch_state", || {
            let conn = self.conn()?;
            let changed = conn.execute(
                "UPDATE sources SET
                    etag = COALESCE(?1, etag),
                    last_modified = COALESCE(?2, last_modified),
                    last_fetched_at = COALESCE(?3, last_fetched_at)
                 WHERE source_id = ?4",
                params![
                    update.etag,
                    update.last_modified,
                    update.last_fetched_at.as_ref().map(format_datetime),
                    source_id
                ],
            )?;
            if changed == 0 {
                return Err(FeedshelfError::not_found("source", source_id));
            }
            Ok(())
        })
    }

    fn add_user_source(
        &self,
        user_id: i64,
        source_id: i64,
        priority: i64,
    ) -> Result<AddUserSourceResult> {
        self.retry.run("add_user_source", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            if !source_exists(&tx, source_id)? {
                return Err(FeedshelfError::not_found("source", source_id));
            }
            let existed = user_source_exists(&tx, user_id, source_id)?;

            tx.execute(
                "INSERT INTO user_sources (user_id, source_id, priority, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, source_id) DO UPDATE SET priority = excluded.priority",
                params![user_id, source_id, priority, format_datetime(&Utc::now())],
            )?;

            tx.commit()?;
            debug!(
                "User {} subscribed to source {} at priority {} (new: {})",
                user_id, source_id, priority, !existed
            );
            Ok(AddUserSourceResult {
                user_id,
                source_id,
                priority,
                created: !existed,
            })
        })
    }

    fn remove_user_source(&self, user_id: i64, source_id: i64) -> Result<RemoveUserSourceResult> {
        self.retry.run("remove_user_source", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            let folder_links_removed = tx.execute(
                "DELETE FROM user_source_folders WHERE user_id = ?1 AND source_id = ?2",
                params![user_id, source_id],
            )?;
            let removed = tx.execute(
                "DELETE FROM user_sources WHERE user_id = ?1 AND source_id = ?2",
                params![user_id, source_id],
            )? > 0;

            tx.commit()?;
            debug!(
                "User {} unsubscribed from source {} (removed: {}, folder links: {})",
                user_id, source_id, removed, folder_links_removed
            );
            Ok(RemoveUserSourceResult {
                user_id,
                source_id,
                removed,
                folder_links_removed,
            })
        })
    }

    fn get_user_source(&self, user_id: i64, source_id: i64) -> Result<Option<UserSource>> {
        self.retry.run("get_user_source", || {
            let conn = self.conn()?;
            let result = conn
                .query_row(
                    "SELECT user_id, source_id, priority, created_at FROM user_sources
                     WHERE user_id = ?1 AND source_id = ?2",
                    params![user_id, source_id],
                    |row| {
                        Ok(UserSource {
                            user_id: row.get(0)?,
                            source_id: row.get(1)?,
                            priority: row.get(2)?,
                            created_at: required_datetime(row, 3)?,
                        })
                    },
                )
                .optional()?;
            Ok(result)
        })
    }

    fn list_user_sources(&self, user_id: i64) -> Result<Vec<SourceSummary>> {
        self.retry.run("list_user_sources", || {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT s.source_id, s.source_name, s.url, us.priority
                 FROM user_sources us
                 JOIN sources s ON s.source_id = us.source_id
                 WHERE us.user_id = ?1
                 ORDER BY us.priority ASC, us.source_id ASC",
            )?;
            let sources = stmt
                .query_map(params![user_id], summary_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(sources)
        })
    }

    fn unread_count(&self, user_id: i64, source_id: i64) -> Result<i64> {
        self.retry.run("unread_count", || {
            let conn = self.conn()?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM items i
                 LEFT JOIN item_state st ON st.item_id = i.item_id AND st.user_id = ?1
                 WHERE i.source_id = ?2 AND (st.read IS NULL OR st.read = 0)",
                params![user_id, source_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    fn create_folder(&self, user_id: i64, name: &str) -> Result<CreateFolderResult> {
        let name = validate_folder_name(name)?;

        // No dedupe key: a repeated insert would create a second folder.
        let conn = self.conn()?;
        let created_at = stored_now();
        conn.execute(
            "INSERT INTO folders (user_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, name, format_datetime(&created_at)],
        )?;
        let folder_id = conn.last_insert_rowid();

        info!("User {} created folder {} ({})", user_id, name, folder_id);
        Ok(Folder {
            folder_id,
            user_id,
            name: name.to_string(),
            created_at,
        })
    }

    fn delete_folder(&self, user_id: i64, folder_id: i64) -> Result<DeleteFolderResult> {
        self.retry.run("delete_folder", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            let folder = owned_folder(&tx, user_id, folder_id)?;
            let links = tx.execute(
                "DELETE FROM user_source_folders WHERE user_id = ?1 AND folder_id = ?2",
                params![user_id, folder_id],
            )?;
            tx.execute(
                "DELETE FROM folders WHERE user_id = ?1 AND folder_id = ?2",
                params![user_id, folder_id],
            )?;

            tx.commit()?;
            info!(
                "User {} deleted folder {} ({} source links)",
                user_id, folder_id, links
            );
            Ok(DeleteFolderResult {
                folder_id,
                name: folder.name,
            })
        })
    }

    fn rename_folder(&self, user_id: i64, folder_id: i64, name: &str) -> Result<Folder> {
        let name = validate_folder_name(name)?;

        self.retry.run("rename_folder", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            let mut folder = owned_folder(&tx, user_id, folder_id)?;
            tx.execute(
                "UPDATE folders SET name = ?1 WHERE user_id = ?2 AND folder_id = ?3",
                params![name, user_id, folder_id],
            )?;

            tx.commit()?;
            folder.name = name.to_string();
            Ok(folder)
        })
    }

    fn list_folders(&self, user_id: i64) -> Result<Vec<Folder>> {
        self.retry.run("list_folders", || {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM folders WHERE user_id = ?1 ORDER BY created_at, folder_id",
                FOLDER_COLUMNS
            ))?;
            let folders = stmt
                .query_map(params![user_id], folder_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(folders)
        })
    }

    fn add_source_to_folder(
        &self,
        user_id: i64,
        folder_id: i64,
        source_id: i64,
    ) -> Result<AddSourceToFolderResult> {
        self.retry.run("add_source_to_folder", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            owned_folder(&tx, user_id, folder_id)?;
            if !user_source_exists(&tx, user_id, source_id)? {
                return Err(FeedshelfError::Precondition(format!(
                    "user {} is not subscribed to source {}",
                    user_id, source_id
                )));
            }

            let added = tx.execute(
                "INSERT OR IGNORE INTO user_source_folders (user_id, folder_id, source_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, folder_id, source_id, format_datetime(&Utc::now())],
            )? > 0;

            tx.commit()?;
            Ok(AddSourceToFolderResult {
                link: UserSourceFolder {
                    user_id,
                    folder_id,
                    source_id,
                },
                added,
            })
        })
    }

    fn remove_source_from_folder(
        &self,
        user_id: i64,
        folder_id: i64,
        source_id: i64,
    ) -> Result<RemoveSourceFromFolderResult> {
        self.retry.run("remove_source_from_folder", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            owned_folder(&tx, user_id, folder_id)?;
            let removed = tx.execute(
                "DELETE FROM user_source_folders
                 WHERE user_id = ?1 AND folder_id = ?2 AND source_id = ?3",
                params![user_id, folder_id, source_id],
            )? > 0;

            tx.commit()?;
            Ok(RemoveSourceFromFolderResult {
                link: UserSourceFolder {
                    user_id,
                    folder_id,
                    source_id,
                },
                removed,
            })
        })
    }

    fn list_folder_sources(&self, user_id: i64, folder_id: i64) -> Result<Vec<SourceSummary>> {
        self.retry.run("list_folder_sources", || {
            let conn = self.conn()?;
            owned_folder(&conn, user_id, folder_id)?;

            let mut stmt = conn.prepare(
                "SELECT s.source_id, s.source_name, s.url, us.priority
                 FROM user_source_folders usf
                 JOIN user_sources us ON us.user_id = usf.user_id AND us.source_id = usf.source_id
                 JOIN sources s ON s.source_id = usf.source_id
                 WHERE usf.user_id = ?1 AND usf.folder_id = ?2
                 ORDER BY us.priority ASC, us.source_id ASC",
            )?;
            let sources = stmt
                .query_map(params![user_id, folder_id], summary_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(sources)
        })
    }

    fn ingest_items(&self, items: &[NewItem]) -> Result<usize> {
        self.retry.run("ingest_items", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let fetched_at = format_datetime(&Utc::now());
            let mut count = 0;

            for item in items {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO items (source_id, guid, title, link, description, pub_date, fetched_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        item.source_id,
                        item.guid,
                        item.title,
                        item.link,
                        item.description,
                        item.pub_date.as_ref().map(format_datetime),
                        fetched_at
                    ],
                )?;
                count += inserted;
            }

            tx.commit()?;
            Ok(count)
        })
    }

    fn mark_item_read(&self, user_id: i64, item_id: i64, read: bool) -> Result<MarkItemReadResult> {
        self.mark_item_read_at(user_id, item_id, read, Utc::now())
    }

    fn mark_home_items_read(
        &self,
        user_id: i64,
        item_ids: &[i64],
    ) -> Result<MarkHomeItemsReadResult> {
        self.mark_home_items_read_at(user_id, item_ids, Utc::now())
    }

    fn save_item(&self, user_id: i64, item_id: i64, save: bool) -> Result<SaveItemResult> {
        self.retry.run("save_item", || {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            if !item_exists(&tx, item_id)? {
                return Err(FeedshelfError::not_found("item", item_id));
            }

            if save {
                tx.execute(
                    "INSERT INTO item_state (user_id, item_id, saved, saved_time) VALUES (?1, ?2, 1, ?3)
                     ON CONFLICT(user_id, item_id) DO UPDATE SET
                        saved = 1,
                        saved_time = COALESCE(item_state.saved_time, excluded.saved_time)",
                    params![user_id, item_id, format_datetime(&Utc::now())],
                )?;
            } else {
                // Only touch an existing row; absence already means unsaved.
                tx.execute(
                    "UPDATE item_state SET saved = 0, saved_time = NULL
                     WHERE user_id = ?1 AND item_id = ?2",
                    params![user_id, item_id],
                )?;
            }

            tx.commit()?;
            Ok(SaveItemResult {
                user_id,
                item_id,
                saved: save,
            })
        })
    }

    fn get_item_state(&self, user_id: i64, item_id: i64) -> Result<Option<ItemState>> {
        self.retry.run("get_item_state", || {
            let conn = self.conn()?;
            load_state(&conn, user_id, item_id)
        })
    }

    fn get_home_feed(&self, user_id: i64) -> Result<Vec<FeedItem>> {
        self.retry.run("get_home_feed", || {
            let conn = self.conn()?;
            let sql = format!(
                "{}
                 JOIN user_sources us ON us.source_id = i.source_id AND us.user_id = ?1
                 {}
                 {}",
                FEED_SELECT, FEED_STATE_JOIN, ORDER_BY_PUB_DATE
            );
            query_feed(&conn, &sql, params![user_id])
        })
    }

    fn get_folder_feed(&self, user_id: i64, folder_id: i64) -> Result<Vec<FeedItem>> {
        self.retry.run("get_folder_feed", || {
            let conn = self.conn()?;
            owned_folder(&conn, user_id, folder_id)?;

            let sql = format!(
                "{}
                 JOIN user_sources us ON us.source_id = i.source_id AND us.user_id = ?1
                 JOIN user_source_folders usf
                   ON usf.source_id = i.source_id AND usf.user_id = ?1 AND usf.folder_id = ?2
                 {}
                 {}",
                FEED_SELECT, FEED_STATE_JOIN, ORDER_BY_PUB_DATE
            );
            query_feed(&conn, &sql, params![user_id, folder_id])
        })
    }

    fn get_read_items(&self, user_id: i64) -> Result<Vec<FeedItem>> {
        self.retry.run("get_read_items", || {
            let conn = self.conn()?;
            let sql = format!(
                "{}
                 {}
                 WHERE st.read = 1
                 ORDER BY st.read_time DESC, i.item_id DESC",
                FEED_SELECT, FEED_STATE_JOIN
            );
            query_feed(&conn, &sql, params![user_id])
        })
    }

    fn get_saved_items(&self, user_id: i64) -> Result<Vec<FeedItem>> {
        self.retry.run("get_saved_items", || {
            let conn = self.conn()?;
            let sql = format!(
                "{}
                 {}
                 WHERE st.saved = 1
                 {}",
                FEED_SELECT, FEED_STATE_JOIN, ORDER_BY_PUB_DATE
            );
            query_feed(&conn, &sql, params![user_id])
        })
    }
}

/// Set or clear the read flag. Returns the resulting state and whether a row changed.
///
/// An item that is already read keeps its first `read_time`.
fn apply_read(
    conn: &Connection,
    user_id: i64,
    item_id: i64,
    read: bool,
    now: DateTime<Utc>,
) -> Result<(MarkItemReadResult, bool)> {
    let existing = load_state(conn, user_id, item_id)?;
    let already_read = existing.as_ref().map(|s| s.read).unwrap_or(false);

    let (read_time, changed) = match (read, already_read) {
        (true, true) => (existing.and_then(|s| s.read_time), false),
        (true, false) => {
            let stamp = now.trunc_subsecs(6);
            conn.execute(
                "INSERT INTO item_state (user_id, item_id, read, read_time) VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(user_id, item_id) DO UPDATE SET read = 1, read_time = excluded.read_time",
                params![user_id, item_id, format_datetime(&stamp)],
            )?;
            (Some(stamp), true)
        }
        (false, true) => {
            conn.execute(
                "UPDATE item_state SET read = 0, read_time = NULL
                 WHERE user_id = ?1 AND item_id = ?2",
                params![user_id, item_id],
            )?;
            (None, true)
        }
        (false, false) => (None, false),
    };

    Ok((
        MarkItemReadResult {
            user_id,
            item_id,
            read,
            read_time,
        },
        changed,
    ))
}

fn load_state(conn: &Connection, user_id: i64, item_id: i64) -> Result<Option<ItemState>> {
    let result = conn
        .query_row(
            "SELECT user_id, item_id, read, read_time, saved, saved_time
             FROM item_state WHERE user_id = ?1 AND item_id = ?2",
            params![user_id, item_id],
            |row| {
                Ok(ItemState {
                    user_id: row.get(0)?,
                    item_id: row.get(1)?,
                    read: row.get::<_, i32>(2)? != 0,
                    read_time: optional_datetime(row, 3)?,
                    saved: row.get::<_, i32>(4)? != 0,
                    saved_time: optional_datetime(row, 5)?,
                })
            },
        )
        .optional()?;
    Ok(result)
}

/// Fetch a folder, or `NotFound` when it is missing or belongs to another user.
fn owned_folder(conn: &Connection, user_id: i64, folder_id: i64) -> Result<Folder> {
    conn.query_row(
        &format!(
            "SELECT {} FROM folders WHERE folder_id = ?1 AND user_id = ?2",
            FOLDER_COLUMNS
        ),
        params![folder_id, user_id],
        folder_from_row,
    )
    .optional()?
    .ok_or_else(|| FeedshelfError::not_found("folder", folder_id))
}

fn source_exists(conn: &Connection, source_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sources WHERE source_id = ?1",
        params![source_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn user_source_exists(conn: &Connection, user_id: i64, source_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM user_sources WHERE user_id = ?1 AND source_id = ?2",
        params![user_id, source_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn item_exists(conn: &Connection, item_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM items WHERE item_id = ?1",
        params![item_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn query_feed<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<FeedItem>> {
    let mut stmt = conn.prepare(sql)?;
    let items = stmt
        .query_map(params, |row| {
            Ok(FeedItem {
                item: Item {
                    item_id: row.get(0)?,
                    source_id: row.get(1)?,
                    title: row.get(2)?,
                    link: row.get(3)?,
                    description: row.get(4)?,
                    pub_date: optional_datetime(row, 5)?,
                },
                source_name: row.get(6)?,
                read: row.get::<_, i32>(7)? != 0,
                read_time: optional_datetime(row, 8)?,
                saved: row.get::<_, i32>(9)? != 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items)
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<Source> {
    Ok(Source {
        source_id: row.get(0)?,
        source_name: row.get(1)?,
        url: row.get(2)?,
        etag: row.get(3)?,
        last_modified: row.get(4)?,
        last_fetched_at: optional_datetime(row, 5)?,
        created_at: required_datetime(row, 6)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<SourceSummary> {
    Ok(SourceSummary {
        source_id: row.get(0)?,
        source_name: row.get(1)?,
        url: row.get(2)?,
        priority: row.get(3)?,
    })
}

fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<Folder> {
    Ok(Folder {
        folder_id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        created_at: required_datetime(row, 3)?,
    })
}

fn validate_folder_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FeedshelfError::InvalidInput(
            "folder name must not be empty".into(),
        ));
    }
    Ok(name)
}

/// Fixed-precision UTC so that text order matches time order in SQL.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time at the precision it is stored with.
fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| s.parse::<DateTime<Utc>>().ok())
}

fn optional_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| datetime_from_text(idx, &raw))
        .transpose()
}

fn required_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    datetime_from_text(idx, &raw)
}

fn datetime_from_text(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_datetime(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp {:?}", raw).into(),
        )
    })
}

#[cfg(test)]
impl SqliteStore {
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }
}
