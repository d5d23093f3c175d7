#![forbid(unsafe_code)]

mod access;
mod error;
mod listing;
mod social;
mod species;
mod trees;
mod types;

pub use error::StoreError;
pub use species::delete::flatten_ids;
pub use types::*;

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA_VERSION: &str = "v1";

/// Document store for trees, species, comments, likes and view events.
///
/// SQLite is only the persistence mechanics here: no foreign keys are
/// declared, and every referential rule between records is enforced by the
/// operations in this crate.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join("phylotree.db");
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS counters (
          name TEXT PRIMARY KEY,
          value INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ph_trees (
          id TEXT PRIMARY KEY,
          owner_id TEXT NOT NULL,
          name TEXT NOT NULL,
          description TEXT,
          image TEXT,
          is_public INTEGER NOT NULL,
          tags_json TEXT NOT NULL,
          collaborators_json TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tree_views (
          tree_id TEXT NOT NULL,
          viewer_id TEXT NOT NULL,
          viewed_at_ms INTEGER NOT NULL,
          PRIMARY KEY (tree_id, viewer_id)
        );

        CREATE TABLE IF NOT EXISTS species (
          id TEXT PRIMARY KEY,
          tree_id TEXT NOT NULL,
          ancestor_id TEXT,
          name TEXT NOT NULL,
          apparition REAL,
          after_apparition REAL,
          duration REAL NOT NULL,
          description TEXT,
          image TEXT
        );

        CREATE TABLE IF NOT EXISTS comments (
          id TEXT PRIMARY KEY,
          tree_id TEXT NOT NULL,
          user_id TEXT NOT NULL,
          content TEXT NOT NULL,
          parent_id TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS likes (
          id TEXT PRIMARY KEY,
          user_id TEXT NOT NULL,
          tree_id TEXT,
          comment_id TEXT,
          species_id TEXT,
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_species_tree ON species(tree_id);
        CREATE INDEX IF NOT EXISTS idx_species_ancestor ON species(ancestor_id);
        CREATE INDEX IF NOT EXISTS idx_comments_tree ON comments(tree_id);
        CREATE INDEX IF NOT EXISTS idx_likes_tree ON likes(tree_id);
        CREATE INDEX IF NOT EXISTS idx_likes_comment ON likes(comment_id);
        CREATE INDEX IF NOT EXISTS idx_likes_species ON likes(species_id);
        "#,
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
        params!["schema_version", SCHEMA_VERSION],
    )?;
    Ok(())
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

fn next_counter_tx(tx: &Transaction<'_>, name: &str) -> Result<i64, StoreError> {
    let current: i64 = tx
        .query_row(
            "SELECT value FROM counters WHERE name=?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let next = current + 1;
    tx.execute(
        r#"
        INSERT INTO counters(name, value) VALUES (?1, ?2)
        ON CONFLICT(name) DO UPDATE SET value=excluded.value
        "#,
        params![name, next],
    )?;
    Ok(next)
}

fn next_id_tx(tx: &Transaction<'_>, counter: &str, prefix: &str) -> Result<String, StoreError> {
    let seq = next_counter_tx(tx, counter)?;
    Ok(format!("{prefix}{seq:06}"))
}

/// Single post-mutation hook for the owning tree's `updated_at` stamp; every
/// logical mutation calls this exactly once.
fn touch_tree_tx(tx: &Transaction<'_>, tree_id: &str, now_ms: i64) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE ph_trees SET updated_at_ms=?2 WHERE id=?1",
        params![tree_id, now_ms],
    )?;
    Ok(())
}
