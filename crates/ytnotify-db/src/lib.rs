//! ytnotify SQLite store.
//!
//! One connection behind a mutex, typed repository methods per entity, and
//! fixed parameterised statements only. Each method is a single statement (or
//! a single read); there are no cross-statement transactions.

mod filters;
mod notices;
mod records;
mod subscriptions;
mod videos;

pub use notices::NoticeUpsert;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use ytnotify_core::error::{Result, YtNotifyError};

/// Persistent store for channels, chats, subscriptions, videos and notices.
pub struct Store {
    conn: Mutex<Connection>,
}

pub(crate) fn db_err(e: rusqlite::Error) -> YtNotifyError {
    YtNotifyError::Database(e.to_string())
}

impl Store {
    /// Open or create the database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| YtNotifyError::Database(format!("DB open error: {e}")))?;

        // WAL keeps readers from blocking the scheduler's writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        tracing::debug!("💾 Store opened at {}", path.display());
        Ok(store)
    }

    /// Fresh in-memory store, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| YtNotifyError::Database(format!("Lock: {e}")))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS channels (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY,
                recorder TEXT,
                token TEXT
            );

            CREATE TABLE IF NOT EXISTS subscribers (
                chat_id INTEGER NOT NULL,
                channel_id TEXT NOT NULL,
                PRIMARY KEY (chat_id, channel_id)
            );

            CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY,
                channel_id TEXT NOT NULL DEFAULT '',
                channel_title TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                start_time INTEGER,
                completed INTEGER NOT NULL DEFAULT 0
            );

            -- message_id = -1 means no message sent yet
            CREATE TABLE IF NOT EXISTS notices (
                video_id TEXT NOT NULL,
                chat_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL DEFAULT -1,
                PRIMARY KEY (video_id, chat_id)
            );

            CREATE TABLE IF NOT EXISTS filters (
                chat_id INTEGER NOT NULL,
                channel_id TEXT NOT NULL,
                block INTEGER NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (chat_id, channel_id, block)
            );

            CREATE TABLE IF NOT EXISTS autorecords (
                chat_id INTEGER NOT NULL,
                channel_id TEXT NOT NULL,
                PRIMARY KEY (chat_id, channel_id)
            );

            CREATE TABLE IF NOT EXISTS records (
                chat_id INTEGER NOT NULL,
                video_id TEXT NOT NULL,
                PRIMARY KEY (chat_id, video_id)
            );
            ",
        )
        .map_err(|e| YtNotifyError::Database(format!("Migration error: {e}")))?;
        Ok(())
    }
}
