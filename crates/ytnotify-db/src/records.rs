//! Auto-record flags per (chat, channel) and record requests per (chat, video).

use rusqlite::params;
use ytnotify_core::error::Result;
use ytnotify_core::types::ChatId;

use crate::{Store, db_err};

impl Store {
    pub fn set_auto_record(&self, chat_id: ChatId, channel_id: &str, enabled: bool) -> Result<()> {
        let conn = self.conn()?;
        let sql = if enabled {
            "INSERT OR IGNORE INTO autorecords (chat_id, channel_id) VALUES (?1, ?2)"
        } else {
            "DELETE FROM autorecords WHERE chat_id = ?1 AND channel_id = ?2"
        };
        conn.execute(sql, params![chat_id, channel_id]).map_err(db_err)?;
        Ok(())
    }

    pub fn has_auto_record(&self, chat_id: ChatId, channel_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM autorecords WHERE chat_id = ?1 AND channel_id = ?2)",
            params![chat_id, channel_id],
            |r| r.get(0),
        )
        .map_err(db_err)
    }

    /// Chats that auto-record a channel.
    pub fn auto_record_chats(&self, channel_id: &str) -> Result<Vec<ChatId>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached("SELECT chat_id FROM autorecords WHERE channel_id = ?1 ORDER BY chat_id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![channel_id], |r| r.get(0))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<ChatId>>>().map_err(db_err)
    }

    /// Returns true if the request is new.
    pub fn insert_record(&self, chat_id: ChatId, video_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn
            .execute(
                "INSERT OR IGNORE INTO records (chat_id, video_id) VALUES (?1, ?2)",
                params![chat_id, video_id],
            )
            .map_err(db_err)?;
        Ok(n > 0)
    }

    pub fn has_record(&self, chat_id: ChatId, video_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM records WHERE chat_id = ?1 AND video_id = ?2)",
            params![chat_id, video_id],
            |r| r.get(0),
        )
        .map_err(db_err)
    }

    pub fn delete_record(&self, chat_id: ChatId, video_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM records WHERE chat_id = ?1 AND video_id = ?2",
            params![chat_id, video_id],
        )
        .map_err(db_err)?;
        Ok(())
    }
}
