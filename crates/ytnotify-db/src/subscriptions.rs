//! Chats, channels and the (chat, channel) subscription pairs.

use rusqlite::{OptionalExtension, params};
use ytnotify_core::error::Result;
use ytnotify_core::types::{Channel, ChatId, RecorderEndpoint};

use crate::{Store, db_err};

impl Store {
    /// Register a chat, a channel and the subscription between them. Existing
    /// rows are left untouched.
    pub fn subscribe(&self, chat_id: ChatId, channel: &Channel) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("INSERT OR IGNORE INTO chats (id) VALUES (?1)", params![chat_id])
            .map_err(db_err)?;
        conn.execute(
            "INSERT OR IGNORE INTO channels (id, title) VALUES (?1, ?2)",
            params![channel.id, channel.title],
        )
        .map_err(db_err)?;
        conn.execute(
            "INSERT OR IGNORE INTO subscribers (chat_id, channel_id) VALUES (?1, ?2)",
            params![chat_id, channel.id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Drop a subscription pair. Returns whether a row was removed.
    pub fn unsubscribe(&self, chat_id: ChatId, channel_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn
            .execute(
                "DELETE FROM subscribers WHERE chat_id = ?1 AND channel_id = ?2",
                params![chat_id, channel_id],
            )
            .map_err(db_err)?;
        Ok(n > 0)
    }

    /// Chats subscribed to a channel.
    pub fn chats_for_channel(&self, channel_id: &str) -> Result<Vec<ChatId>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached("SELECT chat_id FROM subscribers WHERE channel_id = ?1 ORDER BY chat_id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![channel_id], |r| r.get(0))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<ChatId>>>().map_err(db_err)
    }

    /// Channels a chat is subscribed to, ordered by title.
    pub fn channels_for_chat(&self, chat_id: ChatId) -> Result<Vec<Channel>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT channels.id, channels.title FROM channels
                 INNER JOIN subscribers ON channels.id = subscribers.channel_id
                 WHERE subscribers.chat_id = ?1 ORDER BY channels.title",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![chat_id], |r| {
                Ok(Channel {
                    id: r.get(0)?,
                    title: r.get(1)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Every channel id the store knows about.
    pub fn channel_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached("SELECT id FROM channels ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt.query_map([], |r| r.get(0)).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<String>>>().map_err(db_err)
    }

    /// Channels with no remaining subscription rows.
    pub fn orphaned_channel_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT channels.id FROM channels
                 LEFT JOIN subscribers ON channels.id = subscribers.channel_id
                 WHERE subscribers.chat_id IS NULL",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map([], |r| r.get(0)).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<String>>>().map_err(db_err)
    }

    /// Delete a channel only while nobody subscribes to it. Returns whether
    /// a row went away.
    pub fn delete_channel_if_orphaned(&self, channel_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn
            .execute(
                "DELETE FROM channels WHERE id = ?1
                 AND NOT EXISTS (SELECT 1 FROM subscribers WHERE channel_id = ?1)",
                params![channel_id],
            )
            .map_err(db_err)?;
        Ok(n > 0)
    }

    pub fn channel_title(&self, channel_id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT title FROM channels WHERE id = ?1",
            params![channel_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    /// Refresh the cached title of a known channel.
    pub fn update_channel_title(&self, channel_id: &str, title: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE channels SET title = ?1 WHERE id = ?2",
            params![title, channel_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Set or clear a chat's recorder endpoint.
    pub fn set_recorder(&self, chat_id: ChatId, endpoint: Option<&RecorderEndpoint>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO chats (id, recorder, token) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET recorder = excluded.recorder, token = excluded.token",
            params![
                chat_id,
                endpoint.map(|e| e.url.as_str()),
                endpoint.map(|e| e.token.as_str())
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// A chat's recorder, if both url and token are configured.
    pub fn recorder_for(&self, chat_id: ChatId) -> Result<Option<RecorderEndpoint>> {
        let conn = self.conn()?;
        let row: Option<(Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT recorder, token FROM chats WHERE id = ?1",
                params![chat_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()
            .map_err(db_err)?;
        Ok(match row {
            Some((Some(url), Some(token))) => Some(RecorderEndpoint { url, token }),
            _ => None,
        })
    }
}
