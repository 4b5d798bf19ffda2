use rusqlite::params;
use ytnotify_core::error::Result;
use ytnotify_core::types::{ChatId, FilterRule};

use crate::{Store, db_err};

impl Store {
    /// The block and allow rows for a (chat, channel) pair, at most one each.
    pub fn filters_for(&self, chat_id: ChatId, channel_id: &str) -> Result<Vec<FilterRule>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT block, content FROM filters
                 WHERE chat_id = ?1 AND channel_id = ?2 ORDER BY block",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![chat_id, channel_id], |r| {
                let block: bool = r.get(0)?;
                let content: String = r.get(1)?;
                Ok(FilterRule::from_stored(block, &content))
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Replace the block or allow list. An empty word list removes the row.
    pub fn set_filter(&self, chat_id: ChatId, channel_id: &str, rule: &FilterRule) -> Result<()> {
        let conn = self.conn()?;
        if rule.words.is_empty() {
            conn.execute(
                "DELETE FROM filters WHERE chat_id = ?1 AND channel_id = ?2 AND block = ?3",
                params![chat_id, channel_id, rule.block],
            )
            .map_err(db_err)?;
        } else {
            conn.execute(
                "INSERT OR REPLACE INTO filters (chat_id, channel_id, block, content)
                 VALUES (?1, ?2, ?3, ?4)",
                params![chat_id, channel_id, rule.block, rule.to_stored()],
            )
            .map_err(db_err)?;
        }
        Ok(())
    }
}
