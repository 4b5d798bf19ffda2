//! Per (video, chat) notice rows.

use rusqlite::params;
use ytnotify_core::error::Result;
use ytnotify_core::types::{ChatId, MessageId, Notice, SENTINEL_MESSAGE_ID};

use crate::{Store, db_err};

/// How an insert treats an existing (video, chat) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeUpsert {
    /// Leave an existing row alone.
    KeepExisting,
    /// Overwrite the existing row, e.g. with the message it was sent as.
    Replace,
}

impl NoticeUpsert {
    fn statement(self) -> &'static str {
        match self {
            NoticeUpsert::KeepExisting => {
                "INSERT OR IGNORE INTO notices (video_id, chat_id, message_id) VALUES (?1, ?2, ?3)"
            }
            NoticeUpsert::Replace => {
                "INSERT OR REPLACE INTO notices (video_id, chat_id, message_id) VALUES (?1, ?2, ?3)"
            }
        }
    }
}

impl Store {
    /// Returns true if a row was written.
    pub fn upsert_notice(
        &self,
        video_id: &str,
        chat_id: ChatId,
        message_id: Option<MessageId>,
        strategy: NoticeUpsert,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn
            .execute(
                strategy.statement(),
                params![video_id, chat_id, message_id.unwrap_or(SENTINEL_MESSAGE_ID)],
            )
            .map_err(db_err)?;
        Ok(n > 0)
    }

    pub fn notice_exists(&self, video_id: &str, chat_id: ChatId) -> Result<bool> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notices WHERE video_id = ?1 AND chat_id = ?2)",
            params![video_id, chat_id],
            |r| r.get(0),
        )
        .map_err(db_err)
    }

    pub fn notices_for_video(&self, video_id: &str) -> Result<Vec<Notice>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT video_id, chat_id, message_id FROM notices
                 WHERE video_id = ?1 ORDER BY chat_id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![video_id], |r| {
                let message_id: MessageId = r.get(2)?;
                Ok(Notice {
                    video_id: r.get(0)?,
                    chat_id: r.get(1)?,
                    message_id: (message_id != SENTINEL_MESSAGE_ID).then_some(message_id),
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Distinct video ids that still have at least one notice row.
    pub fn notice_video_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached("SELECT DISTINCT video_id FROM notices ORDER BY video_id")
            .map_err(db_err)?;
        let rows = stmt.query_map([], |r| r.get(0)).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<String>>>().map_err(db_err)
    }

    pub fn delete_notices_for_video(&self, video_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM notices WHERE video_id = ?1", params![video_id])
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_existing_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.upsert_notice("v1", 1, None, NoticeUpsert::KeepExisting).unwrap());
        store.upsert_notice("v1", 1, Some(42), NoticeUpsert::Replace).unwrap();
        assert!(!store.upsert_notice("v1", 1, None, NoticeUpsert::KeepExisting).unwrap());

        let notices = store.notices_for_video("v1").unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message_id, Some(42));
    }

    #[test]
    fn test_replace_overwrites() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_notice("v1", 1, Some(10), NoticeUpsert::KeepExisting).unwrap();
        store.upsert_notice("v1", 1, None, NoticeUpsert::Replace).unwrap();

        let notices = store.notices_for_video("v1").unwrap();
        assert_eq!(notices.len(), 1);
        assert!(!notices[0].is_sent());
    }

    #[test]
    fn test_video_ids_and_delete() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_notice("v1", 1, None, NoticeUpsert::KeepExisting).unwrap();
        store.upsert_notice("v1", 2, Some(5), NoticeUpsert::KeepExisting).unwrap();
        store.upsert_notice("v2", 1, None, NoticeUpsert::KeepExisting).unwrap();

        assert_eq!(store.notice_video_ids().unwrap(), vec!["v1", "v2"]);
        assert!(store.notice_exists("v1", 2).unwrap());

        assert_eq!(store.delete_notices_for_video("v1").unwrap(), 2);
        assert!(!store.notice_exists("v1", 2).unwrap());
        assert_eq!(store.notice_video_ids().unwrap(), vec!["v2"]);
    }
}
