//! Tracked videos. `completed` only ever moves from false to true.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use ytnotify_core::error::Result;
use ytnotify_core::types::VideoRecord;

use crate::{Store, db_err};

impl Store {
    /// Insert or refresh a video row. A stored `completed = 1` survives any
    /// later upsert.
    pub fn upsert_video(&self, video: &VideoRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO videos (id, channel_id, channel_title, title, start_time, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                channel_id = excluded.channel_id,
                channel_title = excluded.channel_title,
                title = excluded.title,
                start_time = excluded.start_time,
                completed = MAX(videos.completed, excluded.completed)",
            params![
                video.id,
                video.channel_id,
                video.channel_title,
                video.title,
                video.scheduled_start.map(|t| t.timestamp()),
                video.completed,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Unknown ids count as not completed.
    pub fn is_completed(&self, video_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let completed: Option<bool> = conn
            .query_row(
                "SELECT completed FROM videos WHERE id = ?1",
                params![video_id],
                |r| r.get(0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(completed.unwrap_or(false))
    }

    pub fn mark_completed(&self, video_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE videos SET completed = 1 WHERE id = ?1",
            params![video_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn video(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, channel_id, channel_title, title, start_time, completed
             FROM videos WHERE id = ?1",
            params![video_id],
            |r| {
                let start: Option<i64> = r.get(4)?;
                Ok(VideoRecord {
                    id: r.get(0)?,
                    channel_id: r.get(1)?,
                    channel_title: r.get(2)?,
                    title: r.get(3)?,
                    scheduled_start: start.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0)),
                    completed: r.get(5)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }
}
