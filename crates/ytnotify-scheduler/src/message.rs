//! Notification message text and the Record button.

use chrono::{DateTime, Local, TimeDelta, Utc};
use ytnotify_channels::CallbackData;
use ytnotify_channels::markdown::{bold, escape, italic, link};
use ytnotify_core::traits::{InlineButton, InlineKeyboard};
use ytnotify_core::types::{BroadcastState, Video};

const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format(TIME_FORMAT).to_string()
}

/// `HH:MM:SS`, hours unbounded.
pub fn format_duration(d: TimeDelta) -> String {
    let secs = d.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

/// Bold title linked to the watch page.
pub fn title_link(video: &Video) -> String {
    link(&bold(&escape(&video.title)), &video.url())
}

fn section(name: &str, value: &str) -> String {
    format!("{}\n{}", bold(name), italic(&escape(value)))
}

/// Full notification text for a video in its current state.
pub fn compose(video: &Video) -> String {
    let basic = format!(
        "{}\n{}",
        title_link(video),
        italic(&escape(&video.channel_title))
    );

    let Some(details) = &video.live else {
        return basic;
    };

    let state = video.broadcast_state();
    let (time_title, time) = match state {
        BroadcastState::Completed => ("Actual End Time", details.actual_end),
        BroadcastState::Live => ("Actual Start Time", details.actual_start),
        BroadcastState::Upcoming => ("Scheduled Start Time", details.scheduled_start),
        BroadcastState::NotBroadcast => return basic,
    };

    let mut text = format!("{basic}\n\n{}", section("Status", &state.to_string()));
    if let Some(t) = time {
        text.push_str("\n\n");
        text.push_str(&section(time_title, &local_time(t)));
    }
    if let (BroadcastState::Completed, Some(start), Some(end)) =
        (state, details.actual_start, details.actual_end)
    {
        text.push_str("\n\n");
        text.push_str(&section("Duration", &format_duration(end - start)));
    }
    text
}

/// One-off message sent when a broadcast goes live.
pub fn live_announcement(video: &Video) -> String {
    format!(
        "{}\n{}",
        escape(&format!("{} is now live!", video.channel_title)),
        title_link(video)
    )
}

pub fn record_keyboard(video_id: &str) -> InlineKeyboard {
    InlineKeyboard::single(InlineButton {
        text: "Record".into(),
        callback_data: CallbackData::Record {
            video_id: video_id.to_string(),
        }
        .encode(),
    })
}
