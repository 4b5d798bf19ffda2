//! Route handlers for the gateway.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use ytnotify_channels::telegram::{CallbackData, CallbackQuery, TelegramMessage, TelegramUpdate};
use ytnotify_core::error::YtNotifyError;
use ytnotify_core::traits::{InlineKeyboard, OutgoingMessage};
use ytnotify_scheduler::{RecordReply, RecordReport};

use super::commands::{Command, execute};
use super::server::AppState;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ytnotify",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "subscriptions": state.subscriptions.active_channels().len(),
    }))
}

/// Hub intent verification. Echoes `hub.challenge` only when the request
/// matches what we asked the hub for.
pub async fn websub_verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (Some(mode), Some(topic), Some(challenge)) = (
        params.get("hub.mode"),
        params.get("hub.topic"),
        params.get("hub.challenge"),
    ) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if state.subscriptions.verify_intent(mode, topic) {
        tracing::debug!("✅ Verified {} for {}", mode, topic);
        (StatusCode::OK, challenge.clone()).into_response()
    } else {
        tracing::warn!("⚠️ Rejected {} verification for {}", mode, topic);
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Content distribution from the hub. Always acknowledged; processing runs
/// in the background.
pub async fn websub_push(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    state.ingestor.dispatch(&body);
    StatusCode::OK
}

const TELEGRAM_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Status report from a chat's recorder. The recorder authenticates with the
/// chat's recorder token as a bearer credential.
pub async fn recorder_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(report): Json<RecordReport>,
) -> Result<Json<RecordReply>, StatusCode> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let endpoint = match state.store.recorder_for(report.chat_id) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            tracing::error!("❌ Recorder lookup for chat {} failed: {e}", report.chat_id);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    match (endpoint, bearer) {
        (Some(endpoint), Some(token)) if secrets_match(&endpoint.token, token) => {}
        _ => {
            tracing::warn!("⚠️ Unauthenticated recorder report for chat {}", report.chat_id);
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    match state.recording.handle_report(report).await {
        Ok(reply) => Ok(Json(reply)),
        Err(YtNotifyError::NotFound(what)) => {
            tracing::warn!("⚠️ Recorder report for unknown {}", what);
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            tracing::error!("❌ Recorder report failed: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Telegram webhook. Deliveries without our secret token are refused;
/// everything else answers 200 so Telegram does not redeliver.
pub async fn telegram_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<TelegramUpdate>,
) -> StatusCode {
    let secret = headers
        .get(TELEGRAM_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !secrets_match(&state.telegram_secret, secret) {
        tracing::warn!("⚠️ Telegram update {} without a valid secret token", update.update_id);
        return StatusCode::UNAUTHORIZED;
    }

    if let Some(query) = update.callback_query {
        handle_callback(&state, query).await;
    } else if let Some(message) = update.message {
        handle_message(&state, message).await;
    }
    StatusCode::OK
}

/// Compare without bailing on the first differing byte.
fn secrets_match(expected: &str, given: &str) -> bool {
    expected.len() == given.len()
        && !expected.is_empty()
        && expected
            .bytes()
            .zip(given.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

async fn handle_message(state: &AppState, message: TelegramMessage) {
    let Some(command) = message.text.as_deref().and_then(Command::parse) else {
        return;
    };
    let chat_id = message.chat.id;
    tracing::debug!("💬 {:?} from chat {}", command, chat_id);

    let reply = execute(state, chat_id, command).await;
    let outgoing = OutgoingMessage::new(chat_id, reply).no_preview();
    if let Err(e) = state.messenger.send_message(&outgoing).await {
        tracing::warn!("⚠️ Reply to chat {} failed: {e}", chat_id);
    }
}

async fn handle_callback(state: &AppState, query: CallbackQuery) {
    let data = query.data.as_deref().and_then(CallbackData::decode);
    let (Some(CallbackData::Record { video_id }), Some(message)) = (data, query.message) else {
        answer(state, &query.id, "Unknown action").await;
        return;
    };
    let chat_id = message.chat.id;

    if let Err(e) = state.store.insert_record(chat_id, &video_id) {
        tracing::error!("❌ Record request for {} in chat {} failed: {e}", video_id, chat_id);
        answer(state, &query.id, "Internal server error").await;
        return;
    }
    tracing::info!("🎥 Chat {} asked to record {}", chat_id, video_id);
    answer(state, &query.id, &format!("Add {video_id} recorder")).await;

    if let Err(e) = state
        .messenger
        .edit_message_keyboard(chat_id, message.message_id, &InlineKeyboard::empty())
        .await
    {
        if !e.is_not_modified() {
            tracing::warn!("⚠️ Clearing record button in chat {} failed: {e}", chat_id);
        }
    }
}

async fn answer(state: &AppState, callback_id: &str, text: &str) {
    if let Err(e) = state.messenger.answer_callback(callback_id, Some(text)).await {
        tracing::warn!("⚠️ Callback answer failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::testing::{Call, TELEGRAM_SECRET, eventually, fixture, stored_channel};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use ytnotify_core::types::{RecorderEndpoint, Video};

    const TOPIC: &str = "https%3A%2F%2Fwww.youtube.com%2Fxml%2Ffeeds%2Fvideos.xml%3Fchannel_id%3DUC1";

    fn verify_uri(mode: &str) -> String {
        format!("/websub?hub.mode={mode}&hub.topic={TOPIC}&hub.challenge=c4a11e")
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn telegram_post(update: serde_json::Value) -> Request<Body> {
        Request::post("/telegram")
            .header("content-type", "application/json")
            .header("x-telegram-bot-api-secret-token", TELEGRAM_SECRET)
            .body(Body::from(update.to_string()))
            .unwrap()
    }

    fn recorder_post(token: &str, report: serde_json::Value) -> Request<Body> {
        Request::post("/recorder")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(report.to_string()))
            .unwrap()
    }

    fn recorder_for_chat_42(fx: &crate::testing::Fixture) {
        let endpoint = RecorderEndpoint {
            url: "http://rec.local/record".into(),
            token: "rec-token".into(),
        };
        fx.state.store.set_recorder(42, Some(&endpoint)).unwrap();
    }

    #[tokio::test]
    async fn test_health() {
        let fx = fixture();
        let response = build_router(fx.state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_verify_echoes_challenge_for_active_topic() {
        let fx = fixture();
        fx.state.subscriptions.subscribe("UC1").await.unwrap();

        let response = build_router(fx.state.clone())
            .oneshot(Request::get(verify_uri("subscribe")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "c4a11e");

        let response = build_router(fx.state)
            .oneshot(Request::get(verify_uri("unsubscribe")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_verify_unsubscribe_for_inactive_topic() {
        let fx = fixture();
        let response = build_router(fx.state.clone())
            .oneshot(Request::get(verify_uri("unsubscribe")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = build_router(fx.state)
            .oneshot(Request::get(verify_uri("subscribe")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_verify_missing_params() {
        let fx = fixture();
        let response = build_router(fx.state)
            .oneshot(Request::get("/websub?hub.mode=subscribe").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_push_notifies_subscribers() {
        let fx = fixture();
        stored_channel(&fx, 42, "UC1", "Chan");
        fx.api.set(Video {
            id: "vid00000001".into(),
            channel_id: "UC1".into(),
            channel_title: "Chan".into(),
            title: "New upload".into(),
            live: None,
        });

        let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <yt:videoId>vid00000001</yt:videoId>
    <yt:channelId>UC1</yt:channelId>
    <title>New upload</title>
    <author><name>Chan</name></author>
    <published>2026-01-01T00:00:00+00:00</published>
    <updated>2026-01-01T00:00:00+00:00</updated>
  </entry>
</feed>"#;
        let response = build_router(fx.state)
            .oneshot(Request::post("/websub").body(Body::from(feed)).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let messenger = fx.messenger.clone();
        assert!(eventually(|| !messenger.sends().is_empty()).await);
        let sends = fx.messenger.sends();
        assert_eq!(sends[0].0, 42);
        assert!(sends[0].1.contains("New upload"));
    }

    #[tokio::test]
    async fn test_push_with_garbage_is_acknowledged() {
        let fx = fixture();
        let response = build_router(fx.state)
            .oneshot(Request::post("/websub").body(Body::from("not xml at all")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(fx.messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_record_button_callback() {
        let fx = fixture();
        let update = serde_json::json!({
            "update_id": 1,
            "callback_query": {
                "id": "cb1",
                "from": { "id": 9, "is_bot": false, "first_name": "A" },
                "message": {
                    "message_id": 555,
                    "chat": { "id": 42, "type": "private" },
                    "date": 0
                },
                "data": r#"{"type":"record","videoID":"vid00000001"}"#
            }
        });

        let response = build_router(fx.state.clone())
            .oneshot(telegram_post(update))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(fx.state.store.has_record(42, "vid00000001").unwrap());
        let calls = fx.messenger.calls();
        assert!(calls.contains(&Call::Answer {
            callback_id: "cb1".into(),
            text: Some("Add vid00000001 recorder".into()),
        }));
        assert!(calls.contains(&Call::EditKeyboard {
            chat_id: 42,
            message_id: 555,
            cleared: true,
        }));
    }

    #[tokio::test]
    async fn test_unknown_callback_is_answered() {
        let fx = fixture();
        let update = serde_json::json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb2",
                "from": { "id": 9, "is_bot": false, "first_name": "A" },
                "data": "garbage"
            }
        });
        build_router(fx.state)
            .oneshot(telegram_post(update))
            .await
            .unwrap();
        assert_eq!(
            fx.messenger.calls(),
            vec![Call::Answer {
                callback_id: "cb2".into(),
                text: Some("Unknown action".into()),
            }]
        );
    }

    #[tokio::test]
    async fn test_add_command_via_webhook() {
        let fx = fixture();
        fx.api.add_channel("UC1", "Chan");
        let update = serde_json::json!({
            "update_id": 3,
            "message": {
                "message_id": 1,
                "chat": { "id": 42, "type": "private" },
                "text": "/add UC1",
                "date": 0
            }
        });
        build_router(fx.state.clone())
            .oneshot(telegram_post(update))
            .await
            .unwrap();

        assert_eq!(fx.state.store.chats_for_channel("UC1").unwrap(), vec![42]);
        assert_eq!(
            fx.hub.requests.lock().unwrap().clone(),
            vec![("subscribe".to_string(), "UC1".to_string())]
        );
        let sends = fx.messenger.sends();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].1.starts_with("Subscribed to"));
    }

    #[tokio::test]
    async fn test_plain_text_is_ignored() {
        let fx = fixture();
        let update = serde_json::json!({
            "update_id": 4,
            "message": {
                "message_id": 1,
                "chat": { "id": 42, "type": "private" },
                "text": "hello bot"
            }
        });
        let response = build_router(fx.state)
            .oneshot(telegram_post(update))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(fx.messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_recorder_report_for_unknown_video() {
        let fx = fixture();
        recorder_for_chat_42(&fx);
        let report = serde_json::json!({
            "success": true,
            "chatID": 42,
            "videoID": "missing",
            "filename": "x.mp4"
        });
        let response = build_router(fx.state)
            .oneshot(recorder_post("rec-token", report))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_recorder_report_done() {
        let fx = fixture();
        fx.api.set(Video {
            id: "v1".into(),
            channel_id: "UC1".into(),
            channel_title: "Chan".into(),
            title: "Stream".into(),
            live: None,
        });
        fx.state.store.insert_record(42, "v1").unwrap();
        recorder_for_chat_42(&fx);

        let report = serde_json::json!({
            "success": true,
            "chatID": 42,
            "videoID": "v1",
            "filename": "v1.mp4"
        });
        let response = build_router(fx.state.clone())
            .oneshot(recorder_post("rec-token", report))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"retry":false}"#);
        assert!(!fx.state.store.has_record(42, "v1").unwrap());
    }

    #[tokio::test]
    async fn test_forged_recorder_report_is_rejected() {
        let fx = fixture();
        fx.state.store.insert_record(42, "v1").unwrap();
        recorder_for_chat_42(&fx);
        let report = serde_json::json!({
            "success": true,
            "chatID": 42,
            "videoID": "v1",
            "filename": "v1.mp4"
        });

        let response = build_router(fx.state.clone())
            .oneshot(json_post("/recorder", report.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = build_router(fx.state.clone())
            .oneshot(recorder_post("wrong-token", report))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(fx.state.store.has_record(42, "v1").unwrap());
    }

    #[tokio::test]
    async fn test_recorder_report_for_chat_without_recorder_is_rejected() {
        let fx = fixture();
        fx.state.store.insert_record(7, "v1").unwrap();
        let report = serde_json::json!({ "success": true, "chatID": 7, "videoID": "v1" });
        let response = build_router(fx.state.clone())
            .oneshot(recorder_post("", report))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(fx.state.store.has_record(7, "v1").unwrap());
    }

    #[tokio::test]
    async fn test_forged_telegram_update_is_rejected() {
        let fx = fixture();
        stored_channel(&fx, 42, "UC1", "Chan");
        let update = serde_json::json!({
            "update_id": 5,
            "message": {
                "message_id": 1,
                "chat": { "id": 42, "type": "private" },
                "text": "/remove UC1",
                "date": 0
            }
        });

        let response = build_router(fx.state.clone())
            .oneshot(json_post("/telegram", update.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let forged = Request::post("/telegram")
            .header("content-type", "application/json")
            .header("x-telegram-bot-api-secret-token", "guess")
            .body(Body::from(update.to_string()))
            .unwrap();
        let response = build_router(fx.state.clone()).oneshot(forged).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(fx.state.store.chats_for_channel("UC1").unwrap(), vec![42]);
        assert!(fx.messenger.calls().is_empty());
    }
}
