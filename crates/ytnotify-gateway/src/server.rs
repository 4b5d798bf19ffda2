//! HTTP server implementation using Axum.

use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use ytnotify_core::traits::Messenger;
use ytnotify_db::Store;
use ytnotify_scheduler::{FeedIngestor, RecordingService, SubscriptionManager};

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub messenger: Arc<dyn Messenger>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub ingestor: Arc<FeedIngestor>,
    pub recording: Arc<RecordingService>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` on webhook deliveries.
    pub telegram_secret: String,
    pub start_time: Instant,
}

/// Build the router.
pub fn build_router(state: AppState) -> Router {
    build_router_from_arc(Arc::new(state))
}

pub fn build_router_from_arc(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(super::routes::health_check))
        .route(
            "/websub",
            get(super::routes::websub_verify).post(super::routes::websub_push),
        )
        .route("/recorder", post(super::routes::recorder_report))
        .route("/telegram", post(super::routes::telegram_update))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, addr: SocketAddr, shutdown: F, grace: Duration) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Gateway listening on http://{}", addr);
    serve_on(listener, state, shutdown, grace).await
}

/// Serve on an already bound listener. Once `shutdown` resolves every hub
/// subscription is dropped while the listener keeps answering, so the hub's
/// unsubscribe verifications still reach us during `grace`.
pub async fn serve_on<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
    grace: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let subscriptions = state.subscriptions.clone();
    let app = build_router(state);
    let drain = async move {
        shutdown.await;
        let dropped = subscriptions.shutdown().await;
        tracing::info!("👋 Unsubscribed {} channels, waiting {}s", dropped, grace.as_secs());
        tokio::time::sleep(grace).await;
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(drain)
        .await?;
    tracing::info!("🛑 Gateway stopped");
    Ok(())
}
