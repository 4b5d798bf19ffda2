//! # ytnotify
//!
//! Telegram notifications for YouTube uploads and live broadcasts, driven by
//! WebSub pushes and adaptive polling.
//!
//! Usage:
//!   ytnotify                              # ~/.ytnotify/config.toml
//!   ytnotify --config ./ytnotify.toml     # Custom config
//!   ytnotify --port 9000 --verbose

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use ytnotify_channels::{HttpRecorder, TelegramBot, WebSubClient, YoutubeApi};
use ytnotify_core::config::AppConfig;
use ytnotify_core::traits::{Messenger, PushHub, Recorder, VideoApi};
use ytnotify_db::Store;
use ytnotify_gateway::AppState;
use ytnotify_scheduler::{FeedIngestor, Notifier, RecordingService, Scheduler, SubscriptionManager};

#[derive(Parser)]
#[command(name = "ytnotify", version, about = "📺 YouTube upload and live notifier for Telegram")]
struct Cli {
    /// Config file (default: ~/.ytnotify/config.toml)
    #[arg(short, long, env = "YTNOTIFY_CONFIG")]
    config: Option<String>,

    /// Override gateway.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "ytnotify=debug,tower_http=debug"
    } else {
        "ytnotify=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(&PathBuf::from(shellexpand::tilde(path).to_string()))?,
        None => AppConfig::load()?,
    };
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    config.validate()?;

    let store = Arc::new(Store::open(&config.database.expanded_path()).context("Failed to open store")?);

    let timeout = config.scheduler.api_timeout();
    let bot = Arc::new(TelegramBot::new(&config.telegram.api_base, &config.telegram.bot_token, timeout));
    let api: Arc<dyn VideoApi> = Arc::new(YoutubeApi::new(&config.youtube.api_base, &config.youtube.api_key, timeout));
    let hub: Arc<dyn PushHub> = Arc::new(WebSubClient::new(
        &config.hub.hub_url,
        &config.hub.topic_prefix,
        &config.gateway.websub_callback(),
        config.hub.lease_seconds,
        timeout,
    ));
    let recorder: Arc<dyn Recorder> = Arc::new(HttpRecorder::new(Duration::from_secs(config.recorder.timeout_secs)));

    let me = bot.get_me().await.context("Telegram bot authentication failed")?;
    tracing::info!("🤖 Authorized as @{}", me.username.as_deref().unwrap_or(&me.first_name));
    if let Err(e) = bot.set_webhook(&config.gateway.telegram_webhook(), &config.telegram.webhook_secret).await {
        tracing::warn!("⚠️ Telegram webhook registration failed: {e}");
    }
    let messenger: Arc<dyn Messenger> = bot;

    let notifier = Arc::new(Notifier::new(store.clone(), messenger.clone()));
    let recording = Arc::new(RecordingService::new(
        store.clone(),
        messenger.clone(),
        api.clone(),
        recorder,
        config.gateway.recorder_callback(),
        Duration::from_secs(config.recorder.retry_delay_secs),
    ));
    let scheduler = Arc::new(Scheduler::new(
        api.clone(),
        notifier,
        recording.clone(),
        config.scheduler.clone(),
    ));
    let subscriptions = Arc::new(SubscriptionManager::new(store.clone(), hub, api));
    let ingestor = Arc::new(FeedIngestor::new(scheduler.clone()));

    let recovered = subscriptions
        .recover()
        .await
        .context("Failed to recover subscriptions")?;
    tracing::info!("📡 Recovered {} channel subscriptions", recovered);

    let tracked = scheduler.sweep().await.context("Initial sweep failed")?;
    tracing::info!("🔎 Initial sweep checked {} videos", tracked);

    let regular = scheduler.clone().spawn_regular();
    let renewal = subscriptions.clone().spawn_lease_renewal(config.hub.renewal_interval());

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .context("Invalid gateway address")?;
    let state = AppState {
        store,
        messenger,
        subscriptions: subscriptions.clone(),
        ingestor,
        recording,
        telegram_secret: config.telegram.webhook_secret.clone(),
        start_time: Instant::now(),
    };
    let grace = Duration::from_secs(config.scheduler.shutdown_grace_secs);
    ytnotify_gateway::serve(state, addr, shutdown_signal(), grace).await?;

    regular.abort();
    renewal.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Ctrl-C handler failed: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("❌ SIGTERM handler failed: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("🛑 Shutdown requested");
}
