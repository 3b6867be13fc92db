use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use webmention_api::{build_router, AppState};
use webmention_common::AppConfig;
use webmention_io_client::WebmentionIoClient;
use webmention_receiver::{
    HttpVerifier, MentionFeed, NoopNotifier, Notifier, ReceiverDeps, WebhookNotifier,
    WebmentionReceiver,
};
use webmention_store::{MentionStore, PgMentionStore};

#[derive(Parser)]
#[command(name = "webmention-api", about = "Webmention receiver")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API and run scheduled processing (default)
    Serve,
    /// Run a single processing cycle and exit
    Process,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let receiver = Arc::new(build_receiver(&config).await?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Process => {
            let summary = receiver.process().await?;
            info!(summary = %serde_json::to_string(&summary)?, "One-shot processing finished");
            Ok(())
        }
        Command::Serve => serve(config, receiver).await,
    }
}

async fn build_receiver(config: &AppConfig) -> Result<WebmentionReceiver> {
    let store: Option<Arc<dyn MentionStore>> = match &config.database_url {
        Some(url) => {
            let store = PgMentionStore::connect(url, config.pending_batch_size)
                .await
                .context("Failed to connect to DATABASE_URL")?;
            store.migrate().await.context("Failed to run migrations")?;
            info!("Connected to database, migrations complete");
            Some(Arc::new(store) as Arc<dyn MentionStore>)
        }
        None => {
            warn!("DATABASE_URL not set, mentions are kept in memory only");
            None
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
        None => Arc::new(NoopNotifier),
    };

    let feed: Arc<dyn MentionFeed> = Arc::new(WebmentionIoClient::new()?);

    let deps = ReceiverDeps::builder()
        .supported_hosts(config.supported_hosts.clone())
        .verifier(Arc::new(HttpVerifier::new()?))
        .store(store)
        .notifier(notifier)
        .token(config.token.clone())
        .feed(Some(feed))
        .verify_timeout(config.verify_timeout)
        .concurrency(config.process_concurrency)
        .build();

    Ok(WebmentionReceiver::new(deps))
}

async fn serve(config: AppConfig, receiver: Arc<WebmentionReceiver>) -> Result<()> {
    if config.process_interval.is_zero() {
        info!("Scheduled processing disabled");
    } else {
        tokio::spawn(process_on_schedule(receiver.clone(), config.process_interval));
    }

    let state = Arc::new(AppState { receiver });
    let app = build_router(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("Webmention receiver starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn process_on_schedule(receiver: Arc<WebmentionReceiver>, every: std::time::Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(e) = receiver.process().await {
            warn!(error = %e, "Processing cycle failed");
        }
    }
}
