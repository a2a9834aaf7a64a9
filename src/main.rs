use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use restock_watcher::config::AppConfig;
use restock_watcher::notify::{Notifier, TelegramNotifier};
use restock_watcher::scheduler::{self, Intervals, RandomJitter};
use restock_watcher::{sites, DedupCache};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    init_tracing(config.debug)?;

    info!("Starting restock watcher...");

    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .context("failed to build http client")?;

    let notifier = TelegramNotifier::new(
        client.clone(),
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    );
    notifier
        .connect()
        .await
        .context("telegram bot token rejected")?;
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);

    let cancel = CancellationToken::new();
    handle_interruptions(cancel.clone());

    let cache = Arc::new(DedupCache::new(config.renotify_after()));
    let watch_list = sites::default_sites().context("invalid site registry")?;

    scheduler::run(
        watch_list,
        client,
        cache,
        notifier,
        Intervals {
            min: config.ticker_min(),
            max: config.ticker_max(),
        },
        RandomJitter,
        cancel,
    )
    .await
    .context("watcher stopped")?;

    info!("Shutting down...");
    Ok(())
}

fn init_tracing(debug: bool) -> Result<()> {
    let directive = if debug {
        "restock_watcher=debug"
    } else {
        "restock_watcher=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();

    Ok(())
}

/// Cancels in-flight work on SIGINT/SIGTERM, gives it a short grace period
/// (bounded by the request timeout), then exits cleanly.
fn handle_interruptions(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Stopping the watcher due to received signal...");
        cancel.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        std::process::exit(0);
    });
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            tracing::error!(error = %err, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
