use std::env;

use catalog_watch::start_server;
use catalog_watch::Client;
use catalog_watch::Error;
use catalog_watch::Result;
use catalog_watch::Settings;
use catalog_watch::WatchEvent;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = Settings::new()?.validate()?;

    // Initializing Logs
    init_observability();

    let Some(service) = env::args().nth(1) else {
        eprintln!("usage: catalog-watch <service>");
        std::process::exit(2);
    };

    // Initializing Shutdown Signal
    let cancel = CancellationToken::new();

    if settings.monitoring.prometheus_enabled {
        tokio::spawn(start_server(settings.monitoring.prometheus_port, cancel.clone()));
    }

    let client = Client::builder(settings.agent.address.clone())
        .set_settings(settings)
        .build()?;

    info!("Watching service {}. Waiting for CTRL+C signal...", service);
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = graceful_shutdown(shutdown).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    let mut watcher = client.catalog().watcher(&service);
    let result = watcher
        .run(cancel, |event| {
            match &event {
                WatchEvent::Add { id, entry } | WatchEvent::Change { id, entry } => info!(
                    "{} {} at {}:{} tags={:?}",
                    event.kind(),
                    id,
                    entry.service_address,
                    entry.service_port,
                    entry.service_tags
                ),
                WatchEvent::Remove { id, .. } => info!("remove {}", id),
            }
            Ok(())
        })
        .await;

    if let Err(e) = &result {
        error!("watch stops: {:?}", e);
    }
    info!("Exiting at index {}.", watcher.last_index());
    result
}

async fn graceful_shutdown(cancel: CancellationToken) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| Error::Fatal(format!("SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| Error::Fatal(format!("SIGTERM handler: {e}")))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    cancel.cancel();
    info!("Shutdown completed");
    Ok(())
}

fn init_observability() {
    let base_subscriber = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();
}
