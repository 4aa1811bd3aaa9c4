//! Widget daemon: keeps the home-screen progress counters fresh from a
//! read-only view of the task store.

use std::sync::Arc;

use backend::config::{StoreConfig, WidgetConfig};
use backend::{ReadOnly, RedisStore, RefreshHandle, SystemClock, WidgetRefresher};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "Widget daemon failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let store_config = StoreConfig::from_env()?;
    let widget_config = WidgetConfig::from_env()?;

    let store = RedisStore::open(&store_config.redis_url, store_config.key_prefix.clone())?;
    tracing::info!(
        prefix = %store_config.key_prefix,
        interval_secs = widget_config.refresh_interval.as_secs(),
        "Widget daemon starting"
    );

    let refresher = WidgetRefresher::new(
        Arc::new(ReadOnly(store)),
        Arc::new(SystemClock),
        widget_config.refresh_interval,
    );
    listen_for_refresh_signal(refresher.handle());

    refresher
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Could not listen for Ctrl-C, shutting down");
            }
        })
        .await;
    Ok(())
}

/// `SIGUSR1` triggers an immediate refresh.
#[cfg(unix)]
fn listen_for_refresh_signal(handle: RefreshHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::user_defined1()) {
        Ok(mut signals) => {
            tokio::spawn(async move {
                while signals.recv().await.is_some() {
                    handle.request_refresh();
                }
            });
        }
        Err(err) => tracing::warn!(error = %err, "Refresh signal unavailable"),
    }
}

#[cfg(not(unix))]
fn listen_for_refresh_signal(_handle: RefreshHandle) {}
