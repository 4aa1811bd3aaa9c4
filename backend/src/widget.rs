//! Read-only progress counters for the home-screen widget.
//!
//! The widget never writes. It recomputes on a fixed schedule or when a
//! refresh is requested explicitly, and publishes the latest summary on a
//! `watch` channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use shared::{TaskFilter, WidgetSummary};
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::store::{Store, StoreError};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub async fn summarize(store: &dyn Store, now: DateTime<Utc>) -> Result<WidgetSummary, StoreError> {
    let tasks = store.tasks(&TaskFilter::all()).await?;
    Ok(WidgetSummary::from_tasks(&tasks, now))
}

/// Cloneable trigger for an out-of-schedule refresh.
#[derive(Clone)]
pub struct RefreshHandle(Arc<Notify>);

impl RefreshHandle {
    pub fn request_refresh(&self) {
        self.0.notify_one();
    }
}

pub struct WidgetRefresher {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    refresh: Arc<Notify>,
    summary: watch::Sender<WidgetSummary>,
}

impl WidgetRefresher {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let (summary, _) = watch::channel(WidgetSummary::empty(clock.now()));
        Self {
            store,
            clock,
            interval: interval.max(MIN_INTERVAL),
            refresh: Arc::new(Notify::new()),
            summary,
        }
    }

    pub fn handle(&self) -> RefreshHandle {
        RefreshHandle(self.refresh.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetSummary> {
        self.summary.subscribe()
    }

    /// Recomputes and publishes the summary. An unreadable store shows as
    /// an empty summary rather than an error.
    pub async fn refresh_now(&self) -> WidgetSummary {
        let now = self.clock.now();
        let summary = match summarize(self.store.as_ref(), now).await {
            Ok(summary) => summary,
            Err(err) => {
                tracing::warn!(error = %err, "Widget could not read the store");
                WidgetSummary::empty(now)
            }
        };
        self.summary.send_replace(summary.clone());
        summary
    }

    /// Refreshes immediately, then on every tick or request until
    /// `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Widget refresher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    tracing::debug!("Scheduled widget refresh");
                }
                _ = self.refresh.notified() => {
                    tracing::info!("Widget refresh requested");
                }
            }

            let summary = self.refresh_now().await;
            tracing::info!(
                total = summary.total_tasks,
                completed = summary.completed_tasks,
                percent = summary.completion_percent(),
                "Widget summary refreshed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SteppingClock;
    use crate::repository::TaskRepository;
    use crate::store::{InMemoryStore, ReadOnly};
    use tokio::sync::oneshot;
    use shared::WidgetStatus;

    async fn seeded() -> (TaskRepository, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let repo = TaskRepository::with_clock(store.clone(), Arc::new(SteppingClock::default()));
        repo.create_category("Home").await.unwrap();
        repo.create_category("Work").await.unwrap();
        let mut milk = repo.create_task("Home", "Buy milk", None).await.unwrap();
        repo.create_task("Home", "Walk dog", None).await.unwrap();
        repo.create_task("Work", "Report", None).await.unwrap();
        repo.toggle_completion(&mut milk).await.unwrap();
        (repo, store)
    }

    #[tokio::test]
    async fn summarize_counts_across_categories() {
        let (repo, _) = seeded().await;
        let summary = summarize(repo.store().as_ref(), repo.now()).await.unwrap();
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.completed_tasks, 1);
        assert_eq!(summary.status(), WidgetStatus::Remaining(2));
    }

    #[tokio::test]
    async fn unreadable_store_publishes_empty_summary() {
        let (_, store) = seeded().await;
        store.fail_reads(true);
        let refresher = WidgetRefresher::new(
            store,
            Arc::new(SteppingClock::default()),
            Duration::from_secs(3600),
        );
        let summary = refresher.refresh_now().await;
        assert_eq!(summary.total_tasks, 0);
        assert_eq!(refresher.subscribe().borrow().total_tasks, 0);
    }

    #[tokio::test]
    async fn explicit_refresh_picks_up_new_tasks() {
        let (repo, store) = seeded().await;
        let refresher = WidgetRefresher::new(
            Arc::new(ReadOnly(store)),
            Arc::new(SteppingClock::default()),
            Duration::from_secs(3600),
        );
        let handle = refresher.handle();
        let mut summaries = refresher.subscribe();
        let (stop, stopped) = oneshot::channel::<()>();
        let worker = tokio::spawn(refresher.run_until(async {
            let _ = stopped.await;
        }));

        // First tick fires immediately.
        summaries.changed().await.unwrap();
        assert_eq!(summaries.borrow_and_update().total_tasks, 3);

        repo.create_task("Work", "Slides", None).await.unwrap();
        handle.request_refresh();
        summaries.changed().await.unwrap();
        assert_eq!(summaries.borrow_and_update().total_tasks, 4);

        stop.send(()).unwrap();
        worker.await.unwrap();
    }
}
