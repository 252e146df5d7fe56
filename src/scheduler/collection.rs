//! Statistics collection scheduler

use crate::collector::Collector;
use crate::config::CollectionConfig;
use crate::scheduler::backoff::backoff_for;
use crate::scheduler::{pause, PEEK_ERROR_PAUSE, POST_CYCLE_PAUSE};
use crate::storage::{Repository, SharedRepository};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Inner {
    running: bool,
    stop_tx: Option<watch::Sender<bool>>,
    stop_rx: Option<watch::Receiver<bool>>,
    handles: Vec<JoinHandle<()>>,
}

/// Drives periodic statistics collection across the fleet
pub struct CollectionScheduler<R: Repository + 'static> {
    repo: SharedRepository<R>,
    collector: Arc<Collector<R>>,
    config: CollectionConfig,
    inner: Mutex<Inner>,
}

impl<R: Repository + 'static> CollectionScheduler<R> {
    pub fn new(
        repo: SharedRepository<R>,
        collector: Arc<Collector<R>>,
        config: CollectionConfig,
    ) -> Self {
        Self {
            repo,
            collector,
            config,
            inner: Mutex::new(Inner {
                running: false,
                stop_tx: None,
                stop_rx: None,
                handles: Vec::new(),
            }),
        }
    }

    /// Starts the scheduler; a second call while running is a no-op
    pub fn start(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.running {
            tracing::warn!("collection scheduler already running");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        tracing::info!(
            interval_minutes = self.config.interval_minutes,
            batch_size = self.config.batch_size,
            "collection scheduler started"
        );

        let mut cycle_stop = stop_rx.clone();
        let repo = self.repo.clone();
        let collector = self.collector.clone();
        let config = self.config.clone();
        let initial = tokio::spawn(async move {
            run_cycle(&repo, &collector, &config, &mut cycle_stop).await;
        });

        let loop_stop = stop_rx.clone();
        let repo = self.repo.clone();
        let collector = self.collector.clone();
        let config = self.config.clone();
        let continuous = tokio::spawn(async move {
            continuous_loop(repo, collector, config, loop_stop).await;
        });

        inner.running = true;
        inner.stop_tx = Some(stop_tx);
        inner.stop_rx = Some(stop_rx);
        inner.handles = vec![initial, continuous];
    }

    /// Signals both tasks to stop and waits for them
    pub async fn stop(&self) {
        let (stop_tx, handles) = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.running {
                return;
            }
            inner.running = false;
            inner.stop_rx = None;
            (inner.stop_tx.take(), std::mem::take(&mut inner.handles))
        };

        if let Some(tx) = stop_tx {
            let _ = tx.send(true);
        }
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("collection scheduler stopped");
    }

    /// Runs one extra cycle right now; returns false when not running
    pub async fn trigger(&self) -> bool {
        let stop_rx = {
            let inner = self.inner.lock().unwrap();
            if !inner.running {
                return false;
            }
            inner.stop_rx.clone()
        };

        match stop_rx {
            Some(mut stop) => {
                tracing::info!("manually triggered collection cycle");
                run_cycle(&self.repo, &self.collector, &self.config, &mut stop).await;
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().running
    }
}

/// One collection cycle over the most overdue batch
async fn run_cycle<R: Repository + 'static>(
    repo: &SharedRepository<R>,
    collector: &Collector<R>,
    config: &CollectionConfig,
    stop: &mut watch::Receiver<bool>,
) {
    let started = Instant::now();

    let batch = {
        let repo = repo.lock().await;
        match repo.due_for_collection(config.batch_size) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "failed to load collection batch");
                return;
            }
        }
    };

    if batch.is_empty() {
        return;
    }
    tracing::info!(count = batch.len(), "collection cycle started");

    let delay = Duration::from_secs_f64(config.item_delay_secs);
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    let last = batch.len() - 1;
    for (i, site) in batch.iter().enumerate() {
        if *stop.borrow() {
            tracing::warn!("collection cycle interrupted");
            return;
        }
        if !site.is_active {
            continue;
        }

        match collector.collect_one(site.id).await {
            Ok(_) => succeeded += 1,
            Err(e) => {
                tracing::error!(site_id = site.id, url = %site.url, error = %e, "collection failed");
                failed += 1;
            }
        }

        if i < last && !delay.is_zero() && pause(stop, delay).await {
            tracing::warn!("collection cycle interrupted during delay");
            return;
        }
    }

    tracing::info!(
        succeeded,
        failed,
        elapsed_secs = started.elapsed().as_secs(),
        "collection cycle done"
    );
}

/// Re-runs cycles forever, backing off while the fleet is fresh
async fn continuous_loop<R: Repository + 'static>(
    repo: SharedRepository<R>,
    collector: Arc<Collector<R>>,
    config: CollectionConfig,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        if *stop.borrow() {
            return;
        }

        let peek = {
            let repo = repo.lock().await;
            repo.oldest_collection_check()
        };

        let oldest = match peek {
            Ok(mark) => mark.flatten(),
            Err(e) => {
                tracing::error!(error = %e, "failed to peek collection backlog");
                if pause(&mut stop, PEEK_ERROR_PAUSE).await {
                    return;
                }
                continue;
            }
        };

        if let Some(backoff) = backoff_for(oldest, Utc::now()) {
            tracing::debug!(backoff_secs = backoff.as_secs(), "fleet is fresh, backing off");
            if pause(&mut stop, backoff).await {
                return;
            }
            continue;
        }

        run_cycle(&repo, &collector, &config, &mut stop).await;

        if pause(&mut stop, POST_CYCLE_PAUSE).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::mediawiki::MediaWikiClient;
    use crate::storage::{shared, SqliteRepository};

    fn scheduler() -> CollectionScheduler<SqliteRepository> {
        let repo = shared(SqliteRepository::new_in_memory().unwrap());
        let mediawiki = Arc::new(MediaWikiClient::new(&HttpConfig::default()).unwrap());
        let collector = Arc::new(Collector::new(repo.clone(), mediawiki));
        CollectionScheduler::new(repo, collector, CollectionConfig::default())
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let scheduler = scheduler();
        assert!(!scheduler.is_running());

        scheduler.start();
        assert!(scheduler.is_running());
        scheduler.start();
        assert!(scheduler.is_running());

        scheduler.stop().await;
        assert!(!scheduler.is_running());
        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_trigger_requires_running() {
        let scheduler = scheduler();
        assert!(!scheduler.trigger().await);

        scheduler.start();
        assert!(scheduler.trigger().await);
        scheduler.stop().await;
    }
}
