//! Archive check scheduler

use crate::archive::ArchiveMatcher;
use crate::config::ArchiveConfig;
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

/// Drives periodic archive.org checks across the fleet
pub struct ArchiveScheduler<R: Repository + 'static> {
    repo: SharedRepository<R>,
    matcher: Arc<ArchiveMatcher<R>>,
    config: ArchiveConfig,
    inner: Mutex<Inner>,
}

impl<R: Repository + 'static> ArchiveScheduler<R> {
    pub fn new(
        repo: SharedRepository<R>,
        matcher: Arc<ArchiveMatcher<R>>,
        config: ArchiveConfig,
    ) -> Self {
        Self {
            repo,
            matcher,
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
            tracing::warn!("archive scheduler already running");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        tracing::info!(
            interval_minutes = self.config.interval_minutes,
            batch_size = self.config.batch_size,
            "archive scheduler started"
        );

        let mut cycle_stop = stop_rx.clone();
        let repo = self.repo.clone();
        let matcher = self.matcher.clone();
        let config = self.config.clone();
        let initial = tokio::spawn(async move {
            run_cycle(&repo, &matcher, &config, &mut cycle_stop).await;
        });

        let loop_stop = stop_rx.clone();
        let repo = self.repo.clone();
        let matcher = self.matcher.clone();
        let config = self.config.clone();
        let continuous = tokio::spawn(async move {
            continuous_loop(repo, matcher, config, loop_stop).await;
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
        tracing::info!("archive scheduler stopped");
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
                tracing::info!("manually triggered archive cycle");
                run_cycle(&self.repo, &self.matcher, &self.config, &mut stop).await;
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().running
    }
}

/// One archive cycle over the most overdue batch
///
/// Sites without a detected API URL are skipped; a failed search is
/// recorded on the site so its check timestamp still advances.
async fn run_cycle<R: Repository + 'static>(
    repo: &SharedRepository<R>,
    matcher: &ArchiveMatcher<R>,
    config: &ArchiveConfig,
    stop: &mut watch::Receiver<bool>,
) {
    let started = Instant::now();

    let batch = {
        let repo = repo.lock().await;
        match repo.due_for_archive_check(config.batch_size) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "failed to load archive batch");
                return;
            }
        }
    };

    if batch.is_empty() {
        return;
    }
    tracing::info!(count = batch.len(), "archive cycle started");

    let delay = Duration::from_secs_f64(config.item_delay_secs);
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    let last = batch.len() - 1;
    for (i, site) in batch.iter().enumerate() {
        if *stop.borrow() {
            tracing::warn!("archive cycle interrupted");
            return;
        }
        if site.api_url.is_none() {
            continue;
        }

        match matcher.collect_archives(site.id).await {
            Ok(_) => succeeded += 1,
            Err(e) => {
                tracing::error!(site_id = site.id, url = %site.url, error = %e, "archive check failed");
                if let Err(record_err) =
                    matcher.record_archive_error(site.id, &e.to_string()).await
                {
                    tracing::error!(site_id = site.id, error = %record_err, "failed to record archive error");
                }
                failed += 1;
            }
        }

        if i < last && !delay.is_zero() && pause(stop, delay).await {
            tracing::warn!("archive cycle interrupted during delay");
            return;
        }
    }

    tracing::info!(
        succeeded,
        failed,
        elapsed_secs = started.elapsed().as_secs(),
        "archive cycle done"
    );
}

/// Re-runs cycles forever, backing off while the fleet is fresh
async fn continuous_loop<R: Repository + 'static>(
    repo: SharedRepository<R>,
    matcher: Arc<ArchiveMatcher<R>>,
    config: ArchiveConfig,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        if *stop.borrow() {
            return;
        }

        let peek = {
            let repo = repo.lock().await;
            repo.oldest_archive_check()
        };

        let oldest = match peek {
            Ok(mark) => mark.flatten(),
            Err(e) => {
                tracing::error!(error = %e, "failed to peek archive backlog");
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

        run_cycle(&repo, &matcher, &config, &mut stop).await;

        if pause(&mut stop, POST_CYCLE_PAUSE).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveClient;
    use crate::config::HttpConfig;
    use crate::storage::{shared, SqliteRepository};

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let repo = shared(SqliteRepository::new_in_memory().unwrap());
        let client = Arc::new(
            ArchiveClient::new(&HttpConfig::default(), "https://archive.invalid").unwrap(),
        );
        let matcher = Arc::new(ArchiveMatcher::new(repo.clone(), client));
        let scheduler = ArchiveScheduler::new(repo, matcher, ArchiveConfig::default());

        scheduler.start();
        assert!(scheduler.is_running());
        scheduler.start();

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }
}
