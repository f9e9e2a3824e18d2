//! Background sync - pulls screenings from all providers into the store
use kino_common::{AppError, Provider, ScrapeError, Storage};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::App;

/// Lifecycle of the background sync task
pub(super) enum SyncState {
    Idle,
    Running {
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    },
}

/// A provider that could not be synced during a pass
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

/// Outcome of one sync pass over all providers
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub providers_attempted: usize,
    pub failed_providers: Vec<ProviderFailure>,
    pub upserted: usize,
    pub rejected: usize,
    pub duration_seconds: f64,
}

impl SyncReport {
    fn log(&self) {
        info!(
            "✓ Sync completed: {} providers ({} failed), {} upserted, {} rejected, {:.2}s",
            self.providers_attempted,
            self.failed_providers.len(),
            self.upserted,
            self.rejected,
            self.duration_seconds
        );

        for failure in &self.failed_providers {
            warn!("Provider {:?} failed: {}", failure.provider, failure.error);
        }
    }
}

impl App {
    /// Start the periodic sync task.
    ///
    /// Runs one pass right away, then one every `sync_interval` until
    /// stopped. Does nothing when the interval is zero.
    pub async fn start_background_sync(self: &Arc<Self>) -> Result<(), AppError> {
        if self.config.sync_interval.is_zero() {
            debug!("Background sync disabled");
            return Ok(());
        }

        let mut state = self.sync_state.lock().await;
        if matches!(*state, SyncState::Running { .. }) {
            return Err(AppError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).sync_loop(cancel.clone()));
        *state = SyncState::Running { cancel, handle };

        Ok(())
    }

    /// Stop the periodic sync task and wait for it to exit.
    pub async fn stop_background_sync(&self) {
        let mut state = self.sync_state.lock().await;

        let SyncState::Running { cancel, handle } = std::mem::replace(&mut *state, SyncState::Idle)
        else {
            return;
        };

        cancel.cancel();
        if let Err(e) = handle.await {
            error!("Background sync task failed to join: {}", e);
        }

        info!("Background sync stopped");
    }

    pub async fn is_syncing(&self) -> bool {
        matches!(*self.sync_state.lock().await, SyncState::Running { .. })
    }

    /// Run one pass over all providers and wait for it to finish.
    pub async fn sync_now(&self) -> Result<SyncReport, AppError> {
        self.sync_from_providers(&CancellationToken::new()).await
    }

    async fn sync_loop(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.config.sync_interval;
        info!("Starting background sync (interval: {:?})", period);

        self.run_pass(&cancel).await;

        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    info!("Running scheduled sync");
                    self.run_pass(&cancel).await;
                }
            }
        }
    }

    async fn run_pass(&self, cancel: &CancellationToken) {
        match self.sync_from_providers(cancel).await {
            Ok(report) => report.log(),
            Err(AppError::Cancelled) => info!("Sync pass cancelled"),
            Err(e) => error!("✗ Background sync failed: {}", e),
        }
    }

    pub(super) async fn sync_from_providers(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, AppError> {
        let storage = self.storage()?;
        if self.providers.is_empty() {
            return Err(AppError::NoProviders);
        }

        // One pass at a time; providers are never scraped concurrently.
        let _pass = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            guard = self.pass_lock.lock() => guard,
        };

        let started = Instant::now();
        let mut report = SyncReport::default();

        for provider in &self.providers {
            report.providers_attempted += 1;

            match self
                .sync_from_provider(storage.as_ref(), provider.as_ref(), cancel, &mut report)
                .await
            {
                Ok(()) => {}
                Err(ScrapeError::Cancelled) => return Err(AppError::Cancelled),
                Err(e) => {
                    warn!("Failed to sync from provider {:?}: {}", provider.name(), e);
                    report.failed_providers.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.duration_seconds = started.elapsed().as_secs_f64();

        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save(storage.as_ref()).await {
                warn!("Failed to save snapshot to {:?}: {:#}", snapshot.path(), e);
            }
        }

        Ok(report)
    }

    async fn sync_from_provider(
        &self,
        storage: &dyn Storage,
        provider: &dyn Provider,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> Result<(), ScrapeError> {
        info!("Start scraping {:?}", provider.name());

        let timeout = self.config.scrape_timeout;
        let scraped = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            result = tokio::time::timeout(timeout, provider.scrape()) => result,
        };

        // Records from a partial scrape are still stored; the failure is
        // reported once they are in.
        let (screenings, failure) = match scraped {
            Ok(Ok(screenings)) => (screenings, None),
            Ok(Err(e @ ScrapeError::Partial { .. })) => {
                let message = e.to_string();
                (e.into_partial(), Some(message))
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(ScrapeError::TimedOut(timeout.as_secs())),
        };

        for mut screening in screenings {
            if cancel.is_cancelled() {
                return Err(ScrapeError::Cancelled);
            }

            if !screening.identity_matches() {
                warn!(
                    "Screening {:?} from {:?} has a mismatched ID, re-keying",
                    screening.title,
                    provider.name()
                );
                screening.reidentify();
            }

            let id = screening.id().clone();
            match storage.upsert(screening).await {
                Ok(()) => report.upserted += 1,
                Err(e) => {
                    report.rejected += 1;
                    warn!("Failed to upsert screening {}: {}", id, e);
                }
            }
        }

        info!("Finished scraping {:?}", provider.name());

        match failure {
            Some(message) => Err(ScrapeError::Failed(anyhow::anyhow!(message))),
            None => Ok(()),
        }
    }
}
