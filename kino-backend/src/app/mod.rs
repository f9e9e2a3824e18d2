//! Application layer
//!
//! `App` owns the screening store and the providers. It runs the background
//! sync (see `sync.rs`) and answers the queries of the delivery layer.

mod sync;
pub use sync::{ProviderFailure, SyncReport};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use kino_common::filter::expired_screening_filter;
use kino_common::{AppError, Filter, Provider, Screening, Storage};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::storage::SnapshotCache;
use sync::SyncState;

/// Settings the application layer needs from the process configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interval between automatic syncs. Zero disables background syncing.
    pub sync_interval: Duration,

    /// Upper bound for a single provider scrape
    pub scrape_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30 * 60),
            scrape_timeout: Duration::from_secs(300),
        }
    }
}

pub struct App {
    storage: Option<Arc<dyn Storage>>,
    providers: Vec<Box<dyn Provider>>,
    snapshot: Option<SnapshotCache>,
    config: AppConfig,

    // sync management
    sync_state: Mutex<SyncState>,
    pass_lock: Mutex<()>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            storage: None,
            providers: Vec::new(),
            snapshot: None,
            config,
            sync_state: Mutex::new(SyncState::Idle),
            pass_lock: Mutex::new(()),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Add a provider. Providers are scraped in the order they were added.
    pub fn with_provider(mut self, provider: Box<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_providers(mut self, providers: impl IntoIterator<Item = Box<dyn Provider>>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Save the store to `snapshot` after every completed sync pass.
    pub fn with_snapshot(mut self, snapshot: SnapshotCache) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    fn storage(&self) -> Result<&Arc<dyn Storage>, AppError> {
        self.storage.as_ref().ok_or(AppError::StorageNotConfigured)
    }

    pub async fn fetch_screenings(&self, filters: &[Filter]) -> Result<Vec<Screening>, AppError> {
        let storage = self.storage()?;
        Ok(storage.fetch(filters).await?)
    }

    /// Names of all cinemas with upcoming screenings, sorted
    pub async fn get_available_cinemas(&self) -> Result<Vec<String>, AppError> {
        let screenings = self.fetch_screenings(&[expired_screening_filter()]).await?;

        let cinemas: BTreeSet<String> = screenings
            .into_iter()
            .map(|s| s.cinema)
            .filter(|cinema| !cinema.is_empty())
            .collect();

        Ok(cinemas.into_iter().collect())
    }

    /// Days with upcoming screenings as midnight UTC, oldest first.
    ///
    /// The day is the UTC calendar day of the start instant.
    pub async fn get_available_dates(&self) -> Result<Vec<DateTime<Utc>>, AppError> {
        let screenings = self.fetch_screenings(&[expired_screening_filter()]).await?;

        let days: BTreeSet<NaiveDate> = screenings
            .iter()
            .map(|s| s.start.with_timezone(&Utc).date_naive())
            .collect();

        Ok(days
            .into_iter()
            .map(|day| day.and_time(NaiveTime::MIN).and_utc())
            .collect())
    }
}
