//! Error types shared across the aggregation service

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::screening::{Screening, ScreeningId};

/// Errors returned by [`crate::Storage`] implementations
#[derive(Debug, Error)]
pub enum StorageError {
    /// The incoming record is older than the one already stored
    #[error("stale write for screening {id}: stored record updated at {stored}, incoming at {incoming}")]
    StaleWrite {
        id: ScreeningId,
        stored: DateTime<Utc>,
        incoming: DateTime<Utc>,
    },
}

/// Errors returned by a single provider scrape
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// The scrape broke off, but the records read before that are usable
    #[error("scrape incomplete after {} screenings: {reason}", .partial.len())]
    Partial {
        partial: Vec<Screening>,
        reason: String,
    },

    #[error("scrape timed out after {0}s")]
    TimedOut(u64),

    #[error("scrape cancelled")]
    Cancelled,
}

impl ScrapeError {
    /// Records that are still valid to store despite the error
    pub fn into_partial(self) -> Vec<Screening> {
        match self {
            ScrapeError::Partial { partial, .. } => partial,
            _ => Vec::new(),
        }
    }
}

/// Errors surfaced by the application layer to its callers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage not configured")]
    StorageNotConfigured,

    #[error("no providers configured")]
    NoProviders,

    #[error("background sync already running")]
    AlreadyRunning,

    #[error("sync cancelled")]
    Cancelled,

    #[error("fetching screenings: {0}")]
    Storage(#[from] StorageError),
}
