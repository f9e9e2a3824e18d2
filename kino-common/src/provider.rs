use async_trait::async_trait;

use crate::error::ScrapeError;
use crate::screening::Screening;

/// A source of screenings, usually one cinema website.
///
/// The sync loop never calls `scrape` on the same instance concurrently.
/// Implementations should not panic on malformed remote data; they return
/// what they could read as [`ScrapeError::Partial`] or fail outright.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable, human-readable source name used in logs
    fn name(&self) -> &str;

    async fn scrape(&self) -> Result<Vec<Screening>, ScrapeError>;
}
