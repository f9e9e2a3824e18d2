use async_trait::async_trait;

use crate::error::StorageError;
use crate::filter::Filter;
use crate::screening::Screening;

/// Screening store keyed by [`crate::ScreeningId`].
///
/// Implementations must let readers run concurrently, serialize writers,
/// and never expose a partially written record.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert or replace a screening.
    ///
    /// A record with the same ID is replaced unless it was updated strictly
    /// later than the incoming one, in which case [`StorageError::StaleWrite`]
    /// is returned and nothing changes.
    async fn upsert(&self, screening: Screening) -> Result<(), StorageError>;

    /// All screenings accepted by every filter, ordered by start, then
    /// cinema, then title.
    async fn fetch(&self, filters: &[Filter]) -> Result<Vec<Screening>, StorageError>;

    /// Number of stored screenings
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
