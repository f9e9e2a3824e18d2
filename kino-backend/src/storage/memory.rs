use async_trait::async_trait;
use kino_common::{Filter, Screening, ScreeningId, Storage, StorageError, filter::matches_all};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory screening store.
///
/// Readers share the lock; an upsert holds it exclusively only for the
/// freshness check and the swap, so no reader sees a half-written record.
#[derive(Default)]
pub struct MemoryStorage {
    screenings: RwLock<HashMap<ScreeningId, Screening>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upsert(&self, screening: Screening) -> Result<(), StorageError> {
        let mut screenings = self.screenings.write().await;

        if let Some(current) = screenings.get(screening.id()) {
            if current.updated_at > screening.updated_at {
                return Err(StorageError::StaleWrite {
                    id: screening.id().clone(),
                    stored: current.updated_at,
                    incoming: screening.updated_at,
                });
            }
        }

        screenings.insert(screening.id().clone(), screening);
        Ok(())
    }

    async fn fetch(&self, filters: &[Filter]) -> Result<Vec<Screening>, StorageError> {
        let mut result: Vec<Screening> = {
            let screenings = self.screenings.read().await;
            screenings
                .values()
                .filter(|s| matches_all(filters, s))
                .cloned()
                .collect()
        };

        // Map order is random; sort by start, cinema, title. The ID only
        // breaks ties between records that agree on all three.
        result.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.cinema.cmp(&b.cinema))
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.id().cmp(b.id()))
        });

        Ok(result)
    }

    async fn len(&self) -> usize {
        self.screenings.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
    use kino_common::filter::{cinema_filter, date_filter};
    use std::collections::HashSet;

    fn start(day: u32, hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2099, 6, day, hour, 0, 0)
            .unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2099, 5, 1, 12, 0, 0).unwrap()
    }

    fn ids(screenings: &[Screening]) -> HashSet<ScreeningId> {
        screenings.iter().map(|s| s.id().clone()).collect()
    }

    #[tokio::test]
    async fn test_upsert_inserts_and_replaces_newer() {
        let storage = MemoryStorage::new();
        let first = Screening::new("Paris, Texas", start(1, 20), "Delphi", "").with_updated_at(t0());
        storage.upsert(first.clone()).await.unwrap();

        for step in 1..=3 {
            let newer = first
                .clone()
                .with_description(format!("revision {step}"))
                .with_updated_at(t0() + Duration::seconds(step));
            storage.upsert(newer).await.unwrap();

            let stored = storage.fetch(&[]).await.unwrap();
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].description, format!("revision {step}"));
        }
    }

    #[tokio::test]
    async fn test_upsert_equal_timestamp_replaces() {
        let storage = MemoryStorage::new();
        let first = Screening::new("Paris, Texas", start(1, 20), "Delphi", "").with_updated_at(t0());
        storage.upsert(first.clone()).await.unwrap();

        storage
            .upsert(first.with_description("same moment, new payload"))
            .await
            .unwrap();

        let stored = storage.fetch(&[]).await.unwrap();
        assert_eq!(stored[0].description, "same moment, new payload");
    }

    #[tokio::test]
    async fn test_stale_write_scenario() {
        let storage = MemoryStorage::new();
        let original = Screening::new("Paris, Texas", start(1, 20), "Delphi", "").with_updated_at(t0());
        storage.upsert(original.clone()).await.unwrap();

        // Older record for the same ID is rejected and leaves the store alone.
        let older = original
            .clone()
            .with_description("outdated")
            .with_updated_at(t0() - Duration::seconds(1));
        let err = storage.upsert(older).await.unwrap_err();
        assert!(matches!(err, StorageError::StaleWrite { .. }));
        assert_eq!(storage.fetch(&[]).await.unwrap(), vec![original.clone()]);

        // Newer record keyed on the original identity replaces the payload.
        let mut renamed = original.clone().with_updated_at(t0() + Duration::seconds(1));
        renamed.title = "Paris, Texas (4K)".to_string();
        storage.upsert(renamed).await.unwrap();

        let stored = storage.fetch(&[]).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id(), original.id());
        assert_eq!(stored[0].title, "Paris, Texas (4K)");
    }

    #[tokio::test]
    async fn test_fetch_order() {
        let storage = MemoryStorage::new();
        let records = [
            Screening::new("Zama", start(1, 20), "Delphi", ""),
            Screening::new("Alien", start(1, 20), "Delphi", ""),
            Screening::new("Alien", start(1, 20), "Babylon", ""),
            Screening::new("Zama", start(1, 18), "Zoo Palast", ""),
            Screening::new("Alien", start(2, 10), "Arsenal", ""),
        ];
        for record in records {
            storage.upsert(record).await.unwrap();
        }

        let fetched: Vec<(String, String)> = storage
            .fetch(&[])
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.cinema, s.title))
            .collect();

        assert_eq!(
            fetched,
            vec![
                ("Zoo Palast".to_string(), "Zama".to_string()),
                ("Babylon".to_string(), "Alien".to_string()),
                ("Delphi".to_string(), "Alien".to_string()),
                ("Delphi".to_string(), "Zama".to_string()),
                ("Arsenal".to_string(), "Alien".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_is_deterministic() {
        let storage = MemoryStorage::new();
        for i in 0..50 {
            let language = if i % 2 == 0 { "de" } else { "en" };
            storage
                .upsert(Screening::new("Same Title", start(1, 20), "Same Cinema", format!("{language}{i}")))
                .await
                .unwrap();
        }

        let first = storage.fetch(&[]).await.unwrap();
        let second = storage.fetch(&[]).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_filter_composition_is_intersection() {
        let storage = MemoryStorage::new();
        for (title, day, cinema) in [
            ("Alien", 1, "Delphi"),
            ("Zama", 1, "Babylon"),
            ("Heat", 2, "Delphi"),
            ("Ran", 2, "Babylon"),
        ] {
            storage.upsert(Screening::new(title, start(day, 20), cinema, "")).await.unwrap();
        }

        let day = chrono::NaiveDate::from_ymd_opt(2099, 6, 1).unwrap();
        let by_date = ids(&storage.fetch(&[date_filter(day)]).await.unwrap());
        let by_cinema = ids(&storage.fetch(&[cinema_filter("Delphi")]).await.unwrap());
        let both = ids(&storage
            .fetch(&[date_filter(day), cinema_filter("Delphi")])
            .await
            .unwrap());

        let expected: HashSet<ScreeningId> = by_date.intersection(&by_cinema).cloned().collect();
        assert_eq!(both, expected);
        assert_eq!(both.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_readers_and_writer() {
        let storage = std::sync::Arc::new(MemoryStorage::new());

        let writer = {
            let storage = storage.clone();
            tokio::spawn(async move {
                for i in 0..100u32 {
                    let screening = Screening::new(format!("Film {i}"), start(1 + i % 20, 20), "Delphi", "");
                    storage.upsert(screening).await.unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    for _ in 0..20 {
                        for s in storage.fetch(&[]).await.unwrap() {
                            assert!(s.identity_matches());
                        }
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(storage.len().await, 100);
    }
}
