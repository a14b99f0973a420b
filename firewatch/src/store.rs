use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::classify::classify;
use crate::errors::Result;
use crate::model::{ClassifiedReading, Reading};
use crate::validate::SensorInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// The backing key-value store: one overwritable `current` slot plus an
/// append-only, timestamp-ordered `history` sequence. Each operation is
/// atomic on its own key; cross-key consistency is the store façade's job.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn set_current(&self, reading: ClassifiedReading) -> Result<()>;
    async fn get_current(&self) -> Result<Option<ClassifiedReading>>;
    async fn append_history(&self, reading: ClassifiedReading) -> Result<()>;
    /// The most recent `limit` entries, newest first.
    async fn last_n(&self, limit: usize) -> Result<Vec<ClassifiedReading>>;
    /// Clears history, returning the number of removed entries.
    async fn delete_history(&self) -> Result<u64>;
    /// Removes entries with `ts <= cutoff` (inclusive), returning the count.
    async fn delete_history_older_than(&self, cutoff: i64) -> Result<u64>;
}

/// Owns the current-value cache and bounded-query history on top of a
/// backend, and performs classification at ingest time.
#[derive(Clone)]
pub struct TelemetryStore {
    backend: Arc<dyn StoreBackend>,
}

impl TelemetryStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Stamps, classifies and persists one sample.
    ///
    /// The history entry is written before the current slot: a reader that
    /// observes the new current value is then guaranteed a matching history
    /// row. Any backend failure aborts the ingest and is surfaced.
    pub async fn ingest(&self, input: SensorInput, now: i64) -> Result<ClassifiedReading> {
        let reading = Reading {
            smoke: input.smoke,
            temperature: input.temperature,
            humidity: input.humidity,
            timestamp: now,
        };
        let classified = ClassifiedReading {
            reading,
            status: classify(&reading),
        };
        self.backend.append_history(classified).await?;
        self.backend.set_current(classified).await?;
        Ok(classified)
    }

    pub async fn current(&self) -> Result<Option<ClassifiedReading>> {
        self.backend.get_current().await
    }

    /// At most `limit` most-recent entries, reordered service-side so no
    /// client ever has to re-sort.
    pub async fn history(&self, limit: usize, order: Order) -> Result<Vec<ClassifiedReading>> {
        let mut items = self.backend.last_n(limit).await?;
        if order == Order::Ascending {
            items.reverse();
        }
        Ok(items)
    }

    /// Clears history. The current slot keeps the last-known value until the
    /// next ingest.
    pub async fn delete_history(&self) -> Result<u64> {
        self.backend.delete_history().await
    }

    pub async fn delete_history_older_than(&self, cutoff: i64) -> Result<u64> {
        self.backend.delete_history_older_than(cutoff).await
    }
}

/// In-memory backend with the same per-key atomicity as the real store.
/// Serves tests and `DATABASE_URL=memory` deployments.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    current: Option<ClassifiedReading>,
    history: Vec<ClassifiedReading>,
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn set_current(&self, reading: ClassifiedReading) -> Result<()> {
        self.inner.lock().unwrap().current = Some(reading);
        Ok(())
    }

    async fn get_current(&self) -> Result<Option<ClassifiedReading>> {
        Ok(self.inner.lock().unwrap().current)
    }

    async fn append_history(&self, reading: ClassifiedReading) -> Result<()> {
        self.inner.lock().unwrap().history.push(reading);
        Ok(())
    }

    async fn last_n(&self, limit: usize) -> Result<Vec<ClassifiedReading>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.history.iter().rev().take(limit).copied().collect())
    }

    async fn delete_history(&self) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let removed = inner.history.len() as u64;
        inner.history.clear();
        Ok(removed)
    }

    async fn delete_history_older_than(&self, cutoff: i64) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.history.len();
        inner.history.retain(|r| r.reading.timestamp > cutoff);
        Ok((before - inner.history.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn store() -> TelemetryStore {
        TelemetryStore::new(Arc::new(MemoryBackend::default()))
    }

    fn input(smoke: i64, temperature: f64, humidity: f64) -> SensorInput {
        SensorInput {
            smoke,
            temperature,
            humidity,
        }
    }

    #[test]
    fn ingest_updates_current_and_history() {
        tokio_test::block_on(async {
            let store = store();
            let classified = store.ingest(input(50, 25.0, 40.0), 1_000).await.unwrap();
            assert_eq!(classified.status, Status::Safe);
            assert_eq!(classified.reading.timestamp, 1_000);

            let current = store.current().await.unwrap().unwrap();
            assert_eq!(current, classified);

            let latest = store.history(1, Order::Descending).await.unwrap();
            assert_eq!(latest, vec![classified]);
        });
    }

    #[test]
    fn current_is_absent_before_first_ingest() {
        tokio_test::block_on(async {
            assert!(store().current().await.unwrap().is_none());
        });
    }

    #[test]
    fn stored_status_matches_fresh_classification() {
        tokio_test::block_on(async {
            let store = store();
            store.ingest(input(400, 25.0, 40.0), 1_000).await.unwrap();
            let current = store.current().await.unwrap().unwrap();
            assert_eq!(current.status, classify(&current.reading));
        });
    }

    #[test]
    fn danger_sample_ranks_first_in_recent_history() {
        tokio_test::block_on(async {
            let store = store();
            store.ingest(input(50, 25.0, 40.0), 1_000).await.unwrap();
            store.ingest(input(400, 25.0, 40.0), 1_010).await.unwrap();

            let current = store.current().await.unwrap().unwrap();
            assert_eq!(current.status, Status::Danger);

            let recent = store.history(2, Order::Descending).await.unwrap();
            assert_eq!(recent.len(), 2);
            assert_eq!(recent[0].status, Status::Danger);
            assert_eq!(recent[1].status, Status::Safe);
        });
    }

    #[test]
    fn history_orders_are_exact_reverses() {
        tokio_test::block_on(async {
            let store = store();
            for (i, smoke) in [10, 20, 30].into_iter().enumerate() {
                store
                    .ingest(input(smoke, 25.0, 40.0), 1_000 + i as i64)
                    .await
                    .unwrap();
            }

            let desc = store.history(10, Order::Descending).await.unwrap();
            let asc = store.history(10, Order::Ascending).await.unwrap();

            let mut reversed = desc.clone();
            reversed.reverse();
            assert_eq!(asc, reversed);
            assert_eq!(desc[0].reading.smoke, 30);
            assert_eq!(asc[0].reading.smoke, 10);
        });
    }

    #[test]
    fn history_limit_beyond_available_returns_what_exists() {
        tokio_test::block_on(async {
            let store = store();
            store.ingest(input(10, 25.0, 40.0), 1_000).await.unwrap();
            store.ingest(input(20, 25.0, 40.0), 1_001).await.unwrap();

            let items = store.history(20, Order::Descending).await.unwrap();
            assert_eq!(items.len(), 2);
        });
    }

    #[test]
    fn delete_history_reports_count_and_keeps_current() {
        tokio_test::block_on(async {
            let store = store();
            for i in 0..3 {
                store.ingest(input(10, 25.0, 40.0), 1_000 + i).await.unwrap();
            }

            assert_eq!(store.delete_history().await.unwrap(), 3);
            assert!(store.history(20, Order::Descending).await.unwrap().is_empty());
            // last-known current survives a full wipe
            assert!(store.current().await.unwrap().is_some());
        });
    }

    #[test]
    fn delete_older_than_cutoff_is_inclusive() {
        tokio_test::block_on(async {
            let store = store();
            for ts in [10, 20, 30] {
                store.ingest(input(10, 25.0, 40.0), ts).await.unwrap();
            }

            assert_eq!(store.delete_history_older_than(20).await.unwrap(), 2);
            let remaining = store.history(20, Order::Descending).await.unwrap();
            assert_eq!(remaining.len(), 1);
            assert_eq!(remaining[0].reading.timestamp, 30);
        });
    }
}
