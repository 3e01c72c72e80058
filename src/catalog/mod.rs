//! Catalog cache: the single authority over when the upstream site is hit.
//!
//! State machine: Empty → Fresh → Stale → (refreshing) → Fresh | FailedRefresh.
//! The snapshot lives behind one async mutex that doubles as the refresh
//! gate: a query arriving while a refresh is in flight parks on the lock and
//! then re-checks freshness, so it reads the completed refresh instead of
//! launching a second scrape against the same upstream.

pub mod filter;

use crate::error::{Error, Result};
use crate::models::{CatalogSnapshot, FilterCriteria, Shoe};
use crate::scraper::CatalogSource;
use crate::storage::SnapshotStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct CatalogService {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn SnapshotStore>,
    refresh_interval: Duration,
    snapshot: Mutex<Option<CatalogSnapshot>>,
}

impl CatalogService {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn SnapshotStore>,
        refresh_interval_secs: u64,
    ) -> Self {
        Self {
            source,
            store,
            refresh_interval: Duration::seconds(refresh_interval_secs as i64),
            snapshot: Mutex::new(None),
        }
    }

    /// Current catalog records, refreshing from the source first when the
    /// cached snapshot is missing or stale.
    pub async fn shoes(&self, cancel: &CancellationToken) -> Result<Vec<Shoe>> {
        let mut guard = self.snapshot.lock().await;

        if let Some(snap) = guard.as_ref() {
            if snap.age() <= self.refresh_interval {
                return Ok(snap.shoes.clone());
            }
        }

        self.refresh_locked(&mut guard, cancel).await
    }

    /// Records matching `criteria`, in catalog order.
    pub async fn filtered(
        &self,
        criteria: &FilterCriteria,
        cancel: &CancellationToken,
    ) -> Result<Vec<Shoe>> {
        let shoes = self.shoes(cancel).await?;
        Ok(filter::filter_shoes(&shoes, criteria))
    }

    /// Unconditional refresh, ignoring snapshot age. Returns the record count.
    pub async fn force_refresh(&self, cancel: &CancellationToken) -> Result<usize> {
        let mut guard = self.snapshot.lock().await;
        let shoes = self.refresh_locked(&mut guard, cancel).await?;
        Ok(shoes.len())
    }

    /// Cached record count and fetch time, if any snapshot is loaded.
    pub async fn status(&self) -> Option<(usize, DateTime<Utc>)> {
        let guard = self.snapshot.lock().await;
        guard.as_ref().map(|s| (s.shoes.len(), s.fetched_at))
    }

    /// Run one refresh pass while holding the gate.
    ///
    /// Success: snapshot persisted (a durable-write failure is logged, the
    /// previous durable copy stays intact) and the cache replaced wholesale.
    /// Failure: cache untouched; serve the durable snapshot if it has data,
    /// else propagate as a refresh error. Cancellation propagates directly —
    /// nothing is written and the cache keeps its stale-but-valid contents.
    async fn refresh_locked(
        &self,
        guard: &mut Option<CatalogSnapshot>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Shoe>> {
        info!("Refreshing catalog from source");

        match self.source.fetch_catalog(cancel).await {
            Ok(shoes) => {
                if let Err(e) = self.store.save(&shoes) {
                    warn!("Durable snapshot write failed: {} — serving from memory", e);
                }
                info!("Catalog refreshed: {} records", shoes.len());
                *guard = Some(CatalogSnapshot::new(shoes.clone()));
                Ok(shoes)
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!("Catalog refresh failed: {} — trying durable snapshot", e);
                let fallback = self.store.load().unwrap_or_else(|load_err| {
                    warn!("Durable snapshot unreadable: {}", load_err);
                    Vec::new()
                });

                if fallback.is_empty() {
                    Err(Error::Refresh(format!(
                        "refresh failed and no durable snapshot available: {}",
                        e
                    )))
                } else {
                    info!("Serving {} records from durable snapshot", fallback.len());
                    Ok(fallback)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PRICE_UNKNOWN;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn shoe(name: &str, price: &str) -> Shoe {
        Shoe {
            name: name.to_string(),
            image_url: String::new(),
            release_text: String::new(),
            price_text: price.to_string(),
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
        shoes: Vec<Shoe>,
    }

    #[async_trait]
    impl CatalogSource for CountingSource {
        async fn fetch_catalog(&self, _cancel: &CancellationToken) -> Result<Vec<Shoe>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.shoes.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl CatalogSource for FailingSource {
        async fn fetch_catalog(&self, _cancel: &CancellationToken) -> Result<Vec<Shoe>> {
            Err(Error::Fetch("listing page unreachable".into()))
        }
    }

    struct CancelledSource;

    #[async_trait]
    impl CatalogSource for CancelledSource {
        async fn fetch_catalog(&self, _cancel: &CancellationToken) -> Result<Vec<Shoe>> {
            Err(Error::Cancelled)
        }
    }

    struct MemStore {
        shoes: std::sync::Mutex<Vec<Shoe>>,
        saves: AtomicUsize,
    }

    impl MemStore {
        fn new(shoes: Vec<Shoe>) -> Self {
            Self {
                shoes: std::sync::Mutex::new(shoes),
                saves: AtomicUsize::new(0),
            }
        }
    }

    impl SnapshotStore for MemStore {
        fn save(&self, shoes: &[Shoe]) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.shoes.lock().unwrap() = shoes.to_vec();
            Ok(())
        }

        fn load(&self) -> Result<Vec<Shoe>> {
            Ok(self.shoes.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn second_query_within_interval_serves_from_memory() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            shoes: vec![shoe("Nike Air Max", "169,95 €")],
        });
        let service = CatalogService::new(source.clone(), Arc::new(MemStore::new(vec![])), 3600);
        let cancel = CancellationToken::new();

        let first = service.shoes(&cancel).await.unwrap();
        let second = service.shoes(&cancel).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_refresh_persists_the_snapshot() {
        let store = Arc::new(MemStore::new(vec![]));
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            shoes: vec![shoe("Adidas Samba", "119,99 €")],
        });
        let service = CatalogService::new(source, store.clone(), 3600);

        service.shoes(&CancellationToken::new()).await.unwrap();

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_falls_back_to_durable_snapshot() {
        let durable = vec![shoe("Nike Dunk Low", "-")];
        let service = CatalogService::new(
            Arc::new(FailingSource),
            Arc::new(MemStore::new(durable.clone())),
            3600,
        );

        let shoes = service.shoes(&CancellationToken::new()).await.unwrap();
        assert_eq!(shoes, durable);
    }

    #[tokio::test]
    async fn failed_refresh_with_empty_store_raises() {
        let service = CatalogService::new(
            Arc::new(FailingSource),
            Arc::new(MemStore::new(vec![])),
            3600,
        );

        let err = service.shoes(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Refresh(_)));
    }

    #[tokio::test]
    async fn cancellation_propagates_without_fallback_or_write() {
        let store = Arc::new(MemStore::new(vec![shoe("Durable", "100 €")]));
        let service = CatalogService::new(Arc::new(CancelledSource), store.clone(), 3600);

        let err = service.shoes(&CancellationToken::new()).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
        assert!(service.status().await.is_none());
    }

    #[tokio::test]
    async fn filtered_applies_criteria_to_the_cached_set() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            shoes: vec![
                shoe("Nike Air Max", "169,95 €"),
                shoe("Puma Suede", "89,99 €"),
                shoe("Nike Jordan 1", PRICE_UNKNOWN),
            ],
        });
        let service = CatalogService::new(source, Arc::new(MemStore::new(vec![])), 3600);

        let hits = service
            .filtered(&FilterCriteria::by_brand("nike"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn force_refresh_ignores_a_fresh_snapshot() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            shoes: vec![shoe("New Balance 550", "139,99 €")],
        });
        let service = CatalogService::new(source.clone(), Arc::new(MemStore::new(vec![])), 3600);
        let cancel = CancellationToken::new();

        tokio_test::block_on(async {
            service.shoes(&cancel).await.unwrap();
            let n = service.force_refresh(&cancel).await.unwrap();
            assert_eq!(n, 1);
        });

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
