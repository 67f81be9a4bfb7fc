//! RemoteCollectionStore: the single source of truth for backend-derived
//! collections. One slot per collection; a slot owns its cache, its last
//! error, and a fetch mutex that serializes network loads so concurrent
//! callers share one request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use crate::api::{normalize_items, Backend};
use crate::config::{Config, FieldConvention};
use crate::error::ApiError;
use crate::models::adapt_keys;

/// Every named collection the backend serves, including the aggregate
/// endpoints, which the store treats as one-record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Donors,
    Donations,
    Personnel,
    Schedules,
    Payments,
    GiftTypes,
    GiftDistributions,
    StatsSummary,
    StatsMonthly,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Donors,
        Collection::Donations,
        Collection::Personnel,
        Collection::Schedules,
        Collection::Payments,
        Collection::GiftTypes,
        Collection::GiftDistributions,
        Collection::StatsSummary,
        Collection::StatsMonthly,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Collection::Donors => "/donors",
            Collection::Donations => "/donations",
            Collection::Personnel => "/personnel",
            Collection::Schedules => "/schedules",
            Collection::Payments => "/payments",
            Collection::GiftTypes => "/gift-types",
            Collection::GiftDistributions => "/gift-distributions",
            Collection::StatsSummary => "/stats/summary",
            Collection::StatsMonthly => "/stats/monthly",
        }
    }

    /// The aggregate endpoints are read-only projections.
    pub fn is_writable(&self) -> bool {
        !matches!(self, Collection::StatsSummary | Collection::StatsMonthly)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

/// Ties a canonical record type to the collection it lives in, so callers
/// can write `store.load_all::<Donor>()`.
pub trait Record: DeserializeOwned {
    const COLLECTION: Collection;
}

#[derive(Default)]
struct SlotState {
    cached: Option<Arc<Vec<Value>>>,
    last_error: Option<ApiError>,
}

struct Slot {
    state: StdMutex<SlotState>,
    /// Serializes fetches for this collection only; holding it across the
    /// request is what deduplicates concurrent loads.
    fetch: AsyncMutex<()>,
}

impl Slot {
    fn new() -> Slot {
        Slot {
            state: StdMutex::new(SlotState::default()),
            fetch: AsyncMutex::new(()),
        }
    }
}

pub struct RemoteStore<B> {
    backend: B,
    slots: HashMap<Collection, Slot>,
    page_size: Option<u32>,
    field_convention: FieldConvention,
}

impl<B: Backend> RemoteStore<B> {
    pub fn new(backend: B, config: &Config) -> RemoteStore<B> {
        let slots = Collection::ALL
            .into_iter()
            .map(|c| (c, Slot::new()))
            .collect();
        RemoteStore {
            backend,
            slots,
            page_size: config.page_size,
            field_convention: config.field_convention,
        }
    }

    /// Direct access to the transport, mainly for instrumented test doubles.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn slot(&self, collection: Collection) -> &Slot {
        // The map is keyed by every Collection variant at construction.
        self.slots.get(&collection).expect("slot for collection")
    }

    /// Load a collection, reusing the cache when it is warm. Concurrent
    /// callers for the same collection issue exactly one request; callers
    /// for other collections are unaffected.
    pub async fn load(&self, collection: Collection) -> Result<Arc<Vec<Value>>, ApiError> {
        let slot = self.slot(collection);
        let _fetch = slot.fetch.lock().await;

        if let Some(cached) = slot.state.lock().expect("slot state").cached.clone() {
            return Ok(cached);
        }
        self.fetch_into(slot, collection).await
    }

    // Perform the GET and record its outcome. The caller must hold the
    // slot's fetch lock.
    async fn fetch_into(
        &self,
        slot: &Slot,
        collection: Collection,
    ) -> Result<Arc<Vec<Value>>, ApiError> {
        tracing::debug!("loading collection {}", collection);
        let mut params: Vec<(String, String)> = Vec::new();
        if let Some(limit) = self.page_size {
            params.push(("limit".to_string(), limit.to_string()));
        }

        match self.backend.get(collection.path(), &params).await {
            Ok(value) => {
                let records = Arc::new(normalize_items(value));
                let mut state = slot.state.lock().expect("slot state");
                state.cached = Some(records.clone());
                state.last_error = None;
                Ok(records)
            }
            Err(err) => {
                tracing::error!("failed to load {}: {}", collection, err);
                // Keep any previously cached data; only record the failure.
                slot.state.lock().expect("slot state").last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Load and decode into canonical records. Records that fail to decode
    /// are skipped with a warning rather than poisoning the whole list.
    pub async fn load_all<T: Record>(&self) -> Result<Vec<T>, ApiError> {
        let raw = self.load(T::COLLECTION).await?;
        Ok(decode_records(T::COLLECTION, &raw))
    }

    /// Synchronous read of whatever is cached right now. Never touches the
    /// network, even mid-load.
    pub fn get_cached(&self, collection: Collection) -> Option<Arc<Vec<Value>>> {
        self.slot(collection)
            .state
            .lock()
            .expect("slot state")
            .cached
            .clone()
    }

    /// Typed variant of [`get_cached`].
    pub fn get_cached_all<T: Record>(&self) -> Option<Vec<T>> {
        self.get_cached(T::COLLECTION)
            .map(|raw| decode_records(T::COLLECTION, &raw))
    }

    /// True while a fetch for this collection is in flight, for spinner
    /// affordances. Other collections are unaffected.
    pub fn is_loading(&self, collection: Collection) -> bool {
        self.slot(collection).fetch.try_lock().is_err()
    }

    /// The error recorded by the most recent failed operation, for retry
    /// affordances. Cleared by the next successful load.
    pub fn last_error(&self, collection: Collection) -> Option<ApiError> {
        self.slot(collection)
            .state
            .lock()
            .expect("slot state")
            .last_error
            .clone()
    }

    /// Drop the cache entry so the next load refetches.
    pub fn invalidate(&self, collection: Collection) {
        self.slot(collection).state.lock().expect("slot state").cached = None;
    }

    /// Refetch even when the cache is warm. On failure the previous entry
    /// stays readable and the error is recorded.
    pub async fn force_refresh(&self, collection: Collection) -> Result<Arc<Vec<Value>>, ApiError> {
        let slot = self.slot(collection);
        let _fetch = slot.fetch.lock().await;
        self.fetch_into(slot, collection).await
    }

    /// Refresh every collection that is currently cached. Used by polling.
    /// A failing collection does not stop the others from refreshing; the
    /// first failure is reported after all have been attempted.
    pub async fn refresh_cached(&self) -> Result<(), ApiError> {
        let mut first_failure = None;
        for collection in Collection::ALL {
            if self.get_cached(collection).is_some() {
                if let Err(err) = self.force_refresh(collection).await {
                    first_failure.get_or_insert(err);
                }
            }
        }
        match first_failure {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// POST a new record. On success the collection is invalidated so the
    /// next view refetches; the created record (with its server-assigned id)
    /// is returned. Server errors pass through verbatim.
    pub async fn create(&self, collection: Collection, record: Value) -> Result<Value, ApiError> {
        self.check_writable(collection)?;
        let payload = adapt_keys(record, self.field_convention);
        let created = self.backend.post(collection.path(), &payload).await?;
        self.invalidate(collection);
        self.invalidate_stats();
        Ok(created)
    }

    /// PUT an update to one record by id. Same contract as [`create`].
    pub async fn update(
        &self,
        collection: Collection,
        id: i64,
        record: Value,
    ) -> Result<Value, ApiError> {
        self.check_writable(collection)?;
        let payload = adapt_keys(record, self.field_convention);
        let updated = self.backend.put(collection.path(), id, &payload).await?;
        self.invalidate(collection);
        self.invalidate_stats();
        Ok(updated)
    }

    /// DELETE one record by id. On failure the cached record stays visible.
    pub async fn delete(&self, collection: Collection, id: i64) -> Result<(), ApiError> {
        self.check_writable(collection)?;
        self.backend.delete(collection.path(), id).await?;
        self.invalidate(collection);
        self.invalidate_stats();
        Ok(())
    }

    fn check_writable(&self, collection: Collection) -> Result<(), ApiError> {
        if collection.is_writable() {
            Ok(())
        } else {
            Err(ApiError::Config(format!("{} is read-only", collection)))
        }
    }

    /// Mutations change the aggregate projections too.
    fn invalidate_stats(&self) {
        self.invalidate(Collection::StatsSummary);
        self.invalidate(Collection::StatsMonthly);
    }
}

fn decode_records<T: Record>(collection: Collection, raw: &[Value]) -> Vec<T> {
    raw.iter()
        .filter_map(|value| match serde_json::from_value::<T>(value.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("skipping malformed {} record: {}", collection, e);
                None
            }
        })
        .collect()
}
