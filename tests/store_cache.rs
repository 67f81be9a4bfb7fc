//! Cache behavior of [`RemoteStore`] against an instrumented fake transport:
//! request dedup, invalidation after writes, and error retention.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use donorhub::{
    ApiError, AuthMode, Backend, Collection, Config, FieldConvention, RemoteStore,
};

fn test_config() -> Config {
    Config {
        base_url: "http://fake".to_string(),
        api_path: "/api/v1".to_string(),
        auth: AuthMode::None,
        page_size: None,
        auto_refresh_secs: 0,
        demo_mode: false,
        field_convention: FieldConvention::Uppercase,
    }
}

/// Counts GETs per path and can be told to fail, while serving a fixed
/// payload from a mutable table.
struct CountingBackend {
    gets: AtomicUsize,
    responses: Mutex<Value>,
    fail_gets: AtomicUsize,
}

impl CountingBackend {
    fn serving(payload: Value) -> CountingBackend {
        CountingBackend {
            gets: AtomicUsize::new(0),
            responses: Mutex::new(payload),
            fail_gets: AtomicUsize::new(0),
        }
    }

    fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    fn fail_next_gets(&self, n: usize) {
        self.fail_gets.store(n, Ordering::SeqCst);
    }

    fn set_payload(&self, payload: Value) {
        *self.responses.lock().unwrap() = payload;
    }
}

impl Backend for CountingBackend {
    async fn get(&self, _path: &str, _params: &[(String, String)]) -> Result<Value, ApiError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        // Hold the GET long enough for a second caller to pile up behind it.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let remaining = self.fail_gets.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_gets.store(remaining - 1, Ordering::SeqCst);
            return Err(ApiError::Network("connection reset".to_string()));
        }
        Ok(self.responses.lock().unwrap().clone())
    }

    async fn post(&self, _path: &str, body: &Value) -> Result<Value, ApiError> {
        let mut created = body.clone();
        created["DONOR_ID"] = json!(99);
        Ok(created)
    }

    async fn put(&self, _path: &str, _id: i64, body: &Value) -> Result<Value, ApiError> {
        Ok(body.clone())
    }

    async fn delete(&self, _path: &str, _id: i64) -> Result<(), ApiError> {
        Ok(())
    }
}

#[tokio::test]
async fn concurrent_loads_share_one_request() {
    let backend = CountingBackend::serving(json!([{"DONOR_ID": 1}, {"DONOR_ID": 2}]));
    let store = RemoteStore::new(backend, &test_config());

    let (a, b) = tokio::join!(
        store.load(Collection::Donors),
        store.load(Collection::Donors),
    );
    assert_eq!(a.unwrap().len(), 2);
    assert_eq!(b.unwrap().len(), 2);
    assert_eq!(store.backend().get_count(), 1);

    // A third call after completion is served from cache, no new request.
    let c = store.load(Collection::Donors).await.unwrap();
    assert_eq!(c.len(), 2);
    assert_eq!(store.backend().get_count(), 1);
}

#[tokio::test]
async fn distinct_collections_do_not_share_requests() {
    let backend = CountingBackend::serving(json!([]));
    let store = RemoteStore::new(backend, &test_config());

    let (a, b) = tokio::join!(
        store.load(Collection::Donors),
        store.load(Collection::Donations),
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(store.backend().get_count(), 2);
}

#[tokio::test]
async fn create_invalidates_and_next_load_refetches() {
    let backend = CountingBackend::serving(json!([{"DONOR_ID": 1}]));
    let store = RemoteStore::new(backend, &test_config());

    assert_eq!(store.load(Collection::Donors).await.unwrap().len(), 1);

    store
        .create(Collection::Donors, json!({"firstname": "Nia"}))
        .await
        .unwrap();
    assert!(store.get_cached(Collection::Donors).is_none());

    store
        .backend()
        .set_payload(json!([{"DONOR_ID": 1}, {"DONOR_ID": 99}]));
    let reloaded = store.load(Collection::Donors).await.unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(store.backend().get_count(), 2);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_cache_and_records_error() {
    let backend = CountingBackend::serving(json!([{"DONOR_ID": 1}]));
    let store = RemoteStore::new(backend, &test_config());

    store.load(Collection::Donors).await.unwrap();
    assert!(store.last_error(Collection::Donors).is_none());

    store.backend().fail_next_gets(1);
    let err = store.force_refresh(Collection::Donors).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));

    // Stale data stays readable and the failure is recorded.
    let cached = store.get_cached(Collection::Donors).unwrap();
    assert_eq!(cached.len(), 1);
    assert!(matches!(
        store.last_error(Collection::Donors),
        Some(ApiError::Network(_))
    ));

    // A successful refresh clears the recorded error.
    store.force_refresh(Collection::Donors).await.unwrap();
    assert!(store.last_error(Collection::Donors).is_none());
}

#[tokio::test]
async fn one_failing_collection_does_not_block_other_refreshes() {
    let backend = CountingBackend::serving(json!([{"DONOR_ID": 1}]));
    let store = RemoteStore::new(backend, &test_config());

    store.load(Collection::Donors).await.unwrap();
    store.load(Collection::Donations).await.unwrap();

    // Donors is refreshed first and fails; Donations must refresh anyway.
    store
        .backend()
        .set_payload(json!([{"DONOR_ID": 1}, {"DONOR_ID": 2}]));
    store.backend().fail_next_gets(1);
    let err = store.refresh_cached().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));

    assert!(store.last_error(Collection::Donors).is_some());
    assert!(store.last_error(Collection::Donations).is_none());
    assert_eq!(store.get_cached(Collection::Donors).unwrap().len(), 1);
    assert_eq!(store.get_cached(Collection::Donations).unwrap().len(), 2);
}

#[tokio::test]
async fn is_loading_reports_in_flight_fetch_only() {
    let backend = CountingBackend::serving(json!([]));
    let store = RemoteStore::new(backend, &test_config());
    assert!(!store.is_loading(Collection::Donors));

    let load = store.load(Collection::Donors);
    tokio::pin!(load);
    // Drive the load partway in; the fake transport holds the GET ~20ms.
    let _ = tokio::time::timeout(std::time::Duration::from_millis(5), &mut load).await;
    assert!(store.is_loading(Collection::Donors));
    assert!(!store.is_loading(Collection::Donations));

    load.await.unwrap();
    assert!(!store.is_loading(Collection::Donors));
}

#[tokio::test]
async fn invalidate_forces_refetch() {
    let backend = CountingBackend::serving(json!([{"DONOR_ID": 1}]));
    let store = RemoteStore::new(backend, &test_config());

    store.load(Collection::Donors).await.unwrap();
    store.invalidate(Collection::Donors);
    assert!(store.get_cached(Collection::Donors).is_none());

    store.load(Collection::Donors).await.unwrap();
    assert_eq!(store.backend().get_count(), 2);
}
