//! Transport layer: the [`Backend`] seam plus its HTTP and demo
//! implementations. Everything above this module speaks canonical JSON
//! values; everything below speaks whatever the wire needs.

use std::future::Future;

use serde_json::Value;

use crate::error::ApiError;

pub mod demo;
pub mod http;

pub use demo::DemoBackend;
pub use http::HttpBackend;

/// Minimal REST surface the store needs. Implementations must stay
/// per-request stateless apart from connection/token reuse.
pub trait Backend: Send + Sync {
    fn get(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn post(&self, path: &str, body: &Value) -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn put(
        &self,
        path: &str,
        id: i64,
        body: &Value,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn delete(&self, path: &str, id: i64) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Runtime selection between the live HTTP transport and the offline demo
/// data set. Demo mode is an explicit configuration choice, never a fallback
/// for a failing backend.
pub enum BackendKind {
    Http(HttpBackend),
    Demo(DemoBackend),
}

impl Backend for BackendKind {
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value, ApiError> {
        match self {
            BackendKind::Http(b) => b.get(path, params).await,
            BackendKind::Demo(b) => b.get(path, params).await,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        match self {
            BackendKind::Http(b) => b.post(path, body).await,
            BackendKind::Demo(b) => b.post(path, body).await,
        }
    }

    async fn put(&self, path: &str, id: i64, body: &Value) -> Result<Value, ApiError> {
        match self {
            BackendKind::Http(b) => b.put(path, id, body).await,
            BackendKind::Demo(b) => b.put(path, id, body).await,
        }
    }

    async fn delete(&self, path: &str, id: i64) -> Result<(), ApiError> {
        match self {
            BackendKind::Http(b) => b.delete(path, id).await,
            BackendKind::Demo(b) => b.delete(path, id).await,
        }
    }
}

/// Normalize the two response shapes ORDS modules produce, a bare array or
/// an object with an `items` array plus paging metadata, into "array of
/// records". Aggregate endpoints return one bare object; that becomes a
/// single-record collection.
pub fn normalize_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(records)) => records,
            _ => vec![Value::Object(map)],
        },
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_accepts_bare_arrays() {
        let out = normalize_items(json!([{"a": 1}, {"a": 2}]));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn normalize_unwraps_items_envelope() {
        let out = normalize_items(json!({
            "items": [{"a": 1}],
            "total_count": 13,
            "page": 1,
            "page_size": 20
        }));
        assert_eq!(out, vec![json!({"a": 1})]);
    }

    #[test]
    fn normalize_wraps_bare_objects() {
        let out = normalize_items(json!({"total_donors": 5}));
        assert_eq!(out, vec![json!({"total_donors": 5})]);
        assert!(normalize_items(Value::Null).is_empty());
    }
}
