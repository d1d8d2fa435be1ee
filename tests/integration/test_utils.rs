//! Test utilities for integration tests.
//!
//! Provides an in-memory origin store with request tracking and helpers for
//! building routers and requests.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use tile_proxy::error::StoreError;
use tile_proxy::store::{OriginObject, OriginStore, SharedStore};
use tile_proxy::{create_router, ManualClock, RouterConfig};

pub const TEST_SECRET: &str = "integration-test-secret";

pub const PUBLIC_URL: &str = "https://tiles.example.com";

/// Fixed start time for clock-driven tests.
pub const T0: u64 = 1_700_000_000;

// =============================================================================
// Mock Origin Store
// =============================================================================

/// An in-memory origin store that records every requested key.
#[derive(Clone, Default)]
pub struct MockOriginStore {
    objects: Arc<HashMap<String, OriginObject>>,
    unavailable: bool,
    requests: Arc<Mutex<Vec<String>>>,
    request_count: Arc<AtomicUsize>,
}

impl MockOriginStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every fetch fails at the transport level.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn with_object(self, key: &str, object: OriginObject) -> Self {
        let mut objects = (*self.objects).clone();
        objects.insert(key.to_string(), object);
        Self {
            objects: Arc::new(objects),
            ..self
        }
    }

    pub fn with_bytes(self, key: &str, body: impl Into<Bytes>) -> Self {
        self.with_object(key, OriginObject::new(body))
    }

    pub fn with_json(self, key: &str, value: &Value) -> Self {
        self.with_bytes(key, value.to_string())
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl OriginStore for MockOriginStore {
    async fn fetch(&self, key: &str) -> Result<OriginObject, StoreError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(key.to_string());

        if self.unavailable {
            return Err(StoreError::Connection("connection refused".to_string()));
        }

        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn identifier(&self) -> &str {
        "mock://origin"
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A minimal style whose `openmaptiles` source points at raw bucket tiles.
pub fn sample_style() -> Value {
    json!({
        "version": 8,
        "name": "Test",
        "sprite": "https://bucket.example.com/sprite",
        "glyphs": "https://bucket.example.com/fonts/{fontstack}/{range}.pbf",
        "sources": {
            "openmaptiles": {
                "type": "vector",
                "tiles": ["https://bucket.example.com/{z}/{x}/{y}.pbf"],
                "maxzoom": 14
            }
        },
        "layers": [
            { "id": "water", "type": "fill", "source": "openmaptiles", "source-layer": "water" }
        ]
    })
}

/// A store holding the sample style and one tile at 3/4/5.
pub fn sample_store() -> MockOriginStore {
    MockOriginStore::new()
        .with_json("style.json", &sample_style())
        .with_bytes("3/4/5.pbf", vec![0x1a, 0x02, 0x08, 0x01])
}

/// Router configuration with a pinned clock and no request tracing.
pub fn test_config(clock: &ManualClock) -> RouterConfig {
    RouterConfig::new(TEST_SECRET)
        .with_public_url(PUBLIC_URL)
        .with_clock(Arc::new(clock.clone()))
        .with_tracing(false)
}

pub fn router_for(store: MockOriginStore, config: RouterConfig) -> Router {
    let store: SharedStore = Arc::new(store);
    create_router(store, config)
}

// =============================================================================
// Request Helpers
// =============================================================================

pub async fn send(router: &Router, method: &str, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap()
}

pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    send(router, "GET", uri).await
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Fetch `/style.json` and return the signed tile template.
pub async fn signed_template(router: &Router) -> String {
    let response = get(router, "/style.json").await;
    let style = body_json(response).await;
    style["sources"]["openmaptiles"]["tiles"][0]
        .as_str()
        .unwrap()
        .to_string()
}

/// Turn a signed template into a concrete request path for `z/x/y`.
pub fn tile_path(template: &str, z: u32, x: u32, y: u32) -> String {
    let relative = template.strip_prefix(PUBLIC_URL).unwrap_or(template);
    relative
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

/// Extract the `exp` and `sig` values from a signed template.
pub fn token_params(template: &str) -> (String, String) {
    let query = template.split_once('?').unwrap().1;
    let mut exp = String::new();
    let mut sig = String::new();
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("exp", v)) => exp = v.to_string(),
            Some(("sig", v)) => sig = v.to_string(),
            _ => {}
        }
    }
    (exp, sig)
}

pub fn assert_cors_headers(response: &Response<Body>) {
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET, HEAD, OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type"
    );
}
