#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use campdir::config::QueryConfig;
use campdir::filtering::FilterPredicate;
use campdir::geo::RadiusQuery;
use campdir::store::FindQuery;
use campdir::{
    AppState, Document, DocumentStore, GeoConfig, GeoResolver, Geocoder, MemoryStore, StaticGeocoder, StoreError,
    build_router,
};

pub const BOSTON_ZIP: &str = "02118";
pub const BAY_STATE_ADDRESS: &str = "233 Bay State Rd Boston MA 02215";
pub const LOWELL_ADDRESS: &str = "220 Pawtucket St Lowell MA 01854";
pub const KINGSTON_ADDRESS: &str = "45 Upper College Rd Kingston RI 02881";
pub const SAN_FRANCISCO_ADDRESS: &str = "1 Market St San Francisco CA 94103";

/// Lookup table used by every HTTP test.
pub fn fixture_geocoder() -> StaticGeocoder {
    StaticGeocoder::new()
        .with_point(BOSTON_ZIP, -71.0726, 42.3389)
        .with_point(BAY_STATE_ADDRESS, -71.1003, 42.3505)
        .with_point(LOWELL_ADDRESS, -71.3244, 42.6491)
        .with_point(KINGSTON_ADDRESS, -71.5253, 41.4826)
        .with_point(SAN_FRANCISCO_ADDRESS, -122.4194, 37.7749)
}

pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture must be an object"),
    }
}

pub fn setup_app() -> Router {
    setup_app_with_store(Arc::new(MemoryStore::new()))
}

pub fn setup_app_with_store(store: Arc<dyn DocumentStore>) -> Router {
    setup_app_with(store, Arc::new(fixture_geocoder()), QueryConfig::default(), GeoConfig::default())
}

pub fn setup_app_with(
    store: Arc<dyn DocumentStore>,
    geocoder: Arc<dyn Geocoder>,
    query: QueryConfig,
    geo: GeoConfig,
) -> Router {
    let state = AppState::new(store, query, GeoResolver::new(geocoder, geo));
    build_router(&state).expect("router builds")
}

/// Send one request and decode the JSON response.
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

pub fn program_body(name: &str, address: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{name} trains full stack developers"),
        "website": "https://example.com",
        "email": "hello@example.com",
        "address": address,
        "careers": ["Web Development", "UI/UX"],
        "averageCost": 10000,
        "housing": true
    })
}

pub fn course_body(title: &str, tuition: u64) -> Value {
    json!({
        "title": title,
        "description": format!("{title} from scratch"),
        "weeks": 8,
        "tuition": tuition,
        "minimumSkill": "beginner"
    })
}

/// Create a program over HTTP and return its id.
pub async fn create_program(app: &Router, name: &str, address: &str) -> String {
    let (status, body) = post(app, "/api/v1/programs", program_body(name, address)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

/// Store wrapper that fails deletes and hides matches on demand.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_delete_many_on: Mutex<Option<String>>,
    fail_delete_by_id_on: Mutex<Option<String>>,
    blind_finds: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_delete_many_on(&self, collection: &str) {
        *self.fail_delete_many_on.lock().unwrap() = Some(collection.to_string());
    }

    pub fn fail_delete_by_id_on(&self, collection: &str) {
        *self.fail_delete_by_id_on.lock().unwrap() = Some(collection.to_string());
    }

    /// The next `n` calls to `find` see no documents, as a writer racing
    /// another one would.
    pub fn blind_next_finds(&self, n: usize) {
        self.blind_finds.store(n, Ordering::SeqCst);
    }

    fn fails(slot: &Mutex<Option<String>>, collection: &str) -> bool {
        slot.lock().unwrap().as_deref() == Some(collection)
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn count(&self, collection: &str, filters: &[FilterPredicate]) -> Result<u64, StoreError> {
        self.inner.count(collection, filters).await
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let blind = self
            .blind_finds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if blind {
            return Ok(Vec::new());
        }
        self.inner.find(collection, query).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.find_by_id(collection, id).await
    }

    async fn find_within(
        &self,
        collection: &str,
        field: &str,
        radius: &RadiusQuery,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.find_within(collection, field, radius).await
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        self.inner.insert(collection, doc).await
    }

    async fn update(&self, collection: &str, id: &str, changes: Document) -> Result<Option<Document>, StoreError> {
        self.inner.update(collection, id, changes).await
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        if Self::fails(&self.fail_delete_by_id_on, collection) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        self.inner.delete_by_id(collection, id).await
    }

    async fn delete_many(&self, collection: &str, filters: &[FilterPredicate]) -> Result<u64, StoreError> {
        if Self::fails(&self.fail_delete_many_on, collection) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        self.inner.delete_many(collection, filters).await
    }
}
