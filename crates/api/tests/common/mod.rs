//! Shared helpers for the API integration tests: in-memory fakes for every
//! external service, the test router, and request/response shortcuts.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use tokio::sync::Mutex;
use tower::ServiceExt;
use unwritten_api::config::ServerConfig;
use unwritten_api::router::build_app_router;
use unwritten_api::state::AppState;
use unwritten_core::entry::{Child, DateRange, PhotoRef, StoredEntry};
use unwritten_core::error::PipelineError;
use unwritten_core::format::{softcover_7x7, FormatCatalog, FormatProfile};
use unwritten_core::order::{Order, OrderStatus};
use unwritten_core::ports::{
    ArtifactStore, EntryStore, PhotoFetcher, PrintOrderRequest, PrintProvider,
};
use unwritten_core::signing::{compute_hmac_hex, sign_payment_payload};
use unwritten_core::types::{ChildId, OrderId};
use unwritten_db::MemoryOrderStore;
use unwritten_events::EventBus;
use unwritten_pipeline::{OrderCoordinator, PipelineConfig, RetryPolicy, Services};

pub const PAYMENT_SECRET: &str = "whsec_test_payment";
pub const PROVIDER_SECRET: &str = "rpi_test_secret";
pub const ADMIN_TOKEN: &str = "admin-test-token";
pub const TEST_FORMAT: &str = "test_7x7";

/// Build a test `ServerConfig` with safe defaults and known secrets.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        payment_webhook_secret: PAYMENT_SECRET.to_string(),
        provider_webhook_secret: PROVIDER_SECRET.to_string(),
        admin_token: ADMIN_TOKEN.to_string(),
        support_email: "support@unwritten.test".to_string(),
        signature_tolerance_secs: 300,
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// One child, "Emma" (`c1`), with four text entries in 2025-06-01..14.
pub struct Journal;

#[async_trait]
impl EntryStore for Journal {
    async fn find_child(&self, child_id: &ChildId) -> Result<Option<Child>, PipelineError> {
        Ok((child_id.as_str() == "c1").then(|| Child {
            id: child_id.clone(),
            name: "Emma".into(),
        }))
    }

    async fn entries_between(
        &self,
        child_id: &ChildId,
        range: &DateRange,
    ) -> Result<Vec<StoredEntry>, PipelineError> {
        let rows = [
            ("2025-06-01", "First trip to the lake."),
            ("2025-06-04", "Said 'more' at breakfast."),
            ("2025-06-08", "Built a tower of six blocks."),
            ("2025-06-13", "Fell asleep in the wagon."),
        ];
        Ok(rows
            .iter()
            .map(|(date, text)| StoredEntry {
                child_id: child_id.clone(),
                entry_date: date.parse().unwrap(),
                text: (*text).into(),
                photo_path: None,
                prompt: None,
            })
            .filter(|e| range.contains(e.entry_date))
            .collect())
    }

    fn photo_url(&self, photo_path: &str) -> PhotoRef {
        PhotoRef(format!("https://photos.test/{photo_path}"))
    }
}

#[derive(Default)]
pub struct Bucket {
    pub keys: Mutex<Vec<String>>,
}

#[async_trait]
impl ArtifactStore for Bucket {
    async fn put(
        &self,
        key: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, PipelineError> {
        self.keys.lock().await.push(key.to_string());
        Ok(format!("https://artifacts.test/{key}"))
    }
}

pub struct NoPhotos;

#[async_trait]
impl PhotoFetcher for NoPhotos {
    async fn fetch(&self, photo: &PhotoRef) -> Result<Vec<u8>, PipelineError> {
        Err(PipelineError::Render(format!("unexpected photo fetch: {}", photo.url())))
    }
}

#[derive(Default)]
pub struct Provider {
    pub requests: Mutex<Vec<PrintOrderRequest>>,
}

#[async_trait]
impl PrintProvider for Provider {
    async fn create_order(&self, request: &PrintOrderRequest) -> Result<String, PipelineError> {
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());
        Ok(format!("rpi_{}", requests.len()))
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub coordinator: Arc<OrderCoordinator>,
    pub provider: Arc<Provider>,
    pub bucket: Arc<Bucket>,
}

/// Softcover geometry whose bounds admit a four-page book.
pub fn test_profile() -> FormatProfile {
    FormatProfile {
        key: TEST_FORMAT.into(),
        min_pages: 4,
        ..softcover_7x7()
    }
}

/// Build the full application router (same middleware stack as `main.rs`)
/// over in-memory fakes.
pub fn build_test_app() -> TestApp {
    let provider = Arc::new(Provider::default());
    let bucket = Arc::new(Bucket::default());

    let mut catalog = FormatCatalog::default();
    catalog.register(test_profile()).unwrap();

    let services = Services {
        entries: Arc::new(Journal),
        orders: Arc::new(MemoryOrderStore::new()),
        artifacts: bucket.clone(),
        photos: Arc::new(NoPhotos),
        provider: provider.clone(),
        events: Arc::new(EventBus::default()),
        catalog: Arc::new(catalog),
    };
    let coordinator = Arc::new(
        OrderCoordinator::new(services, PipelineConfig::default())
            .with_retry(RetryPolicy::new(vec![Duration::from_millis(1); 3])),
    );

    let config = test_config();
    let state = AppState {
        config: Arc::new(config.clone()),
        coordinator: coordinator.clone(),
        pool: None,
        throttle: None,
    };

    TestApp {
        router: build_app_router(state, &config),
        coordinator,
        provider,
        bucket,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: &TestApp, path: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

/// POST `body` as JSON with extra `headers`.
pub async fn post_json(
    app: &TestApp,
    path: &str,
    body: &serde_json::Value,
    headers: &[(&str, String)],
) -> Response<Body> {
    post_raw(app, path, serde_json::to_vec(body).unwrap(), headers).await
}

pub async fn post_raw(
    app: &TestApp,
    path: &str,
    body: Vec<u8>,
    headers: &[(&str, String)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    let request = builder.body(Body::from(body)).unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn order_request(format: &str) -> serde_json::Value {
    serde_json::json!({
        "child_id": "c1",
        "range": { "start": "2025-06-01", "end": "2025-06-14" },
        "format": format,
        "cover_template": "ocean",
        "quantity": 2,
        "contact_email": "sarah@example.com",
        "shipping": {
            "name": "Sarah Johnson",
            "street1": "123 Oak Street",
            "city": "Portland",
            "state": "OR",
            "zip": "97201"
        }
    })
}

/// Create an order through the API and return its id.
pub async fn create_order(app: &TestApp) -> String {
    let response = post_json(app, "/api/v1/orders", &order_request(TEST_FORMAT), &[]).await;
    assert_eq!(response.status(), 201);
    let json = body_json(response).await;
    json["data"]["order"]["id"].as_str().unwrap().to_string()
}

/// Signed payment confirmation for `order_id`, as (body, headers).
pub fn signed_payment(order_id: &str, token: &str) -> (Vec<u8>, Vec<(&'static str, String)>) {
    let body = serde_json::to_vec(&serde_json::json!({
        "order_id": order_id,
        "confirmation_token": token,
    }))
    .unwrap();
    let header = sign_payment_payload(PAYMENT_SECRET, Utc::now().timestamp(), &body);
    (body, vec![("payment-signature", header)])
}

/// Signed provider notification, as (body, headers).
pub fn signed_notification(
    event: &str,
    order_id: &str,
    tracking: Option<&str>,
) -> (Vec<u8>, Vec<(&'static str, String)>) {
    let mut payload = serde_json::json!({ "event": event, "external_id": order_id });
    if let Some(number) = tracking {
        payload["tracking_number"] = number.into();
        payload["tracking_url"] = format!("https://track.test/{number}").into();
    }
    let body = serde_json::to_vec(&payload).unwrap();
    let header = compute_hmac_hex(PROVIDER_SECRET, &body);
    (body, vec![("x-rpi-signature", header)])
}

/// Poll until the order reaches `status` or two seconds pass.
pub async fn wait_for_status(app: &TestApp, id: &str, status: OrderStatus) -> Order {
    let id = OrderId::from(id);
    for _ in 0..200 {
        let order = app.coordinator.get_order(&id).await.unwrap();
        if order.status == status {
            return order;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("order {id} never reached {status}");
}
