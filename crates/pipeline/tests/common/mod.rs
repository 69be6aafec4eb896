//! Shared fakes for the pipeline integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use tokio::sync::{Mutex, Notify};
use unwritten_core::entry::{Child, DateRange, PhotoRef, StoredEntry};
use unwritten_core::error::PipelineError;
use unwritten_core::format::{softcover_7x7, FormatCatalog, FormatProfile};
use unwritten_core::manifest::CoverTemplate;
use unwritten_core::order::{ShippingAddress, ShippingMethod};
use unwritten_core::ports::{
    ArtifactStore, EntryStore, PhotoFetcher, PrintOrderRequest, PrintProvider,
};
use unwritten_core::types::{ChildId, OrderId};
use unwritten_db::MemoryOrderStore;
use unwritten_events::EventBus;
use unwritten_pipeline::{NewOrder, OrderCoordinator, PipelineConfig, RetryPolicy, Services};

pub const TEST_FORMAT: &str = "test_7x7";

/// Softcover geometry whose bounds admit a four-page book.
pub fn test_profile() -> FormatProfile {
    FormatProfile {
        key: TEST_FORMAT.into(),
        min_pages: 4,
        ..softcover_7x7()
    }
}

// ---------------------------------------------------------------------------
// Entry store
// ---------------------------------------------------------------------------

pub struct Journal {
    child: Child,
    rows: Vec<StoredEntry>,
}

impl Journal {
    pub fn emma(rows: Vec<StoredEntry>) -> Self {
        Self {
            child: Child {
                id: ChildId::from("c1"),
                name: "Emma".into(),
            },
            rows,
        }
    }
}

#[async_trait]
impl EntryStore for Journal {
    async fn find_child(&self, child_id: &ChildId) -> Result<Option<Child>, PipelineError> {
        Ok((self.child.id == *child_id).then(|| self.child.clone()))
    }

    async fn entries_between(
        &self,
        child_id: &ChildId,
        range: &DateRange,
    ) -> Result<Vec<StoredEntry>, PipelineError> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.child_id == *child_id && range.contains(r.entry_date))
            .cloned()
            .collect())
    }

    fn photo_url(&self, photo_path: &str) -> PhotoRef {
        PhotoRef(format!("https://photos.test/{photo_path}"))
    }
}

pub fn row(date: &str, text: &str, photo: Option<&str>) -> StoredEntry {
    StoredEntry {
        child_id: ChildId::from("c1"),
        entry_date: date.parse().unwrap(),
        text: text.into(),
        photo_path: photo.map(Into::into),
        prompt: None,
    }
}

/// 2025-06-01..14 without photos: two text weeks.
pub fn two_text_weeks() -> Vec<StoredEntry> {
    vec![
        row("2025-06-01", "First trip to the lake.", None),
        row("2025-06-04", "Said 'more' at breakfast.", None),
        row("2025-06-08", "Built a tower of six blocks.", None),
        row("2025-06-13", "Fell asleep in the wagon.", None),
    ]
}

/// First week has two photos, second week is text only.
pub fn photo_and_text_weeks() -> Vec<StoredEntry> {
    vec![
        row("2025-06-01", "Lake day.", Some("c1/0601.png")),
        row("2025-06-02", "Blocks.", Some("c1/0602.png")),
        row("2025-06-03", "Nap in the wagon.", None),
        row("2025-06-09", "Danced to the radio.", None),
    ]
}

// ---------------------------------------------------------------------------
// Artifacts and photos
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Bucket {
    pub puts: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl ArtifactStore for Bucket {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, PipelineError> {
        self.puts.lock().await.push((key.to_string(), bytes));
        Ok(format!("https://artifacts.test/{key}"))
    }
}

pub struct Photos {
    bytes: Vec<u8>,
}

impl Photos {
    pub fn png() -> Self {
        let img = RgbImage::from_pixel(320, 240, Rgb([232, 131, 107]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        Self {
            bytes: out.into_inner(),
        }
    }

    pub fn garbage() -> Self {
        Self {
            bytes: b"not an image".to_vec(),
        }
    }
}

#[async_trait]
impl PhotoFetcher for Photos {
    async fn fetch(&self, _photo: &PhotoRef) -> Result<Vec<u8>, PipelineError> {
        Ok(self.bytes.clone())
    }
}

// ---------------------------------------------------------------------------
// Print provider
// ---------------------------------------------------------------------------

/// Records every create-order call. Answers from `script` first, then with
/// `rpi_<n>`. When `hang` is set, calls never return.
#[derive(Default)]
pub struct Provider {
    pub requests: Mutex<Vec<PrintOrderRequest>>,
    script: Mutex<VecDeque<Result<String, PipelineError>>>,
    hang: AtomicBool,
    pub entered: Notify,
}

impl Provider {
    pub async fn respond(&self, result: Result<String, PipelineError>) {
        self.script.lock().await.push_back(result);
    }

    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl PrintProvider for Provider {
    async fn create_order(&self, request: &PrintOrderRequest) -> Result<String, PipelineError> {
        let n = {
            let mut requests = self.requests.lock().await;
            requests.push(request.clone());
            requests.len()
        };
        self.entered.notify_one();
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        match self.script.lock().await.pop_front() {
            Some(result) => result,
            None => Ok(format!("rpi_{n}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub coordinator: Arc<OrderCoordinator>,
    pub orders: Arc<MemoryOrderStore>,
    pub bucket: Arc<Bucket>,
    pub provider: Arc<Provider>,
    pub events: Arc<EventBus>,
}

pub fn harness(rows: Vec<StoredEntry>, photos: Photos) -> Harness {
    harness_with_config(rows, photos, PipelineConfig::default())
}

pub fn harness_with_config(
    rows: Vec<StoredEntry>,
    photos: Photos,
    config: PipelineConfig,
) -> Harness {
    let orders = Arc::new(MemoryOrderStore::new());
    let bucket = Arc::new(Bucket::default());
    let provider = Arc::new(Provider::default());
    let events = Arc::new(EventBus::default());

    let mut catalog = FormatCatalog::default();
    catalog.register(test_profile()).unwrap();

    let services = Services {
        entries: Arc::new(Journal::emma(rows)),
        orders: orders.clone(),
        artifacts: bucket.clone(),
        photos: Arc::new(photos),
        provider: provider.clone(),
        events: events.clone(),
        catalog: Arc::new(catalog),
    };
    let coordinator = OrderCoordinator::new(services, config)
        .with_retry(RetryPolicy::new(vec![Duration::from_millis(1); 3]));

    Harness {
        coordinator: Arc::new(coordinator),
        orders,
        bucket,
        provider,
        events,
    }
}

pub fn june_1_to_14() -> DateRange {
    DateRange::new("2025-06-01".parse().unwrap(), "2025-06-14".parse().unwrap()).unwrap()
}

pub fn shipping() -> ShippingAddress {
    ShippingAddress {
        name: "Sarah Johnson".into(),
        street1: "123 Oak Street".into(),
        street2: None,
        city: "Portland".into(),
        state: "OR".into(),
        zip: "97201".into(),
        country: "US".into(),
        method: ShippingMethod::Standard,
    }
}

pub fn new_order(id: &str) -> NewOrder {
    NewOrder {
        id: OrderId::from(id),
        child_id: ChildId::from("c1"),
        range: june_1_to_14(),
        format_key: TEST_FORMAT.into(),
        cover_template: CoverTemplate::Garden,
        quantity: 1,
        contact_email: "sarah@example.com".into(),
        shipping: shipping(),
    }
}
