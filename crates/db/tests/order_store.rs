use assert_matches::assert_matches;
use chrono::Utc;
use unwritten_core::entry::{Child, DateRange};
use unwritten_core::error::PipelineError;
use unwritten_core::format::{softcover_7x7, FormatProfile};
use unwritten_core::manifest::{BookManifest, CoverTemplate, FormatSelection};
use unwritten_core::order::{
    ArtifactRecord, Order, OrderStatus, OrderUpdate, ShippingAddress, ShippingMethod, Tracking,
};
use unwritten_core::ports::OrderStore;
use unwritten_core::types::{ChildId, OrderId};
use unwritten_db::models::order::OrderRow;
use unwritten_db::MemoryOrderStore;

fn order(id: &str) -> Order {
    let child = Child {
        id: ChildId::from("c1"),
        name: "Emma".into(),
    };
    let range = DateRange::new(
        "2025-06-01".parse().unwrap(),
        "2025-06-14".parse().unwrap(),
    )
    .unwrap();
    let profile = FormatProfile {
        min_pages: 2,
        ..softcover_7x7()
    };
    let selection = FormatSelection::new(profile, CoverTemplate::Garden, 1).unwrap();
    let manifest = BookManifest::build(&child, range, selection, &[]).unwrap();
    let shipping = ShippingAddress {
        name: "Sarah Johnson".into(),
        street1: "123 Oak Street".into(),
        street2: None,
        city: "Portland".into(),
        state: "OR".into(),
        zip: "97201".into(),
        country: "US".into(),
        method: ShippingMethod::Standard,
    };
    Order::new(
        OrderId::from(id),
        "sarah@example.com".into(),
        manifest,
        shipping,
        Utc::now(),
    )
}

#[tokio::test]
async fn insert_rejects_duplicate_ids() {
    let store = MemoryOrderStore::new();
    store.insert(&order("o1")).await.unwrap();
    assert_matches!(
        store.insert(&order("o1")).await,
        Err(PipelineError::Validation(_))
    );
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn transition_is_compare_and_set() {
    let store = MemoryOrderStore::new();
    let id = OrderId::from("o1");
    store.insert(&order("o1")).await.unwrap();

    let update = OrderUpdate::to(OrderStatus::PaymentConfirmed).with_payment_token("pi_1");
    let first = store
        .transition(&id, OrderStatus::Created, &update)
        .await
        .unwrap();
    assert_eq!(first.unwrap().payment_token.as_deref(), Some("pi_1"));

    // Second writer with a stale expectation loses.
    let second = store
        .transition(&id, OrderStatus::Created, &update)
        .await
        .unwrap();
    assert!(second.is_none());

    let unknown = store
        .transition(&OrderId::from("nope"), OrderStatus::Created, &update)
        .await
        .unwrap();
    assert!(unknown.is_none());
}

#[tokio::test]
async fn transition_keeps_fields_not_in_update() {
    let store = MemoryOrderStore::new();
    let id = OrderId::from("o1");
    store.insert(&order("o1")).await.unwrap();

    store
        .transition(
            &id,
            OrderStatus::Created,
            &OrderUpdate::to(OrderStatus::PaymentConfirmed).with_payment_token("pi_1"),
        )
        .await
        .unwrap();
    let failed = store
        .transition(
            &id,
            OrderStatus::PaymentConfirmed,
            &OrderUpdate::to(OrderStatus::Failed).with_error("boom"),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.payment_token.as_deref(), Some("pi_1"));
    assert_eq!(failed.last_error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn list_by_status_filters_and_orders_oldest_first() {
    let store = MemoryOrderStore::new();
    let mut older = order("b");
    older.created_at = Utc::now() - chrono::Duration::hours(2);
    store.insert(&order("a")).await.unwrap();
    store.insert(&older).await.unwrap();
    store
        .transition(
            &OrderId::from("a"),
            OrderStatus::Created,
            &OrderUpdate::to(OrderStatus::Expired),
        )
        .await
        .unwrap();

    let created = store.list_by_status(&[OrderStatus::Created]).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].id, OrderId::from("b"));

    let both = store
        .list_by_status(&[OrderStatus::Created, OrderStatus::Expired])
        .await
        .unwrap();
    let ids: Vec<&str> = both.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[test]
fn row_conversion_preserves_order() {
    let mut original = order("o1");
    original.status = OrderStatus::Shipped;
    original.provider_order_id = Some("rpi_42".into());
    original.artifacts = Some(ArtifactRecord {
        cover_url: "https://cdn.test/orders/o1/cover.pdf".into(),
        interior_url: "https://cdn.test/orders/o1/interior.pdf".into(),
        cover_bytes: 10,
        interior_bytes: 20,
        checksum: "abc".into(),
    });
    original.tracking = Some(Tracking {
        number: "1Z999".into(),
        url: Some("https://track.test/1Z999".into()),
    });

    let row = OrderRow::from_order(&original).unwrap();
    assert_eq!(row.status_id, 7);
    assert_eq!(row.tracking_number.as_deref(), Some("1Z999"));

    let back = row.into_order().unwrap();
    assert_eq!(back.id, original.id);
    assert_eq!(back.status, OrderStatus::Shipped);
    assert_eq!(back.artifacts, original.artifacts);
    assert_eq!(back.tracking, original.tracking);
    assert_eq!(back.manifest.digest, original.manifest.digest);
}

#[test]
fn row_with_unknown_status_is_rejected() {
    let mut row = OrderRow::from_order(&order("o1")).unwrap();
    row.status_id = 99;
    assert!(row.into_order().is_err());
}
