mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::*;
use unwritten_core::error::PipelineError;
use unwritten_core::manifest::PageKind;
use unwritten_core::order::{OrderStatus, ProviderEvent, Tracking};
use unwritten_core::ports::OrderStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use unwritten_core::types::{ChildId, OrderId};
use unwritten_events::bus::event_types;
use unwritten_pipeline::{EventOutcome, PaymentOutcome, PipelineConfig};

fn o1() -> OrderId {
    OrderId::from("o1")
}

async fn status(h: &Harness, id: &OrderId) -> OrderStatus {
    h.orders.get(id).await.unwrap().unwrap().status
}

async fn finish(runs: Vec<JoinHandle<()>>) {
    for run in runs {
        run.await.unwrap();
    }
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn paid_order_renders_once_and_submits_with_its_id_as_idempotency_key() {
    let h = harness(two_text_weeks(), Photos::png());

    let order = h.coordinator.create_order(new_order("o1")).await.unwrap();
    let kinds: Vec<PageKind> = order.manifest.pages.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        [
            PageKind::CoverFront,
            PageKind::TextWeek,
            PageKind::TextWeek,
            PageKind::CoverBack
        ]
    );
    assert_eq!(order.status, OrderStatus::Created);

    let outcome = h.coordinator.confirm_payment(&o1(), "pay_123").await.unwrap();
    assert_eq!(outcome, PaymentOutcome::Confirmed);
    assert_eq!(
        h.coordinator.run_pipeline(&o1()).await.unwrap(),
        OrderStatus::Submitted
    );

    let requests = h.provider.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].idempotency_key, o1());
    assert_eq!(requests[0].external_id, o1());
    assert_eq!(requests[0].sku, "7x7_softcover_lustre");
    assert_eq!(requests[0].cover_url, "https://artifacts.test/orders/o1/cover.pdf");
    assert_eq!(requests[0].guts_url, "https://artifacts.test/orders/o1/interior.pdf");

    let stored = h.orders.get(&o1()).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Submitted);
    assert_eq!(stored.provider_order_id.as_deref(), Some("rpi_1"));
    assert_eq!(stored.payment_token.as_deref(), Some("pay_123"));
    let artifacts = stored.artifacts.unwrap();
    assert_eq!(artifacts.checksum.len(), 64);

    let puts = h.bucket.puts.lock().await;
    let keys: Vec<&str> = puts.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["orders/o1/cover.pdf", "orders/o1/interior.pdf"]);
    assert!(puts.iter().all(|(_, bytes)| bytes.starts_with(b"%PDF-1.4")));
}

#[tokio::test]
async fn photo_weeks_embed_the_highlighted_photo() {
    let h = harness(photo_and_text_weeks(), Photos::png());
    let order = h.coordinator.create_order(new_order("o1")).await.unwrap();
    assert_eq!(order.manifest.pages[1].kind, PageKind::PhotoWeek);

    h.coordinator.confirm_payment(&o1(), "pay_123").await.unwrap();
    h.coordinator.run_pipeline(&o1()).await.unwrap();

    let puts = h.bucket.puts.lock().await;
    let interior = &puts[1].1;
    assert!(interior.windows(11).any(|w| w == b"/DCTDecode "));
}

#[tokio::test]
async fn preview_lays_out_without_storing_an_order() {
    let h = harness(two_text_weeks(), Photos::png());
    let manifest = h
        .coordinator
        .preview(&ChildId::from("c1"), june_1_to_14(), TEST_FORMAT)
        .await
        .unwrap();

    assert_eq!(manifest.page_count, 4);
    assert_eq!(manifest.child_name, "Emma");
    assert!(h.orders.is_empty().await);
}

#[tokio::test]
async fn identical_inputs_render_identical_artifacts() {
    let h = harness(photo_and_text_weeks(), Photos::png());
    for id in ["o1", "o2"] {
        h.coordinator.create_order(new_order(id)).await.unwrap();
        h.coordinator.confirm_payment(&OrderId::from(id), "pay").await.unwrap();
        h.coordinator.run_pipeline(&OrderId::from(id)).await.unwrap();
    }

    let first = h.orders.get(&o1()).await.unwrap().unwrap();
    let second = h.orders.get(&OrderId::from("o2")).await.unwrap().unwrap();
    assert_eq!(first.manifest.digest, second.manifest.digest);
    assert_eq!(
        first.artifacts.unwrap().checksum,
        second.artifacts.unwrap().checksum
    );
}

// ---------------------------------------------------------------------------
// Payment gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_render_before_payment() {
    let h = harness(two_text_weeks(), Photos::png());
    h.coordinator.create_order(new_order("o1")).await.unwrap();

    assert_eq!(
        h.coordinator.run_pipeline(&o1()).await.unwrap(),
        OrderStatus::Created
    );
    assert!(h.bucket.puts.lock().await.is_empty());
    assert_eq!(h.provider.calls().await, 0);
}

#[tokio::test]
async fn duplicate_payment_yields_one_render_and_one_submission() {
    let h = harness(two_text_weeks(), Photos::png());
    h.coordinator.create_order(new_order("o1")).await.unwrap();

    assert_eq!(
        h.coordinator.confirm_payment(&o1(), "pay_123").await.unwrap(),
        PaymentOutcome::Confirmed
    );
    assert_eq!(
        h.coordinator.confirm_payment(&o1(), "pay_123").await.unwrap(),
        PaymentOutcome::Duplicate
    );

    let (id_a, id_b) = (o1(), o1());
    let (a, b) = tokio::join!(
        h.coordinator.run_pipeline(&id_a),
        h.coordinator.run_pipeline(&id_b)
    );
    assert_eq!(a.unwrap(), OrderStatus::Submitted);
    assert_eq!(b.unwrap(), OrderStatus::Submitted);

    // A replay after submission changes nothing.
    assert_eq!(
        h.coordinator.confirm_payment(&o1(), "pay_123").await.unwrap(),
        PaymentOutcome::Duplicate
    );
    assert_eq!(h.provider.calls().await, 1);
    assert_eq!(h.bucket.puts.lock().await.len(), 2);
}

#[tokio::test]
async fn payment_for_unknown_order_is_ignored() {
    let h = harness(two_text_weeks(), Photos::png());
    assert_eq!(
        h.coordinator
            .confirm_payment(&OrderId::from("nope"), "pay")
            .await
            .unwrap(),
        PaymentOutcome::UnknownOrder
    );
    assert!(h.orders.is_empty().await);
}

// ---------------------------------------------------------------------------
// Provider notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shipped_before_accepted_is_discarded_then_applies_in_order() {
    let h = harness(two_text_weeks(), Photos::png());
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();
    h.coordinator.run_pipeline(&o1()).await.unwrap();
    let mut events = h.events.subscribe();

    let tracking = || {
        Some(Tracking {
            number: "1Z999".into(),
            url: Some("https://track.test/1Z999".into()),
        })
    };

    assert_eq!(
        h.coordinator
            .apply_provider_event(&o1(), ProviderEvent::Shipped, tracking())
            .await
            .unwrap(),
        EventOutcome::Discarded
    );
    assert_eq!(status(&h, &o1()).await, OrderStatus::Submitted);

    assert_eq!(
        h.coordinator
            .apply_provider_event(&o1(), ProviderEvent::Accepted, None)
            .await
            .unwrap(),
        EventOutcome::Applied(OrderStatus::Accepted)
    );
    assert_eq!(
        h.coordinator
            .apply_provider_event(&o1(), ProviderEvent::Shipped, tracking())
            .await
            .unwrap(),
        EventOutcome::Applied(OrderStatus::Shipped)
    );
    // Duplicate delivery and regression are both discarded.
    for event in [ProviderEvent::Shipped, ProviderEvent::Accepted] {
        assert_eq!(
            h.coordinator
                .apply_provider_event(&o1(), event, None)
                .await
                .unwrap(),
            EventOutcome::Discarded
        );
    }

    let stored = h.orders.get(&o1()).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Shipped);
    assert_eq!(stored.tracking.unwrap().number, "1Z999");

    let accepted = events.recv().await.unwrap();
    assert_eq!(accepted.status, Some(OrderStatus::Accepted));
    let shipped = events.recv().await.unwrap();
    assert_eq!(shipped.status, Some(OrderStatus::Shipped));
    assert_eq!(shipped.payload["tracking_number"], "1Z999");
    assert_eq!(shipped.contact_email.as_deref(), Some("sarah@example.com"));
}

#[tokio::test]
async fn notifications_for_unsubmitted_or_unknown_orders_are_discarded() {
    let h = harness(two_text_weeks(), Photos::png());
    h.coordinator.create_order(new_order("o1")).await.unwrap();

    for id in [o1(), OrderId::from("ghost")] {
        assert_eq!(
            h.coordinator
                .apply_provider_event(&id, ProviderEvent::Accepted, None)
                .await
                .unwrap(),
            EventOutcome::Discarded
        );
    }
    assert_eq!(status(&h, &o1()).await, OrderStatus::Created);
}

#[tokio::test]
async fn provider_rejection_fails_the_order() {
    let h = harness(two_text_weeks(), Photos::png());
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();
    h.coordinator.run_pipeline(&o1()).await.unwrap();

    assert_eq!(
        h.coordinator
            .apply_provider_event(&o1(), ProviderEvent::Failed, None)
            .await
            .unwrap(),
        EventOutcome::Applied(OrderStatus::Failed)
    );
    let stored = h.orders.get(&o1()).await.unwrap().unwrap();
    assert!(stored.last_error.is_some());
    assert!(stored.artifacts.is_some());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn undecodable_photo_fails_the_order_and_notifies() {
    let h = harness(photo_and_text_weeks(), Photos::garbage());
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();
    let mut events = h.events.subscribe();

    assert_eq!(
        h.coordinator.run_pipeline(&o1()).await.unwrap(),
        OrderStatus::Failed
    );

    let stored = h.orders.get(&o1()).await.unwrap().unwrap();
    assert!(stored.last_error.unwrap().starts_with("Render failed"));
    assert_eq!(h.provider.calls().await, 0);

    let mut failed = None;
    while let Ok(event) = events.try_recv() {
        if event.event_type == event_types::ORDER_FAILED {
            failed = Some(event);
        }
    }
    let failed = failed.expect("failure event");
    assert_eq!(failed.order_id, o1());
    assert_eq!(failed.contact_email.as_deref(), Some("sarah@example.com"));
}

#[tokio::test]
async fn provider_rejection_at_submission_fails_with_artifacts_kept() {
    let h = harness(two_text_weeks(), Photos::png());
    h.provider
        .respond(Err(PipelineError::Provider("unknown sku".into())))
        .await;
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();

    assert_eq!(
        h.coordinator.run_pipeline(&o1()).await.unwrap(),
        OrderStatus::Failed
    );
    let stored = h.orders.get(&o1()).await.unwrap().unwrap();
    assert!(stored.artifacts.is_some());
    assert!(stored.last_error.unwrap().contains("unknown sku"));
}

#[tokio::test]
async fn backpressure_keeps_the_order_queued_until_the_recovery_sweep() {
    let h = harness(two_text_weeks(), Photos::png());
    h.provider
        .respond(Err(PipelineError::SubmissionRateExceeded { backlog: 350 }))
        .await;
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();

    assert_eq!(
        h.coordinator.run_pipeline(&o1()).await.unwrap(),
        OrderStatus::Rendering
    );
    let queued = h.orders.get(&o1()).await.unwrap().unwrap();
    assert!(queued.artifacts.is_some());
    assert!(queued.last_error.is_some());

    let runs = h.coordinator.resume_incomplete().await.unwrap();
    assert_eq!(runs.len(), 1);
    finish(runs).await;
    assert_eq!(status(&h, &o1()).await, OrderStatus::Submitted);
    // Recorded artifacts were reused, not rendered again.
    assert_eq!(h.bucket.puts.lock().await.len(), 2);
    assert_eq!(h.provider.calls().await, 2);
}

#[tokio::test]
async fn unavailable_provider_is_retried_then_left_for_recovery() {
    let h = harness(two_text_weeks(), Photos::png());
    for _ in 0..4 {
        h.provider
            .respond(Err(PipelineError::ProviderUnavailable("502".into())))
            .await;
    }
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();

    assert_eq!(
        h.coordinator.run_pipeline(&o1()).await.unwrap(),
        OrderStatus::Rendering
    );
    assert_eq!(h.provider.calls().await, 4);

    finish(h.coordinator.resume_incomplete().await.unwrap()).await;
    assert_eq!(status(&h, &o1()).await, OrderStatus::Submitted);
}

// ---------------------------------------------------------------------------
// Admin, expiry, recovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_fail_cancels_an_in_flight_run() {
    let h = harness(two_text_weeks(), Photos::png());
    h.provider.hang();
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();

    let run = h.coordinator.spawn_pipeline(o1());
    h.provider.entered.notified().await;

    let failed = h
        .coordinator
        .admin_fail(&o1(), "Cancelled at customer request")
        .await
        .unwrap();
    assert_eq!(failed.status, OrderStatus::Failed);
    run.await.unwrap();

    let stored = h.orders.get(&o1()).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Failed);
    assert_eq!(
        stored.last_error.as_deref(),
        Some("Cancelled at customer request")
    );
    assert!(stored.artifacts.is_some());
    assert!(stored.provider_order_id.is_none());
}

#[tokio::test]
async fn admin_can_fail_a_shipped_order() {
    let h = harness(two_text_weeks(), Photos::png());
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();
    h.coordinator.run_pipeline(&o1()).await.unwrap();
    for event in [ProviderEvent::Accepted, ProviderEvent::Shipped] {
        h.coordinator
            .apply_provider_event(&o1(), event, None)
            .await
            .unwrap();
    }

    // The vendor cannot fail a shipped order, but an admin can.
    assert_eq!(
        h.coordinator
            .apply_provider_event(&o1(), ProviderEvent::Failed, None)
            .await
            .unwrap(),
        EventOutcome::Discarded
    );
    let failed = h
        .coordinator
        .admin_fail(&o1(), "Lost in transit")
        .await
        .unwrap();
    assert_eq!(failed.status, OrderStatus::Failed);
    assert_eq!(failed.last_error.as_deref(), Some("Lost in transit"));
}

#[tokio::test]
async fn admin_fail_rejects_terminal_and_unknown_orders() {
    let h = harness(two_text_weeks(), Photos::png());
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.admin_fail(&o1(), "test").await.unwrap();

    assert_matches!(
        h.coordinator.admin_fail(&o1(), "again").await,
        Err(PipelineError::InvalidTransition {
            from: OrderStatus::Failed,
            ..
        })
    );
    assert_matches!(
        h.coordinator.admin_fail(&OrderId::from("ghost"), "x").await,
        Err(PipelineError::NotFound { entity: "Order", .. })
    );
}

#[tokio::test]
async fn unpaid_orders_expire_after_the_window() {
    let h = harness(two_text_weeks(), Photos::png());
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.create_order(new_order("o2")).await.unwrap();
    h.coordinator
        .confirm_payment(&OrderId::from("o2"), "pay")
        .await
        .unwrap();

    let now = Utc::now();
    assert_eq!(
        h.coordinator
            .expire_stale(now + Duration::hours(23))
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        h.coordinator
            .expire_stale(now + Duration::hours(25))
            .await
            .unwrap(),
        1
    );
    assert_eq!(status(&h, &o1()).await, OrderStatus::Expired);
    assert_eq!(
        status(&h, &OrderId::from("o2")).await,
        OrderStatus::PaymentConfirmed
    );
    assert_eq!(
        h.coordinator.confirm_payment(&o1(), "late").await.unwrap(),
        PaymentOutcome::NotPayable(OrderStatus::Expired)
    );
}

#[tokio::test]
async fn recovery_resumes_paid_orders_left_by_a_restart() {
    let h = harness(two_text_weeks(), Photos::png());
    for id in ["o1", "o2"] {
        h.coordinator.create_order(new_order(id)).await.unwrap();
        h.coordinator
            .confirm_payment(&OrderId::from(id), "pay")
            .await
            .unwrap();
    }

    let runs = h.coordinator.resume_incomplete().await.unwrap();
    assert_eq!(runs.len(), 2);
    finish(runs).await;
    assert_eq!(status(&h, &o1()).await, OrderStatus::Submitted);
    assert_eq!(status(&h, &OrderId::from("o2")).await, OrderStatus::Submitted);
    assert!(h.coordinator.resume_incomplete().await.unwrap().is_empty());
    assert_eq!(h.provider.calls().await, 2);
}

#[tokio::test]
async fn recovery_skips_orders_with_a_run_in_flight() {
    let h = harness(two_text_weeks(), Photos::png());
    h.provider.hang();
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();

    let runs = h.coordinator.resume_incomplete().await.unwrap();
    assert_eq!(runs.len(), 1);
    h.provider.entered.notified().await;

    assert!(h.coordinator.resume_incomplete().await.unwrap().is_empty());
    assert_eq!(h.provider.calls().await, 1);
    h.coordinator.shutdown();
}

#[tokio::test]
async fn sweeper_keeps_expiring_orders_while_a_submission_is_queued() {
    let config = PipelineConfig {
        order_expiry: Duration::milliseconds(50),
        sweep_interval: std::time::Duration::from_millis(20),
        ..PipelineConfig::default()
    };
    let h = harness_with_config(two_text_weeks(), Photos::png(), config);
    h.provider.hang();
    h.coordinator.create_order(new_order("o1")).await.unwrap();
    h.coordinator.confirm_payment(&o1(), "pay").await.unwrap();

    let cancel = CancellationToken::new();
    let sweeper = tokio::spawn(h.coordinator.clone().run_sweepers(cancel.clone()));
    // The first sweep resumes o1, whose submission never returns.
    h.provider.entered.notified().await;

    let o2 = OrderId::from("o2");
    h.coordinator.create_order(new_order("o2")).await.unwrap();
    let mut expired = false;
    for _ in 0..100 {
        if status(&h, &o2).await == OrderStatus::Expired {
            expired = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    cancel.cancel();
    sweeper.await.unwrap();
    h.coordinator.shutdown();

    assert!(expired, "unpaid order was not expired while o1 was queued");
    assert_eq!(status(&h, &o1()).await, OrderStatus::Rendering);
    assert_eq!(h.provider.calls().await, 1);
}

// ---------------------------------------------------------------------------
// Order creation errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn creation_rejects_bad_input() {
    let h = harness(two_text_weeks(), Photos::png());

    let mut unknown_child = new_order("o1");
    unknown_child.child_id = ChildId::from("nobody");
    assert_matches!(
        h.coordinator.create_order(unknown_child).await,
        Err(PipelineError::NotFound { entity: "Child", .. })
    );

    let mut unknown_format = new_order("o1");
    unknown_format.format_key = "poster_24x36".into();
    assert_matches!(
        h.coordinator.create_order(unknown_format).await,
        Err(PipelineError::NotFound { entity: "Format", .. })
    );

    // The built-in profiles need at least 40 pages.
    let mut too_small = new_order("o1");
    too_small.format_key = "softcover_7x7".into();
    assert_matches!(
        h.coordinator.create_order(too_small).await,
        Err(PipelineError::ManifestTooSmall { pages: 4, min: 40 })
    );

    let mut bad_quantity = new_order("o1");
    bad_quantity.quantity = 11;
    assert_matches!(
        h.coordinator.create_order(bad_quantity).await,
        Err(PipelineError::Validation(_))
    );

    let mut bad_address = new_order("o1");
    bad_address.shipping.zip = String::new();
    assert_matches!(
        h.coordinator.create_order(bad_address).await,
        Err(PipelineError::Validation(_))
    );

    assert!(h.orders.is_empty().await);
}
