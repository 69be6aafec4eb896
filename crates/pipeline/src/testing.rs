//! Shared fixtures for unit tests.

use chrono::Utc;
use unwritten_core::entry::{Child, DateRange, Entry, PhotoRef};
use unwritten_core::format::{softcover_7x7, FormatProfile};
use unwritten_core::manifest::{BookManifest, CoverTemplate, FormatSelection};
use unwritten_core::order::{Order, ShippingAddress, ShippingMethod};
use unwritten_core::types::{ChildId, OrderId};

/// Softcover geometry with page bounds loose enough for short test books.
pub fn profile() -> FormatProfile {
    FormatProfile {
        key: "test_7x7".into(),
        min_pages: 2,
        ..softcover_7x7()
    }
}

pub fn child() -> Child {
    Child {
        id: ChildId::from("c1"),
        name: "Emma".into(),
    }
}

pub fn entry(date: &str, text: &str, photo: Option<&str>) -> Entry {
    Entry {
        child_id: ChildId::from("c1"),
        entry_date: date.parse().unwrap(),
        text: text.into(),
        photo: photo.map(|p| PhotoRef(format!("https://cdn.test/{p}"))),
        prompt: None,
    }
}

/// 2025-06-01..14: two text weeks.
pub fn two_weeks() -> Vec<Entry> {
    vec![
        entry("2025-06-01", "First trip to the lake.", None),
        entry("2025-06-03", "Said 'more' at breakfast.", None),
        entry("2025-06-09", "Built a tower of six blocks.", None),
        entry("2025-06-14", "Fell asleep in the wagon.", None),
    ]
}

/// One photo week: two photo entries plus a text row.
pub fn photo_week() -> Vec<Entry> {
    vec![
        entry("2025-06-01", "Lake day.", Some("c1/0601.png")),
        entry("2025-06-02", "Blocks.", Some("c1/0602.png")),
        entry("2025-06-04", "Nap in the wagon.", None),
    ]
}

pub fn manifest(entries: &[Entry]) -> BookManifest {
    let range =
        DateRange::new("2025-06-01".parse().unwrap(), "2025-06-14".parse().unwrap()).unwrap();
    let format = FormatSelection::new(profile(), CoverTemplate::Garden, 1).unwrap();
    BookManifest::build(&child(), range, format, entries).unwrap()
}

pub fn shipping() -> ShippingAddress {
    ShippingAddress {
        name: "Sam Rivera".into(),
        street1: "12 Elm St".into(),
        street2: None,
        city: "Portland".into(),
        state: "OR".into(),
        zip: "97201".into(),
        country: "US".into(),
        method: ShippingMethod::Standard,
    }
}

/// A `created` order over `entries`.
pub fn order(id: &str, entries: &[Entry]) -> Order {
    Order::new(
        OrderId::from(id),
        "parent@example.com".into(),
        manifest(entries),
        shipping(),
        Utc::now(),
    )
}
