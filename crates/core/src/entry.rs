//! Journal entries, children, and inclusive date ranges.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{CalendarDate, ChildId};

/// Maximum length of an entry's text, in characters.
pub const MAX_ENTRY_CHARS: usize = 280;

/// Default maximum span of a book's date range (days).
pub const DEFAULT_MAX_RANGE_DAYS: i64 = 366;

// ---------------------------------------------------------------------------
// Child
// ---------------------------------------------------------------------------

/// A child as known to the hosted entry store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    pub id: ChildId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// An entry row as returned by the entry store. `photo_path` is a storage
/// key, not yet a fetchable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub child_id: ChildId,
    pub entry_date: CalendarDate,
    pub text: String,
    pub photo_path: Option<String>,
    pub prompt: Option<String>,
}

/// Fetchable pointer to an entry photo (public URL). Not fetched until
/// render time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(pub String);

impl PhotoRef {
    pub fn url(&self) -> &str {
        &self.0
    }
}

/// An entry selected for a book, with its photo resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub child_id: ChildId,
    pub entry_date: CalendarDate,
    pub text: String,
    pub photo: Option<PhotoRef>,
    pub prompt: Option<String>,
}

impl Entry {
    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }

    /// Row label used on weekly pages, e.g. `Mon 1`.
    pub fn day_label(&self) -> String {
        format!("{} {}", self.entry_date.format("%a"), self.entry_date.day())
    }
}

/// Truncate `text` to at most [`MAX_ENTRY_CHARS`] characters. Returns the
/// input unchanged (borrowed) when it is within bounds.
pub fn clamp_entry_text(text: &str) -> std::borrow::Cow<'_, str> {
    match text.char_indices().nth(MAX_ENTRY_CHARS) {
        Some((cut, _)) => std::borrow::Cow::Owned(text[..cut].to_string()),
        None => std::borrow::Cow::Borrowed(text),
    }
}

// ---------------------------------------------------------------------------
// DateRange
// ---------------------------------------------------------------------------

/// Inclusive calendar date range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: CalendarDate,
    end: CalendarDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: CalendarDate,
    end: CalendarDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = CoreError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: CalendarDate, end: CalendarDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::Validation(format!(
                "Date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> CalendarDate {
        self.start
    }

    pub fn end(&self) -> CalendarDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Reject ranges longer than `max_days`.
    pub fn ensure_max_span(&self, max_days: i64) -> Result<(), CoreError> {
        let days = self.span_days();
        if days > max_days {
            return Err(CoreError::Validation(format!(
                "Date range spans {days} days; the maximum is {max_days}"
            )));
        }
        Ok(())
    }

    /// Cover label, e.g. `JUNE 2025 — MAY 2026` (or just `JUNE 2025` when
    /// both ends fall in the same month).
    pub fn cover_label(&self) -> String {
        let start = self.start.format("%B %Y").to_string().to_uppercase();
        let end = self.end.format("%B %Y").to_string().to_uppercase();
        if start == end {
            start
        } else {
            format!("{start} \u{2014} {end}")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> CalendarDate {
        s.parse().unwrap()
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!(DateRange::new(d("2025-06-14"), d("2025-06-01")).is_err());
        assert!(DateRange::new(d("2025-06-01"), d("2025-06-01")).is_ok());
    }

    #[test]
    fn range_span_is_inclusive() {
        let r = DateRange::new(d("2025-06-01"), d("2025-06-14")).unwrap();
        assert_eq!(r.span_days(), 14);
        assert!(r.contains(d("2025-06-01")));
        assert!(r.contains(d("2025-06-14")));
        assert!(!r.contains(d("2025-06-15")));
    }

    #[test]
    fn range_max_span() {
        let r = DateRange::new(d("2025-06-01"), d("2026-05-31")).unwrap();
        assert!(r.ensure_max_span(DEFAULT_MAX_RANGE_DAYS).is_ok());
        let long = DateRange::new(d("2025-01-01"), d("2026-06-01")).unwrap();
        assert!(long.ensure_max_span(DEFAULT_MAX_RANGE_DAYS).is_err());
    }

    #[test]
    fn range_deserialization_enforces_order() {
        let ok: Result<DateRange, _> =
            serde_json::from_str(r#"{"start":"2025-06-01","end":"2026-05-31"}"#);
        assert!(ok.is_ok());
        let bad: Result<DateRange, _> =
            serde_json::from_str(r#"{"start":"2026-06-01","end":"2025-05-31"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn cover_label_formats_months() {
        let r = DateRange::new(d("2025-06-01"), d("2026-05-31")).unwrap();
        assert_eq!(r.cover_label(), "JUNE 2025 \u{2014} MAY 2026");
        let same = DateRange::new(d("2025-06-01"), d("2025-06-14")).unwrap();
        assert_eq!(same.cover_label(), "JUNE 2025");
    }

    #[test]
    fn clamp_text_respects_char_boundaries() {
        let short = "Said 'more' at dinner.";
        assert_eq!(clamp_entry_text(short), short);

        let long: String = "é".repeat(MAX_ENTRY_CHARS + 10);
        let clamped = clamp_entry_text(&long);
        assert_eq!(clamped.chars().count(), MAX_ENTRY_CHARS);
    }

    #[test]
    fn day_label_uses_short_weekday() {
        let entry = Entry {
            child_id: ChildId::from("c1"),
            entry_date: d("2025-09-01"),
            text: "First day of daycare.".into(),
            photo: None,
            prompt: None,
        };
        assert_eq!(entry.day_label(), "Mon 1");
    }
}
