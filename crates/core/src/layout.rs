//! Layout engine: turns a date-ordered entry sequence into the page
//! sequence of a book.
//!
//! Rules:
//!
//! - Entries are grouped into calendar weeks starting on [`WEEK_START`].
//!   Weeks without entries produce no page.
//! - A week with at least [`PHOTO_WEEK_MIN_PHOTOS`] photo entries becomes a
//!   photo-week page: its first photo entry is the highlighted card and the
//!   remaining entries are plain rows, at most [`PHOTO_WEEK_MAX_ROWS`] per
//!   page. Entries that do not fit spill onto continuation pages of the same
//!   kind, each highlighting the first photo entry among the spilled ones.
//! - Every other week is a single text-week page.
//! - A front cover and a back cover bracket the interior; a filler page is
//!   inserted before the back cover when needed to make the count even.
//!
//! The function is pure and deterministic. Input order is irrelevant.

use chrono::{Datelike, Duration, Weekday};

use crate::entry::Entry;
use crate::error::PipelineError;
use crate::format::FormatProfile;
use crate::manifest::{PageDescription, PageKind};
use crate::types::CalendarDate;

/// First day of a layout week.
pub const WEEK_START: Weekday = Weekday::Sun;

/// Photo entries needed in one week to switch it to a photo-week page.
pub const PHOTO_WEEK_MIN_PHOTOS: usize = 2;

/// Plain rows on one photo-week page (besides the highlighted card).
pub const PHOTO_WEEK_MAX_ROWS: usize = 4;

/// Start date of the layout week containing `date`.
pub fn week_start_of(date: CalendarDate) -> CalendarDate {
    let offset = (7 + date.weekday().num_days_from_sunday()
        - WEEK_START.num_days_from_sunday())
        % 7;
    date - Duration::days(i64::from(offset))
}

/// Lay out `entries` for `profile`.
///
/// Fails with [`PipelineError::ManifestTooSmall`] or
/// [`PipelineError::ManifestTooLarge`] when the resulting page count falls
/// outside the profile's bounds.
pub fn layout_pages(
    entries: &[Entry],
    profile: &FormatProfile,
) -> Result<Vec<PageDescription>, PipelineError> {
    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.entry_date);

    let mut pages = vec![PageDraft::bare(PageKind::CoverFront)];
    for (week_of, week) in group_by_week(&sorted) {
        pages.extend(layout_week(week_of, &week));
    }
    if (pages.len() + 1) % 2 != 0 {
        pages.push(PageDraft::bare(PageKind::Filler));
    }
    pages.push(PageDraft::bare(PageKind::CoverBack));

    let total = u32::try_from(pages.len()).unwrap_or(u32::MAX);
    profile.check_page_count(total)?;

    let geometry = profile.page_geometry();
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(position, draft)| PageDescription {
            position: position as u32,
            kind: draft.kind,
            week_of: draft.week_of,
            continuation: draft.continuation,
            highlight: draft.highlight,
            entries: draft.entries,
            geometry,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct PageDraft {
    kind: PageKind,
    week_of: Option<CalendarDate>,
    continuation: bool,
    highlight: Option<CalendarDate>,
    entries: Vec<Entry>,
}

impl PageDraft {
    fn bare(kind: PageKind) -> Self {
        Self {
            kind,
            week_of: None,
            continuation: false,
            highlight: None,
            entries: Vec::new(),
        }
    }
}

/// Group date-sorted entries into consecutive calendar weeks.
fn group_by_week<'a>(sorted: &[&'a Entry]) -> Vec<(CalendarDate, Vec<&'a Entry>)> {
    let mut weeks: Vec<(CalendarDate, Vec<&'a Entry>)> = Vec::new();
    for entry in sorted {
        let week_of = week_start_of(entry.entry_date);
        match weeks.last_mut() {
            Some((current, group)) if *current == week_of => group.push(entry),
            _ => weeks.push((week_of, vec![entry])),
        }
    }
    weeks
}

fn layout_week(week_of: CalendarDate, week: &[&Entry]) -> Vec<PageDraft> {
    let photos = week.iter().filter(|e| e.has_photo()).count();
    if photos < PHOTO_WEEK_MIN_PHOTOS {
        return vec![PageDraft {
            kind: PageKind::TextWeek,
            week_of: Some(week_of),
            continuation: false,
            highlight: None,
            entries: week.iter().map(|e| (*e).clone()).collect(),
        }];
    }

    let mut pages = Vec::new();
    let mut remaining: Vec<&Entry> = week.to_vec();
    while !remaining.is_empty() {
        let highlight = remaining
            .iter()
            .position(|e| e.has_photo())
            .map(|idx| remaining.remove(idx));

        let take = remaining.len().min(PHOTO_WEEK_MAX_ROWS);
        let mut on_page: Vec<&Entry> = remaining.drain(..take).collect();
        if let Some(card) = highlight {
            on_page.push(card);
        }
        on_page.sort_by_key(|e| e.entry_date);

        pages.push(PageDraft {
            kind: PageKind::PhotoWeek,
            week_of: Some(week_of),
            continuation: !pages.is_empty(),
            highlight: highlight.map(|e| e.entry_date),
            entries: on_page.into_iter().cloned().collect(),
        });
    }
    pages
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
