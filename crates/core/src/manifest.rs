//! Book manifest: the complete, versioned description of one book's pages
//! before rendering.

use serde::{Deserialize, Serialize};

use crate::entry::{Child, DateRange, Entry};
use crate::error::{CoreError, PipelineError};
use crate::format::{CoverSpread, FormatProfile, PageGeometry};
use crate::hashing::sha256_hex;
use crate::layout::layout_pages;
use crate::types::{CalendarDate, ChildId};

/// Bumped whenever the manifest's serialized shape or layout rules change.
pub const MANIFEST_VERSION: u32 = 1;

/// Copies per order.
pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 10;

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    CoverFront,
    TextWeek,
    PhotoWeek,
    Filler,
    CoverBack,
}

impl PageKind {
    pub fn is_cover(self) -> bool {
        matches!(self, Self::CoverFront | Self::CoverBack)
    }
}

/// One page of the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDescription {
    /// Zero-based position; the front cover is 0.
    pub position: u32,
    pub kind: PageKind,
    /// Start of the calendar week this page covers (weekly pages only).
    pub week_of: Option<CalendarDate>,
    /// True for the second and later pages of one photo week.
    pub continuation: bool,
    /// Date of the entry shown as the highlighted photo card.
    pub highlight: Option<CalendarDate>,
    /// Entries on this page in date order (weekly pages only).
    pub entries: Vec<Entry>,
    pub geometry: PageGeometry,
}

impl PageDescription {
    pub fn highlighted_entry(&self) -> Option<&Entry> {
        let date = self.highlight?;
        self.entries.iter().find(|e| e.entry_date == date)
    }

    /// Entries shown as plain rows (everything but the highlighted card).
    pub fn rows(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |e| Some(e.entry_date) != self.highlight)
    }
}

// ---------------------------------------------------------------------------
// Format selection
// ---------------------------------------------------------------------------

/// Cover artwork theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverTemplate {
    #[default]
    Garden,
    Ocean,
    Sunrise,
    Meadow,
    Classic,
}

impl CoverTemplate {
    pub const ALL: [CoverTemplate; 5] = [
        Self::Garden,
        Self::Ocean,
        Self::Sunrise,
        Self::Meadow,
        Self::Classic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Garden => "garden",
            Self::Ocean => "ocean",
            Self::Sunrise => "sunrise",
            Self::Meadow => "meadow",
            Self::Classic => "classic",
        }
    }

    /// Background RGB (0..=1) of the cover panels.
    pub fn background_rgb(self) -> (f64, f64, f64) {
        match self {
            Self::Garden => (0.89, 0.93, 0.85),
            Self::Ocean => (0.84, 0.91, 0.96),
            Self::Sunrise => (0.99, 0.90, 0.80),
            Self::Meadow => (0.93, 0.95, 0.80),
            Self::Classic => (0.97, 0.96, 0.93),
        }
    }
}

/// The customer's product choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSelection {
    pub profile: FormatProfile,
    #[serde(default)]
    pub cover_template: CoverTemplate,
    pub quantity: u32,
}

impl FormatSelection {
    pub fn new(
        profile: FormatProfile,
        cover_template: CoverTemplate,
        quantity: u32,
    ) -> Result<Self, CoreError> {
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
            return Err(CoreError::Validation(format!(
                "Quantity must be between {MIN_QUANTITY} and {MAX_QUANTITY}"
            )));
        }
        Ok(Self {
            profile,
            cover_template,
            quantity,
        })
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookManifest {
    pub version: u32,
    pub child_id: ChildId,
    pub child_name: String,
    pub range: DateRange,
    pub format: FormatSelection,
    pub pages: Vec<PageDescription>,
    pub page_count: u32,
    /// SHA-256 over the serialized pages and selection. Two manifests with
    /// the same digest render to identical artifacts.
    pub digest: String,
}

impl BookManifest {
    /// Lay out `entries` and wrap the result with its selection metadata.
    pub fn build(
        child: &Child,
        range: DateRange,
        format: FormatSelection,
        entries: &[Entry],
    ) -> Result<Self, PipelineError> {
        let pages = layout_pages(entries, &format.profile)?;
        let page_count = pages.len() as u32;
        let digest = manifest_digest(child, &range, &format, &pages)?;

        Ok(Self {
            version: MANIFEST_VERSION,
            child_id: child.id.clone(),
            child_name: child.name.clone(),
            range,
            format,
            pages,
            page_count,
            digest,
        })
    }

    /// Pages printed in the interior document (everything but the covers).
    pub fn interior_pages(&self) -> impl Iterator<Item = &PageDescription> {
        self.pages.iter().filter(|p| !p.kind.is_cover())
    }

    pub fn cover_spread(&self) -> CoverSpread {
        self.format.profile.cover_spread(self.page_count)
    }

    /// Entries across all pages, in page order.
    pub fn entry_count(&self) -> usize {
        self.pages.iter().map(|p| p.entries.len()).sum()
    }
}

fn manifest_digest(
    child: &Child,
    range: &DateRange,
    format: &FormatSelection,
    pages: &[PageDescription],
) -> Result<String, PipelineError> {
    #[derive(Serialize)]
    struct DigestInput<'a> {
        version: u32,
        child: &'a Child,
        range: &'a DateRange,
        format: &'a FormatSelection,
        pages: &'a [PageDescription],
    }

    let bytes = serde_json::to_vec(&DigestInput {
        version: MANIFEST_VERSION,
        child,
        range,
        format,
        pages,
    })
    .map_err(|e| PipelineError::Render(format!("Manifest serialization failed: {e}")))?;
    Ok(sha256_hex(&bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
