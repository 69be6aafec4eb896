//! Print format catalog: trim size, bleed, safe area, page-count bounds,
//! and cover spine formula per supported product.
//!
//! All geometry is stored in inches. Renderers convert to PDF points via
//! [`POINTS_PER_INCH`]. Adding a product means adding a profile here (or
//! registering one at runtime); render logic reads everything from the
//! profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, PipelineError};

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Catalog key of the default product.
pub const DEFAULT_FORMAT_KEY: &str = "softcover_7x7";

// ---------------------------------------------------------------------------
// Profile types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverMaterial {
    Softcover,
    Hardcover,
}

/// Bleed extending past the trim line on each edge of an interior page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bleed {
    pub top_in: f64,
    pub bottom_in: f64,
    pub outside_in: f64,
    pub gutter_in: f64,
}

/// Spine width = `base_in + pages * per_page_in`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpineFormula {
    pub base_in: f64,
    pub per_page_in: f64,
}

/// A supported print product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatProfile {
    /// Catalog key, e.g. `softcover_7x7`.
    pub key: String,
    /// Provider SKU sent on the create-order call.
    pub sku: String,
    pub label: String,
    pub material: CoverMaterial,
    pub trim_width_in: f64,
    pub trim_height_in: f64,
    pub bleed: Bleed,
    /// Inset from the trim edge that text and photos must stay inside.
    pub safe_area_in: f64,
    pub min_pages: u32,
    pub max_pages: u32,
    pub spine: SpineFormula,
}

/// Geometry of one interior page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub trim_width_in: f64,
    pub trim_height_in: f64,
    pub bleed: Bleed,
    pub safe_area_in: f64,
}

impl PageGeometry {
    /// Full media width including outside and gutter bleed.
    pub fn media_width_in(&self) -> f64 {
        self.trim_width_in + self.bleed.outside_in + self.bleed.gutter_in
    }

    /// Full media height including top and bottom bleed.
    pub fn media_height_in(&self) -> f64 {
        self.trim_height_in + self.bleed.top_in + self.bleed.bottom_in
    }
}

/// Geometry of the single-page cover spread (back | spine | front).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverSpread {
    pub width_in: f64,
    pub height_in: f64,
    pub spine_in: f64,
    /// Bleed on every outer edge of the spread.
    pub bleed_in: f64,
    pub panel_width_in: f64,
    pub panel_height_in: f64,
}

impl FormatProfile {
    pub fn page_geometry(&self) -> PageGeometry {
        PageGeometry {
            trim_width_in: self.trim_width_in,
            trim_height_in: self.trim_height_in,
            bleed: self.bleed,
            safe_area_in: self.safe_area_in,
        }
    }

    pub fn spine_width_in(&self, pages: u32) -> f64 {
        self.spine.base_in + f64::from(pages) * self.spine.per_page_in
    }

    /// Cover spread for a book of `pages` pages. Outer bleed matches the
    /// interior outside bleed.
    pub fn cover_spread(&self, pages: u32) -> CoverSpread {
        let spine_in = self.spine_width_in(pages);
        let bleed_in = self.bleed.outside_in;
        CoverSpread {
            width_in: 2.0 * self.trim_width_in + spine_in + 2.0 * bleed_in,
            height_in: self.trim_height_in + 2.0 * bleed_in,
            spine_in,
            bleed_in,
            panel_width_in: self.trim_width_in,
            panel_height_in: self.trim_height_in,
        }
    }

    /// Check a total page count against this product's bounds.
    pub fn check_page_count(&self, pages: u32) -> Result<(), PipelineError> {
        if pages < self.min_pages {
            return Err(PipelineError::ManifestTooSmall {
                pages,
                min: self.min_pages,
            });
        }
        if pages > self.max_pages {
            return Err(PipelineError::ManifestTooLarge {
                pages,
                max: self.max_pages,
            });
        }
        Ok(())
    }

    /// Structural checks applied when a profile enters the catalog.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.key.trim().is_empty() || self.sku.trim().is_empty() {
            return Err(CoreError::Validation(
                "Format profile requires a non-empty key and sku".into(),
            ));
        }
        let lengths = [
            self.trim_width_in,
            self.trim_height_in,
            self.bleed.top_in,
            self.bleed.bottom_in,
            self.bleed.outside_in,
            self.bleed.gutter_in,
            self.safe_area_in,
            self.spine.base_in,
            self.spine.per_page_in,
        ];
        if lengths.iter().any(|v| !v.is_finite() || *v < 0.0)
            || self.trim_width_in == 0.0
            || self.trim_height_in == 0.0
        {
            return Err(CoreError::Validation(format!(
                "Format profile '{}' has invalid geometry",
                self.key
            )));
        }
        if 2.0 * self.safe_area_in >= self.trim_width_in.min(self.trim_height_in) {
            return Err(CoreError::Validation(format!(
                "Format profile '{}' safe area leaves no printable region",
                self.key
            )));
        }
        if self.min_pages > self.max_pages || self.min_pages < 2 || self.max_pages % 2 != 0 {
            return Err(CoreError::Validation(format!(
                "Format profile '{}' has invalid page bounds {}..={}",
                self.key, self.min_pages, self.max_pages
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Built-in profiles
// ---------------------------------------------------------------------------

const SQUARE_7X7_BLEED: Bleed = Bleed {
    top_in: 0.125,
    bottom_in: 0.125,
    outside_in: 0.125,
    gutter_in: 0.0,
};

/// 7x7" square softcover on premium lustre paper.
pub fn softcover_7x7() -> FormatProfile {
    FormatProfile {
        key: DEFAULT_FORMAT_KEY.into(),
        sku: "7x7_softcover_lustre".into(),
        label: "7x7\" Square Softcover".into(),
        material: CoverMaterial::Softcover,
        trim_width_in: 7.0,
        trim_height_in: 7.0,
        bleed: SQUARE_7X7_BLEED,
        safe_area_in: 0.25,
        min_pages: 40,
        max_pages: 80,
        spine: SpineFormula {
            base_in: 0.005,
            per_page_in: 0.002,
        },
    }
}

/// 7x7" square hardcover (image wrap) on premium lustre paper.
pub fn hardcover_7x7() -> FormatProfile {
    FormatProfile {
        key: "hardcover_7x7".into(),
        sku: "7x7_hardcover_lustre".into(),
        label: "7x7\" Square Hardcover".into(),
        material: CoverMaterial::Hardcover,
        spine: SpineFormula {
            base_in: 0.25,
            per_page_in: 0.002,
        },
        ..softcover_7x7()
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Set of supported formats keyed by profile key. Iteration order is the
/// key order, so listings are stable.
#[derive(Debug, Clone)]
pub struct FormatCatalog {
    profiles: BTreeMap<String, FormatProfile>,
}

impl Default for FormatCatalog {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        for profile in [softcover_7x7(), hardcover_7x7()] {
            profiles.insert(profile.key.clone(), profile);
        }
        Self { profiles }
    }
}

impl FormatCatalog {
    /// Catalog with no entries (for tests that register their own).
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Add or replace a profile after validating it.
    pub fn register(&mut self, profile: FormatProfile) -> Result<(), CoreError> {
        profile.validate()?;
        self.profiles.insert(profile.key.clone(), profile);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<&FormatProfile, CoreError> {
        self.profiles.get(key).ok_or_else(|| CoreError::NotFound {
            entity: "Format",
            id: key.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormatProfile> {
        self.profiles.values()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
