//! Book templates: the cover spread and the interior pages, drawn onto the
//! PDF canvas from manifest geometry.

use std::collections::HashMap;

use unwritten_core::entry::{Entry, PhotoRef};
use unwritten_core::manifest::{BookManifest, PageDescription, PageKind};

use super::pdf::{wrap, Canvas, Font, ImageId, PageBoxes, Rect, Rgb, PT};

const CREAM: Rgb = Rgb::hex(0xFFF8F0);
const SAGE: Rgb = Rgb::hex(0x7C9A82);
const CORAL: Rgb = Rgb::hex(0xE8836B);
const DARK: Rgb = Rgb::hex(0x2C2C2C);
const WARM_GRAY: Rgb = Rgb::hex(0x8B8178);
const CARD: Rgb = Rgb::hex(0xF0E6D6);

const TITLE: &str = "One Line a Day";
const TAGLINE: [&str; 2] = ["\u{201C}365 tiny moments.", "One big story.\u{201D}"];
const BRANDING: &str = "MADE WITH UNWRITTEN";

/// Square photo size on a highlighted card.
pub const PHOTO_CARD_IN: f64 = 1.6;
const CARD_PAD_IN: f64 = 0.12;
/// Left column holding the `Mon 1` day labels.
const LABEL_COLUMN_IN: f64 = 0.6;
/// Spines narrower than this carry no text.
const MIN_SPINE_TEXT_IN: f64 = 0.25;

/// Body sizes tried in order until a page's rows fit.
const BODY_SIZES: [f64; 4] = [10.5, 9.5, 8.5, 7.5];
const LEADING: f64 = 1.45;
const ROW_GAP: f64 = 7.0;
const LABEL_SIZE: f64 = 9.0;

/// A prepared photo ready to place on a page.
#[derive(Debug, Clone, Copy)]
pub struct PlacedPhoto {
    pub image: ImageId,
    pub width: u32,
    pub height: u32,
}

// ---------------------------------------------------------------------------
// Cover
// ---------------------------------------------------------------------------

/// The single-page cover spread: back | spine | front.
pub fn cover_spread(manifest: &BookManifest) -> (PageBoxes, Canvas) {
    let spread = manifest.cover_spread();
    let bleed = spread.bleed_in * PT;
    let media_w = spread.width_in * PT;
    let media_h = spread.height_in * PT;
    let panel_w = spread.panel_width_in * PT;
    let panel_h = spread.panel_height_in * PT;
    let spine_w = spread.spine_in * PT;

    let boxes = PageBoxes {
        media_w,
        media_h,
        bleed: Rect::new(0.0, 0.0, media_w, media_h),
        trim: Rect::new(bleed, bleed, media_w - 2.0 * bleed, media_h - 2.0 * bleed),
    };

    let (r, g, b) = manifest.format.cover_template.background_rgb();
    let background = Rgb(r, g, b);

    let back = Rect::new(bleed, bleed, panel_w, panel_h);
    let spine = Rect::new(bleed + panel_w, bleed, spine_w, panel_h);
    let front = Rect::new(bleed + panel_w + spine_w, bleed, panel_w, panel_h);

    let mut canvas = Canvas::new();
    canvas.fill_rect(background, boxes.bleed);
    canvas.fill_rect(background.mix(DARK, 0.08), Rect::new(spine.x, 0.0, spine.w, media_h));

    // Front panel.
    let cx = front.center_x();
    let mid = front.y + front.h * 0.5;
    canvas.fill_circle(background.mix(Rgb::WHITE, 0.6), cx, mid + 0.95 * PT, 0.7 * PT);
    canvas.text_centered(Font::SerifBold, 22.0, DARK, cx, mid - 0.2 * PT, TITLE);
    canvas.text_centered(
        Font::SerifItalic,
        13.0,
        WARM_GRAY,
        cx,
        mid - 0.2 * PT - 24.0,
        &format!("{}'s Story", manifest.child_name),
    );
    canvas.line(SAGE, 1.0, cx - 20.0, mid - 0.2 * PT - 40.0, cx + 20.0, mid - 0.2 * PT - 40.0);
    canvas.text_centered(
        Font::Sans,
        11.0,
        WARM_GRAY,
        cx,
        mid - 0.2 * PT - 60.0,
        &manifest.range.cover_label(),
    );

    // Spine.
    if spread.spine_in >= MIN_SPINE_TEXT_IN {
        let size = (spine_w * 0.45).min(12.0);
        canvas.text_vertical(
            Font::SansBold,
            size,
            DARK,
            spine.center_x(),
            spine.y + spine.h / 2.0,
            &manifest.child_name.to_uppercase(),
        );
    }

    // Back panel.
    let bx = back.center_x();
    let bmid = back.y + back.h * 0.5;
    canvas.text_centered(Font::SerifItalic, 13.0, WARM_GRAY, bx, bmid + 20.0, TAGLINE[0]);
    canvas.text_centered(Font::SerifItalic, 13.0, WARM_GRAY, bx, bmid, TAGLINE[1]);
    canvas.line(SAGE, 1.0, bx - 15.0, bmid - 22.0, bx + 15.0, bmid - 22.0);
    canvas.text_centered(Font::Sans, 10.0, WARM_GRAY, bx, bmid - 46.0, BRANDING);

    (boxes, canvas)
}

// ---------------------------------------------------------------------------
// Interior
// ---------------------------------------------------------------------------

/// Page boxes of an interior page. Odd positions are rectos: gutter on the
/// left, outside bleed on the right. Even positions mirror that.
pub fn interior_boxes(page: &PageDescription) -> PageBoxes {
    let g = &page.geometry;
    let media_w = g.media_width_in() * PT;
    let media_h = g.media_height_in() * PT;
    let trim_x = if page.position % 2 == 1 {
        g.bleed.gutter_in
    } else {
        g.bleed.outside_in
    };
    PageBoxes {
        media_w,
        media_h,
        bleed: Rect::new(0.0, 0.0, media_w, media_h),
        trim: Rect::new(
            trim_x * PT,
            g.bleed.bottom_in * PT,
            g.trim_width_in * PT,
            g.trim_height_in * PT,
        ),
    }
}

pub fn interior_page(
    page: &PageDescription,
    photos: &HashMap<PhotoRef, PlacedPhoto>,
) -> (PageBoxes, Canvas) {
    let boxes = interior_boxes(page);
    let safe = boxes.trim.inset(page.geometry.safe_area_in * PT);

    let mut canvas = Canvas::new();
    canvas.fill_rect(CREAM, boxes.bleed);

    match page.kind {
        PageKind::TextWeek | PageKind::PhotoWeek => weekly(&mut canvas, page, safe, photos),
        PageKind::Filler => {
            let y = safe.y + safe.h / 2.0;
            canvas.line(SAGE, 1.0, safe.center_x() - 12.0, y, safe.center_x() + 12.0, y);
        }
        PageKind::CoverFront | PageKind::CoverBack => {}
    }
    (boxes, canvas)
}

fn weekly(
    canvas: &mut Canvas,
    page: &PageDescription,
    safe: Rect,
    photos: &HashMap<PhotoRef, PlacedPhoto>,
) {
    let mut y = safe.top() - LABEL_SIZE;
    if let Some(week_of) = page.week_of {
        let mut header = week_of.format("%B %Y").to_string().to_uppercase();
        if page.continuation {
            header.push_str(" (CONTINUED)");
        }
        canvas.text(Font::SansBold, LABEL_SIZE, SAGE, safe.x, y, &header);
    }
    canvas.line(SAGE.mix(CREAM, 0.6), 1.5, safe.x, y - 6.0, safe.x + 24.0, y - 6.0);
    y -= 22.0;

    if let Some(entry) = page.highlighted_entry() {
        y = photo_card(canvas, entry, safe, y, photos) - 12.0;
    }

    let rows: Vec<&Entry> = page.rows().collect();
    let text_w = safe.w - LABEL_COLUMN_IN * PT;
    let size = fit_body_size(&rows, text_w, y - safe.y);
    let leading = size * LEADING;

    for (i, entry) in rows.iter().enumerate() {
        let lines = wrap(&entry.text, Font::Serif, size, text_w);
        let baseline = y - size;
        canvas.text(Font::MonoBold, LABEL_SIZE, CORAL, safe.x, baseline, &entry.day_label());
        for (n, line) in lines.iter().enumerate() {
            let line_y = baseline - n as f64 * leading;
            if line_y < safe.y {
                break;
            }
            canvas.text(Font::Serif, size, DARK, safe.x + LABEL_COLUMN_IN * PT, line_y, line);
        }
        y -= lines.len().max(1) as f64 * leading + ROW_GAP;
        if i + 1 < rows.len() {
            let rule_y = y + ROW_GAP / 2.0;
            canvas.line(SAGE.mix(CREAM, 0.85), 0.5, safe.x, rule_y, safe.right(), rule_y);
        }
    }
}

/// Draw the highlighted card; returns its bottom edge.
fn photo_card(
    canvas: &mut Canvas,
    entry: &Entry,
    safe: Rect,
    top: f64,
    photos: &HashMap<PhotoRef, PlacedPhoto>,
) -> f64 {
    let pad = CARD_PAD_IN * PT;
    let side = PHOTO_CARD_IN * PT;
    let card = Rect::new(safe.x, top - side - 2.0 * pad, safe.w, side + 2.0 * pad);
    canvas.fill_rect(CARD, card);

    let slot = Rect::new(card.x + pad, card.y + pad, side, side);
    match entry.photo.as_ref().and_then(|p| photos.get(p)) {
        Some(photo) => canvas.image(photo.image, fit(slot, photo.width, photo.height)),
        None => canvas.fill_rect(SAGE.mix(CREAM, 0.5), slot),
    }

    let text_x = slot.right() + pad;
    let text_w = card.right() - pad - text_x;
    let mut baseline = card.top() - pad - LABEL_SIZE;
    canvas.text(Font::MonoBold, LABEL_SIZE, CORAL, text_x, baseline, &entry.day_label());
    baseline -= LABEL_SIZE + 4.0;
    for line in wrap(&entry.text, Font::Serif, 10.5, text_w) {
        if baseline < card.y + pad {
            break;
        }
        canvas.text(Font::Serif, 10.5, DARK, text_x, baseline, &line);
        baseline -= 10.5 * LEADING;
    }
    card.y
}

/// Largest body size whose rows fit in `available` points of height.
fn fit_body_size(rows: &[&Entry], text_w: f64, available: f64) -> f64 {
    let height_at = |size: f64| -> f64 {
        rows.iter()
            .map(|e| wrap(&e.text, Font::Serif, size, text_w).len().max(1) as f64 * size * LEADING)
            .sum::<f64>()
            + ROW_GAP * rows.len().saturating_sub(1) as f64
    };
    BODY_SIZES
        .iter()
        .copied()
        .find(|size| height_at(*size) <= available)
        .unwrap_or(BODY_SIZES[BODY_SIZES.len() - 1])
}

/// Centre an image of `w` x `h` pixels inside `slot`, keeping its aspect.
fn fit(slot: Rect, w: u32, h: u32) -> Rect {
    let (w, h) = (f64::from(w.max(1)), f64::from(h.max(1)));
    let scale = (slot.w / w).min(slot.h / h);
    let (dw, dh) = (w * scale, h * scale);
    Rect::new(slot.x + (slot.w - dw) / 2.0, slot.y + (slot.h - dh) / 2.0, dw, dh)
}
