//! Minimal PDF 1.4 writer for print artifacts.
//!
//! Supports exactly what the book templates need: filled rectangles and
//! circles, stroked lines, standard Type 1 fonts with WinAnsi encoding, and
//! JPEG image XObjects. Every page carries MediaBox, BleedBox and TrimBox.
//! Output contains no timestamps or random ids, so identical input yields
//! identical bytes.

use std::fmt::Write as _;

/// Points per inch.
pub const PT: f64 = 72.0;

/// RGB color, components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f64, pub f64, pub f64);

impl Rgb {
    pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);

    /// From a `0xRRGGBB` literal.
    pub const fn hex(value: u32) -> Rgb {
        Rgb(
            ((value >> 16) & 0xff) as f64 / 255.0,
            ((value >> 8) & 0xff) as f64 / 255.0,
            (value & 0xff) as f64 / 255.0,
        )
    }

    /// Blend toward `other` by `t` (0 = self, 1 = other).
    pub fn mix(self, other: Rgb, t: f64) -> Rgb {
        Rgb(
            self.0 + (other.0 - self.0) * t,
            self.1 + (other.1 - self.1) * t,
            self.2 + (other.2 - self.2) * t,
        )
    }
}

/// Axis-aligned rectangle in points, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn top(&self) -> f64 {
        self.y + self.h
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.w / 2.0
    }

    /// Shrink by `d` on every side.
    pub fn inset(&self, d: f64) -> Rect {
        Rect::new(self.x + d, self.y + d, self.w - 2.0 * d, self.h - 2.0 * d)
    }
}

// ---------------------------------------------------------------------------
// Fonts
// ---------------------------------------------------------------------------

/// The standard 14 fonts used by the templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Sans,
    SansBold,
    Serif,
    SerifBold,
    SerifItalic,
    MonoBold,
}

impl Font {
    const ALL: [Font; 6] = [
        Font::Sans,
        Font::SansBold,
        Font::Serif,
        Font::SerifBold,
        Font::SerifItalic,
        Font::MonoBold,
    ];

    fn base_name(self) -> &'static str {
        match self {
            Font::Sans => "Helvetica",
            Font::SansBold => "Helvetica-Bold",
            Font::Serif => "Times-Roman",
            Font::SerifBold => "Times-Bold",
            Font::SerifItalic => "Times-Italic",
            Font::MonoBold => "Courier-Bold",
        }
    }

    fn resource(self) -> &'static str {
        match self {
            Font::Sans => "F1",
            Font::SansBold => "F2",
            Font::Serif => "F3",
            Font::SerifBold => "F4",
            Font::SerifItalic => "F5",
            Font::MonoBold => "F6",
        }
    }

    /// Average glyph advance as a fraction of the font size. Good enough for
    /// wrapping and centering.
    fn avg_advance(self) -> f64 {
        match self {
            Font::Sans => 0.52,
            Font::SansBold => 0.56,
            Font::Serif | Font::SerifItalic => 0.46,
            Font::SerifBold => 0.5,
            Font::MonoBold => 0.6,
        }
    }

    pub fn text_width(self, size: f64, text: &str) -> f64 {
        text.chars().count() as f64 * size * self.avg_advance()
    }
}

/// Greedy word wrap to `max_width` points. Words wider than a line are
/// split.
pub fn wrap(text: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let max_chars = ((max_width / (size * font.avg_advance())).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Handle to an image registered with [`PdfDocument::add_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageId(usize);

/// Content stream of one page.
#[derive(Debug, Default)]
pub struct Canvas {
    ops: Vec<u8>,
    images: Vec<ImageId>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    fn op(&mut self, s: &str) {
        self.ops.extend_from_slice(s.as_bytes());
        self.ops.push(b'\n');
    }

    pub fn fill_rect(&mut self, color: Rgb, rect: Rect) {
        self.op(&format!(
            "{} rg {} {} {} {} re f",
            rgb(color),
            num(rect.x),
            num(rect.y),
            num(rect.w),
            num(rect.h)
        ));
    }

    /// Filled circle approximated by four Bézier arcs.
    pub fn fill_circle(&mut self, color: Rgb, cx: f64, cy: f64, r: f64) {
        const K: f64 = 0.552_284_75;
        let k = r * K;
        let mut path = format!("{} rg {} {} m", rgb(color), num(cx + r), num(cy));
        let _ = write!(
            path,
            " {} {} {} {} {} {} c",
            num(cx + r),
            num(cy + k),
            num(cx + k),
            num(cy + r),
            num(cx),
            num(cy + r)
        );
        let _ = write!(
            path,
            " {} {} {} {} {} {} c",
            num(cx - k),
            num(cy + r),
            num(cx - r),
            num(cy + k),
            num(cx - r),
            num(cy)
        );
        let _ = write!(
            path,
            " {} {} {} {} {} {} c",
            num(cx - r),
            num(cy - k),
            num(cx - k),
            num(cy - r),
            num(cx),
            num(cy - r)
        );
        let _ = write!(
            path,
            " {} {} {} {} {} {} c f",
            num(cx + k),
            num(cy - r),
            num(cx + r),
            num(cy - k),
            num(cx + r),
            num(cy)
        );
        self.op(&path);
    }

    pub fn line(&mut self, color: Rgb, width: f64, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.op(&format!(
            "{} RG {} w {} {} m {} {} l S",
            rgb(color),
            num(width),
            num(x1),
            num(y1),
            num(x2),
            num(y2)
        ));
    }

    /// Single line of text with its baseline starting at (`x`, `y`).
    pub fn text(&mut self, font: Font, size: f64, color: Rgb, x: f64, y: f64, text: &str) {
        self.op(&format!(
            "BT /{} {} Tf {} rg {} {} Td",
            font.resource(),
            num(size),
            rgb(color),
            num(x),
            num(y)
        ));
        self.ops.push(b'(');
        self.ops.extend(encode_text(text));
        self.ops.extend_from_slice(b") Tj ET\n");
    }

    /// Text centered horizontally on `cx`.
    pub fn text_centered(&mut self, font: Font, size: f64, color: Rgb, cx: f64, y: f64, text: &str) {
        let x = cx - font.text_width(size, text) / 2.0;
        self.text(font, size, color, x, y, text);
    }

    /// Text rotated 90° counter-clockwise, reading bottom to top, centered
    /// on (`cx`, `cy`). Used on spines.
    pub fn text_vertical(&mut self, font: Font, size: f64, color: Rgb, cx: f64, cy: f64, text: &str) {
        let half = font.text_width(size, text) / 2.0;
        self.op(&format!(
            "BT /{} {} Tf {} rg 0 1 -1 0 {} {} Tm",
            font.resource(),
            num(size),
            rgb(color),
            num(cx + size * 0.35),
            num(cy - half)
        ));
        self.ops.push(b'(');
        self.ops.extend(encode_text(text));
        self.ops.extend_from_slice(b") Tj ET\n");
    }

    pub fn image(&mut self, image: ImageId, rect: Rect) {
        if !self.images.contains(&image) {
            self.images.push(image);
        }
        self.op(&format!(
            "q {} 0 0 {} {} {} cm /Im{} Do Q",
            num(rect.w),
            num(rect.h),
            num(rect.x),
            num(rect.y),
            image.0
        ));
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Page boxes in points. MediaBox always starts at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBoxes {
    pub media_w: f64,
    pub media_h: f64,
    pub bleed: Rect,
    pub trim: Rect,
}

/// A baseline JPEG to embed via `DCTDecode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct PdfDocument {
    pages: Vec<(PageBoxes, Canvas)>,
    images: Vec<JpegImage>,
}

impl PdfDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&mut self, image: JpegImage) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    pub fn add_page(&mut self, boxes: PageBoxes, canvas: Canvas) {
        self.pages.push((boxes, canvas));
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialize the document.
    ///
    /// Object layout: 1 catalog, 2 page tree, then fonts, images, and a
    /// (page, contents) pair per page.
    pub fn finish(self) -> Vec<u8> {
        let font_base = 3;
        let image_base = font_base + Font::ALL.len();
        let page_base = image_base + self.images.len();
        let object_count = page_base - 1 + 2 * self.pages.len();

        let mut out = PdfOut::new();
        out.raw(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");

        out.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");

        let kids: Vec<String> = (0..self.pages.len())
            .map(|i| format!("{} 0 R", page_base + 2 * i))
            .collect();
        out.object(
            2,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                self.pages.len()
            )
            .as_bytes(),
        );

        for (i, font) in Font::ALL.iter().enumerate() {
            out.object(
                font_base + i,
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.base_name()
                )
                .as_bytes(),
            );
        }

        for (i, image) in self.images.iter().enumerate() {
            let dict = format!(
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
                 /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>",
                image.width,
                image.height,
                image.data.len()
            );
            out.stream(image_base + i, &dict, &image.data);
        }

        let fonts: String = Font::ALL
            .iter()
            .enumerate()
            .map(|(i, f)| format!("/{} {} 0 R", f.resource(), font_base + i))
            .collect::<Vec<_>>()
            .join(" ");

        for (i, (boxes, canvas)) in self.pages.iter().enumerate() {
            let page_id = page_base + 2 * i;
            let contents_id = page_id + 1;

            let mut resources = format!("<< /Font << {fonts} >>");
            if !canvas.images.is_empty() {
                let xobjects: Vec<String> = canvas
                    .images
                    .iter()
                    .map(|id| format!("/Im{} {} 0 R", id.0, image_base + id.0))
                    .collect();
                let _ = write!(resources, " /XObject << {} >>", xobjects.join(" "));
            }
            resources.push_str(" >>");

            out.object(
                page_id,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /BleedBox {} /TrimBox {} \
                     /Resources {} /Contents {} 0 R >>",
                    num(boxes.media_w),
                    num(boxes.media_h),
                    pdf_rect(boxes.bleed),
                    pdf_rect(boxes.trim),
                    resources,
                    contents_id
                )
                .as_bytes(),
            );
            out.stream(
                contents_id,
                &format!("<< /Length {} >>", canvas.ops.len()),
                &canvas.ops,
            );
        }

        out.finish(object_count)
    }
}

/// Byte sink that records object offsets for the xref table.
struct PdfOut {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfOut {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            offsets: Vec::new(),
        }
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.raw(format!("{id} 0 obj\n").as_bytes());
        self.raw(body);
        self.raw(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, dict: &str, data: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.raw(format!("{id} 0 obj\n{dict}\nstream\n").as_bytes());
        self.raw(data);
        self.raw(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, object_count: usize) -> Vec<u8> {
        self.offsets.sort_unstable();
        let xref_at = self.buf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", object_count + 1);
        for (_, offset) in &self.offsets {
            let _ = write!(xref, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            object_count + 1
        );
        self.raw(xref.as_bytes());
        self.buf
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Compact decimal with at most three fractional digits.
pub(crate) fn num(v: f64) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn rgb(c: Rgb) -> String {
    format!("{} {} {}", num(c.0), num(c.1), num(c.2))
}

fn pdf_rect(r: Rect) -> String {
    format!("[{} {} {} {}]", num(r.x), num(r.y), num(r.right()), num(r.top()))
}

/// Encode `text` as a WinAnsi literal string body (without parentheses).
/// Characters outside WinAnsi become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let byte = match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                ch as u8
            }
            '\n' | '\r' | '\t' => b' ',
            ' '..='~' => ch as u8,
            '\u{2014}' => 0x97,
            '\u{2013}' => 0x96,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2026}' => 0x85,
            '\u{20AC}' => 0x80,
            '\u{00A0}'..='\u{00FF}' => ch as u32 as u8,
            _ => b'?',
        };
        out.push(byte);
    }
    out
}
