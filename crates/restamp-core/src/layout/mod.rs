pub mod encoding;
pub mod fonts;
pub mod interpret;

use crate::error::RestampError;
use lopdf::Document;
use serde::Serialize;

/// Style flag bits carried on a [`TextSpan`].
pub const FLAG_ITALIC: u32 = 1 << 1;
pub const FLAG_BOLD: u32 = 1 << 4;

/// Axis-aligned box in layout units. The origin is the top-left corner
/// of the page: y grows downward, so the header band is simply
/// `y_min <= threshold`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// A contiguous run of text sharing one style within a line.
#[derive(Debug, Clone, Serialize)]
pub struct TextSpan {
    pub text: String,
    /// Font base name with any subset prefix ("ABCDEF+") stripped.
    pub font_name: String,
    /// [`FLAG_BOLD`] / [`FLAG_ITALIC`] bits.
    pub flags: u32,
    /// Point size.
    pub size: f32,
    /// Packed 0xRRGGBB fill color.
    pub color: u32,
    /// Baseline origin (x, y) in layout units.
    pub origin: (f32, f32),
    pub bbox: BBox,
}

/// A horizontal run of spans sharing a baseline.
#[derive(Debug, Clone, Serialize)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub bbox: BBox,
    /// Indices of the content-stream operations that painted this line's
    /// text. Redaction removes exactly these.
    #[serde(skip)]
    pub op_indices: Vec<usize>,
}

impl TextLine {
    /// All span texts concatenated, the string patterns are matched against.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// One BT..ET group of lines.
#[derive(Debug, Clone, Serialize)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub bbox: BBox,
}

/// Structured text content of a single page.
#[derive(Debug, Clone, Serialize)]
pub struct PageLayout {
    pub page_number: u32,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<TextBlock>,
}

/// Extract the structured text layout of every page.
///
/// Used by the `inspect` diagnostics and by tests; the rewriter drives
/// the same machinery page by page so it can keep the decoded content
/// operations around for editing.
pub fn extract_pages(doc: &Document) -> Result<Vec<PageLayout>, RestampError> {
    let mut pages = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let content = interpret::page_content(doc, page_id)?;
        let font_map = fonts::build_font_map(doc, page_id);
        let (width, height) = interpret::page_dimensions(doc, page_id)?;
        pages.push(interpret::build_layout(
            &content.operations,
            &font_map,
            page_number,
            width,
            height,
        ));
    }
    Ok(pages)
}
