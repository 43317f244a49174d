//! Font information resolved from page resources.

use super::{FLAG_BOLD, FLAG_ITALIC};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

// Font descriptor /Flags bits (PDF 32000-1, table 123).
const DESCRIPTOR_ITALIC: i64 = 1 << 6;
const DESCRIPTOR_FORCE_BOLD: i64 = 1 << 18;

/// What the layout pass needs to know about one font resource.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// /BaseFont with any subset prefix stripped.
    pub base_name: String,
    /// Span flag bits derived from the descriptor and the name.
    pub flags: u32,
    first_char: i64,
    /// Glyph widths in em fractions, indexed from `first_char`.
    widths: Vec<f32>,
    default_width: f32,
    /// Em fractions; descent is negative.
    pub ascent: f32,
    pub descent: f32,
}

impl FontInfo {
    pub fn width_em(&self, code: u8) -> f32 {
        let idx = code as i64 - self.first_char;
        match self.widths.get(usize::try_from(idx).unwrap_or(usize::MAX)) {
            Some(&w) if w > 0.0 => w,
            _ => self.default_width,
        }
    }

    /// Neutral metrics for text shown with an unresolvable font.
    pub fn default_metrics() -> FontInfo {
        FontInfo::fallback("Helvetica")
    }

    fn fallback(resource_name: &str) -> FontInfo {
        FontInfo {
            base_name: resource_name.to_string(),
            flags: 0,
            first_char: 0,
            widths: Vec::new(),
            default_width: 0.5,
            ascent: 0.8,
            descent: -0.2,
        }
    }
}

/// Build the resource-name → font map for a page, walking /Parent for
/// inherited resources. Unknown or malformed fonts get a neutral
/// fallback entry so extraction keeps going.
pub fn build_font_map(doc: &Document, page_id: ObjectId) -> HashMap<String, FontInfo> {
    let mut map = HashMap::new();

    let Some(resources) = resolve_inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
    else {
        return map;
    };
    let Some(font_dict) = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
    else {
        return map;
    };

    for (name, font_obj) in font_dict.iter() {
        let resource_name = String::from_utf8_lossy(name).into_owned();
        let info = match resolve(doc, font_obj).as_dict() {
            Ok(dict) => parse_font(doc, &resource_name, dict),
            Err(_) => FontInfo::fallback(&resource_name),
        };
        map.insert(resource_name, info);
    }

    map
}

fn parse_font(doc: &Document, resource_name: &str, font: &Dictionary) -> FontInfo {
    let raw_base = font
        .get(b"BaseFont")
        .ok()
        .and_then(|obj| match resolve(doc, obj) {
            Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
            _ => None,
        })
        .unwrap_or_else(|| resource_name.to_string());
    let base_name = strip_subset_prefix(&raw_base).to_string();

    let descriptor = font
        .get(b"FontDescriptor")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok());

    let mut flags = 0u32;
    let descriptor_flags = descriptor
        .and_then(|d| d.get(b"Flags").ok())
        .and_then(|obj| resolve(doc, obj).as_i64().ok())
        .unwrap_or(0);
    if descriptor_flags & DESCRIPTOR_FORCE_BOLD != 0 {
        flags |= FLAG_BOLD;
    }
    if descriptor_flags & DESCRIPTOR_ITALIC != 0 {
        flags |= FLAG_ITALIC;
    }
    let lower = base_name.to_lowercase();
    if lower.contains("bold") {
        flags |= FLAG_BOLD;
    }
    if lower.contains("italic") || lower.contains("oblique") {
        flags |= FLAG_ITALIC;
    }

    let first_char = font
        .get(b"FirstChar")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_i64().ok())
        .unwrap_or(0);
    let widths = font
        .get(b"Widths")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_array().ok())
        .map(|arr| {
            arr.iter()
                .map(|w| num(resolve(doc, w)).unwrap_or(0.0) / 1000.0)
                .collect()
        })
        .unwrap_or_default();

    // Base-14 fonts typically carry no /Widths; Courier is fixed-pitch.
    let default_width = if lower.contains("courier") || lower.contains("mono") {
        0.6
    } else {
        0.5
    };

    let ascent = descriptor
        .and_then(|d| d.get(b"Ascent").ok())
        .and_then(|obj| num(resolve(doc, obj)))
        .map(|a| a / 1000.0)
        .unwrap_or(0.8);
    let descent = descriptor
        .and_then(|d| d.get(b"Descent").ok())
        .and_then(|obj| num(resolve(doc, obj)))
        .map(|d| d / 1000.0)
        .unwrap_or(-0.2);

    FontInfo {
        base_name,
        flags,
        first_char,
        widths,
        default_width,
        ascent,
        descent,
    }
}

/// Subset names look like "ABCDEF+Helvetica"; strip the tag.
fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// Follow an indirect reference to its target, or return the object as-is.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Look up a key on the page dictionary, walking up /Parent links if it
/// is not found on the page itself.
pub(crate) fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current_id = page_id;
    // Bounded walk; page trees are shallow and cycles are malformed input.
    for _ in 0..64 {
        let dict = doc.get_object(current_id).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

pub(crate) fn num(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f as f32),
        _ => None,
    }
}
