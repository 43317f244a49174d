//! Low-level drawing: building the erase and replacement-text operation
//! sequences and registering font resources on pages.

use super::style::BuiltinStyle;
use crate::error::RestampError;
use crate::layout::{encoding, fonts, BBox};
use lopdf::content::Operation;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::HashMap;

/// A line whose replacement text cannot be rendered with the chosen
/// style. The caller decides whether to retry with another style.
#[derive(Debug, thiserror::Error)]
#[error("replacement text is not representable in WinAnsi")]
pub struct RenderFailure;

pub fn encode_winansi(text: &str) -> Result<Vec<u8>, RenderFailure> {
    text.chars()
        .map(encoding::encode_char)
        .collect::<Option<Vec<u8>>>()
        .ok_or(RenderFailure)
}

/// Fill the line's box with white. `bbox` is in top-origin layout units.
pub fn erase_rect_ops(bbox: &BBox, page_height: f32) -> Vec<Operation> {
    let x = bbox.x_min;
    let y = page_height - bbox.y_max;
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "rg",
            vec![Object::Real(1.0), Object::Real(1.0), Object::Real(1.0)],
        ),
        Operation::new(
            "re",
            vec![
                Object::Real(x),
                Object::Real(y),
                Object::Real(bbox.width()),
                Object::Real(bbox.height()),
            ],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// Build the full operation sequence for one replacement line, failing
/// if the text cannot be encoded for the style's font.
pub fn render_line(
    style: BuiltinStyle,
    size: f32,
    color: u32,
    x: f32,
    pdf_y: f32,
    text: &str,
) -> Result<Vec<Operation>, RenderFailure> {
    let bytes = encode_winansi(text)?;
    Ok(text_ops(style, size, color, x, pdf_y, bytes))
}

/// Paint one line of replacement text at a baseline position given in
/// PDF (bottom-origin) coordinates.
pub fn text_ops(
    style: BuiltinStyle,
    size: f32,
    color: u32,
    x: f32,
    pdf_y: f32,
    bytes: Vec<u8>,
) -> Vec<Operation> {
    let r = ((color >> 16) & 0xFF) as f32 / 255.0;
    let g = ((color >> 8) & 0xFF) as f32 / 255.0;
    let b = (color & 0xFF) as f32 / 255.0;
    vec![
        Operation::new("q", vec![]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(style.resource_name().as_bytes().to_vec()),
                Object::Real(size),
            ],
        ),
        Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(pdf_y)]),
        Operation::new(
            "Tj",
            vec![Object::String(bytes, StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]
}

#[derive(Clone, Copy)]
enum ResourceSlot {
    OnPage,
    Indirect(ObjectId),
}

/// Make sure the page can reference `style` by its resource name.
///
/// Font objects are created once per document and cached in `font_ids`.
/// Inherited /Resources are cloned onto the page before editing so
/// sibling pages are not affected.
pub fn ensure_font_resource(
    doc: &mut Document,
    page_id: ObjectId,
    style: BuiltinStyle,
    font_ids: &mut HashMap<BuiltinStyle, ObjectId>,
) -> Result<(), RestampError> {
    let font_id = match font_ids.get(&style) {
        Some(id) => *id,
        None => {
            let id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => style.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            font_ids.insert(style, id);
            id
        }
    };

    let found = {
        let page = page_dict(doc, page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(ResourceSlot::Indirect(*id)),
            Ok(_) => Some(ResourceSlot::OnPage),
            Err(_) => None,
        }
    };
    let slot = match found {
        Some(slot) => slot,
        None => {
            let inherited = fonts::resolve_inherited(doc, page_id, b"Resources")
                .map(|obj| fonts::resolve(doc, obj))
                .and_then(|obj| obj.as_dict().ok())
                .cloned()
                .unwrap_or_default();
            page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(inherited));
            ResourceSlot::OnPage
        }
    };

    let font_table_ref = {
        let resources = match slot {
            ResourceSlot::OnPage => page_dict(doc, page_id)?
                .get(b"Resources")
                .and_then(|obj| obj.as_dict())
                .map_err(|e| RestampError::DocumentFormat(e.to_string()))?,
            ResourceSlot::Indirect(id) => doc
                .get_object(id)
                .and_then(|obj| obj.as_dict())
                .map_err(|e| RestampError::DocumentFormat(e.to_string()))?,
        };
        match resources.get(b"Font") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    match font_table_ref {
        Some(table_id) => {
            let table = doc
                .get_object_mut(table_id)
                .and_then(|obj| obj.as_dict_mut())
                .map_err(|e| RestampError::DocumentFormat(e.to_string()))?;
            table.set(style.resource_name(), Object::Reference(font_id));
        }
        None => {
            let resources = match slot {
                ResourceSlot::OnPage => {
                    let page = page_dict_mut(doc, page_id)?;
                    page.get_mut(b"Resources")
                        .and_then(|obj| obj.as_dict_mut())
                        .map_err(|e| RestampError::DocumentFormat(e.to_string()))?
                }
                ResourceSlot::Indirect(id) => doc
                    .get_object_mut(id)
                    .and_then(|obj| obj.as_dict_mut())
                    .map_err(|e| RestampError::DocumentFormat(e.to_string()))?,
            };
            if !resources.has(b"Font") {
                resources.set("Font", Object::Dictionary(Dictionary::new()));
            }
            let table = resources
                .get_mut(b"Font")
                .and_then(|obj| obj.as_dict_mut())
                .map_err(|e| RestampError::DocumentFormat(e.to_string()))?;
            table.set(style.resource_name(), Object::Reference(font_id));
        }
    }

    Ok(())
}

fn page_dict<'a>(doc: &'a Document, page_id: ObjectId) -> Result<&'a Dictionary, RestampError> {
    doc.get_object(page_id)
        .and_then(|obj| obj.as_dict())
        .map_err(|e| RestampError::DocumentFormat(e.to_string()))
}

fn page_dict_mut(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<&mut Dictionary, RestampError> {
    doc.get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| RestampError::DocumentFormat(e.to_string()))
}
