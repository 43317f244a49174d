//! Content-stream interpreter: walks page operations and produces the
//! block/line/span layout, tracking the text matrix, font state and fill
//! color just far enough to recover origin, size and styling per span.

use super::encoding::decode_byte;
use super::fonts::{self, FontInfo};
use super::{BBox, PageLayout, TextBlock, TextLine, TextSpan};
use crate::error::RestampError;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;

/// Gap threshold for TJ kerning adjustments, in thousandths of an em.
/// Negative adjustments larger than this render as visible whitespace.
const KERN_SPACE_THRESHOLD: f32 = -200.0;

/// Baseline tolerance when grouping spans into lines, in layout units.
const BASELINE_TOLERANCE: f32 = 0.5;

/// 2D affine transform, row-major `[a b 0; c d 0; e f 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }

    /// `self * other` with `self` applied first.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Vertical scale magnitude, used to turn the nominal font size into
    /// an effective size.
    fn scale_y(&self) -> f32 {
        self.b.hypot(self.d)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    /// Packed 0xRRGGBB nonstroking fill color.
    fill_color: u32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            ctm: Matrix::IDENTITY,
            fill_color: 0x000000,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TextState {
    font_resource: Option<String>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    leading: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
}

impl TextState {
    fn begin(&mut self) {
        self.text_matrix = Matrix::IDENTITY;
        self.line_matrix = Matrix::IDENTITY;
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }
}

/// Page width and height from the (possibly inherited) /MediaBox.
/// Letter-size defaults apply when the box is missing or malformed.
pub fn page_dimensions(doc: &Document, page_id: ObjectId) -> Result<(f32, f32), RestampError> {
    let media_box = fonts::resolve_inherited(doc, page_id, b"MediaBox")
        .map(|obj| fonts::resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok());
    if let Some(coords) = media_box {
        let values: Vec<f32> = coords
            .iter()
            .filter_map(|c| fonts::num(fonts::resolve(doc, c)))
            .collect();
        if let [x0, y0, x1, y1] = values[..] {
            return Ok(((x1 - x0).abs(), (y1 - y0).abs()));
        }
    }
    Ok((612.0, 792.0))
}

/// Decode a page's content operations. /Contents may be a single stream
/// or an array of streams; the streams are concatenated before decoding.
pub fn page_content(doc: &Document, page_id: ObjectId) -> Result<Content, RestampError> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(|obj| obj.as_dict())
        .map_err(|e| RestampError::DocumentFormat(e.to_string()))?;

    let mut bytes = Vec::new();
    if let Ok(contents) = page_dict.get(b"Contents") {
        match fonts::resolve(doc, contents) {
            Object::Array(parts) => {
                for part in parts {
                    if let Some(data) = stream_bytes(doc, part) {
                        bytes.extend_from_slice(&data);
                        bytes.push(b'\n');
                    }
                }
            }
            single => {
                if let Some(data) = stream_bytes(doc, single) {
                    bytes = data;
                }
            }
        }
    }

    Content::decode(&bytes).map_err(|e| RestampError::DocumentFormat(e.to_string()))
}

fn stream_bytes(doc: &Document, obj: &Object) -> Option<Vec<u8>> {
    match fonts::resolve(doc, obj) {
        Object::Stream(stream) => Some(
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
        ),
        _ => None,
    }
}

/// Interpret decoded operations into the page's text layout.
///
/// Spans remember the index of the operation that painted them, so a
/// later editing pass can remove exactly those operations.
pub fn build_layout(
    operations: &[Operation],
    font_map: &HashMap<String, FontInfo>,
    page_number: u32,
    width: f32,
    height: f32,
) -> PageLayout {
    let mut gs = GraphicsState::default();
    let mut gs_stack: Vec<GraphicsState> = Vec::new();
    let mut ts = TextState::default();
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut current: Vec<LineBuilder> = Vec::new();

    for (op_index, op) in operations.iter().enumerate() {
        let ops = &op.operands;
        match op.operator.as_str() {
            "q" => gs_stack.push(gs),
            "Q" => gs = gs_stack.pop().unwrap_or_default(),
            "cm" => {
                if let [a, b, c, d, e, f] = nums(ops)[..] {
                    gs.ctm = Matrix { a, b, c, d, e, f }.multiply(&gs.ctm);
                }
            }
            "rg" => {
                if let [r, g, b] = nums(ops)[..] {
                    gs.fill_color = pack_rgb(r, g, b);
                }
            }
            "g" => {
                if let [v] = nums(ops)[..] {
                    gs.fill_color = pack_rgb(v, v, v);
                }
            }
            "k" => {
                if let [c, m, y, k] = nums(ops)[..] {
                    gs.fill_color =
                        pack_rgb((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k));
                }
            }
            "BT" => {
                ts.begin();
                flush_block(&mut blocks, &mut current);
            }
            "ET" => flush_block(&mut blocks, &mut current),
            "Tf" => {
                if let [Object::Name(name), size] = &ops[..] {
                    ts.font_resource = Some(String::from_utf8_lossy(name).into_owned());
                    ts.size = fonts::num(size).unwrap_or(ts.size);
                }
            }
            "Td" => {
                if let [tx, ty] = nums(ops)[..] {
                    ts.next_line(tx, ty);
                }
            }
            "TD" => {
                if let [tx, ty] = nums(ops)[..] {
                    ts.leading = -ty;
                    ts.next_line(tx, ty);
                }
            }
            "Tm" => {
                if let [a, b, c, d, e, f] = nums(ops)[..] {
                    ts.line_matrix = Matrix { a, b, c, d, e, f };
                    ts.text_matrix = ts.line_matrix;
                }
            }
            "T*" => ts.next_line(0.0, -ts.leading),
            "TL" => {
                if let [l] = nums(ops)[..] {
                    ts.leading = l;
                }
            }
            "Tc" => {
                if let [c] = nums(ops)[..] {
                    ts.char_spacing = c;
                }
            }
            "Tw" => {
                if let [w] = nums(ops)[..] {
                    ts.word_spacing = w;
                }
            }
            "Tj" => {
                if let [Object::String(bytes, _)] = &ops[..] {
                    show_text(
                        &mut current,
                        &mut ts,
                        &gs,
                        font_map,
                        &[TjPart::Text(bytes)],
                        height,
                        op_index,
                    );
                }
            }
            "'" => {
                if let [Object::String(bytes, _)] = &ops[..] {
                    ts.next_line(0.0, -ts.leading);
                    show_text(
                        &mut current,
                        &mut ts,
                        &gs,
                        font_map,
                        &[TjPart::Text(bytes)],
                        height,
                        op_index,
                    );
                }
            }
            "\"" => {
                if let [aw, ac, Object::String(bytes, _)] = &ops[..] {
                    ts.word_spacing = fonts::num(aw).unwrap_or(ts.word_spacing);
                    ts.char_spacing = fonts::num(ac).unwrap_or(ts.char_spacing);
                    ts.next_line(0.0, -ts.leading);
                    show_text(
                        &mut current,
                        &mut ts,
                        &gs,
                        font_map,
                        &[TjPart::Text(bytes)],
                        height,
                        op_index,
                    );
                }
            }
            "TJ" => {
                if let [Object::Array(parts)] = &ops[..] {
                    let parts: Vec<TjPart> = parts
                        .iter()
                        .filter_map(|p| match p {
                            Object::String(bytes, _) => Some(TjPart::Text(bytes)),
                            other => fonts::num(other).map(TjPart::Adjust),
                        })
                        .collect();
                    show_text(&mut current, &mut ts, &gs, font_map, &parts, height, op_index);
                }
            }
            _ => {}
        }
    }
    flush_block(&mut blocks, &mut current);

    PageLayout {
        page_number,
        width,
        height,
        blocks,
    }
}

enum TjPart<'a> {
    Text(&'a [u8]),
    Adjust(f32),
}

struct LineBuilder {
    baseline: f32,
    spans: Vec<TextSpan>,
    op_indices: Vec<usize>,
}

/// Emit one span for a show-text operation and advance the text matrix.
#[allow(clippy::too_many_arguments)]
fn show_text(
    lines: &mut Vec<LineBuilder>,
    ts: &mut TextState,
    gs: &GraphicsState,
    font_map: &HashMap<String, FontInfo>,
    parts: &[TjPart<'_>],
    page_height: f32,
    op_index: usize,
) {
    let fallback = FontInfo::default_metrics();
    let font = ts
        .font_resource
        .as_deref()
        .and_then(|name| font_map.get(name))
        .unwrap_or(&fallback);

    let combined = ts.text_matrix.multiply(&gs.ctm);
    let (x, device_y) = combined.apply(0.0, 0.0);
    let effective_size = (ts.size * combined.scale_y()).abs();
    let baseline = page_height - device_y;

    let mut text = String::new();
    // Horizontal displacement in unscaled text space.
    let mut advance = 0.0f32;
    for part in parts {
        match part {
            TjPart::Text(bytes) => {
                for &b in bytes.iter() {
                    text.push(decode_byte(b));
                    advance += font.width_em(b) * ts.size + ts.char_spacing;
                    if b == 0x20 {
                        advance += ts.word_spacing;
                    }
                }
            }
            TjPart::Adjust(t) => {
                advance -= t / 1000.0 * ts.size;
                if *t < KERN_SPACE_THRESHOLD && !text.is_empty() {
                    text.push(' ');
                }
            }
        }
    }

    ts.text_matrix = Matrix::translate(advance, 0.0).multiply(&ts.text_matrix);

    if text.is_empty() {
        return;
    }

    let (end_x, _) = ts.text_matrix.multiply(&gs.ctm).apply(0.0, 0.0);
    let span = TextSpan {
        text,
        font_name: font.base_name.clone(),
        flags: font.flags,
        size: effective_size,
        color: gs.fill_color,
        origin: (x, baseline),
        bbox: BBox {
            x_min: x.min(end_x),
            y_min: baseline - font.ascent * effective_size,
            x_max: x.max(end_x),
            y_max: baseline - font.descent * effective_size,
        },
    };

    match lines
        .iter_mut()
        .find(|l| (l.baseline - baseline).abs() <= BASELINE_TOLERANCE)
    {
        Some(line) => {
            line.spans.push(span);
            line.op_indices.push(op_index);
        }
        None => lines.push(LineBuilder {
            baseline,
            spans: vec![span],
            op_indices: vec![op_index],
        }),
    }
}

fn flush_block(blocks: &mut Vec<TextBlock>, lines: &mut Vec<LineBuilder>) {
    if lines.is_empty() {
        return;
    }
    let mut builders = std::mem::take(lines);
    builders.sort_by(|a, b| a.baseline.total_cmp(&b.baseline));

    let mut block_lines = Vec::with_capacity(builders.len());
    for mut builder in builders {
        builder
            .spans
            .sort_by(|a, b| a.origin.0.total_cmp(&b.origin.0));
        let bbox = builder
            .spans
            .iter()
            .skip(1)
            .fold(builder.spans[0].bbox.clone(), |acc, s| acc.union(&s.bbox));
        block_lines.push(TextLine {
            spans: builder.spans,
            bbox,
            op_indices: builder.op_indices,
        });
    }

    let bbox = block_lines
        .iter()
        .skip(1)
        .fold(block_lines[0].bbox.clone(), |acc, l| acc.union(&l.bbox));
    blocks.push(TextBlock {
        lines: block_lines,
        bbox,
    });
}

fn nums(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(fonts::num).collect()
}

fn pack_rgb(r: f32, g: f32, b: f32) -> u32 {
    let clamp = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    (clamp(r) << 16) | (clamp(g) << 8) | clamp(b)
}
