//! The field rewriter: matches labeled header lines against a profile
//! and repaints them with replacement values, preserving each line's
//! position, size and color.

pub mod draw;
pub mod style;

use crate::error::RestampError;
use crate::layout::{fonts, interpret, TextLine};
use crate::pattern::{self, FieldPattern};
use crate::profile::{FieldKind, Profile};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use style::BuiltinStyle;

/// How matched lines are cleared before the replacement is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EraseMode {
    /// Remove the line's text-showing operations from the content
    /// stream. The original value is gone for downstream extractors.
    #[default]
    Redact,
    /// Paint an opaque white rectangle over the line. The original text
    /// stays in the stream underneath.
    PaintOver,
}

/// Which label text the rewritten line carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Echo the label synonym exactly as it appeared in the source line.
    #[default]
    EchoSource,
    /// Use the fixed canonical label for the field.
    Canonical,
}

#[derive(Debug, Clone)]
pub struct RewriteOptions {
    pub erase_mode: EraseMode,
    pub label_policy: LabelPolicy,
    /// Lines whose top edge lies below this distance from the page top
    /// are left alone.
    pub header_limit_y: f32,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions {
            erase_mode: EraseMode::default(),
            label_policy: LabelPolicy::default(),
            header_limit_y: 300.0,
        }
    }
}

/// One rewritten line.
#[derive(Debug, Clone, Serialize)]
pub struct Replacement {
    pub page_number: u32,
    pub kind: FieldKind,
    /// Label as it appeared in the source document.
    pub label: String,
    /// Full text of the rewritten line.
    pub new_text: String,
}

/// Non-fatal conditions surfaced alongside the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteWarning {
    /// No header line matched any supplied field.
    NoFieldsMatched,
    /// A matched line was erased but its replacement could not be drawn.
    LineDrawSkipped { page_number: u32, text: String },
}

#[derive(Debug)]
pub struct RewriteOutcome {
    pub pdf_bytes: Vec<u8>,
    pub replacements: Vec<Replacement>,
    pub warnings: Vec<RewriteWarning>,
}

/// Rewrite the labeled header fields of one document.
pub fn rewrite_fields(
    pdf_bytes: &[u8],
    profile: &Profile,
    options: &RewriteOptions,
) -> Result<RewriteOutcome, RestampError> {
    let mut doc = Document::load_mem(pdf_bytes)
        .map_err(|e| RestampError::DocumentFormat(e.to_string()))?;

    let profile = profile.normalized();
    let patterns = pattern::build_patterns(&profile);

    let mut replacements = Vec::new();
    let mut warnings = Vec::new();
    let mut font_ids: HashMap<BuiltinStyle, ObjectId> = HashMap::new();

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    for (page_number, page_id) in pages {
        rewrite_page(
            &mut doc,
            page_number,
            page_id,
            &patterns,
            options,
            &mut font_ids,
            &mut replacements,
            &mut warnings,
        )?;
    }

    if replacements.is_empty() {
        tracing::warn!("no header fields matched the supplied profile");
        warnings.push(RewriteWarning::NoFieldsMatched);
    }

    doc.compress();
    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| RestampError::Serialize(e.to_string()))?;

    Ok(RewriteOutcome {
        pdf_bytes: out,
        replacements,
        warnings,
    })
}

struct PlannedEdit {
    line: TextLine,
    kind: FieldKind,
    label: String,
    new_text: String,
}

#[allow(clippy::too_many_arguments)]
fn rewrite_page(
    doc: &mut Document,
    page_number: u32,
    page_id: ObjectId,
    patterns: &[FieldPattern],
    options: &RewriteOptions,
    font_ids: &mut HashMap<BuiltinStyle, ObjectId>,
    replacements: &mut Vec<Replacement>,
    warnings: &mut Vec<RewriteWarning>,
) -> Result<(), RestampError> {
    if patterns.is_empty() {
        return Ok(());
    }

    let content = interpret::page_content(doc, page_id)?;
    let font_map = fonts::build_font_map(doc, page_id);
    let (width, height) = interpret::page_dimensions(doc, page_id)?;
    let layout =
        interpret::build_layout(&content.operations, &font_map, page_number, width, height);

    // Plan all edits against the immutable layout before touching
    // anything, so match decisions never see partially rewritten state.
    let mut planned: Vec<PlannedEdit> = Vec::new();
    for block in &layout.blocks {
        if block.bbox.y_min > options.header_limit_y {
            continue;
        }
        for line in &block.lines {
            if line.bbox.y_min > options.header_limit_y {
                continue;
            }
            let text = line.text();
            if let Some(m) = pattern::match_line(&text, patterns) {
                let label = match options.label_policy {
                    LabelPolicy::EchoSource => m.label.clone(),
                    LabelPolicy::Canonical => m.kind.canonical_label().to_string(),
                };
                let separator = pattern::choose_separator(&text);
                let new_text = format!("{label}{separator}{}", m.replacement);
                planned.push(PlannedEdit {
                    line: line.clone(),
                    kind: m.kind,
                    label: m.label,
                    new_text,
                });
            }
        }
    }

    if planned.is_empty() {
        return Ok(());
    }

    let mut removed: HashSet<usize> = HashSet::new();
    let mut appended: Vec<Operation> = Vec::new();

    for edit in &planned {
        let first = &edit.line.spans[0];

        match options.erase_mode {
            EraseMode::Redact => removed.extend(edit.line.op_indices.iter().copied()),
            EraseMode::PaintOver => {
                appended.extend(draw::erase_rect_ops(&edit.line.bbox, height))
            }
        }

        replacements.push(Replacement {
            page_number,
            kind: edit.kind,
            label: edit.label.clone(),
            new_text: edit.new_text.clone(),
        });

        let mapped = style::map_font(&first.font_name, first.flags);
        let (x, baseline) = first.origin;
        let attempt = |s: style::BuiltinStyle| {
            draw::render_line(s, first.size, first.color, x, height - baseline, &edit.new_text)
                .map(|ops| (s, ops))
        };
        // Mapped style first, then the fixed default before giving up.
        match attempt(mapped).or_else(|_| attempt(style::DEFAULT_STYLE)) {
            Ok((chosen, ops)) => {
                draw::ensure_font_resource(doc, page_id, chosen, font_ids)?;
                appended.extend(ops);
            }
            Err(_) => {
                tracing::warn!(
                    page = page_number,
                    text = %edit.new_text,
                    "replacement text not drawable, line left erased"
                );
                warnings.push(RewriteWarning::LineDrawSkipped {
                    page_number,
                    text: edit.new_text.clone(),
                });
            }
        }
    }

    let mut operations: Vec<Operation> =
        Vec::with_capacity(content.operations.len() + appended.len() + 2);

    // The original stream may leave an unbalanced transform behind, and
    // the appended ops are positioned in device space. Isolate it.
    operations.push(Operation::new("q", vec![]));
    for (i, op) in content.operations.into_iter().enumerate() {
        if !removed.contains(&i) {
            operations.push(op);
            continue;
        }
        // ' and " advance to the next line as a side effect (and " sets
        // word/char spacing); keep those so following lines stay put.
        match op.operator.as_str() {
            "'" => operations.push(Operation::new("T*", vec![])),
            "\"" => {
                if let [aw, ac, _] = &op.operands[..] {
                    operations.push(Operation::new("Tw", vec![aw.clone()]));
                    operations.push(Operation::new("Tc", vec![ac.clone()]));
                }
                operations.push(Operation::new("T*", vec![]));
            }
            _ => {}
        }
    }
    operations.push(Operation::new("Q", vec![]));
    operations.extend(appended);

    let encoded = Content { operations }
        .encode()
        .map_err(|e| RestampError::Serialize(e.to_string()))?;
    let stream_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, encoded)));
    doc.get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| RestampError::DocumentFormat(e.to_string()))?
        .set("Contents", Object::Reference(stream_id));

    Ok(())
}
