//! Integration tests for rewrite_fields() end-to-end.
//!
//! Fixture PDFs are built in memory with lopdf and the output is
//! checked by re-extracting it with the crate's own layout pass, so the
//! tests need no external tooling or sample files.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use restamp_core::{EraseMode, Profile, RestampError, RewriteOptions, RewriteWarning};

fn text_line(font: &str, size: f32, x: f32, pdf_y: f32, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), Object::Real(size)],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(pdf_y)]),
        Operation::new(
            "Tj",
            vec![Object::String(
                text.as_bytes().to_vec(),
                StringFormat::Literal,
            )],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Build a PDF with one content stream per page. Every page carries two
/// font resources: /F1 Helvetica and /F2 Times-Bold.
fn build_pdf(pages_ops: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let helvetica_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let times_bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let page_count = pages_ops.len();
    let mut kids: Vec<Object> = Vec::new();
    for operations in pages_ops {
        let encoded = Content { operations }.encode().unwrap();
        let stream_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, encoded)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => stream_id,
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => helvetica_id,
                    "F2" => times_bold_id,
                },
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn all_text(pdf: &[u8]) -> Vec<String> {
    restamp_core::extract_layout(pdf)
        .unwrap()
        .iter()
        .flat_map(|page| page.blocks.iter())
        .flat_map(|block| block.lines.iter())
        .map(|line| line.text())
        .collect()
}

fn name_profile(name: &str) -> Profile {
    Profile {
        name: Some(name.to_string()),
        ..Profile::default()
    }
}

fn find_line_span(pdf: &[u8], text: &str) -> restamp_core::layout::TextSpan {
    restamp_core::extract_layout(pdf)
        .unwrap()
        .iter()
        .flat_map(|page| page.blocks.iter())
        .flat_map(|block| block.lines.iter())
        .find(|line| line.text() == text)
        .unwrap_or_else(|| panic!("line not found: {text}"))
        .spans[0]
        .clone()
}

// ---------------------------------------------------------------------------
// Basic replacement
// ---------------------------------------------------------------------------

#[test]
fn name_line_is_replaced() {
    let pdf = build_pdf(vec![[
        text_line("F1", 12.0, 72.0, 700.0, "Name: John Doe"),
        text_line("F1", 12.0, 72.0, 680.0, "Observations follow"),
    ]
    .concat()]);

    let outcome =
        restamp_core::rewrite_fields(&pdf, &name_profile("Jane Smith"), &RewriteOptions::default())
            .unwrap();

    assert_eq!(outcome.replacements.len(), 1);
    assert_eq!(outcome.replacements[0].new_text, "Name: Jane Smith");
    assert!(outcome.warnings.is_empty());

    let texts = all_text(&outcome.pdf_bytes);
    assert!(texts.contains(&"Name: Jane Smith".to_string()));
    assert!(texts.contains(&"Observations follow".to_string()));
    assert!(!texts.iter().any(|t| t.contains("John Doe")));
}

#[test]
fn dash_separator_is_kept() {
    let pdf = build_pdf(vec![text_line("F1", 12.0, 72.0, 700.0, "Roll - 42")]);
    let profile = Profile {
        roll_number: Some("99".to_string()),
        ..Profile::default()
    };

    let outcome =
        restamp_core::rewrite_fields(&pdf, &profile, &RewriteOptions::default()).unwrap();

    assert_eq!(outcome.replacements[0].new_text, "Roll- 99");
    assert!(all_text(&outcome.pdf_bytes).contains(&"Roll- 99".to_string()));
}

#[test]
fn only_first_matching_field_applies_per_line() {
    // "Class: SY Div B" could match both Class and Division.
    let pdf = build_pdf(vec![text_line("F1", 12.0, 72.0, 700.0, "Class: SY Div B")]);
    let profile = Profile {
        class_name: Some("TY".to_string()),
        division: Some("C".to_string()),
        ..Profile::default()
    };

    let outcome =
        restamp_core::rewrite_fields(&pdf, &profile, &RewriteOptions::default()).unwrap();

    assert_eq!(outcome.replacements.len(), 1);
    assert_eq!(outcome.replacements[0].new_text, "Class: TY");
}

// ---------------------------------------------------------------------------
// Header band and pass-through behavior
// ---------------------------------------------------------------------------

#[test]
fn lines_below_the_header_band_are_untouched() {
    // 792 - 292 = 500 units from the page top, past the 300 threshold.
    let pdf = build_pdf(vec![text_line("F1", 12.0, 72.0, 292.0, "Name: John Doe")]);

    let outcome =
        restamp_core::rewrite_fields(&pdf, &name_profile("Jane Smith"), &RewriteOptions::default())
            .unwrap();

    assert!(outcome.replacements.is_empty());
    assert_eq!(outcome.warnings, vec![RewriteWarning::NoFieldsMatched]);
    assert!(all_text(&outcome.pdf_bytes).contains(&"Name: John Doe".to_string()));
}

#[test]
fn empty_profile_changes_nothing() {
    let pdf = build_pdf(vec![text_line("F1", 12.0, 72.0, 700.0, "Name: John Doe")]);

    let outcome =
        restamp_core::rewrite_fields(&pdf, &Profile::default(), &RewriteOptions::default())
            .unwrap();

    assert!(outcome.replacements.is_empty());
    assert!(all_text(&outcome.pdf_bytes).contains(&"Name: John Doe".to_string()));
}

#[test]
fn garbage_bytes_are_a_format_error() {
    let err = restamp_core::rewrite_fields(
        b"definitely not a pdf",
        &name_profile("Jane Smith"),
        &RewriteOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RestampError::DocumentFormat(_)));
}

#[test]
fn page_count_is_preserved() {
    let pdf = build_pdf(vec![
        text_line("F1", 12.0, 72.0, 700.0, "Name: John Doe"),
        text_line("F1", 12.0, 72.0, 700.0, "Roll No: 42"),
        vec![],
    ]);
    let profile = Profile {
        name: Some("Jane Smith".to_string()),
        roll_number: Some("99".to_string()),
        ..Profile::default()
    };

    let outcome =
        restamp_core::rewrite_fields(&pdf, &profile, &RewriteOptions::default()).unwrap();

    let doc = Document::load_mem(&outcome.pdf_bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(outcome.replacements.len(), 2);
}

#[test]
fn rewriting_twice_is_stable() {
    let pdf = build_pdf(vec![text_line("F1", 12.0, 72.0, 700.0, "Name: John Doe")]);
    let profile = name_profile("Jane Smith");
    let options = RewriteOptions::default();

    let once = restamp_core::rewrite_fields(&pdf, &profile, &options).unwrap();
    let twice = restamp_core::rewrite_fields(&once.pdf_bytes, &profile, &options).unwrap();

    assert_eq!(twice.replacements.len(), 1);
    assert_eq!(all_text(&once.pdf_bytes), all_text(&twice.pdf_bytes));
}

// ---------------------------------------------------------------------------
// Content-stream state preservation
// ---------------------------------------------------------------------------

#[test]
fn redacting_a_move_show_line_keeps_following_lines_in_place() {
    // Both lines drawn with ', whose line advance must survive the
    // removal of the first line's text.
    let operations = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Real(12.0)],
        ),
        Operation::new("TL", vec![Object::Real(20.0)]),
        Operation::new("Td", vec![Object::Real(72.0), Object::Real(720.0)]),
        Operation::new(
            "'",
            vec![Object::String(
                b"Name: John Doe".to_vec(),
                StringFormat::Literal,
            )],
        ),
        Operation::new(
            "'",
            vec![Object::String(
                b"Observations follow".to_vec(),
                StringFormat::Literal,
            )],
        ),
        Operation::new("ET", vec![]),
    ];
    let pdf = build_pdf(vec![operations]);

    let outcome =
        restamp_core::rewrite_fields(&pdf, &name_profile("Jane Smith"), &RewriteOptions::default())
            .unwrap();

    let replaced = find_line_span(&outcome.pdf_bytes, "Name: Jane Smith");
    assert_eq!(replaced.origin, (72.0, 92.0));
    let follower = find_line_span(&outcome.pdf_bytes, "Observations follow");
    assert_eq!(follower.origin, (72.0, 112.0));
}

#[test]
fn redacting_a_spacing_show_line_keeps_its_side_effects() {
    // " sets word/char spacing and advances a line; both must survive.
    let operations = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Real(12.0)],
        ),
        Operation::new("TL", vec![Object::Real(20.0)]),
        Operation::new("Td", vec![Object::Real(72.0), Object::Real(720.0)]),
        Operation::new(
            "\"",
            vec![
                Object::Real(1.5),
                Object::Real(0.0),
                Object::String(b"Roll No: 42".to_vec(), StringFormat::Literal),
            ],
        ),
        Operation::new(
            "'",
            vec![Object::String(
                b"Observations follow".to_vec(),
                StringFormat::Literal,
            )],
        ),
        Operation::new("ET", vec![]),
    ];
    let pdf = build_pdf(vec![operations]);
    let profile = Profile {
        roll_number: Some("99".to_string()),
        ..Profile::default()
    };

    let outcome =
        restamp_core::rewrite_fields(&pdf, &profile, &RewriteOptions::default()).unwrap();

    let replaced = find_line_span(&outcome.pdf_bytes, "Roll No: 99");
    assert_eq!(replaced.origin, (72.0, 92.0));
    let follower = find_line_span(&outcome.pdf_bytes, "Observations follow");
    assert_eq!(follower.origin, (72.0, 112.0));
    assert!(!all_text(&outcome.pdf_bytes)
        .iter()
        .any(|t| t.contains("42")));
}

#[test]
fn replacement_is_isolated_from_a_leftover_transform() {
    // A top-level cm with no enclosing q/Q; the replacement must not be
    // transformed a second time.
    let mut operations = vec![Operation::new(
        "cm",
        vec![
            Object::Real(2.0),
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(2.0),
            Object::Real(0.0),
            Object::Real(0.0),
        ],
    )];
    operations.extend(text_line("F1", 12.0, 36.0, 350.0, "Name: John Doe"));
    let pdf = build_pdf(vec![operations]);

    let outcome =
        restamp_core::rewrite_fields(&pdf, &name_profile("Jane Smith"), &RewriteOptions::default())
            .unwrap();

    let replaced = find_line_span(&outcome.pdf_bytes, "Name: Jane Smith");
    assert_eq!(replaced.origin, (72.0, 92.0));
    assert_eq!(replaced.size, 24.0);
    assert!(!all_text(&outcome.pdf_bytes)
        .iter()
        .any(|t| t.contains("John Doe")));
}

// ---------------------------------------------------------------------------
// Erase modes
// ---------------------------------------------------------------------------

#[test]
fn redact_removes_the_original_value_from_extraction() {
    let pdf = build_pdf(vec![text_line("F1", 12.0, 72.0, 700.0, "Roll No: 42")]);
    let profile = Profile {
        roll_number: Some("99".to_string()),
        ..Profile::default()
    };
    let options = RewriteOptions {
        erase_mode: EraseMode::Redact,
        ..RewriteOptions::default()
    };

    let outcome = restamp_core::rewrite_fields(&pdf, &profile, &options).unwrap();

    let texts = all_text(&outcome.pdf_bytes);
    assert!(texts.contains(&"Roll No: 99".to_string()));
    assert!(!texts.iter().any(|t| t.contains("42")));
}

#[test]
fn paint_over_keeps_the_original_text_underneath() {
    let pdf = build_pdf(vec![text_line("F1", 12.0, 72.0, 700.0, "Roll No: 42")]);
    let profile = Profile {
        roll_number: Some("99".to_string()),
        ..Profile::default()
    };
    let options = RewriteOptions {
        erase_mode: EraseMode::PaintOver,
        ..RewriteOptions::default()
    };

    let outcome = restamp_core::rewrite_fields(&pdf, &profile, &options).unwrap();

    // Visually covered, but still present in the content stream.
    let texts = all_text(&outcome.pdf_bytes);
    assert!(texts.contains(&"Roll No: 42".to_string()));
    assert!(texts.contains(&"Roll No: 99".to_string()));
}

#[test]
fn undrawable_replacement_leaves_the_line_erased() {
    let pdf = build_pdf(vec![text_line("F1", 12.0, 72.0, 700.0, "Name: John Doe")]);

    // Devanagari has no WinAnsi encoding, in any style bucket.
    let outcome =
        restamp_core::rewrite_fields(&pdf, &name_profile("नाम"), &RewriteOptions::default())
            .unwrap();

    assert_eq!(outcome.replacements.len(), 1);
    assert!(matches!(
        outcome.warnings[..],
        [RewriteWarning::LineDrawSkipped { .. }]
    ));

    let texts = all_text(&outcome.pdf_bytes);
    assert!(!texts.iter().any(|t| t.contains("John Doe")));
    assert!(!texts.iter().any(|t| t.contains("नाम")));
}

// ---------------------------------------------------------------------------
// Style preservation
// ---------------------------------------------------------------------------

#[test]
fn replacement_keeps_size_and_color() {
    let mut operations = vec![Operation::new(
        "rg",
        vec![Object::Real(1.0), Object::Real(0.0), Object::Real(0.0)],
    )];
    operations.extend(text_line("F1", 14.0, 72.0, 700.0, "Name: John Doe"));
    let pdf = build_pdf(vec![operations]);

    let outcome =
        restamp_core::rewrite_fields(&pdf, &name_profile("Jane Smith"), &RewriteOptions::default())
            .unwrap();

    let pages = restamp_core::extract_layout(&outcome.pdf_bytes).unwrap();
    let span = pages
        .iter()
        .flat_map(|p| p.blocks.iter())
        .flat_map(|b| b.lines.iter())
        .find(|l| l.text() == "Name: Jane Smith")
        .unwrap()
        .spans[0]
        .clone();

    assert_eq!(span.size, 14.0);
    assert_eq!(span.color, 0xFF0000);
    assert_eq!(span.origin, (72.0, 92.0));
}

#[test]
fn serif_bold_source_maps_to_times_bold() {
    let pdf = build_pdf(vec![text_line("F2", 12.0, 72.0, 700.0, "Name: John Doe")]);

    let outcome =
        restamp_core::rewrite_fields(&pdf, &name_profile("Jane Smith"), &RewriteOptions::default())
            .unwrap();

    let pages = restamp_core::extract_layout(&outcome.pdf_bytes).unwrap();
    let span = pages
        .iter()
        .flat_map(|p| p.blocks.iter())
        .flat_map(|b| b.lines.iter())
        .find(|l| l.text() == "Name: Jane Smith")
        .unwrap()
        .spans[0]
        .clone();

    assert_eq!(span.font_name, "Times-Bold");
}
