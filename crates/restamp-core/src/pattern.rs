use crate::profile::{FieldKind, Profile};
use regex::Regex;
use std::sync::LazyLock;

/// One active pattern: a field the caller supplied a value for, paired
/// with the compiled label regex and the replacement text.
///
/// The table lives for a single document-processing call.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    pub kind: FieldKind,
    pub replacement: String,
}

/// A successful label match on one line.
#[derive(Debug, Clone)]
pub struct LineMatch {
    pub kind: FieldKind,
    /// The label synonym exactly as it appears in the source line.
    pub label: String,
    pub replacement: String,
}

/// Build the pattern table from the non-empty fields of a profile,
/// in [`FieldKind`] declaration order.
pub fn build_patterns(profile: &Profile) -> Vec<FieldPattern> {
    FieldKind::ALL
        .iter()
        .filter_map(|&kind| {
            profile.value_for(kind).map(|value| FieldPattern {
                kind,
                replacement: value.to_string(),
            })
        })
        .collect()
}

/// Test a line against the active patterns in table order, returning the
/// first match. Patterns after the first hit are not tried.
pub fn match_line(line_text: &str, patterns: &[FieldPattern]) -> Option<LineMatch> {
    for pattern in patterns {
        if let Some(caps) = field_regex(pattern.kind).captures(line_text) {
            return Some(LineMatch {
                kind: pattern.kind,
                label: caps[1].to_string(),
                replacement: pattern.replacement.clone(),
            });
        }
    }
    None
}

/// Pick the separator for the rewritten line by inspecting the original
/// line text: ":" wins, then "-", then ".", defaulting to ": ".
pub fn choose_separator(line_text: &str) -> &'static str {
    if line_text.contains(':') {
        ": "
    } else if line_text.contains('-') {
        "- "
    } else if line_text.contains('.') {
        ". "
    } else {
        ": "
    }
}

fn field_regex(kind: FieldKind) -> &'static Regex {
    // One compiled regex per field; the synonym sets are fixed.
    static REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        FieldKind::ALL
            .iter()
            .map(|kind| {
                let alternation = kind.synonyms().join("|");
                Regex::new(&format!(r"(?i)({alternation})\s*[:\-.]?\s*(.*)")).unwrap()
            })
            .collect()
    });
    let index = FieldKind::ALL.iter().position(|&k| k == kind).unwrap();
    &REGEXES[index]
}
