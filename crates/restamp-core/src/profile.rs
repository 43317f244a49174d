use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Replacement values supplied by the caller. Every field is optional;
/// absent or empty fields are simply not targeted for replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub roll_number: Option<String>,
    pub class_name: Option<String>,
    pub division: Option<String>,
    pub registration_id: Option<String>,
    pub activity_title: Option<String>,
}

impl Profile {
    /// Fill in fields that can be inferred from the others.
    ///
    /// Currently one heuristic: if the division is empty but the class
    /// string contains a token like "Div B", "Section A" or "Batch 3",
    /// the captured token becomes the division. Best-effort; a class
    /// string with no recognizable token leaves the division unset.
    pub fn normalized(&self) -> Profile {
        let mut refined = self.clone();

        if is_blank(&refined.division) {
            if let Some(class_name) = non_blank(&refined.class_name) {
                if let Some(m) = DIVISION_IN_CLASS.captures(class_name) {
                    refined.division = Some(m[2].to_string());
                }
            }
        }

        refined
    }

    /// The value the caller supplied for a given field kind, if non-empty.
    pub fn value_for(&self, kind: FieldKind) -> Option<&str> {
        let slot = match kind {
            FieldKind::Name => &self.name,
            FieldKind::Roll => &self.roll_number,
            FieldKind::Class => &self.class_name,
            FieldKind::Division => &self.division,
            FieldKind::Registration => &self.registration_id,
            FieldKind::Activity => &self.activity_title,
        };
        non_blank(slot)
    }

    pub fn is_empty(&self) -> bool {
        FieldKind::ALL.iter().all(|&k| self.value_for(k).is_none())
    }
}

static DIVISION_IN_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Div|Section|Group|Batch)\s*[:\-.]?\s*([A-Z0-9]+)").unwrap()
});

fn is_blank(s: &Option<String>) -> bool {
    non_blank(s).is_none()
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    match s {
        Some(v) if !v.trim().is_empty() => Some(v.as_str()),
        _ => None,
    }
}

/// The six recognized field types, in declaration order.
///
/// Pattern matching iterates this order, so a line that could match two
/// fields is always resolved the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Name,
    Roll,
    Class,
    Division,
    Registration,
    Activity,
}

impl FieldKind {
    pub const ALL: [FieldKind; 6] = [
        FieldKind::Name,
        FieldKind::Roll,
        FieldKind::Class,
        FieldKind::Division,
        FieldKind::Registration,
        FieldKind::Activity,
    ];

    /// Label synonyms recognized for this field, longest first so the
    /// regex alternation prefers "Student Name" over "Name".
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            FieldKind::Name => &["Student Name", "Candidate Name", "Name"],
            FieldKind::Roll => &["Roll No", "Seat No", "Roll"],
            FieldKind::Class => &["Class", "Year", "Branch", "Course"],
            FieldKind::Division => &["Division", "Section", "Batch", "Div"],
            FieldKind::Registration => &["Registration", "Reg No", "PRN", "ID"],
            FieldKind::Activity => &["Experiment", "Activity", "Title", "Aim"],
        }
    }

    /// One fixed display label per field, used under
    /// [`LabelPolicy::Canonical`](crate::rewrite::LabelPolicy).
    pub fn canonical_label(self) -> &'static str {
        match self {
            FieldKind::Name => "Name",
            FieldKind::Roll => "Roll No",
            FieldKind::Class => "Class",
            FieldKind::Division => "Division",
            FieldKind::Registration => "PRN",
            FieldKind::Activity => "Activity",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_class(class: &str) -> Profile {
        Profile {
            class_name: Some(class.to_string()),
            ..Profile::default()
        }
    }

    #[test]
    fn test_division_inferred_from_class() {
        let p = profile_with_class("SY BTech Div B").normalized();
        assert_eq!(p.division.as_deref(), Some("B"));
    }

    #[test]
    fn test_division_inferred_with_separator() {
        let p = profile_with_class("TY Section: A2").normalized();
        assert_eq!(p.division.as_deref(), Some("A2"));

        let p = profile_with_class("FY Batch-3").normalized();
        assert_eq!(p.division.as_deref(), Some("3"));
    }

    #[test]
    fn test_no_token_leaves_division_unset() {
        let p = profile_with_class("SY BTech Computer").normalized();
        assert_eq!(p.division, None);
    }

    #[test]
    fn test_existing_division_passes_through() {
        let mut p = profile_with_class("SY BTech Div B");
        p.division = Some("C".to_string());
        let p = p.normalized();
        assert_eq!(p.division.as_deref(), Some("C"));
    }

    #[test]
    fn test_empty_class_passes_through() {
        let p = Profile::default().normalized();
        assert_eq!(p.division, None);
    }

    #[test]
    fn test_blank_values_are_not_targeted() {
        let p = Profile {
            name: Some("   ".to_string()),
            ..Profile::default()
        };
        assert_eq!(p.value_for(FieldKind::Name), None);
        assert!(p.is_empty());
    }
}
