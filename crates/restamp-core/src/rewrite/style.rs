//! Mapping from arbitrary document fonts to the base-14 styles used for
//! replacement text.

use crate::layout::FLAG_BOLD;

/// One of six base-14 styles replacement text can be drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinStyle {
    SerifRegular,
    SerifBold,
    MonoRegular,
    MonoBold,
    SansRegular,
    SansBold,
}

/// Second-tier style when the mapped one fails to render.
pub const DEFAULT_STYLE: BuiltinStyle = BuiltinStyle::SansRegular;

impl BuiltinStyle {
    /// Standard /BaseFont name for the style.
    pub fn base_font(self) -> &'static str {
        match self {
            BuiltinStyle::SerifRegular => "Times-Roman",
            BuiltinStyle::SerifBold => "Times-Bold",
            BuiltinStyle::MonoRegular => "Courier",
            BuiltinStyle::MonoBold => "Courier-Bold",
            BuiltinStyle::SansRegular => "Helvetica",
            BuiltinStyle::SansBold => "Helvetica-Bold",
        }
    }

    /// Resource name registered on pages that draw this style. Prefixed
    /// to stay clear of the /F1, /F2... names documents commonly use.
    pub fn resource_name(self) -> &'static str {
        match self {
            BuiltinStyle::SerifRegular => "RsTiR",
            BuiltinStyle::SerifBold => "RsTiB",
            BuiltinStyle::MonoRegular => "RsCoR",
            BuiltinStyle::MonoBold => "RsCoB",
            BuiltinStyle::SansRegular => "RsHeR",
            BuiltinStyle::SansBold => "RsHeB",
        }
    }
}

/// Bucket a source font into one of the six styles: serif and mono
/// families by name, everything else sans; bold from the span flags or
/// the name itself.
pub fn map_font(font_name: &str, flags: u32) -> BuiltinStyle {
    let lower = font_name.to_lowercase();
    let bold = flags & FLAG_BOLD != 0 || lower.contains("bold");
    if lower.contains("times") || lower.contains("serif") {
        if bold {
            BuiltinStyle::SerifBold
        } else {
            BuiltinStyle::SerifRegular
        }
    } else if lower.contains("courier") || lower.contains("mono") {
        if bold {
            BuiltinStyle::MonoBold
        } else {
            BuiltinStyle::MonoRegular
        }
    } else if bold {
        BuiltinStyle::SansBold
    } else {
        BuiltinStyle::SansRegular
    }
}
