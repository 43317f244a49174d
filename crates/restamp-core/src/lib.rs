pub mod archive;
pub mod error;
pub mod jobs;
pub mod layout;
pub mod pattern;
pub mod profile;
pub mod rewrite;

pub use error::RestampError;
pub use profile::{FieldKind, Profile};
pub use rewrite::{
    EraseMode, LabelPolicy, Replacement, RewriteOptions, RewriteOutcome, RewriteWarning,
};

/// Main API entry point: rewrite the labeled header fields of a lab
/// report PDF.
///
/// Labeled lines (Name, Roll, Class, Division, PRN, Activity and their
/// synonyms) in the header band of each page are matched against the
/// profile and repainted with the supplied values, keeping the original
/// position, size and color. Pages and lines that match nothing pass
/// through untouched.
pub fn rewrite_fields(
    pdf_bytes: &[u8],
    profile: &Profile,
    options: &RewriteOptions,
) -> Result<RewriteOutcome, RestampError> {
    rewrite::rewrite_fields(pdf_bytes, profile, options)
}

/// Extract the structured text layout of every page, for diagnostics.
pub fn extract_layout(pdf_bytes: &[u8]) -> Result<Vec<layout::PageLayout>, RestampError> {
    let doc = lopdf::Document::load_mem(pdf_bytes)
        .map_err(|e| RestampError::DocumentFormat(e.to_string()))?;
    layout::extract_pages(&doc)
}
