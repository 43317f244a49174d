//! Batch processing: run the rewriter over a set of uploaded documents
//! and package the results into one zip archive.

use crate::error::RestampError;
use crate::profile::Profile;
use crate::rewrite::{self, RewriteOptions};
use serde::Serialize;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Per-document input size cap.
pub const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// One document submitted for batch processing.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A document the batch left out, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub zip_bytes: Vec<u8>,
    /// Entry names written to the archive, in input order.
    pub processed: Vec<String>,
    pub skipped: Vec<SkippedDocument>,
}

fn validate(doc: &InputDocument) -> Result<(), String> {
    if !doc.file_name.to_lowercase().ends_with(".pdf") {
        return Err("not a .pdf file".to_string());
    }
    if doc.bytes.len() > MAX_DOCUMENT_BYTES {
        return Err("larger than 20 MiB".to_string());
    }
    Ok(())
}

/// Rewrite every valid document and collect the outputs into a zip.
///
/// A document that fails validation or rewriting is recorded in
/// `skipped` and the batch moves on. Zero successful documents is an
/// error: there is nothing to hand back.
pub fn process_batch(
    documents: &[InputDocument],
    profile: &Profile,
    options: &RewriteOptions,
) -> Result<BatchOutcome, RestampError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let entry_options = SimpleFileOptions::default();

    let mut processed = Vec::new();
    let mut skipped = Vec::new();

    for document in documents {
        if let Err(reason) = validate(document) {
            tracing::warn!(file = %document.file_name, %reason, "document skipped");
            skipped.push(SkippedDocument {
                file_name: document.file_name.clone(),
                reason,
            });
            continue;
        }

        let outcome = match rewrite::rewrite_fields(&document.bytes, profile, options) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(file = %document.file_name, error = %e, "document skipped");
                skipped.push(SkippedDocument {
                    file_name: document.file_name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let entry_name = format!("processed_{}", document.file_name);
        writer
            .start_file(entry_name.as_str(), entry_options)
            .map_err(|e| RestampError::Archive(e.to_string()))?;
        writer.write_all(&outcome.pdf_bytes)?;
        processed.push(entry_name);
    }

    if processed.is_empty() {
        return Err(RestampError::NoDocumentsProcessed);
    }

    let cursor = writer
        .finish()
        .map_err(|e| RestampError::Archive(e.to_string()))?;

    Ok(BatchOutcome {
        zip_bytes: cursor.into_inner(),
        processed,
        skipped,
    })
}
