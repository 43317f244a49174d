use restamp_core::archive::{self, InputDocument};
use restamp_core::error::RestampError;
use restamp_core::{Profile, RewriteOptions, RewriteWarning};
use std::path::{Path, PathBuf};

pub fn run(
    input_files: Vec<PathBuf>,
    profile: Profile,
    options: RewriteOptions,
    zip: bool,
    out: Option<PathBuf>,
) -> Result<(), RestampError> {
    if input_files.len() == 1 && !zip {
        run_single(&input_files[0], &profile, &options, out)
    } else {
        run_batch(&input_files, &profile, &options, out)
    }
}

fn run_single(
    input_file: &Path,
    profile: &Profile,
    options: &RewriteOptions,
    out: Option<PathBuf>,
) -> Result<(), RestampError> {
    let pdf_bytes = std::fs::read(input_file)?;
    let outcome = restamp_core::rewrite_fields(&pdf_bytes, profile, options)?;

    let out_path = out.unwrap_or_else(|| PathBuf::from(processed_name(input_file)));
    std::fs::write(&out_path, &outcome.pdf_bytes)?;

    eprintln!(
        "Rewrote {} field(s), written to {}",
        outcome.replacements.len(),
        out_path.display()
    );
    for replacement in &outcome.replacements {
        eprintln!(
            "  page {}: {} -> \"{}\"",
            replacement.page_number, replacement.kind, replacement.new_text
        );
    }
    print_warnings(&outcome.warnings);

    Ok(())
}

fn run_batch(
    input_files: &[PathBuf],
    profile: &Profile,
    options: &RewriteOptions,
    out: Option<PathBuf>,
) -> Result<(), RestampError> {
    let mut documents = Vec::with_capacity(input_files.len());
    for path in input_files {
        documents.push(InputDocument {
            file_name: file_name_of(path),
            bytes: std::fs::read(path)?,
        });
    }

    let batch = archive::process_batch(&documents, profile, options)?;

    let out_path = out.unwrap_or_else(|| PathBuf::from("processed.zip"));
    std::fs::write(&out_path, &batch.zip_bytes)?;

    eprintln!(
        "Processed {} document(s), written to {}",
        batch.processed.len(),
        out_path.display()
    );
    for skipped in &batch.skipped {
        eprintln!("  skipped {}: {}", skipped.file_name, skipped.reason);
    }

    Ok(())
}

fn print_warnings(warnings: &[RewriteWarning]) {
    for warning in warnings {
        match warning {
            RewriteWarning::NoFieldsMatched => {
                eprintln!("  warning: no header fields matched the supplied values");
            }
            RewriteWarning::LineDrawSkipped { page_number, text } => {
                eprintln!(
                    "  warning: page {page_number}: could not draw \"{text}\", line left erased"
                );
            }
        }
    }
}

fn processed_name(path: &Path) -> String {
    format!("processed_{}", file_name_of(path))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
