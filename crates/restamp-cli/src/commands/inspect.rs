use restamp_core::error::RestampError;
use restamp_core::layout::PageLayout;
use std::path::PathBuf;

use crate::output;

pub fn run(input_file: PathBuf, output_format: &str, band: f32) -> Result<(), RestampError> {
    let pdf_bytes = std::fs::read(&input_file)?;
    let mut pages = restamp_core::extract_layout(&pdf_bytes)?;
    keep_header_band(&mut pages, band);

    let output_str = match output_format {
        "json" => serde_json::to_string_pretty(&pages)?,
        _ => output::table::format_pages(&pages),
    };
    println!("{output_str}");

    Ok(())
}

fn keep_header_band(pages: &mut [PageLayout], band: f32) {
    for page in pages {
        for block in &mut page.blocks {
            block.lines.retain(|line| line.bbox.y_min <= band);
        }
        page.blocks.retain(|block| !block.lines.is_empty());
    }
}
