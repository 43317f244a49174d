use restamp_core::layout::{PageLayout, TextLine, FLAG_BOLD, FLAG_ITALIC};

/// Plain-text rendering of the header-band layout, one row per line.
pub fn format_pages(pages: &[PageLayout]) -> String {
    let mut out = String::new();

    for page in pages {
        out.push_str(&format!(
            "Page {} ({:.0} x {:.0})\n",
            page.page_number, page.width, page.height
        ));
        let mut lines: Vec<&TextLine> = page.blocks.iter().flat_map(|b| &b.lines).collect();
        lines.sort_by(|a, b| a.bbox.y_min.total_cmp(&b.bbox.y_min));

        if lines.is_empty() {
            out.push_str("  (no text in the header band)\n");
            continue;
        }
        for line in lines {
            let first = &line.spans[0];
            out.push_str(&format!(
                "  y={:<7.1} x={:<7.1} [{} {:.1}{} #{:06X}]  {}\n",
                first.origin.1,
                first.origin.0,
                first.font_name,
                first.size,
                flag_marker(first.flags),
                first.color,
                line.text()
            ));
        }
    }

    out
}

fn flag_marker(flags: u32) -> &'static str {
    match (flags & FLAG_BOLD != 0, flags & FLAG_ITALIC != 0) {
        (true, true) => " bold italic",
        (true, false) => " bold",
        (false, true) => " italic",
        (false, false) => "",
    }
}
