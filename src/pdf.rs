use anyhow::{Context, Result};
use lopdf::Document as PdfDocument;
use std::path::Path;

/// Pages scanned for a P&L heading before falling back to the full document.
pub const MAX_SCAN_PAGES: usize = 8;

/// Heading phrases that mark the consolidated P&L page. Casing matches the
/// reports these extractors were built against.
const PNL_HEADINGS: [&str; 3] = [
    "Consolidated Income Statement",
    "STATEMENT OF PROFIT OR LOSS",
    "Group Profit or Loss",
];

/// Locate the consolidated P&L pages of a report and return their text.
///
/// Scans the first `MAX_SCAN_PAGES` pages for any known heading and joins the
/// text of matching pages. When no heading is found the whole document is
/// returned instead, with a warning. A page whose text extraction fails
/// contributes an empty string rather than an error, so this only fails when
/// the PDF itself cannot be loaded.
pub fn select_pnl_text(path: &Path) -> Result<String> {
    let doc = PdfDocument::load(path)
        .with_context(|| format!("failed to load PDF {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

    let matched: Vec<String> = page_numbers
        .iter()
        .take(MAX_SCAN_PAGES)
        .map(|&page| page_text(&doc, page))
        .filter(|txt| PNL_HEADINGS.iter().any(|h| txt.contains(h)))
        .collect();

    if !matched.is_empty() {
        log::info!("found {} P&L page(s) in {}", matched.len(), name);
        return Ok(matched.join("\n"));
    }

    log::warn!(
        "P&L heading not found in first {} pages of {}; using full document",
        MAX_SCAN_PAGES,
        name
    );
    let all: Vec<String> = page_numbers
        .iter()
        .map(|&page| page_text(&doc, page))
        .collect();
    Ok(all.join("\n"))
}

fn page_text(doc: &PdfDocument, page: u32) -> String {
    doc.extract_text(&[page]).unwrap_or_default()
}
