/// Column-header marker for the single-quarter column of an interim P&L.
pub const QTR_HEADER_MARKER: &str = "03 months to";

/// The exact text sent to the extraction prompt for one PDF, plus the column
/// header it was anchored on. `text` is also persisted as the audit `.txt`
/// artifact next to the structured record.
#[derive(Debug, Clone)]
pub struct ReportSnippet {
    /// PDF file stem this snippet was cut from.
    pub source: String,
    /// The exact "03 months to ..." header line, or empty when absent.
    pub header: String,
    pub text: String,
}

impl ReportSnippet {
    pub fn from_text(source: &str, full_text: &str) -> Self {
        let (text, header) = extract_qtr_snippet(full_text);
        ReportSnippet {
            source: source.to_string(),
            header,
            text,
        }
    }
}

/// Cut the quarter-only table out of the selected page text.
///
/// Finds the first line whose trimmed form starts with "03 months to" and
/// collects every line from there up to (excluding) the next blank line.
/// Returns (snippet, header). When the marker is absent the input is returned
/// unchanged with an empty header; narrowing is best-effort, never an error.
pub fn extract_qtr_snippet(full_text: &str) -> (String, String) {
    let lines: Vec<&str> = full_text.lines().collect();
    let Some(idx) = lines
        .iter()
        .position(|l| l.trim().starts_with(QTR_HEADER_MARKER))
    else {
        return (full_text.to_string(), String::new());
    };

    let mut snippet_lines = Vec::new();
    for line in &lines[idx..] {
        if line.trim().is_empty() {
            break;
        }
        snippet_lines.push(*line);
    }
    let header = snippet_lines[0].trim().to_string();
    (snippet_lines.join("\n"), header)
}
