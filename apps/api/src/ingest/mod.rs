//! Document ingestion: turns an uploaded PDF or text file into the immutable
//! `DocumentContent` every drafting stage reads from.
//!
//! Extraction stops at the first page containing the reference marker; only the
//! text before the marker on that page is kept. All counts are computed over the
//! retained text with the same `TokenCounter` used for budget checks.

pub mod handlers;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::tokenizer::TokenCounter;

pub const DEFAULT_REFERENCE_MARKER: &str = "References\n";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("Text file is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Unsupported file kind: {0}")]
    UnsupportedKind(String),

    #[error("Document contains no readable text before the reference section")]
    Empty,

    #[error("Upload failed: {0}")]
    Upload(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence {
            "application/pdf" => Some(FileKind::Pdf),
            "text/plain" => Some(FileKind::Text),
            _ => None,
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl FromStr for FileKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "text" | "txt" => Ok(FileKind::Text),
            other => Err(IngestError::UnsupportedKind(other.to_string())),
        }
    }
}

/// Retained document text plus size metrics. Constructed only by ingestion so
/// the counts always describe `text`.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentContent {
    text: String,
    page_count: usize,
    char_count: usize,
    word_count: usize,
    token_count: usize,
}

impl DocumentContent {
    fn new(text: String, page_count: usize, tokens: &TokenCounter) -> Self {
        Self {
            page_count,
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
            token_count: tokens.count(&text),
            text,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn metrics(&self) -> DocumentMetrics {
        DocumentMetrics {
            page_count: self.page_count,
            char_count: self.char_count,
            word_count: self.word_count,
            token_count: self.token_count,
        }
    }

    /// How many tokens the document alone exceeds the ceiling by, if any.
    pub fn budget_deficit(&self, max_allowable_tokens: usize) -> Option<usize> {
        self.token_count.checked_sub(max_allowable_tokens).filter(|d| *d > 0)
    }
}

/// Size metrics without the text, for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentMetrics {
    pub page_count: usize,
    pub char_count: usize,
    pub word_count: usize,
    pub token_count: usize,
}

/// Ingests raw upload bytes of the declared kind.
pub fn ingest(
    bytes: &[u8],
    kind: FileKind,
    reference_marker: &str,
    tokens: &TokenCounter,
) -> Result<DocumentContent, IngestError> {
    let document = match kind {
        FileKind::Pdf => {
            // pdf-extract decodes every page up front; only the cut below is lazy.
            let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
                .map_err(|e| IngestError::Pdf(e.to_string()))?;
            collect_until_marker(pages, reference_marker, tokens)
        }
        FileKind::Text => {
            let text = std::str::from_utf8(bytes)?;
            collect_until_marker([text.to_string()], reference_marker, tokens)
        }
    };

    if document.text.trim().is_empty() {
        return Err(IngestError::Empty);
    }

    info!(
        "Ingested {:?} document: pages={} chars={} words={} tokens={}",
        kind, document.page_count, document.char_count, document.word_count, document.token_count
    );
    Ok(document)
}

/// Concatenates pages until the first one containing `marker`, keeping only the
/// text before it. Iteration stops at that page, so a lazy source is never read
/// past it. An empty marker disables truncation.
pub fn collect_until_marker<I>(pages: I, marker: &str, tokens: &TokenCounter) -> DocumentContent
where
    I: IntoIterator<Item = String>,
{
    let mut text = String::new();
    let mut page_count = 0;

    for page in pages {
        page_count += 1;
        if !marker.is_empty() {
            if let Some((before, _)) = page.split_once(marker) {
                text.push_str(before);
                break;
            }
        }
        text.push_str(&page);
    }

    // A marker split across a page boundary only shows up after concatenation.
    if !marker.is_empty() {
        if let Some(idx) = text.find(marker) {
            text.truncate(idx);
        }
    }

    DocumentContent::new(text, page_count, tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> TokenCounter {
        TokenCounter::for_model("gpt-4o")
    }

    #[test]
    fn test_text_truncates_at_reference_marker() {
        let bytes = b"Hello world.\nReferences\nBar baz";
        let doc = ingest(bytes, FileKind::Text, DEFAULT_REFERENCE_MARKER, &counter()).unwrap();
        assert_eq!(doc.text(), "Hello world.\n");
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.char_count(), 13);
        assert_eq!(doc.word_count(), 2);
        assert_eq!(doc.token_count(), counter().count("Hello world.\n"));
    }

    #[test]
    fn test_pages_after_marker_page_are_not_read() {
        let mut pulled = 0;
        let pages = ["Intro page\n", "Results.\nReferences\n[1] Smith", "Appendix", "More"]
            .into_iter()
            .map(|p| {
                pulled += 1;
                p.to_string()
            });
        let doc = collect_until_marker(pages, DEFAULT_REFERENCE_MARKER, &counter());
        assert_eq!(doc.text(), "Intro page\nResults.\n");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(pulled, 2, "pages after the marker page must not be pulled");
    }

    #[test]
    fn test_no_marker_keeps_everything() {
        let pages = vec!["Page one. ".to_string(), "Page two.".to_string()];
        let doc = collect_until_marker(pages, DEFAULT_REFERENCE_MARKER, &counter());
        assert_eq!(doc.text(), "Page one. Page two.");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.word_count(), 4);
    }

    #[test]
    fn test_marker_split_across_pages_still_truncates() {
        let pages = vec!["Body text\nReferences".to_string(), "\n[1] Doe".to_string()];
        let doc = collect_until_marker(pages, DEFAULT_REFERENCE_MARKER, &counter());
        assert_eq!(doc.text(), "Body text\n");
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_empty_marker_disables_truncation() {
        let doc = collect_until_marker(["A\nReferences\nB".to_string()], "", &counter());
        assert_eq!(doc.text(), "A\nReferences\nB");
    }

    #[test]
    fn test_counts_describe_retained_text_only() {
        let bytes = b"one two three\nReferences\nfour five six seven";
        let doc = ingest(bytes, FileKind::Text, DEFAULT_REFERENCE_MARKER, &counter()).unwrap();
        assert_eq!(doc.word_count(), 3);
        assert_eq!(doc.char_count(), doc.text().chars().count());
    }

    #[test]
    fn test_invalid_utf8_is_ingest_error() {
        let result = ingest(&[0xff, 0xfe, 0xfd], FileKind::Text, DEFAULT_REFERENCE_MARKER, &counter());
        assert!(matches!(result, Err(IngestError::Utf8(_))));
    }

    /// Uncompressed single-font PDF, one text run per page.
    fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
        let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];
        for (i, text) in pages.iter().enumerate() {
            let stream = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                5 + 2 * i
            ));
            objects.push(format!("<< /Length {} >>\nstream\n{stream}\nendstream", stream.len()));
        }

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
        }
        let xref = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            pdf.push_str(&format!("{offset:010} 00000 n \n"));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.into_bytes()
    }

    #[test]
    fn test_pdf_pages_are_extracted_and_truncated() {
        let bytes = minimal_pdf(&["Groundwater depletion in the basin", "References"]);
        let doc = ingest(&bytes, FileKind::Pdf, "References", &counter()).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert!(doc.text().contains("Groundwater depletion"));
        assert!(!doc.text().contains("References"));
    }

    #[test]
    fn test_garbage_pdf_is_ingest_error() {
        let result = ingest(b"definitely not a pdf", FileKind::Pdf, DEFAULT_REFERENCE_MARKER, &counter());
        assert!(matches!(result, Err(IngestError::Pdf(_))));
    }

    #[test]
    fn test_document_starting_with_references_is_empty() {
        let result = ingest(b"References\nonly refs", FileKind::Text, DEFAULT_REFERENCE_MARKER, &counter());
        assert!(matches!(result, Err(IngestError::Empty)));
    }

    #[test]
    fn test_budget_deficit() {
        let doc = collect_until_marker(["a ".repeat(50)], "", &TokenCounter::for_model("unknown"));
        assert_eq!(doc.token_count(), 25);
        assert_eq!(doc.budget_deficit(100), None);
        assert_eq!(doc.budget_deficit(25), None);
        assert_eq!(doc.budget_deficit(20), Some(5));
    }

    #[test]
    fn test_file_kind_detection() {
        assert_eq!(FileKind::from_content_type("application/pdf"), Some(FileKind::Pdf));
        assert_eq!(
            FileKind::from_content_type("text/plain; charset=utf-8"),
            Some(FileKind::Text)
        );
        assert_eq!(FileKind::from_content_type("image/png"), None);
        assert_eq!(FileKind::from_file_name("paper.PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_file_name("notes.txt"), Some(FileKind::Text));
        assert_eq!(FileKind::from_file_name("README"), None);
        assert!("docx".parse::<FileKind>().is_err());
    }
}
