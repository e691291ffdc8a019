//! PDF document parser.

use super::DocumentParser;
use crate::error::{PipelineError, PipelineResult};
use agentkb_core::FileFormat;
use std::path::Path;
use tracing::debug;

/// Parser for PDF files. Each page becomes one unit.
pub struct PdfParser;

impl PdfParser {
    /// Create a new PDF parser.
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path) -> PipelineResult<Vec<String>> {
        debug!("Parsing PDF: {:?}", path);

        let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| {
            PipelineError::ParseFailure(format!("failed to extract text from PDF: {}", e))
        })?;

        debug!("Extracted {} pages from PDF", pages.len());

        Ok(pages.iter().map(|page| clean_pdf_text(page)).collect())
    }

    fn format(&self) -> FileFormat {
        FileFormat::Pdf
    }
}

/// Clean up extracted PDF text.
fn clean_pdf_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        // Collapse runs of blank lines into one
        .fold(Vec::new(), |mut acc: Vec<&str>, line| {
            let last_was_empty = acc.last().map(|s| s.is_empty()).unwrap_or(false);
            if !(line.is_empty() && last_was_empty) {
                acc.push(line);
            }
            acc
        })
        .join("\n")
        .replace('\x0C', "")
}
