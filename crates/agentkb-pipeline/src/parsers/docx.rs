//! Word (.docx) document parser.

use super::{ooxml, DocumentParser};
use crate::error::PipelineResult;
use agentkb_core::FileFormat;
use std::path::Path;
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";

/// Parser for Word documents. The body becomes a single unit with one
/// paragraph per line.
pub struct WordParser;

impl WordParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WordParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for WordParser {
    fn parse(&self, path: &Path) -> PipelineResult<Vec<String>> {
        debug!("Parsing Word document: {:?}", path);

        let mut archive = ooxml::open(path)?;
        let xml = ooxml::require_entry(&mut archive, DOCUMENT_PART)?;
        let body = ooxml::paragraph_text(&xml, b"p")?;

        Ok(vec![body])
    }

    fn format(&self) -> FileFormat {
        FileFormat::Word
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{fixtures, parse_document};
    use crate::PipelineError;

    #[test]
    fn test_docx_paragraphs_on_lines() {
        let bytes = fixtures::docx(&["Refund policy", "Returns are accepted within 30 days."]);
        let parsed = parse_document(&bytes, "policy.docx").unwrap();

        assert_eq!(
            parsed.units,
            vec!["Refund policy\nReturns are accepted within 30 days.".to_string()]
        );
    }

    #[test]
    fn test_docx_without_body_part() {
        let bytes = fixtures::zip_archive(&[("word/styles.xml", "<w:styles/>")]);
        let err = parse_document(&bytes, "odd.docx").unwrap_err();
        assert!(matches!(err, PipelineError::ParseFailure(msg) if msg.contains(DOCUMENT_PART)));
    }
}
