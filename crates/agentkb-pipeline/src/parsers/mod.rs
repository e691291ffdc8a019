//! Document parsers for the supported upload formats.
//!
//! Each format turns a file into an ordered list of text units: pages for
//! PDF, slides for PowerPoint, worksheets for Excel and the whole body for
//! Word. Units are trimmed and blank units are dropped.

mod docx;
mod ooxml;
mod pdf;
mod pptx;
mod xlsx;

pub use docx::WordParser;
pub use pdf::PdfParser;
pub use pptx::PowerPointParser;
pub use xlsx::ExcelParser;

use crate::error::{PipelineError, PipelineResult};
use agentkb_core::FileFormat;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Text extracted from one document.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub format: FileFormat,
    /// Non-blank text units in document order.
    pub units: Vec<String>,
}

impl ParsedDocument {
    /// Total number of characters across all units.
    pub fn char_count(&self) -> usize {
        self.units.iter().map(|u| u.chars().count()).sum()
    }
}

/// Trait for document parsers.
pub trait DocumentParser: Send + Sync {
    /// Parse a file at the given path into raw text units.
    fn parse(&self, path: &Path) -> PipelineResult<Vec<String>>;

    /// The format this parser handles.
    fn format(&self) -> FileFormat;
}

/// Get the parser for a format.
pub fn parser_for(format: FileFormat) -> Box<dyn DocumentParser> {
    match format {
        FileFormat::Pdf => Box::new(PdfParser::new()),
        FileFormat::Word => Box::new(WordParser::new()),
        FileFormat::Excel => Box::new(ExcelParser::new()),
        FileFormat::PowerPoint => Box::new(PowerPointParser::new()),
    }
}

/// Parse an uploaded document from its raw bytes.
///
/// The format is chosen from the extension of `file_name`. The bytes live in
/// a temporary file for the duration of the parse; the file is removed when
/// this returns, whether parsing succeeded, failed or panicked.
pub fn parse_document(bytes: &[u8], file_name: &str) -> PipelineResult<ParsedDocument> {
    let format = FileFormat::from_file_name(file_name)?;

    let mut file = tempfile::Builder::new()
        .prefix("agentkb-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;

    let units: Vec<String> = parser_for(format)
        .parse(file.path())?
        .into_iter()
        .map(|unit| unit.trim().to_string())
        .filter(|unit| !unit.is_empty())
        .collect();

    if units.is_empty() {
        return Err(PipelineError::ParseFailure(format!(
            "no extractable text in {}",
            file_name
        )));
    }

    debug!("Parsed {} as {} into {} units", file_name, format, units.len());

    Ok(ParsedDocument { format, units })
}
