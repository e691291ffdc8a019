//! PowerPoint (.pptx) presentation parser.

use super::{ooxml, DocumentParser};
use crate::error::PipelineResult;
use agentkb_core::FileFormat;
use std::path::Path;
use tracing::debug;

const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Parser for PowerPoint presentations. Each slide becomes one unit.
pub struct PowerPointParser;

impl PowerPointParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PowerPointParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for PowerPointParser {
    fn parse(&self, path: &Path) -> PipelineResult<Vec<String>> {
        let mut archive = ooxml::open(path)?;
        let slides = ooxml::numbered_parts(&archive, SLIDE_PREFIX);
        debug!("Parsing presentation {:?} with {} slides", path, slides.len());

        let mut units = Vec::with_capacity(slides.len());
        for name in slides {
            let xml = ooxml::require_entry(&mut archive, &name)?;
            units.push(ooxml::paragraph_text(&xml, b"p")?);
        }

        Ok(units)
    }

    fn format(&self) -> FileFormat {
        FileFormat::PowerPoint
    }
}
