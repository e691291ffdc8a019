//! Shared helpers for Office Open XML packages (docx, xlsx, pptx).

use crate::error::{PipelineError, PipelineResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

/// Maximum decompressed bytes read from a single archive entry.
const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub(crate) type Package = ZipArchive<BufReader<File>>;

/// Open a package from disk.
pub(crate) fn open(path: &Path) -> PipelineResult<Package> {
    let file = File::open(path)?;
    ZipArchive::new(BufReader::new(file)).map_err(archive_error)
}

/// Read one entry in full, or `None` when the package has no such entry.
pub(crate) fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> PipelineResult<Option<Vec<u8>>> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(archive_error(e)),
    };

    let mut out = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| PipelineError::ParseFailure(format!("{}: {}", name, e)))?;
    if out.len() as u64 >= MAX_ENTRY_BYTES {
        return Err(PipelineError::ParseFailure(format!(
            "{} exceeds size limit ({} bytes)",
            name, MAX_ENTRY_BYTES
        )));
    }

    Ok(Some(out))
}

/// Read an entry that must be present.
pub(crate) fn require_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> PipelineResult<Vec<u8>> {
    read_entry(archive, name)?
        .ok_or_else(|| PipelineError::ParseFailure(format!("{} not found in package", name)))
}

/// Names of numbered parts such as `ppt/slides/slide3.xml`, in numeric order.
pub(crate) fn numbered_parts<R: Read + Seek>(archive: &ZipArchive<R>, prefix: &str) -> Vec<String> {
    let mut parts: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name.strip_prefix(prefix)?.strip_suffix(".xml")?;
            Some((number.parse().ok()?, name.to_string()))
        })
        .collect();
    parts.sort();
    parts.into_iter().map(|(_, name)| name).collect()
}

/// Collect the text of every `<t>` run in a part.
///
/// Closing a `paragraph` element ends the current line. `<tab/>` and
/// `<br/>` become a tab and a newline.
pub(crate) fn paragraph_text(xml: &[u8], paragraph: &[u8]) -> PipelineResult<String> {
    let mut out = String::new();
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(xml_error)?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"t" {
                    in_text = false;
                } else if name.as_ref() == paragraph {
                    out.push('\n');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

pub(crate) fn archive_error(e: ZipError) -> PipelineError {
    PipelineError::ParseFailure(format!("invalid document archive: {}", e))
}

pub(crate) fn xml_error(e: quick_xml::Error) -> PipelineError {
    PipelineError::ParseFailure(format!("malformed XML: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::fixtures;
    use std::io::Cursor;

    #[test]
    fn test_paragraph_text_keeps_runs_and_breaks() {
        let xml = br#"<w:document xmlns:w="w"><w:body>
            <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
            <w:p><w:r><w:t>a</w:t><w:tab/><w:t>b &amp; c</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let text = paragraph_text(xml, b"p").unwrap();
        assert_eq!(text, "Hello world\na\tb & c\n");
    }

    #[test]
    fn test_malformed_xml_is_parse_failure() {
        let err = paragraph_text(b"<w:p><w:t>open</w:p>", b"p").unwrap_err();
        assert!(matches!(err, PipelineError::ParseFailure(_)));
    }

    #[test]
    fn test_numbered_parts_sort_numerically() {
        let bytes = fixtures::zip_archive(&[
            ("ppt/slides/slide10.xml", "<x/>"),
            ("ppt/slides/slide2.xml", "<x/>"),
            ("ppt/slides/slide1.xml", "<x/>"),
            ("ppt/slides/_rels/slide1.xml.rels", "<x/>"),
        ]);
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(
            numbered_parts(&archive, "ppt/slides/slide"),
            vec![
                "ppt/slides/slide1.xml",
                "ppt/slides/slide2.xml",
                "ppt/slides/slide10.xml",
            ]
        );
    }

    #[test]
    fn test_missing_entry() {
        let bytes = fixtures::zip_archive(&[("a.xml", "<a/>")]);
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert!(read_entry(&mut archive, "b.xml").unwrap().is_none());
        assert!(require_entry(&mut archive, "b.xml").is_err());
        assert_eq!(require_entry(&mut archive, "a.xml").unwrap(), b"<a/>");
    }
}
