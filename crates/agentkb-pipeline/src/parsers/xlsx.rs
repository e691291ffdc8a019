//! Excel (.xlsx) workbook parser.

use super::{ooxml, DocumentParser};
use crate::error::PipelineResult;
use agentkb_core::FileFormat;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use tracing::{debug, warn};

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const SHEET_PREFIX: &str = "xl/worksheets/sheet";

/// Maximum worksheets read from one workbook.
const MAX_SHEETS: usize = 100;
/// Maximum cells read from one worksheet.
const MAX_CELLS_PER_SHEET: usize = 100_000;

/// Parser for Excel workbooks. Each worksheet becomes one unit: rows on
/// separate lines, cells separated by tabs.
pub struct ExcelParser;

impl ExcelParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExcelParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for ExcelParser {
    fn parse(&self, path: &Path) -> PipelineResult<Vec<String>> {
        let mut archive = ooxml::open(path)?;

        let shared = match ooxml::read_entry(&mut archive, SHARED_STRINGS_PART)? {
            Some(xml) => shared_strings(&xml)?,
            None => Vec::new(),
        };

        let sheets = ooxml::numbered_parts(&archive, SHEET_PREFIX);
        if sheets.len() > MAX_SHEETS {
            warn!(
                "Workbook {:?} has {} sheets, reading the first {}",
                path,
                sheets.len(),
                MAX_SHEETS
            );
        }
        debug!("Parsing workbook {:?} with {} sheets", path, sheets.len());

        let mut units = Vec::new();
        for name in sheets.into_iter().take(MAX_SHEETS) {
            let xml = ooxml::require_entry(&mut archive, &name)?;
            units.push(sheet_text(&xml, &shared)?);
        }

        Ok(units)
    }

    fn format(&self) -> FileFormat {
        FileFormat::Excel
    }
}

/// Read the shared string table. Rich-text runs of one entry are joined;
/// phonetic hints are skipped.
fn shared_strings(xml: &[u8]) -> PipelineResult<Vec<String>> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(Event::Text(te)) if in_t => {
                current.push_str(&te.unescape().map_err(ooxml::xml_error)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml::xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CellKind {
    Shared,
    Inline,
    Boolean,
    Value,
}

impl CellKind {
    fn of(cell: &BytesStart) -> Self {
        let kind = cell
            .attributes()
            .flatten()
            .find(|a| a.key.as_ref() == b"t")
            .map(|a| a.value.into_owned());

        match kind.as_deref() {
            Some(b"s") => CellKind::Shared,
            Some(b"inlineStr") => CellKind::Inline,
            Some(b"b") => CellKind::Boolean,
            _ => CellKind::Value,
        }
    }

    fn render(self, raw: &str, shared: &[String]) -> String {
        let raw = raw.trim();
        match self {
            CellKind::Shared => raw
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i))
                .cloned()
                .unwrap_or_default(),
            CellKind::Boolean => match raw {
                "1" => "TRUE".to_string(),
                "0" => "FALSE".to_string(),
                other => other.to_string(),
            },
            CellKind::Inline | CellKind::Value => raw.to_string(),
        }
    }
}

fn sheet_text(xml: &[u8], shared: &[String]) -> PipelineResult<String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut lines: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut raw = String::new();
    let mut kind = CellKind::Value;
    let mut capture = false;
    let mut cells = 0usize;

    loop {
        if cells >= MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    kind = CellKind::of(&e);
                    raw.clear();
                }
                b"v" => capture = true,
                b"t" if kind == CellKind::Inline => capture = true,
                _ => {}
            },
            Ok(Event::Text(te)) if capture => {
                raw.push_str(&te.unescape().map_err(ooxml::xml_error)?);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    let value = kind.render(&raw, shared);
                    if !value.is_empty() {
                        row.push(value);
                    }
                    cells += 1;
                }
                b"row" => {
                    if !row.is_empty() {
                        lines.push(row.join("\t"));
                    }
                    row.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml::xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    if !row.is_empty() {
        lines.push(row.join("\t"));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{fixtures, parse_document};

    const SHARED: &str = r#"<sst xmlns="s"><si><t>Region</t></si><si><r><t>Sales</t></r><r><t xml:space="preserve"> total</t></r></si><si><t>North</t><rPh><t>のーす</t></rPh></si></sst>"#;

    const SHEET1: &str = r#"<worksheet xmlns="s"><sheetData>
        <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
        <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>1250.5</v></c><c r="C2" t="b"><v>1</v></c></row>
        <row r="3"/>
    </sheetData></worksheet>"#;

    const SHEET2: &str = r#"<worksheet xmlns="s"><sheetData>
        <row r="1"><c r="A1" t="inlineStr"><is><t>Notes &amp; caveats</t></is></c></row>
    </sheetData></worksheet>"#;

    #[test]
    fn test_shared_strings() {
        let strings = shared_strings(SHARED.as_bytes()).unwrap();
        assert_eq!(strings, vec!["Region", "Sales total", "North"]);
    }

    #[test]
    fn test_workbook_units_per_sheet() {
        let bytes = fixtures::zip_archive(&[
            ("xl/sharedStrings.xml", SHARED),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ]);

        let parsed = parse_document(&bytes, "sales.xlsx").unwrap();
        assert_eq!(
            parsed.units,
            vec![
                "Region\tSales total\nNorth\t1250.5\tTRUE".to_string(),
                "Notes & caveats".to_string(),
            ]
        );
    }

    #[test]
    fn test_workbook_without_shared_strings() {
        let bytes = fixtures::zip_archive(&[("xl/worksheets/sheet1.xml", SHEET2)]);
        let parsed = parse_document(&bytes, "notes.xlsx").unwrap();
        assert_eq!(parsed.units, vec!["Notes & caveats".to_string()]);
    }
}
