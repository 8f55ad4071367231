//! Inventory CSV export and import.
//!
//! Files carry the header `id,name,category,size,color,quantity,condition,location,notes`
//! and are read back by column position; the header line itself is skipped
//! without inspecting it.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use serde::Serialize;
use thiserror::Error;

use crate::{
    item::{InventoryItem, ItemDraft},
    types::ItemId,
};

/// File name used for exports.
pub const EXPORT_FILE_NAME: &str = "inventory_export.csv";

/// Exact export header.
pub const HEADER: [&str; 9] = [
    "id", "name", "category", "size", "color", "quantity", "condition", "location", "notes",
];

/// CSV import and export failures.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Codec error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// File access failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Export produced invalid UTF-8.
    #[error("export is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    /// Nothing but a header, or nothing at all.
    #[error("No data found")]
    NoData,
    /// Import path lacks a `.csv` extension.
    #[error("not a .csv file: {}", .0.display())]
    NotCsv(PathBuf),
}

/// One data row turned into a creation draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// 1-based line of the row in the source text.
    pub line: u64,
    /// Draft to submit; `id` is `None` when the column was blank.
    pub draft: ItemDraft,
}

/// A row that could not be read or stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// 1-based line of the row in the source text.
    pub line: u64,
    /// What went wrong.
    pub reason: String,
}

/// Parsed import: drafts in file order plus rows the codec rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImport {
    /// Rows ready to submit.
    pub rows: Vec<ImportRow>,
    /// Rows the codec could not decode.
    pub rejected: Vec<RowFailure>,
}

/// Outcome of submitting an import row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Ids stored, in submission order.
    pub added: Vec<ItemId>,
    /// Rows that were not stored.
    pub failed: Vec<RowFailure>,
}

/// Renders `items` with a header row, one line per item.
pub fn export_inventory<'a>(
    items: impl IntoIterator<Item = &'a InventoryItem>,
) -> Result<String, CsvError> {
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(HEADER)?;

    for item in items {
        let quantity = item.quantity.to_string();
        wtr.write_record([
            item.id.as_str(),
            item.name.as_str(),
            item.category.as_str(),
            item.size.as_str(),
            item.color.as_str(),
            quantity.as_str(),
            item.condition.as_str(),
            item.location.as_str(),
            item.notes.as_str(),
        ])?;
    }

    let bytes = wtr.into_inner().map_err(|e| CsvError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Writes the export to `dir/inventory_export.csv` and returns the path.
pub fn write_export<'a>(
    dir: impl AsRef<Path>,
    items: impl IntoIterator<Item = &'a InventoryItem>,
) -> Result<PathBuf, CsvError> {
    let path = dir.as_ref().join(EXPORT_FILE_NAME);
    std::fs::write(&path, export_inventory(items)?)?;
    Ok(path)
}

/// Reads an import file, refusing paths without a `.csv` extension.
pub fn read_import_file(path: impl AsRef<Path>) -> Result<String, CsvError> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(CsvError::NotCsv(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Parses import text into drafts.
///
/// Input is read one physical line at a time. A line only continues onto the
/// next when it leaves a quoted field open and the joined lines form well-formed
/// CSV, which is what [`export_inventory`] writes for multi-line notes. A line
/// whose quoting is broken, or whose open quote never closes, is decoded on its
/// own with quotes kept as literal text, so it cannot swallow the rows after it.
///
/// Blank lines are skipped and the first remaining line is the header. Short
/// rows are padded with defaults: text fields become empty and the quantity
/// becomes 0, as does any quantity that is not a non-negative whole number.
pub fn parse_inventory(text: &str) -> Result<ParsedImport, CsvError> {
    let lines: Vec<(u64, &str)> = text
        .split('\n')
        .zip(1u64..)
        .map(|(line, n)| (n, line.strip_suffix('\r').unwrap_or(line)))
        .collect();

    let mut parsed = ParsedImport::default();
    let mut seen_header = false;
    let mut at = 0;
    while at < lines.len() {
        let (line, first) = lines[at];
        if first.is_empty() {
            at += 1;
            continue;
        }
        let segment = next_segment(&lines[at..]);
        at += segment.lines;
        if !seen_header {
            seen_header = true;
            continue;
        }

        match decode_segment(&segment) {
            Ok(record) => parsed.rows.push(ImportRow {
                line,
                draft: draft_from_record(&record),
            }),
            Err(err) => parsed.rejected.push(RowFailure {
                line,
                reason: err.to_string(),
            }),
        }
    }

    if parsed.rows.is_empty() && parsed.rejected.is_empty() {
        return Err(CsvError::NoData);
    }
    Ok(parsed)
}

/// Text of one logical row and how to decode it.
struct Segment {
    text: String,
    quoted: bool,
    lines: usize,
}

enum Shape {
    Complete,
    OpenQuote,
    Malformed,
}

fn next_segment(lines: &[(u64, &str)]) -> Segment {
    let first = lines[0].1;
    let mut text = first.to_string();
    let mut used = 1;
    loop {
        match shape(&text) {
            Shape::Complete => {
                return Segment {
                    text,
                    quoted: true,
                    lines: used,
                };
            }
            Shape::OpenQuote if used < lines.len() => {
                text.push('\n');
                text.push_str(lines[used].1);
                used += 1;
            }
            _ => {
                return Segment {
                    text: first.to_string(),
                    quoted: false,
                    lines: 1,
                };
            }
        }
    }
}

/// Strict scan: a quote opens a field only at its start, and a closing quote
/// must be followed by a delimiter or the end of the row.
fn shape(text: &str) -> Shape {
    let mut chars = text.chars().peekable();
    let mut field_start = true;
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    in_quotes = false;
                    if !matches!(chars.peek(), None | Some(&',') | Some(&'\n')) {
                        return Shape::Malformed;
                    }
                }
            }
            continue;
        }
        match c {
            '"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            ',' | '\n' => field_start = true,
            _ => field_start = false,
        }
    }
    if in_quotes {
        Shape::OpenQuote
    } else {
        Shape::Complete
    }
}

fn decode_segment(segment: &Segment) -> Result<StringRecord, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(segment.quoted)
        .from_reader(segment.text.as_bytes());
    let mut record = StringRecord::new();
    rdr.read_record(&mut record)?;
    Ok(record)
}

/// Whole, non-negative numbers in any numeric spelling (`3`, `3.0`, `1e1`).
fn parse_quantity(raw: &str) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(q) if q.is_finite() && q >= 0.0 && q.fract() == 0.0 && q <= f64::from(u32::MAX) => {
            q as u32
        }
        _ => 0,
    }
}

fn draft_from_record(record: &StringRecord) -> ItemDraft {
    let text = |idx: usize| record.get(idx).unwrap_or_default().to_string();
    let id = record
        .get(0)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    ItemDraft {
        id,
        name: text(1),
        category: text(2),
        size: text(3),
        color: text(4),
        quantity: record.get(5).map_or(0, parse_quantity),
        condition: text(6),
        location: text(7),
        notes: text(8),
    }
}
