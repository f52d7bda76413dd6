//! Input loading: turn an uploaded file into a [`Table`].
//!
//! The declared filename decides how the bytes are read. Spreadsheets go
//! through calamine; delimited text is decoded by walking a fixed list of
//! candidate encodings and keeping the first one that both decodes strictly
//! and parses as a rectangular table. Nothing downstream runs if loading
//! fails.

use crate::error::QrSheetError;
use crate::table::{normalize_headers, CellValue, Table};
use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use encoding_rs::{Encoding, EUC_KR, GBK, SHIFT_JIS, UTF_8};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Encodings tried, in order, for delimited text without a byte-order mark.
pub fn encoding_candidates() -> [&'static Encoding; 4] {
    [UTF_8, SHIFT_JIS, EUC_KR, GBK]
}

/// How an input file is read, decided from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Spreadsheet,
    Delimited { delimiter: u8 },
}

impl InputKind {
    pub fn from_name(name: &str) -> Result<Self, QrSheetError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(InputKind::Spreadsheet),
            "csv" | "txt" => Ok(InputKind::Delimited { delimiter: b',' }),
            "tsv" | "tab" => Ok(InputKind::Delimited { delimiter: b'\t' }),
            _ => Err(QrSheetError::UnsupportedInput {
                name: name.to_string(),
            }),
        }
    }
}

/// Where a loaded table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Spreadsheet { sheet: String, sheets: Vec<String> },
    Delimited { encoding: &'static str },
}

/// A parsed table together with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    pub source: TableSource,
}

/// Read a local input file, mapping I/O failures to input errors.
pub fn read_input(path: &Path) -> Result<Vec<u8>, QrSheetError> {
    if !path.exists() {
        return Err(QrSheetError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut bytes = Vec::new();
            f.read_to_end(&mut bytes)
                .map_err(|e| QrSheetError::Internal(format!("Failed to read input: {e}")))?;
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(QrSheetError::PermissionDenied {
                path: PathBuf::from(path),
            })
        }
        Err(_) => Err(QrSheetError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Parse `bytes`, declared as `name`, into a table.
///
/// `sheet` selects a worksheet for spreadsheet inputs; `None` takes the first.
/// It is ignored for delimited text.
pub fn load_table(
    bytes: &[u8],
    name: &str,
    sheet: Option<&str>,
) -> Result<LoadedTable, QrSheetError> {
    let kind = InputKind::from_name(name)?;
    let (table, source) = match kind {
        InputKind::Spreadsheet => load_spreadsheet(bytes, name, sheet)?,
        InputKind::Delimited { delimiter } => load_delimited(bytes, name, delimiter)?,
    };
    info!(
        "Loaded '{}': {} columns × {} rows",
        name,
        table.columns().len(),
        table.row_count()
    );
    Ok(LoadedTable { table, source })
}

/// Open a spreadsheet container held in memory.
pub(crate) fn open_spreadsheet(
    bytes: &[u8],
    name: &str,
) -> Result<Sheets<Cursor<Vec<u8>>>, QrSheetError> {
    open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| QrSheetError::Workbook {
        name: name.to_string(),
        detail: e.to_string(),
    })
}

fn load_spreadsheet(
    bytes: &[u8],
    name: &str,
    sheet: Option<&str>,
) -> Result<(Table, TableSource), QrSheetError> {
    let mut workbook = open_spreadsheet(bytes, name)?;
    let sheets = workbook.sheet_names().to_vec();

    let chosen = match sheet {
        Some(s) => {
            if !sheets.iter().any(|n| n == s) {
                return Err(QrSheetError::SheetNotFound {
                    sheet: s.to_string(),
                    available: sheets,
                });
            }
            s.to_string()
        }
        None => sheets
            .first()
            .cloned()
            .ok_or_else(|| QrSheetError::EmptyTable {
                name: name.to_string(),
            })?,
    };

    let range = workbook
        .worksheet_range(&chosen)
        .map_err(|e| QrSheetError::Workbook {
            name: name.to_string(),
            detail: e.to_string(),
        })?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| QrSheetError::EmptyTable {
        name: name.to_string(),
    })?;
    let columns = normalize_headers(header.iter().map(|c| c.to_string()).collect());
    let body: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    debug!("Sheet '{}' of '{}' has {} data rows", chosen, name, body.len());
    let table = Table::new(columns, body)?;
    Ok((
        table,
        TableSource::Spreadsheet {
            sheet: chosen,
            sheets,
        },
    ))
}

/// Map a calamine cell onto our scalar type.
pub(crate) fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::String(s.clone()),
        other => CellValue::String(other.to_string()),
    }
}

fn load_delimited(
    bytes: &[u8],
    name: &str,
    delimiter: u8,
) -> Result<(Table, TableSource), QrSheetError> {
    let mut tried: Vec<String> = Vec::new();
    let mut last_error = String::from("no encoding attempted");

    // A byte-order mark names the encoding outright; try it before the list.
    let (bom_encoding, body) = match Encoding::for_bom(bytes) {
        Some((enc, len)) => (Some(enc), &bytes[len..]),
        None => (None, bytes),
    };
    let candidates = bom_encoding
        .into_iter()
        .chain(encoding_candidates().into_iter().filter(|e| Some(*e) != bom_encoding));

    for encoding in candidates {
        tried.push(encoding.name().to_string());
        let text = match encoding.decode_without_bom_handling_and_without_replacement(body) {
            Some(text) => text,
            None => {
                debug!("'{}' is not valid {}", name, encoding.name());
                last_error = format!("invalid {} byte sequence", encoding.name());
                continue;
            }
        };
        match parse_delimited(&text, delimiter, name) {
            Ok(table) => {
                info!("Decoded '{}' as {}", name, encoding.name());
                return Ok((
                    table,
                    TableSource::Delimited {
                        encoding: encoding.name(),
                    },
                ));
            }
            Err(ParseFailure::Empty) => {
                return Err(QrSheetError::EmptyTable {
                    name: name.to_string(),
                });
            }
            Err(ParseFailure::Malformed(detail)) => {
                debug!("Parsing '{}' as {} failed: {}", name, encoding.name(), detail);
                last_error = detail;
            }
        }
    }

    Err(QrSheetError::Decode {
        name: name.to_string(),
        tried,
        detail: last_error,
    })
}

enum ParseFailure {
    Empty,
    Malformed(String),
}

fn parse_delimited(text: &str, delimiter: u8, name: &str) -> Result<Table, ParseFailure> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ParseFailure::Malformed(e.to_string()))?
        .iter()
        .map(String::from)
        .collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(ParseFailure::Empty);
    }
    let columns = normalize_headers(headers);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ParseFailure::Malformed(e.to_string()))?;
        rows.push(record.iter().map(CellValue::infer).collect());
    }

    debug!("Parsed {} records from '{}'", rows.len(), name);
    Table::new(columns, rows).map_err(|e| ParseFailure::Malformed(e.to_string()))
}
