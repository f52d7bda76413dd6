//! Error types for the qrsheet library.
//!
//! Every failure is fatal. A run either produces the full document (and the
//! workbook, when a round trip was requested) or nothing at all: there is no
//! per-row skip and no partial output. This mirrors how the pipeline is used,
//! an operator fixes the input or selection and re-runs.
//!
//! The three failures an operator is most likely to hit are:
//!
//! * [`QrSheetError::Decode`] — a delimited file could not be decoded with
//!   any of the candidate text encodings.
//! * [`QrSheetError::EncodingCapacity`] — a cell value is too long to fit in
//!   a QR code at the configured error-correction level.
//! * [`QrSheetError::SheetNotFound`] — the requested sheet does not exist.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the qrsheet library.
#[derive(Debug, Error)]
pub enum QrSheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The declared filename has an extension we cannot load.
    #[error("Unsupported input '{name}': expected .xlsx, .xlsm, .xlsb, .xls, .ods, .csv, .tsv or .txt")]
    UnsupportedInput { name: String },

    /// No candidate text encoding could decode and parse the delimited file.
    #[error(
        "Could not decode '{name}' with any supported text encoding (tried: {}); last error: {detail}",
        .tried.join(", ")
    )]
    Decode {
        name: String,
        tried: Vec<String>,
        detail: String,
    },

    /// The spreadsheet container could not be opened or a sheet could not be read.
    #[error("Failed to read workbook '{name}': {detail}")]
    Workbook { name: String, detail: String },

    /// The requested sheet is not in the workbook.
    #[error("Sheet '{sheet}' not found (available: {})", .available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    /// The input has no header row.
    #[error("'{name}' contains no columns")]
    EmptyTable { name: String },

    /// A row does not have one value per column.
    #[error("Row {row} has {found} values but the table has {expected} columns")]
    RaggedTable {
        row: usize,
        expected: usize,
        found: usize,
    },

    // ── Selection errors ──────────────────────────────────────────────────
    /// A selected column does not exist in the table.
    #[error("Column '{column}' not found (available: {})", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    // ── Encoding errors ───────────────────────────────────────────────────
    /// The cell value does not fit in a QR code at the configured parameters.
    #[error(
        "Value in column '{column}', row {row} is too long to encode ({length} bytes): {detail}"
    )]
    EncodingCapacity {
        column: String,
        row: usize,
        length: usize,
        detail: String,
    },

    /// PNG encoding or decoding of a QR raster failed.
    #[error("Image encoding failed for column '{column}', row {row}: {detail}")]
    ImageEncodeFailed {
        column: String,
        row: usize,
        detail: String,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The PDF could not be assembled.
    #[error("Document rendering failed: {0}")]
    RenderFailed(String),

    /// The workbook copy could not be written.
    #[error("Failed to write workbook: {0}")]
    WorkbookWriteFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed or a selection is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rust_xlsxwriter::XlsxError> for QrSheetError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        QrSheetError::WorkbookWriteFailed(e.to_string())
    }
}
