//! Results returned by a run.

use serde::{Deserialize, Serialize};

/// Default download name of the generated document.
pub const DEFAULT_DOCUMENT_FILENAME: &str = "output_with_qr.pdf";
/// MIME type of the generated document.
pub const DOCUMENT_MIME_TYPE: &str = "application/pdf";
/// Default download name of the round-trip workbook.
pub const DEFAULT_WORKBOOK_FILENAME: &str = "output_with_qr.xlsx";
/// MIME type of the round-trip workbook.
pub const WORKBOOK_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A finished output file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Suggested filename for saving or download.
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn document(bytes: Vec<u8>) -> Self {
        Self {
            filename: DEFAULT_DOCUMENT_FILENAME.to_string(),
            mime_type: DOCUMENT_MIME_TYPE,
            bytes,
        }
    }

    pub fn workbook(bytes: Vec<u8>) -> Self {
        Self {
            filename: DEFAULT_WORKBOOK_FILENAME.to_string(),
            mime_type: WORKBOOK_MIME_TYPE,
            bytes,
        }
    }
}

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The PDF.
    pub document: Artifact,
    /// The workbook copy with embedded codes, when a round trip was requested.
    pub workbook: Option<Artifact>,
    pub stats: ConversionStats,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_rows: usize,
    pub encoded_columns: usize,
    pub images_generated: usize,
    pub pages: usize,
    pub document_bytes: usize,
    pub workbook_bytes: Option<usize>,
    pub load_duration_ms: u64,
    pub encode_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// What [`crate::inspect`] reports about an input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    /// Input filename as declared.
    pub name: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    /// Sheets in a spreadsheet input; empty for delimited text.
    pub sheets: Vec<String>,
    /// Sheet the table was read from.
    pub sheet: Option<String>,
    /// Text encoding that decoded a delimited input.
    pub encoding: Option<String>,
}
