//! # qrsheet
//!
//! Turn a column of a spreadsheet or CSV file into QR codes and lay them out
//! next to the original data in a paginated PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! table file (.xlsx / .ods / .xls / .csv / .tsv)
//!  │
//!  ├─ 1. Input   parse the first (or named) sheet, or decode delimited text
//!  ├─ 2. Encode  one QR code PNG per selected cell
//!  ├─ 3. Layout  paired / values-then-images / combined grid
//!  ├─ 4. Render  paginated PDF table (Letter or A4)
//!  └─ 5. Embed   optional: codes written back into a workbook copy
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qrsheet::{convert, ConversionConfig, IncludeColumns, LayoutMode};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .encode_column("url")
//!         .include(IncludeColumns::All)
//!         .layout(LayoutMode::ValuesThenImages)
//!         .build()?;
//!     let output = convert("items.xlsx", &config)?;
//!     std::fs::write("items.pdf", &output.document.bytes)?;
//!     eprintln!("{} codes on {} page(s)", output.stats.images_generated, output.stats.pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `qrsheet` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! qrsheet = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ErrorCorrection, IncludeColumns, LayoutMode,
    PageSize, QrOptions, RoundTripConfig,
};
pub use convert::{convert, convert_from_bytes, convert_to_file, inspect, write_artifact};
pub use error::QrSheetError;
pub use output::{Artifact, ConversionOutput, ConversionStats, TableSummary};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use table::{CellValue, Table};
