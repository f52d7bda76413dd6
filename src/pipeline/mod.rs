//! Pipeline stages for table-to-QR-document conversion.
//!
//! Each submodule implements exactly one transformation step, so every stage
//! can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ layout ──▶ render ──▶ (embed)
//! (table)   (PNG)      (grid)     (PDF)      (workbook copy)
//! ```
//!
//! 1. [`input`]  — parse a spreadsheet or delimited text into a `Table`,
//!    walking a fixed list of text encodings for delimited files
//! 2. [`encode`] — turn each selected cell into a QR code PNG
//! 3. [`layout`] — interleave values and images according to the layout mode
//! 4. [`render`] — paginate the grid into a styled PDF
//! 5. [`embed`]  — optionally write the images back into a copy of the
//!    spreadsheet

pub mod embed;
pub mod encode;
pub mod input;
pub mod layout;
pub mod render;
