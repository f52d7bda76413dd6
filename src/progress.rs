//! Progress-callback trait for run events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline encodes rows and writes its outputs.
//!
//! The run itself is synchronous; callbacks fire on the calling thread in
//! pipeline order. The trait is still `Send + Sync` so a host can share one
//! reporter between runs on different threads.
//!
//! # Example
//!
//! ```rust
//! use qrsheet::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     encoded: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_row_encoded(&self, row: usize, total_rows: usize) {
//!         self.encoded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("row {}/{} encoded", row + 1, total_rows);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { encoded: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .encode_column("url")
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it works through a run.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after the table is loaded, before any QR code is generated.
    ///
    /// # Arguments
    /// * `total_rows`      — data rows in the table
    /// * `encoded_columns` — number of columns being encoded
    fn on_conversion_start(&self, total_rows: usize, encoded_columns: usize) {
        let _ = (total_rows, encoded_columns);
    }

    /// Called after every encoded column has produced the image for `row`.
    ///
    /// # Arguments
    /// * `row`        — 0-indexed data row
    /// * `total_rows` — data rows in the table
    fn on_row_encoded(&self, row: usize, total_rows: usize) {
        let _ = (row, total_rows);
    }

    /// Called when the PDF has been assembled.
    fn on_document_rendered(&self, pages: usize, bytes: usize) {
        let _ = (pages, bytes);
    }

    /// Called when the workbook copy has been written (round trip only).
    fn on_workbook_embedded(&self, images: usize, bytes: usize) {
        let _ = (images, bytes);
    }

    /// Called once after all outputs are produced.
    fn on_conversion_complete(&self, total_rows: usize, images: usize) {
        let _ = (total_rows, images);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
