//! QR encoding: cell text → square grayscale PNG.
//!
//! Every image in a run uses the same error-correction level, module size
//! and quiet zone, so the output is a pure function of the cell text. The QR
//! version grows with the payload; a value too long for the largest version
//! at the chosen level is a fatal [`QrSheetError::EncodingCapacity`] and no
//! other row is skipped in its place.

use crate::config::{ErrorCorrection, QrOptions};
use crate::error::QrSheetError;
use crate::model::{EncodedImage, EncodedImages, ImageRef};
use crate::progress::ProgressCallback;
use crate::table::Table;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use std::io::Cursor;
use tracing::debug;

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }
}

/// Why a single payload could not be rasterised.
#[derive(Debug)]
pub enum EncodeFailure {
    /// The payload exceeds QR capacity at the chosen level.
    Capacity(String),
    /// The encoder rejected the payload or the PNG writer failed.
    Raster(String),
}

/// Encode one payload as a QR code PNG.
///
/// Returns the PNG bytes and the edge length in pixels:
/// `(modules + 2 × border) × module_px`.
pub fn encode_payload(payload: &str, opts: &QrOptions) -> Result<(Vec<u8>, u32), EncodeFailure> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), opts.error_correction.into())
        .map_err(|e| match e {
            QrError::DataTooLong => EncodeFailure::Capacity(e.to_string()),
            other => EncodeFailure::Raster(other.to_string()),
        })?;

    let raster = rasterize(&code, opts);
    let size = raster.width();

    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(raster)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| EncodeFailure::Raster(e.to_string()))?;

    Ok((buf, size))
}

/// Paint the module matrix black on white with a quiet zone.
fn rasterize(code: &QrCode, opts: &QrOptions) -> GrayImage {
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let scale = opts.module_px.max(1);
    let border = opts.border_modules;
    let size = (modules + 2 * border) * scale;

    GrayImage::from_fn(size, size, |x, y| {
        let mx = (x / scale).checked_sub(border);
        let my = (y / scale).checked_sub(border);
        match (mx, my) {
            (Some(mx), Some(my)) if mx < modules && my < modules => {
                match colors[(my * modules + mx) as usize] {
                    Color::Dark => Luma([0]),
                    Color::Light => Luma([255]),
                }
            }
            _ => Luma([255]),
        }
    })
}

/// Encode every row of every selected column.
///
/// Column names are resolved up front, so an unknown column fails before any
/// image is produced. The first failing row aborts the whole stage.
pub fn encode_columns(
    table: &Table,
    columns: &[String],
    opts: &QrOptions,
    progress: Option<&ProgressCallback>,
) -> Result<EncodedImages, QrSheetError> {
    let indices = columns
        .iter()
        .map(|name| table.require_column(name))
        .collect::<Result<Vec<_>, _>>()?;

    let total_rows = table.row_count();
    let mut images = EncodedImages::new(columns.to_vec());

    for row in 0..total_rows {
        for (slot, (&col_idx, name)) in indices.iter().zip(columns).enumerate() {
            let payload = table
                .cell(row, col_idx)
                .map(|v| v.to_string())
                .unwrap_or_default();

            let (png, size_px) = encode_payload(&payload, opts).map_err(|f| match f {
                EncodeFailure::Capacity(detail) => QrSheetError::EncodingCapacity {
                    column: name.clone(),
                    row,
                    length: payload.len(),
                    detail,
                },
                EncodeFailure::Raster(detail) => QrSheetError::ImageEncodeFailed {
                    column: name.clone(),
                    row,
                    detail,
                },
            })?;

            debug!(
                "Encoded {}[{}] ({} chars) → {}px, {} bytes PNG",
                name,
                row,
                payload.chars().count(),
                size_px,
                png.len()
            );

            images.insert(
                ImageRef { column: slot, row },
                EncodedImage {
                    column: name.clone(),
                    row,
                    size_px,
                    png,
                },
            );
        }

        if let Some(cb) = progress {
            cb.on_row_encoded(row, total_rows);
        }
    }

    Ok(images)
}
