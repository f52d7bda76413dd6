//! Workbook round trip: write QR images back into a copy of the input.
//!
//! The copy is rebuilt sheet by sheet from what the reader exposes, cell
//! values and formulas. Styling, charts and existing images of the source
//! are not carried over. The source bytes are never modified.
//!
//! Each image is staged as a PNG file in a scoped temporary directory before
//! being inserted. The directory belongs to one call and is removed when the
//! call returns, whether it succeeded or not.

use crate::config::RoundTripConfig;
use crate::error::QrSheetError;
use crate::model::EncodedImage;
use crate::pipeline::input::open_spreadsheet;
use calamine::{Data, Reader, Sheets};
use rust_xlsxwriter::{Image, Workbook, Worksheet};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Last column Excel addresses, `XFD`, as a 0-based index.
pub const MAX_COLUMN: u16 = 16_383;

/// Parse a column letter such as `"D"` or `"aa"` into a 0-based index.
///
/// Returns `None` for anything that is not one to three ASCII letters within
/// `A`–`XFD`.
pub fn parse_column_letter(letters: &str) -> Option<u16> {
    let letters = letters.trim();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let upper = ch.to_ascii_uppercase();
        col = col * 26 + (upper as u32 - 'A' as u32 + 1);
    }
    let idx = col - 1;
    if idx > u32::from(MAX_COLUMN) {
        return None;
    }
    u16::try_from(idx).ok()
}

/// Workbook bytes produced by the round trip.
#[derive(Debug, Clone)]
pub struct EmbeddedWorkbook {
    pub bytes: Vec<u8>,
    /// Images inserted into the target sheet.
    pub images: usize,
}

/// Convert an image edge in points to whole pixels at 96 DPI.
fn points_to_pixels(pt: f32) -> u16 {
    (pt * 96.0 / 72.0).ceil().clamp(1.0, f32::from(u16::MAX)) as u16
}

/// Embed `images` into a copy of `workbook`, staging files under the system
/// temporary directory.
///
/// See [`embed_images_in`].
pub fn embed_images<'a, I>(
    workbook: &[u8],
    name: &str,
    target: &RoundTripConfig,
    images: I,
    image_size_pt: f32,
) -> Result<EmbeddedWorkbook, QrSheetError>
where
    I: IntoIterator<Item = &'a EncodedImage>,
{
    embed_images_in(
        &std::env::temp_dir(),
        workbook,
        name,
        target,
        images,
        image_size_pt,
    )
}

/// Embed `images` into a copy of `workbook`.
///
/// The image of data row `n` (0-based) is anchored at `<column><n + 2>`,
/// directly beside its value when the first row is the header. The target
/// sheet is checked before anything is written: a missing sheet fails with
/// [`QrSheetError::SheetNotFound`] and no image is staged.
pub fn embed_images_in<'a, I>(
    staging_parent: &Path,
    workbook: &[u8],
    name: &str,
    target: &RoundTripConfig,
    images: I,
    image_size_pt: f32,
) -> Result<EmbeddedWorkbook, QrSheetError>
where
    I: IntoIterator<Item = &'a EncodedImage>,
{
    let column = parse_column_letter(&target.column).ok_or_else(|| {
        QrSheetError::InvalidConfig(format!(
            "'{}' is not a column letter (A–XFD)",
            target.column
        ))
    })?;

    let mut source = open_spreadsheet(workbook, name)?;
    let sheet_names = source.sheet_names().to_vec();
    if !sheet_names.iter().any(|s| *s == target.sheet) {
        return Err(QrSheetError::SheetNotFound {
            sheet: target.sheet.clone(),
            available: sheet_names,
        });
    }

    let staging = tempfile::Builder::new()
        .prefix("qrsheet-")
        .tempdir_in(staging_parent)
        .map_err(|e| QrSheetError::OutputWriteFailed {
            path: staging_parent.to_path_buf(),
            source: e,
        })?;
    debug!("Staging images in {}", staging.path().display());

    let size_px = points_to_pixels(image_size_pt);
    let mut staged = Vec::new();
    for image in images {
        let path = staging
            .path()
            .join(format!("qr_{}_{}.png", image.column, image.row));
        std::fs::write(&path, &image.png).map_err(|e| QrSheetError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;
        let row = u32::try_from(image.row + 1).map_err(|_| {
            QrSheetError::WorkbookWriteFailed(format!("row {} is beyond the sheet", image.row))
        })?;
        let picture =
            Image::new(&path)?.set_scale_to_size(f64::from(size_px), f64::from(size_px), true);
        staged.push((row, picture));
    }

    let mut out = Workbook::new();
    for sheet_name in &sheet_names {
        let sheet = out.add_worksheet();
        sheet.set_name(sheet_name)?;
        copy_sheet(&mut source, name, sheet_name, sheet)?;

        if *sheet_name == target.sheet {
            if !staged.is_empty() {
                sheet.set_column_width_pixels(column, size_px)?;
            }
            for (row, picture) in &staged {
                sheet.insert_image(*row, column, picture)?;
                sheet.set_row_height_pixels(*row, size_px)?;
            }
        }
    }

    let bytes = out.save_to_buffer()?;
    staging.close().map_err(|e| QrSheetError::OutputWriteFailed {
        path: staging_parent.to_path_buf(),
        source: e,
    })?;

    info!(
        "Embedded {} images into sheet '{}' column {} ({} bytes)",
        staged.len(),
        target.sheet,
        target.column.to_ascii_uppercase(),
        bytes.len()
    );
    Ok(EmbeddedWorkbook {
        bytes,
        images: staged.len(),
    })
}

/// Copy cell values, then formulas, of one sheet.
fn copy_sheet(
    source: &mut Sheets<Cursor<Vec<u8>>>,
    name: &str,
    sheet_name: &str,
    sheet: &mut Worksheet,
) -> Result<(), QrSheetError> {
    let values = source
        .worksheet_range(sheet_name)
        .map_err(|e| QrSheetError::Workbook {
            name: name.to_string(),
            detail: e.to_string(),
        })?;
    let (row0, col0) = values.start().unwrap_or((0, 0));
    let mut copied = 0usize;
    for (r, c, cell) in values.used_cells() {
        let row = row0 + r as u32;
        let Ok(col) = u16::try_from(col0 as usize + c) else {
            continue;
        };
        match cell {
            Data::Empty => continue,
            Data::Int(i) => sheet.write_number(row, col, *i as f64)?,
            Data::Float(f) => sheet.write_number(row, col, *f)?,
            Data::Bool(b) => sheet.write_boolean(row, col, *b)?,
            Data::String(s) => sheet.write_string(row, col, s)?,
            Data::DateTime(dt) => sheet.write_number(row, col, dt.as_f64())?,
            other => sheet.write_string(row, col, other.to_string())?,
        };
        copied += 1;
    }

    // Some container formats expose no formulas; values alone are still a copy.
    match source.worksheet_formula(sheet_name) {
        Ok(formulas) => {
            let (row0, col0) = formulas.start().unwrap_or((0, 0));
            for (r, c, formula) in formulas.used_cells() {
                if formula.is_empty() {
                    continue;
                }
                let row = row0 + r as u32;
                let Ok(col) = u16::try_from(col0 as usize + c) else {
                    continue;
                };
                sheet.write_formula(row, col, formula.as_str())?;
            }
        }
        Err(e) => debug!("No formulas read from sheet '{}': {}", sheet_name, e),
    }

    debug!("Copied {} cells of sheet '{}'", copied, sheet_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QrOptions;
    use crate::pipeline::encode::encode_payload;
    use calamine::open_workbook_auto_from_rs;

    fn source_workbook() -> Vec<u8> {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("Items").unwrap();
        ws.write_string(0, 0, "id").unwrap();
        ws.write_string(0, 1, "url").unwrap();
        ws.write_number(1, 0, 1).unwrap();
        ws.write_string(1, 1, "http://a").unwrap();
        ws.write_number(2, 0, 2).unwrap();
        ws.write_string(2, 1, "http://b").unwrap();
        ws.write_formula(3, 0, "=A2+A3").unwrap();
        let notes = wb.add_worksheet();
        notes.set_name("Notes").unwrap();
        notes.write_string(0, 0, "keep me").unwrap();
        wb.save_to_buffer().unwrap()
    }

    fn images() -> Vec<EncodedImage> {
        ["http://a", "http://b"]
            .iter()
            .enumerate()
            .map(|(row, value)| {
                let (png, size_px) = encode_payload(value, &QrOptions::default()).unwrap();
                EncodedImage {
                    column: "url".into(),
                    row,
                    size_px,
                    png,
                }
            })
            .collect()
    }

    fn target(sheet: &str) -> RoundTripConfig {
        RoundTripConfig {
            sheet: sheet.into(),
            column: "C".into(),
            source_column: None,
        }
    }

    #[test]
    fn column_letters() {
        assert_eq!(parse_column_letter("A"), Some(0));
        assert_eq!(parse_column_letter("d"), Some(3));
        assert_eq!(parse_column_letter("Z"), Some(25));
        assert_eq!(parse_column_letter("AA"), Some(26));
        assert_eq!(parse_column_letter("XFD"), Some(MAX_COLUMN));
        assert_eq!(parse_column_letter("XFE"), None);
        assert_eq!(parse_column_letter("AAAA"), None);
        assert_eq!(parse_column_letter("A1"), None);
        assert_eq!(parse_column_letter(""), None);
    }

    #[test]
    fn embeds_into_a_copy() {
        let source = source_workbook();
        let imgs = images();
        let out = embed_images(&source, "items.xlsx", &target("Items"), &imgs, 50.0).unwrap();
        assert_eq!(out.images, 2);
        assert!(out.bytes.starts_with(b"PK"));

        let mut wb = open_workbook_auto_from_rs(Cursor::new(out.bytes)).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Items".to_string(), "Notes".to_string()]);
        let items = wb.worksheet_range("Items").unwrap();
        assert_eq!(items.get_value((2, 1)), Some(&Data::String("http://b".into())));
        let notes = wb.worksheet_range("Notes").unwrap();
        assert_eq!(notes.get_value((0, 0)), Some(&Data::String("keep me".into())));
        let formulas = wb.worksheet_formula("Items").unwrap();
        assert!(formulas.used_cells().any(|(_, _, f)| f.contains("A2+A3")));
    }

    #[test]
    fn missing_sheet_fails_before_staging() {
        let parent = tempfile::tempdir().unwrap();
        let err = embed_images_in(
            parent.path(),
            &source_workbook(),
            "items.xlsx",
            &target("Orders"),
            &images(),
            50.0,
        )
        .unwrap_err();
        match err {
            QrSheetError::SheetNotFound { sheet, available } => {
                assert_eq!(sheet, "Orders");
                assert_eq!(available, vec!["Items", "Notes"]);
            }
            other => panic!("expected SheetNotFound, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn staging_directory_is_removed() {
        let parent = tempfile::tempdir().unwrap();
        embed_images_in(
            parent.path(),
            &source_workbook(),
            "items.xlsx",
            &target("Items"),
            &images(),
            50.0,
        )
        .unwrap();
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn source_bytes_are_untouched() {
        let source = source_workbook();
        let before = source.clone();
        embed_images(&source, "items.xlsx", &target("Items"), &images(), 50.0).unwrap();
        assert_eq!(source, before);
    }

    #[test]
    fn points_convert_at_96_dpi() {
        assert_eq!(points_to_pixels(50.0), 67);
        assert_eq!(points_to_pixels(72.0), 96);
    }
}
