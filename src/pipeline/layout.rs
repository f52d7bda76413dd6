//! Layout composition: table values and QR images → header + row records.
//!
//! [`LayoutMode`] is closed; each variant has its own shaping function and
//! [`compose`] only dispatches. Every shaping function guarantees that the
//! header has as many cells as each record and that there is exactly one
//! record per source row.

use crate::config::{IncludeColumns, LayoutMode};
use crate::error::QrSheetError;
use crate::model::{ImageRef, Layout, LayoutCell, LayoutRecord};
use crate::table::Table;
use tracing::debug;

/// Header label for the image column of `column`.
pub fn image_label(column: &str) -> String {
    format!("QR Code ({column})")
}

/// A column that appears as values in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Included {
    name: String,
    /// Index in the table.
    index: usize,
    /// Position in the encoded list when the column is encoded.
    encoded: Option<usize>,
}

/// Resolve the included column names, in output order.
///
/// Unknown names fail with [`QrSheetError::ColumnNotFound`]. Repeats in a
/// selected list are dropped, and encoded columns the list leaves out are
/// appended after it.
pub fn resolve_included(
    table: &Table,
    encoded: &[String],
    include: &IncludeColumns,
) -> Result<Vec<String>, QrSheetError> {
    for name in encoded {
        table.require_column(name)?;
    }

    let mut names: Vec<String> = match include {
        IncludeColumns::Encoded => encoded.to_vec(),
        IncludeColumns::All => table.columns().to_vec(),
        IncludeColumns::Selected(selected) => {
            let mut out: Vec<String> = Vec::with_capacity(selected.len());
            for name in selected {
                table.require_column(name)?;
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            out
        }
    };

    for name in encoded {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    Ok(names)
}

/// Arrange `table` and the images of `encoded` according to `mode`.
///
/// Images are referenced by [`ImageRef`] (position in `encoded`, row), the
/// same keys the encoder stage produces.
pub fn compose(
    table: &Table,
    encoded: &[String],
    include: &IncludeColumns,
    mode: LayoutMode,
) -> Result<Layout, QrSheetError> {
    let included = resolve_included(table, encoded, include)?
        .into_iter()
        .map(|name| {
            Ok(Included {
                index: table.require_column(&name)?,
                encoded: encoded.iter().position(|e| *e == name),
                name,
            })
        })
        .collect::<Result<Vec<_>, QrSheetError>>()?;

    let layout = match mode {
        LayoutMode::Paired => paired(table, &included),
        LayoutMode::ValuesThenImages => values_then_images(table, encoded, &included)?,
        LayoutMode::Combined => combined(table, &included),
    };

    debug!(
        "Composed {} layout: {} header cells × {} records",
        mode,
        layout.header.len(),
        layout.records.len()
    );
    Ok(layout)
}

fn value_cell(table: &Table, row: usize, col: usize) -> LayoutCell {
    LayoutCell::Value(table.cell(row, col).cloned().unwrap_or_default())
}

/// `value, [image]` per included column.
fn paired(table: &Table, included: &[Included]) -> Layout {
    let mut header = Vec::new();
    for col in included {
        header.push(col.name.clone());
        if col.encoded.is_some() {
            header.push(image_label(&col.name));
        }
    }

    let records = (0..table.row_count())
        .map(|row| {
            let mut cells = Vec::with_capacity(header.len());
            for col in included {
                cells.push(value_cell(table, row, col.index));
                if let Some(slot) = col.encoded {
                    cells.push(LayoutCell::Image(ImageRef { column: slot, row }));
                }
            }
            LayoutRecord { cells }
        })
        .collect();

    Layout { header, records }
}

/// All included values, then one image per encoded column.
fn values_then_images(
    table: &Table,
    encoded: &[String],
    included: &[Included],
) -> Result<Layout, QrSheetError> {
    let mut header: Vec<String> = included.iter().map(|c| c.name.clone()).collect();
    header.extend(encoded.iter().map(|name| image_label(name)));

    // resolve_included guarantees every encoded column is included.
    if included.iter().filter(|c| c.encoded.is_some()).count() != encoded.len() {
        return Err(QrSheetError::Internal(
            "encoded column missing from included set".into(),
        ));
    }

    let records = (0..table.row_count())
        .map(|row| {
            let mut cells: Vec<LayoutCell> = included
                .iter()
                .map(|c| value_cell(table, row, c.index))
                .collect();
            cells.extend((0..encoded.len()).map(|slot| LayoutCell::Image(ImageRef { column: slot, row })));
            LayoutRecord { cells }
        })
        .collect();

    Ok(Layout { header, records })
}

/// One cell per included column; encoded ones stack text over the image.
fn combined(table: &Table, included: &[Included]) -> Layout {
    let header = included.iter().map(|c| c.name.clone()).collect();

    let records = (0..table.row_count())
        .map(|row| {
            let cells = included
                .iter()
                .map(|c| {
                    let text = table
                        .cell(row, c.index)
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    match c.encoded {
                        Some(slot) => LayoutCell::Stacked {
                            text,
                            image: ImageRef { column: slot, row },
                        },
                        None => LayoutCell::Text(text),
                    }
                })
                .collect();
            LayoutRecord { cells }
        })
        .collect();

    Layout { header, records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn two_rows() -> Table {
        Table::new(
            vec!["id".into(), "url".into()],
            vec![
                vec!["1".into(), "http://a".into()],
                vec!["2".into(), "http://b".into()],
            ],
        )
        .unwrap()
    }

    fn wide() -> Table {
        Table::new(
            vec!["id".into(), "name".into(), "url".into(), "sku".into()],
            vec![
                vec![CellValue::Int(1), "bolt".into(), "http://a".into(), "S-1".into()],
                vec![CellValue::Int(2), "nut".into(), "http://b".into(), "S-2".into()],
                vec![CellValue::Int(3), "gear".into(), "http://c".into(), "S-3".into()],
            ],
        )
        .unwrap()
    }

    fn enc(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn assert_rectangular(layout: &Layout, rows: usize) {
        assert_eq!(layout.records.len(), rows);
        for r in &layout.records {
            assert_eq!(r.len(), layout.header.len());
        }
    }

    #[test]
    fn every_mode_is_rectangular() {
        let table = wide();
        for mode in LayoutMode::ALL {
            for include in [
                IncludeColumns::Encoded,
                IncludeColumns::All,
                IncludeColumns::Selected(vec!["name".into()]),
            ] {
                let layout = compose(&table, &enc(&["url", "sku"]), &include, mode).unwrap();
                assert_rectangular(&layout, 3);
            }
        }
    }

    #[test]
    fn values_then_images_example() {
        let layout = compose(
            &two_rows(),
            &enc(&["url"]),
            &IncludeColumns::All,
            LayoutMode::ValuesThenImages,
        )
        .unwrap();
        assert_eq!(layout.header, vec!["id", "url", "QR Code (url)"]);
        assert_rectangular(&layout, 2);
        let first = layout.records[0].cells[2].image().unwrap();
        let second = layout.records[1].cells[2].image().unwrap();
        assert_ne!(first, second);
        assert_eq!(layout.records[1].cells[0], LayoutCell::Value("2".into()));
    }

    #[test]
    fn paired_alternates_value_and_image() {
        let layout = compose(
            &wide(),
            &enc(&["url", "sku"]),
            &IncludeColumns::Encoded,
            LayoutMode::Paired,
        )
        .unwrap();
        assert_eq!(
            layout.header,
            vec!["url", "QR Code (url)", "sku", "QR Code (sku)"]
        );
        let row = &layout.records[1].cells;
        assert_eq!(row[0], LayoutCell::Value("http://b".into()));
        assert_eq!(row[1], LayoutCell::Image(ImageRef { column: 0, row: 1 }));
        assert_eq!(row[2], LayoutCell::Value("S-2".into()));
        assert_eq!(row[3], LayoutCell::Image(ImageRef { column: 1, row: 1 }));
    }

    #[test]
    fn paired_only_pairs_encoded_columns() {
        let layout = compose(&wide(), &enc(&["url"]), &IncludeColumns::All, LayoutMode::Paired)
            .unwrap();
        assert_eq!(
            layout.header,
            vec!["id", "name", "url", "QR Code (url)", "sku"]
        );
    }

    #[test]
    fn values_then_images_trailing_labels() {
        let layout = compose(
            &wide(),
            &enc(&["sku", "url"]),
            &IncludeColumns::All,
            LayoutMode::ValuesThenImages,
        )
        .unwrap();
        assert_eq!(&layout.header[..4], &["id", "name", "url", "sku"]);
        assert_eq!(&layout.header[4..], &["QR Code (sku)", "QR Code (url)"]);
        let row = &layout.records[0].cells;
        assert_eq!(row[4], LayoutCell::Image(ImageRef { column: 0, row: 0 }));
        assert_eq!(row[5], LayoutCell::Image(ImageRef { column: 1, row: 0 }));
    }

    #[test]
    fn combined_stacks_text_over_image() {
        let layout = compose(
            &wide(),
            &enc(&["url"]),
            &IncludeColumns::Selected(vec!["id".into(), "url".into()]),
            LayoutMode::Combined,
        )
        .unwrap();
        assert_eq!(layout.header, vec!["id", "url"]);
        let row = &layout.records[2].cells;
        assert_eq!(row[0], LayoutCell::Text("3".into()));
        assert_eq!(
            row[1],
            LayoutCell::Stacked {
                text: "http://c".into(),
                image: ImageRef { column: 0, row: 2 },
            }
        );
    }

    #[test]
    fn unselected_columns_are_dropped_and_encoded_appended() {
        let included = resolve_included(
            &wide(),
            &enc(&["url"]),
            &IncludeColumns::Selected(vec!["name".into(), "name".into()]),
        )
        .unwrap();
        assert_eq!(included, vec!["name", "url"]);
    }

    #[test]
    fn unknown_included_column_is_rejected() {
        let err = compose(
            &wide(),
            &enc(&["url"]),
            &IncludeColumns::Selected(vec!["price".into()]),
            LayoutMode::Paired,
        )
        .unwrap_err();
        assert!(matches!(err, QrSheetError::ColumnNotFound { ref column, .. } if column == "price"));
    }

    #[test]
    fn empty_table_yields_header_only() {
        let table = Table::new(vec!["url".into()], vec![]).unwrap();
        let layout = compose(&table, &enc(&["url"]), &IncludeColumns::Encoded, LayoutMode::Paired)
            .unwrap();
        assert_eq!(layout.header, vec!["url", "QR Code (url)"]);
        assert!(layout.records.is_empty());
    }
}
