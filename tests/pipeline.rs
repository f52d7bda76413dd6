//! Integration tests for qrsheet.
//!
//! Fixtures are built in memory with `rust_xlsxwriter` or as literal CSV
//! bytes, and outputs go to per-test temporary directories, so the suite
//! needs no files on disk and no network.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use qrsheet::pipeline::{encode, layout};
use qrsheet::{
    convert_from_bytes, convert_to_file, inspect, ConversionConfig, IncludeColumns, LayoutMode,
    NoopProgressCallback, QrSheetError,
};
use rust_xlsxwriter::Workbook;
use std::io::{Cursor, Read};
use std::path::Path;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Workbook with an `Items` sheet (id, url) and an unrelated `Notes` sheet.
fn items_workbook() -> Vec<u8> {
    let mut wb = Workbook::new();
    let items = wb.add_worksheet();
    items.set_name("Items").unwrap();
    items.write_string(0, 0, "id").unwrap();
    items.write_string(0, 1, "url").unwrap();
    items.write_string(1, 0, "1").unwrap();
    items.write_string(1, 1, "http://a").unwrap();
    items.write_string(2, 0, "2").unwrap();
    items.write_string(2, 1, "http://b").unwrap();
    let notes = wb.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "printed on demand").unwrap();
    wb.save_to_buffer().unwrap()
}

fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn url_config() -> qrsheet::ConversionConfigBuilder {
    ConversionConfig::builder()
        .encode_column("url")
        .include(IncludeColumns::All)
        .layout(LayoutMode::ValuesThenImages)
}

/// Read one part of an xlsx package as text.
fn xlsx_part(bytes: &[u8], part: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive.by_name(part).unwrap().read_to_string(&mut xml).unwrap();
    xml
}

/// The opening tag that starts with `prefix`, up to its closing `>`.
fn opening_tag<'a>(xml: &'a str, prefix: &str) -> &'a str {
    let start = xml.find(prefix).unwrap_or_else(|| panic!("no {prefix} in part"));
    let end = xml[start..].find('>').unwrap();
    &xml[start..=start + end]
}

// ── Layout over a real workbook ──────────────────────────────────────────────

#[test]
fn test_values_then_images_example() {
    let loaded =
        qrsheet::pipeline::input::load_table(&items_workbook(), "items.xlsx", None).unwrap();
    let table = &loaded.table;
    let encoded = vec!["url".to_string()];

    let images = encode::encode_columns(table, &encoded, &Default::default(), None).unwrap();
    let grid = layout::compose(
        table,
        &encoded,
        &IncludeColumns::All,
        LayoutMode::ValuesThenImages,
    )
    .unwrap();

    assert_eq!(grid.header, vec!["id", "url", "QR Code (url)"]);
    assert_eq!(grid.records.len(), 2);
    for record in &grid.records {
        assert_eq!(record.len(), 3);
    }
    let a = grid.records[0].cells[2].image().unwrap();
    let b = grid.records[1].cells[2].image().unwrap();
    assert_ne!(images.get(a).unwrap().png, images.get(b).unwrap().png);
}

#[test]
fn test_first_sheet_is_default() {
    let config = url_config().build().unwrap();
    let out = convert_from_bytes(&items_workbook(), "items.xlsx", &config).unwrap();
    assert_eq!(out.stats.total_rows, 2);
    assert_eq!(out.stats.images_generated, 2);
    assert!(out.document.bytes.starts_with(b"%PDF-"));
}

#[test]
fn test_missing_input_sheet() {
    let config = url_config().sheet("Orders").build().unwrap();
    let err = convert_from_bytes(&items_workbook(), "items.xlsx", &config).unwrap_err();
    assert!(matches!(err, QrSheetError::SheetNotFound { .. }), "got {err:?}");
}

// ── Round trip ───────────────────────────────────────────────────────────────

#[test]
fn test_round_trip_writes_workbook_copy() {
    let source = items_workbook();
    let before = source.clone();
    let config = url_config().round_trip("Items", "C").build().unwrap();
    let out = convert_from_bytes(&source, "items.xlsx", &config).unwrap();

    let workbook = out.workbook.expect("round trip produces a workbook");
    assert!(workbook.bytes.starts_with(b"PK"));
    assert_eq!(workbook.filename, "output_with_qr.xlsx");
    assert_eq!(out.stats.workbook_bytes, Some(workbook.bytes.len()));

    let mut copy = open_workbook_auto_from_rs(Cursor::new(workbook.bytes)).unwrap();
    assert_eq!(copy.sheet_names(), vec!["Items".to_string(), "Notes".to_string()]);
    let items = copy.worksheet_range("Items").unwrap();
    assert_eq!(items.get_value((1, 1)), Some(&Data::String("http://a".into())));

    // The caller's bytes are not modified.
    assert_eq!(source, before);
}

#[test]
fn test_round_trip_anchors_images_below_header() {
    let config = url_config().round_trip("Items", "C").build().unwrap();
    let out = convert_from_bytes(&items_workbook(), "items.xlsx", &config).unwrap();
    let bytes = out.workbook.unwrap().bytes;

    // Data row 0 lands in C2, data row 1 in C3 (0-based col 2, rows 1 and 2).
    let drawing = xlsx_part(&bytes, "xl/drawings/drawing1.xml");
    let anchors: Vec<&str> = drawing
        .split("<xdr:from>")
        .skip(1)
        .map(|rest| &rest[..rest.find("</xdr:from>").unwrap()])
        .collect();
    assert_eq!(anchors.len(), 2);
    assert!(anchors[0].contains("<xdr:col>2</xdr:col>"), "{}", anchors[0]);
    assert!(anchors[0].contains("<xdr:row>1</xdr:row>"), "{}", anchors[0]);
    assert!(anchors[1].contains("<xdr:col>2</xdr:col>"), "{}", anchors[1]);
    assert!(anchors[1].contains("<xdr:row>2</xdr:row>"), "{}", anchors[1]);

    // The target column is widened and the image rows heightened; the
    // header row keeps its default height.
    let sheet = xlsx_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(opening_tag(&sheet, "<col min=\"3\" max=\"3\"").contains("customWidth=\"1\""));
    for row in ["<row r=\"2\"", "<row r=\"3\""] {
        let tag = opening_tag(&sheet, row);
        assert!(tag.contains("customHeight=\"1\""), "{tag}");
    }
    assert!(!opening_tag(&sheet, "<row r=\"1\"").contains("customHeight"));
}

#[test]
fn test_round_trip_missing_sheet() {
    let config = url_config().round_trip("Orders", "C").build().unwrap();
    let err = convert_from_bytes(&items_workbook(), "items.xlsx", &config).unwrap_err();
    match err {
        QrSheetError::SheetNotFound { sheet, available } => {
            assert_eq!(sheet, "Orders");
            assert_eq!(available, vec!["Items", "Notes"]);
        }
        other => panic!("expected SheetNotFound, got {other:?}"),
    }
}

#[test]
fn test_round_trip_rejects_bad_column_letter() {
    let err = url_config().round_trip("Items", "C3").build().unwrap_err();
    assert!(matches!(err, QrSheetError::InvalidConfig(_)));
}

#[test]
fn test_convert_to_file_writes_both_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "items.xlsx", &items_workbook());
    let output = dir.path().join("out").join("labels.pdf");

    let config = url_config().round_trip("Items", "D").build().unwrap();
    let stats = convert_to_file(&input, &output, &config).unwrap();

    assert_eq!(stats.pages, 1);
    let pdf = std::fs::read(&output).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    let xlsx = std::fs::read(dir.path().join("out").join("labels.xlsx")).unwrap();
    assert!(xlsx.starts_with(b"PK"));
}

// ── Delimited text ───────────────────────────────────────────────────────────

#[test]
fn test_csv_in_unsupported_encoding_fails() {
    let config = ConversionConfig::builder().encode_column("url").build().unwrap();
    let err = convert_from_bytes(b"id,url\n1,caf\xff\n", "items.csv", &config).unwrap_err();
    assert!(matches!(err, QrSheetError::Decode { .. }), "got {err:?}");
}

#[test]
fn test_shift_jis_csv_converts() {
    // "品名,url" / "テスト,http://a" in Shift_JIS.
    let bytes = b"\x95\x69\x96\xbc,url\n\x83\x65\x83\x58\x83\x67,http://a\n";
    let config = ConversionConfig::builder()
        .encode_column("url")
        .include(IncludeColumns::All)
        .build()
        .unwrap();
    let out = convert_from_bytes(bytes, "items.csv", &config).unwrap();
    assert_eq!(out.stats.total_rows, 1);
}

#[test]
fn test_long_numeric_field_is_encoded_verbatim() {
    let csv = b"iccid,url\n89445001021983048260,http://a\n+5,http://b\n";
    let loaded = qrsheet::pipeline::input::load_table(csv, "sims.csv", None).unwrap();
    let table = &loaded.table;
    assert_eq!(table.cell(0, 0).unwrap().to_string(), "89445001021983048260");
    assert_eq!(table.cell(1, 0).unwrap().to_string(), "+5");

    let encoded = vec!["iccid".to_string()];
    let opts = Default::default();
    let images = encode::encode_columns(table, &encoded, &opts, None).unwrap();
    let (expected, _) = encode::encode_payload("89445001021983048260", &opts).unwrap();
    assert_eq!(images.column(0).next().unwrap().png, expected);

    let grid = layout::compose(table, &encoded, &IncludeColumns::Encoded, LayoutMode::Paired)
        .unwrap();
    assert_eq!(grid.records[0].cells[0].text().as_deref(), Some("89445001021983048260"));
}

#[test]
fn test_pdf_output_is_deterministic() {
    let csv = b"id,url\n1,http://a\n2,http://b\n3,http://c\n";
    for mode in LayoutMode::ALL {
        let config = url_config().layout(mode).build().unwrap();
        let a = convert_from_bytes(csv, "items.csv", &config).unwrap();
        let b = convert_from_bytes(csv, "items.csv", &config).unwrap();
        assert_eq!(a.document.bytes, b.document.bytes, "layout {mode}");
    }
}

#[test]
fn test_oversized_value_aborts_run() {
    let csv = format!("id,url\n1,http://a\n2,{}\n", "x".repeat(5000));
    let config = ConversionConfig::builder().encode_column("url").build().unwrap();
    let err = convert_from_bytes(csv.as_bytes(), "items.csv", &config).unwrap_err();
    match err {
        QrSheetError::EncodingCapacity { column, row, .. } => {
            assert_eq!(column, "url");
            assert_eq!(row, 1);
        }
        other => panic!("expected EncodingCapacity, got {other:?}"),
    }
}

#[test]
fn test_unknown_column_is_reported() {
    let config = ConversionConfig::builder().encode_column("sku").build().unwrap();
    let err =
        convert_from_bytes(b"id,url\n1,http://a\n", "items.csv", &config).unwrap_err();
    match err {
        QrSheetError::ColumnNotFound { column, available } => {
            assert_eq!(column, "sku");
            assert_eq!(available, vec!["id", "url"]);
        }
        other => panic!("expected ColumnNotFound, got {other:?}"),
    }
}

// ── Inspect ──────────────────────────────────────────────────────────────────

#[test]
fn test_inspect_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "items.xlsx", &items_workbook());
    let summary = inspect(&input, None).unwrap();
    assert_eq!(summary.columns, vec!["id", "url"]);
    assert_eq!(summary.row_count, 2);
    assert_eq!(summary.sheets, vec!["Items", "Notes"]);
    assert_eq!(summary.sheet.as_deref(), Some("Items"));
    assert!(summary.encoding.is_none());
}

#[test]
fn test_inspect_nonexistent() {
    let err = inspect("/definitely/not/here.csv", None).unwrap_err();
    assert!(matches!(err, QrSheetError::FileNotFound { .. }));
}

// ── API surface ──────────────────────────────────────────────────────────────

#[test]
fn test_stats_json_serialisable() {
    let config = ConversionConfig::builder().encode_column("url").build().unwrap();
    let out = convert_from_bytes(b"id,url\n1,http://a\n", "items.csv", &config).unwrap();
    let json = serde_json::to_value(&out.stats).unwrap();
    assert_eq!(json["images_generated"], 1);
    assert_eq!(json["pages"], 1);
    assert!(json["workbook_bytes"].is_null());
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<ConversionConfig>();
}
