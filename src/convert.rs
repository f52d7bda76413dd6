//! Run entry points: table file in, PDF (and optional workbook) out.
//!
//! Every entry point runs the same synchronous pipeline and returns either
//! the complete output or the first fatal error. Nothing is written to disk
//! unless the caller asks for it through [`convert_to_file`] or
//! [`write_artifact`].

use crate::config::ConversionConfig;
use crate::error::QrSheetError;
use crate::output::{Artifact, ConversionOutput, ConversionStats, TableSummary};
use crate::pipeline::input::{self, InputKind, TableSource};
use crate::pipeline::render::RenderOptions;
use crate::pipeline::{embed, encode, layout, render};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Convert a spreadsheet or delimited text file into a QR code document.
///
/// This is the primary entry point for the library. The file type is taken
/// from the extension of `input`.
///
/// # Errors
/// Every failure is fatal: an unreadable or undecodable file, an unknown
/// column or sheet, a value too long for a QR code, or a failure assembling
/// either output.
///
/// # Example
/// ```rust,no_run
/// use qrsheet::{convert, ConversionConfig};
///
/// let config = ConversionConfig::builder().encode_column("url").build()?;
/// let output = convert("items.csv", &config)?;
/// std::fs::write(&output.document.filename, &output.document.bytes)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn convert(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, QrSheetError> {
    let path = input.as_ref();
    info!("Starting conversion: {}", path.display());
    let bytes = input::read_input(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    convert_from_bytes(&bytes, &name, config)
}

/// Convert file contents held in memory.
///
/// `filename` is the declared name of the upload; only its extension is
/// used, to pick the reader.
pub fn convert_from_bytes(
    bytes: &[u8],
    filename: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, QrSheetError> {
    let total_start = Instant::now();

    let kind = InputKind::from_name(filename)?;
    if config.round_trip.is_some() && kind != InputKind::Spreadsheet {
        return Err(QrSheetError::InvalidConfig(format!(
            "Writing codes back into a workbook needs a spreadsheet input, got '{filename}'"
        )));
    }

    // ── Step 1: Load table ───────────────────────────────────────────────
    let load_start = Instant::now();
    let loaded = input::load_table(bytes, filename, config.sheet.as_deref())?;
    let table = &loaded.table;
    let load_duration_ms = load_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(table.row_count(), config.encode_columns.len());
    }

    // ── Step 2: Encode selected columns ──────────────────────────────────
    let encode_start = Instant::now();
    let images = encode::encode_columns(
        table,
        &config.encode_columns,
        &config.qr,
        config.progress_callback.as_ref(),
    )?;
    let encode_duration_ms = encode_start.elapsed().as_millis() as u64;
    info!(
        "Encoded {} QR codes from {} column(s) in {}ms",
        images.len(),
        config.encode_columns.len(),
        encode_duration_ms
    );

    // ── Step 3: Compose layout ───────────────────────────────────────────
    let composed = layout::compose(table, &config.encode_columns, &config.include, config.layout)?;

    // ── Step 4: Render document ──────────────────────────────────────────
    let render_start = Instant::now();
    let rendered = render::render_document(&composed, &images, &RenderOptions::from(config))?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_rendered(rendered.pages, rendered.bytes.len());
    }

    // ── Step 5: Round trip ───────────────────────────────────────────────
    let workbook = match config.round_trip {
        Some(ref target) => {
            let source = target
                .source_column
                .as_deref()
                .or_else(|| config.encode_columns.first().map(String::as_str))
                .ok_or_else(|| QrSheetError::InvalidConfig("No encoded column".into()))?;
            let slot = images
                .columns()
                .iter()
                .position(|c| c == source)
                .ok_or_else(|| {
                    QrSheetError::InvalidConfig(format!(
                        "Round-trip source column '{source}' is not an encoded column"
                    ))
                })?;
            debug!("Writing codes of '{}' into sheet '{}'", source, target.sheet);

            let embedded = embed::embed_images(
                bytes,
                filename,
                target,
                images.column(slot),
                config.image_size_pt,
            )?;
            if let Some(ref cb) = config.progress_callback {
                cb.on_workbook_embedded(embedded.images, embedded.bytes.len());
            }
            Some(Artifact::workbook(embedded.bytes))
        }
        None => None,
    };

    let stats = ConversionStats {
        total_rows: table.row_count(),
        encoded_columns: config.encode_columns.len(),
        images_generated: images.len(),
        pages: rendered.pages,
        document_bytes: rendered.bytes.len(),
        workbook_bytes: workbook.as_ref().map(|w| w.bytes.len()),
        load_duration_ms,
        encode_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} rows, {} images, {} page(s), {}ms total",
        stats.total_rows, stats.images_generated, stats.pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(stats.total_rows, stats.images_generated);
    }

    Ok(ConversionOutput {
        document: Artifact::document(rendered.bytes),
        workbook,
        stats,
    })
}

/// Convert a file and write the outputs to disk.
///
/// The document goes to `output_path`. A round-trip workbook, when
/// configured, is written beside it with an `.xlsx` extension. Both writes
/// are atomic (temp file + rename), so a failed run never leaves a partial
/// file behind.
pub fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, QrSheetError> {
    let output = convert(input, config)?;
    let path = output_path.as_ref();

    write_artifact(path, &output.document)?;
    if let Some(ref workbook) = output.workbook {
        write_artifact(&workbook_path_for(path), workbook)?;
    }
    Ok(output.stats)
}

/// Where [`convert_to_file`] puts the workbook for a given document path.
pub fn workbook_path_for(document_path: &Path) -> PathBuf {
    document_path.with_extension("xlsx")
}

/// Atomically write one artifact to `path`, creating parent directories.
pub fn write_artifact(path: &Path, artifact: &Artifact) -> Result<(), QrSheetError> {
    let write_err = |e: std::io::Error| QrSheetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(&artifact.bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!(
        "Wrote {} ({} bytes) to {}",
        artifact.mime_type,
        artifact.bytes.len(),
        path.display()
    );
    Ok(())
}

/// Describe an input file without generating anything.
///
/// Reports the columns, row count and, for spreadsheets, the available
/// sheets. Useful for choosing columns before a run.
pub fn inspect(input: impl AsRef<Path>, sheet: Option<&str>) -> Result<TableSummary, QrSheetError> {
    let path = input.as_ref();
    let bytes = input::read_input(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let loaded = input::load_table(&bytes, &name, sheet)?;

    let (sheets, sheet, encoding) = match loaded.source {
        TableSource::Spreadsheet { sheet, sheets } => (sheets, Some(sheet), None),
        TableSource::Delimited { encoding } => (Vec::new(), None, Some(encoding.to_string())),
    };
    Ok(TableSummary {
        name,
        columns: loaded.table.columns().to_vec(),
        row_count: loaded.table.row_count(),
        sheets,
        sheet,
        encoding,
    })
}
