//! CLI binary for qrsheet.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, writes the outputs and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use qrsheet::convert::workbook_path_for;
use qrsheet::{
    convert, inspect, write_artifact, ConversionConfig, ConversionProgressCallback,
    ErrorCorrection, IncludeColumns, LayoutMode, PageSize, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn human_bytes(n: usize) -> String {
    if n >= 1024 * 1024 {
        format!("{:.1} MB", n as f64 / (1024.0 * 1024.0))
    } else if n >= 1024 {
        format!("{:.1} KB", n as f64 / 1024.0)
    } else {
        format!("{n} B")
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the table loads, then a bar
/// over the data rows while QR codes are generated.
struct CliProgressCallback {
    bar: ProgressBar,
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Loading");
        bar.set_message("Reading table…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} rows  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Generating QR codes");
        self.bar.reset_eta();
    }

    /// Remove the spinner or bar so a following error prints on a clean line.
    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_rows: usize, encoded_columns: usize) {
        self.activate_bar(total_rows);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Generating QR codes for {total_rows} rows × {encoded_columns} column(s)…"
            ))
        ));
    }

    fn on_row_encoded(&self, _row: usize, _total_rows: usize) {
        self.bar.inc(1);
    }

    fn on_document_rendered(&self, pages: usize, bytes: usize) {
        self.bar.println(format!(
            "  {} Document   {:>3} page(s)  {}",
            green("✓"),
            pages,
            dim(&human_bytes(bytes)),
        ));
    }

    fn on_workbook_embedded(&self, images: usize, bytes: usize) {
        self.bar.println(format!(
            "  {} Workbook   {:>3} image(s)  {}",
            green("✓"),
            images,
            dim(&human_bytes(bytes)),
        ));
    }

    fn on_conversion_complete(&self, total_rows: usize, images: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} QR codes generated from {} rows",
            green("✔"),
            bold(&images.to_string()),
            total_rows
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One QR code per URL, paired with its value
  qrsheet items.xlsx -c url

  # Keep every column, codes at the end of each row
  qrsheet items.csv -c url --include all --layout values-then-images -o items.pdf

  # Two encoded columns, value and code in one cell, A4 paper
  qrsheet items.xlsx -c url,sku --layout combined --page-size a4

  # Read a named sheet and write the codes back into column D of it
  qrsheet items.xlsx -c url --sheet Items --embed-sheet Items --embed-column D

  # List columns and sheets before choosing
  qrsheet --inspect-only items.xlsx

  # Machine-readable run statistics
  qrsheet items.csv -c url --json > stats.json

LAYOUTS:
  paired               value, code, value, code …   (default)
  values-then-images   all values, then all codes
  combined             value stacked over its code in one cell

INPUT FORMATS:
  .xlsx .xlsm .xlsb .xls .ods     first sheet, or --sheet NAME
  .csv .txt                       comma-separated
  .tsv .tab                       tab-separated
  Delimited text is decoded as UTF-8, then Shift_JIS, EUC-KR and GBK.
  A byte-order mark takes precedence.

ENVIRONMENT VARIABLES:
  RUST_LOG            Override log filtering (e.g. qrsheet=debug)
  QRSHEET_OUTPUT      Default document path
  QRSHEET_PAGE_SIZE   Default page size
"#;

/// Generate QR codes from spreadsheet or CSV columns and lay them out in a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "qrsheet",
    version,
    about = "Generate QR codes from spreadsheet or CSV columns and lay them out in a PDF",
    long_about = "Read a spreadsheet (.xlsx, .xls, .ods) or delimited text file, turn every value \
of the selected column(s) into a QR code, and compose the original data alongside the codes into \
a paginated PDF. Optionally write the codes back into a copy of the workbook.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Spreadsheet or delimited text file.
    input: PathBuf,

    /// Column(s) to encode as QR codes. Repeat or separate with commas.
    #[arg(
        short = 'c',
        long = "column",
        value_delimiter = ',',
        required_unless_present = "inspect_only"
    )]
    columns: Vec<String>,

    /// Columns shown as values: encoded, all, or a comma-separated list.
    /// Prefix the list with `list:` to select columns named `all` or `encoded`.
    #[arg(long, default_value = "encoded")]
    include: String,

    /// Layout: paired, values-then-images, combined.
    #[arg(long, default_value = "paired")]
    layout: String,

    /// Sheet to read from a spreadsheet input (default: first sheet).
    #[arg(long)]
    sheet: Option<String>,

    /// Write the PDF to this file.
    #[arg(short, long, env = "QRSHEET_OUTPUT", default_value = qrsheet::output::DEFAULT_DOCUMENT_FILENAME)]
    output: PathBuf,

    /// Sheet of the workbook copy that receives the codes.
    #[arg(long, requires = "embed_column")]
    embed_sheet: Option<String>,

    /// Column letter the codes are anchored in (e.g. D).
    #[arg(long, requires = "embed_sheet")]
    embed_column: Option<String>,

    /// Encoded column whose codes are written back (default: the first).
    #[arg(long, requires = "embed_sheet")]
    embed_source: Option<String>,

    /// Write the workbook copy here (default: beside the PDF, .xlsx).
    #[arg(long, requires = "embed_sheet")]
    workbook_output: Option<PathBuf>,

    /// QR error-correction level.
    #[arg(long, value_enum, default_value = "l")]
    ec_level: EcLevelArg,

    /// Pixels per QR module (1–100).
    #[arg(long, default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..=100))]
    module_size: u32,

    /// Quiet-zone width in modules.
    #[arg(long, default_value_t = 4,
          value_parser = clap::value_parser!(u32).range(0..=40))]
    border: u32,

    /// Edge length of each code in the PDF, in points.
    #[arg(long, default_value_t = 50.0)]
    image_size: f32,

    /// Paper size.
    #[arg(long, env = "QRSHEET_PAGE_SIZE", value_enum, default_value = "letter")]
    page_size: PageSizeArg,

    /// Print columns, row count and sheets only, no generation.
    #[arg(long)]
    inspect_only: bool,

    /// Print run statistics (or the inspect summary) as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "QRSHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EcLevelArg {
    L,
    M,
    Q,
    H,
}

impl From<EcLevelArg> for ErrorCorrection {
    fn from(v: EcLevelArg) -> Self {
        match v {
            EcLevelArg::L => ErrorCorrection::Low,
            EcLevelArg::M => ErrorCorrection::Medium,
            EcLevelArg::Q => ErrorCorrection::Quartile,
            EcLevelArg::H => ErrorCorrection::High,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    Letter,
    A4,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::A4 => PageSize::A4,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let summary = inspect(&cli.input, cli.sheet.as_deref())
            .with_context(|| format!("Failed to inspect {}", cli.input.display()))?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        } else {
            println!("File:      {}", summary.name);
            if !summary.sheets.is_empty() {
                println!("Sheets:    {}", summary.sheets.join(", "));
            }
            if let Some(ref s) = summary.sheet {
                println!("Sheet:     {}", s);
            }
            if let Some(ref e) = summary.encoding {
                println!("Encoding:  {}", e);
            }
            println!("Rows:      {}", summary.row_count);
            println!("Columns:   {}", summary.columns.join(", "));
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let cli_progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);

    // ── Run conversion ───────────────────────────────────────────────────
    let result = build_config(&cli, progress_cb)
        .and_then(|config| convert(&cli.input, &config).context("Conversion failed"));
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            if let Some(ref cb) = cli_progress {
                cb.clear();
            }
            return Err(e);
        }
    };

    write_artifact(&cli.output, &output.document)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    let workbook_path = match output.workbook {
        Some(ref workbook) => {
            let path = cli
                .workbook_output
                .clone()
                .unwrap_or_else(|| workbook_path_for(&cli.output));
            write_artifact(&path, workbook)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Some(path)
        }
        None => None,
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output.stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        let stats = &output.stats;
        if !show_progress {
            eprintln!(
                "Generated {} QR codes from {} rows in {}ms",
                stats.images_generated, stats.total_rows, stats.total_duration_ms
            );
        }
        eprintln!(
            "{}  {} page(s)  {}ms  →  {}",
            green("✔"),
            stats.pages,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        if let Some(path) = workbook_path {
            eprintln!("   workbook  →  {}", bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let layout: LayoutMode = cli.layout.parse().context("Invalid --layout")?;

    let mut builder = ConversionConfig::builder()
        .encode_columns(cli.columns.iter().map(|c| c.trim()).filter(|c| !c.is_empty()))
        .include(parse_include(&cli.include))
        .layout(layout)
        .error_correction(cli.ec_level.into())
        .module_size(cli.module_size)
        .border(cli.border)
        .image_size_pt(cli.image_size)
        .page_size(cli.page_size.into());

    if let Some(ref sheet) = cli.sheet {
        builder = builder.sheet(sheet);
    }
    if let (Some(sheet), Some(column)) = (&cli.embed_sheet, &cli.embed_column) {
        builder = builder.round_trip(sheet, column);
        if let Some(ref source) = cli.embed_source {
            builder = builder.round_trip_source(source);
        }
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--include` into `IncludeColumns`.
///
/// `encoded` and `all` are keywords; anything else is a comma-separated
/// column list. A `list:` prefix forces the list reading.
fn parse_include(s: &str) -> IncludeColumns {
    let s = s.trim();
    let list = match s.strip_prefix("list:") {
        Some(rest) => rest,
        None => match s.to_lowercase().as_str() {
            "encoded" => return IncludeColumns::Encoded,
            "all" => return IncludeColumns::All,
            _ => s,
        },
    };
    IncludeColumns::Selected(
        list.split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_keywords() {
        assert_eq!(parse_include("encoded"), IncludeColumns::Encoded);
        assert_eq!(parse_include(" ALL "), IncludeColumns::All);
        assert_eq!(
            parse_include("id, url"),
            IncludeColumns::Selected(vec!["id".into(), "url".into()])
        );
    }

    #[test]
    fn include_list_prefix_selects_keyword_columns() {
        assert_eq!(
            parse_include("list:all"),
            IncludeColumns::Selected(vec!["all".into()])
        );
        assert_eq!(
            parse_include("list:encoded,id"),
            IncludeColumns::Selected(vec!["encoded".into(), "id".into()])
        );
    }

    #[test]
    fn failed_run_clears_progress() {
        let cb = CliProgressCallback::new_dynamic();
        cb.on_conversion_start(3, 1);
        cb.on_row_encoded(0, 3);
        cb.clear();
        assert!(cb.bar.is_finished());
    }
}
