//! Configuration types for a table-to-QR-document run.
//!
//! All run behaviour is controlled through [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. The selections an operator makes (which
//! columns to encode, which to show, how to lay them out, whether to write
//! the codes back into the workbook) all live in this one struct.

use crate::error::QrSheetError;
use crate::pipeline::embed::parse_column_letter;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration for a run.
///
/// Built via [`ConversionConfig::builder()`].
///
/// # Example
/// ```rust
/// use qrsheet::{ConversionConfig, IncludeColumns, LayoutMode};
///
/// let config = ConversionConfig::builder()
///     .encode_column("url")
///     .include(IncludeColumns::All)
///     .layout(LayoutMode::ValuesThenImages)
///     .build()
///     .unwrap();
/// assert_eq!(config.encode_columns, vec!["url".to_string()]);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Columns whose values are turned into QR codes, in output order.
    pub encode_columns: Vec<String>,

    /// Which columns appear as values in the document. Default: [`IncludeColumns::Encoded`].
    pub include: IncludeColumns,

    /// How values and codes are interleaved. Default: [`LayoutMode::Paired`].
    pub layout: LayoutMode,

    /// Sheet to read from a spreadsheet input. `None` reads the first sheet.
    pub sheet: Option<String>,

    /// QR raster parameters.
    pub qr: QrOptions,

    /// Edge length of each QR image in the PDF, in points. Default: 50.
    pub image_size_pt: f32,

    /// Page size of the PDF. Default: [`PageSize::Letter`].
    pub page_size: PageSize,

    /// Write the codes back into a copy of the input workbook.
    pub round_trip: Option<RoundTripConfig>,

    /// Receives stage and per-row events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            encode_columns: Vec::new(),
            include: IncludeColumns::default(),
            layout: LayoutMode::default(),
            sheet: None,
            qr: QrOptions::default(),
            image_size_pt: 50.0,
            page_size: PageSize::default(),
            round_trip: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("encode_columns", &self.encode_columns)
            .field("include", &self.include)
            .field("layout", &self.layout)
            .field("sheet", &self.sheet)
            .field("qr", &self.qr)
            .field("image_size_pt", &self.image_size_pt)
            .field("page_size", &self.page_size)
            .field("round_trip", &self.round_trip)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    /// Add one column to encode. Repeats are ignored.
    pub fn encode_column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.config.encode_columns.contains(&name) {
            self.config.encode_columns.push(name);
        }
        self
    }

    pub fn encode_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self = self.encode_column(name);
        }
        self
    }

    pub fn include(mut self, include: IncludeColumns) -> Self {
        self.config.include = include;
        self
    }

    pub fn layout(mut self, layout: LayoutMode) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn sheet(mut self, sheet: impl Into<String>) -> Self {
        self.config.sheet = Some(sheet.into());
        self
    }

    pub fn error_correction(mut self, level: ErrorCorrection) -> Self {
        self.config.qr.error_correction = level;
        self
    }

    pub fn module_size(mut self, px: u32) -> Self {
        self.config.qr.module_px = px.clamp(1, 100);
        self
    }

    pub fn border(mut self, modules: u32) -> Self {
        self.config.qr.border_modules = modules.min(40);
        self
    }

    pub fn image_size_pt(mut self, pt: f32) -> Self {
        self.config.image_size_pt = pt.clamp(8.0, 500.0);
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Request the workbook round trip into `sheet`, anchoring codes in `column`.
    pub fn round_trip(mut self, sheet: impl Into<String>, column: impl Into<String>) -> Self {
        self.config.round_trip = Some(RoundTripConfig {
            sheet: sheet.into(),
            column: column.into(),
            source_column: None,
        });
        self
    }

    /// Which encoded column's codes are written back. Defaults to the first.
    pub fn round_trip_source(mut self, column: impl Into<String>) -> Self {
        if let Some(ref mut rt) = self.config.round_trip {
            rt.source_column = Some(column.into());
        }
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, QrSheetError> {
        let c = &self.config;
        if c.encode_columns.is_empty() {
            return Err(QrSheetError::InvalidConfig(
                "At least one column to encode is required".into(),
            ));
        }
        if let IncludeColumns::Selected(ref names) = c.include {
            if names.is_empty() {
                return Err(QrSheetError::InvalidConfig(
                    "Included column list is empty".into(),
                ));
            }
        }
        if let Some(ref rt) = c.round_trip {
            if rt.sheet.trim().is_empty() {
                return Err(QrSheetError::InvalidConfig(
                    "Round-trip sheet name is empty".into(),
                ));
            }
            if parse_column_letter(&rt.column).is_none() {
                return Err(QrSheetError::InvalidConfig(format!(
                    "'{}' is not a column letter (A–XFD)",
                    rt.column
                )));
            }
            if let Some(ref src) = rt.source_column {
                if !c.encode_columns.contains(src) {
                    return Err(QrSheetError::InvalidConfig(format!(
                        "Round-trip source column '{src}' is not an encoded column"
                    )));
                }
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How original values and QR images are arranged in each output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Each encoded column's value is followed directly by its image. (default)
    #[default]
    Paired,
    /// All included values first, then one image per encoded column.
    ValuesThenImages,
    /// One cell per encoded column holding the value stacked above its image.
    Combined,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 3] = [
        LayoutMode::Paired,
        LayoutMode::ValuesThenImages,
        LayoutMode::Combined,
    ];

    /// Short identifier used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Paired => "paired",
            LayoutMode::ValuesThenImages => "values-then-images",
            LayoutMode::Combined => "combined",
        }
    }

    /// Human-readable label shown to operators.
    pub fn label(&self) -> &'static str {
        match self {
            LayoutMode::Paired => "paired columns",
            LayoutMode::ValuesThenImages => "all values then all images",
            LayoutMode::Combined => "value+image combined per cell",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = QrSheetError;

    /// Accepts the short identifier or the operator label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        LayoutMode::ALL
            .into_iter()
            .find(|m| m.as_str() == needle || m.label() == needle)
            .ok_or_else(|| {
                QrSheetError::InvalidConfig(format!(
                    "Unknown layout mode '{s}' (expected one of: paired, values-then-images, combined)"
                ))
            })
    }
}

/// Which table columns appear as values in the document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IncludeColumns {
    /// Only the encoded columns. (default)
    #[default]
    Encoded,
    /// Every column of the table, in table order.
    All,
    /// The named columns in the given order. Encoded columns missing from the
    /// list are appended after it.
    Selected(Vec<String>),
}

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// ~7 % recovery, highest capacity. (default)
    #[default]
    Low,
    /// ~15 % recovery.
    Medium,
    /// ~25 % recovery.
    Quartile,
    /// ~30 % recovery, lowest capacity.
    High,
}

/// Fixed raster parameters for every QR image in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrOptions {
    pub error_correction: ErrorCorrection,
    /// Pixels per QR module. Default: 10.
    pub module_px: u32,
    /// Quiet-zone width in modules. Default: 4.
    pub border_modules: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrection::Low,
            module_px: 10,
            border_modules: 4,
        }
    }
}

/// PDF page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// 8.5 × 11 in. (default)
    #[default]
    Letter,
    /// 210 × 297 mm.
    A4,
}

impl PageSize {
    /// Width and height in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.28, 841.89),
        }
    }
}

/// Where the round trip writes codes back into the workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTripConfig {
    /// Sheet that receives the images.
    pub sheet: String,
    /// Column letter the images are anchored in, e.g. `"D"`.
    pub column: String,
    /// Encoded column whose codes are written. `None` uses the first.
    pub source_column: Option<String>,
}
