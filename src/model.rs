//! Intermediate values passed between pipeline stages.

use crate::table::CellValue;
use std::collections::BTreeMap;

/// One QR code rendered as a PNG, keyed by source column and row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Name of the column the value came from.
    pub column: String,
    /// 0-indexed data row.
    pub row: usize,
    /// Edge length of the square raster in pixels.
    pub size_px: u32,
    /// PNG bytes.
    pub png: Vec<u8>,
}

/// Key into [`EncodedImages`]: position of the column in the encoded list, and the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageRef {
    pub column: usize,
    pub row: usize,
}

/// Every image produced by the encoder stage for one run.
///
/// Holds exactly one image per (encoded column, row) pair once the encoder
/// stage returns.
#[derive(Debug, Clone, Default)]
pub struct EncodedImages {
    columns: Vec<String>,
    images: BTreeMap<ImageRef, EncodedImage>,
}

impl EncodedImages {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            images: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: ImageRef, image: EncodedImage) {
        self.images.insert(key, image);
    }

    pub fn get(&self, key: ImageRef) -> Option<&EncodedImage> {
        self.images.get(&key)
    }

    /// Names of the encoded columns, in encoding order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Images of one encoded column, ordered by row.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &EncodedImage> + '_ {
        self.images
            .range(ImageRef { column, row: 0 }..=ImageRef { column, row: usize::MAX })
            .map(|(_, img)| img)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// One cell of the composed grid.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutCell {
    /// A table value carried through untouched.
    Value(CellValue),
    /// Literal text (header labels, stringified values).
    Text(String),
    /// A QR image.
    Image(ImageRef),
    /// Text stacked above a QR image in one cell.
    Stacked { text: String, image: ImageRef },
}

impl LayoutCell {
    pub fn image(&self) -> Option<ImageRef> {
        match self {
            LayoutCell::Image(r) | LayoutCell::Stacked { image: r, .. } => Some(*r),
            _ => None,
        }
    }

    /// Text drawn in the cell, if any.
    pub fn text(&self) -> Option<String> {
        match self {
            LayoutCell::Value(v) => Some(v.to_string()),
            LayoutCell::Text(t) | LayoutCell::Stacked { text: t, .. } => Some(t.clone()),
            LayoutCell::Image(_) => None,
        }
    }
}

/// One output row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutRecord {
    pub cells: Vec<LayoutCell>,
}

impl LayoutRecord {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Header plus one record per source row, ready to render.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub header: Vec<String>,
    pub records: Vec<LayoutRecord>,
}
