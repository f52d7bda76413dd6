//! PDF rendering: composed layout + QR images → paginated document bytes.
//!
//! ## Table style
//!
//! One table, one style. The header band is grey with whitesmoke
//! Helvetica-Bold text; body rows are beige with Helvetica text; every cell
//! is outlined by a 1 pt black grid and its content is centred. QR images
//! are drawn at a fixed square size regardless of their pixel dimensions.
//!
//! ## Pagination
//!
//! Rows flow top to bottom between the margins. When the next row does not
//! fit above the bottom margin it starts a new page. The header is drawn
//! once, on the first page. Tables wider than the printable width and single
//! rows taller than a page are not split; they overflow the page edge.
//!
//! ## Fonts
//!
//! Only the standard Type1 Helvetica faces are used, so nothing is embedded.
//! Text is written in WinAnsi encoding; characters it cannot represent are
//! drawn as `?`. Widths come from the Adobe font metrics for the printable
//! ASCII range.
//!
//! The output is a pure function of the layout, images and options: there
//! are no timestamps or random identifiers in the file.

use crate::config::{ConversionConfig, PageSize};
use crate::error::QrSheetError;
use crate::model::{EncodedImages, ImageRef, Layout, LayoutCell};
use encoding_rs::WINDOWS_1252;
use image::ImageFormat;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Page margin on every side, in points.
pub const MARGIN_PT: f32 = 72.0;
const PAD_X: f32 = 6.0;
const PAD_TOP: f32 = 3.0;
const PAD_BOTTOM: f32 = 3.0;
const HEADER_PAD_BOTTOM: f32 = 12.0;
const HEADER_FONT_SIZE: f32 = 12.0;
const BODY_FONT_SIZE: f32 = 10.0;
const LEADING: f32 = 1.2;
/// Gap between the text and the image of a stacked cell.
const STACK_GAP: f32 = 2.0;
const GRID_WIDTH: f32 = 1.0;

const HEADER_FILL: (f32, f32, f32) = (0.5, 0.5, 0.5);
const HEADER_TEXT: (f32, f32, f32) = (0.96, 0.96, 0.96);
const BODY_FILL: (f32, f32, f32) = (0.96, 0.96, 0.86);

const PRODUCER: &str = concat!("qrsheet ", env!("CARGO_PKG_VERSION"));

/// Parameters the renderer takes from the run configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub page_size: PageSize,
    /// Edge length of each QR image, in points.
    pub image_size_pt: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::Letter,
            image_size_pt: 50.0,
        }
    }
}

impl From<&ConversionConfig> for RenderOptions {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            page_size: config.page_size,
            image_size_pt: config.image_size_pt,
        }
    }
}

/// A finished PDF and its page count.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

// ── Font metrics ─────────────────────────────────────────────────────────

/// Helvetica advance widths for bytes 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Helvetica-Bold advance widths for bytes 0x20..=0x7E, in 1/1000 em.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0..?
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // P.._
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // `..o
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // p..~
];

/// Width used for WinAnsi bytes outside the ASCII table.
const FALLBACK_WIDTH: u16 = 556;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource(self) -> Name<'static> {
        match self {
            Face::Regular => Name(b"F1"),
            Face::Bold => Name(b"F2"),
        }
    }

    fn width(self, byte: u8) -> u16 {
        let table = match self {
            Face::Regular => &HELVETICA_WIDTHS,
            Face::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match byte {
            0x20..=0x7E => table[(byte - 0x20) as usize],
            _ => FALLBACK_WIDTH,
        }
    }
}

/// Convert text to WinAnsi bytes. Unrepresentable characters become `?`,
/// control characters a space.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c.is_control() {
            out.push(b' ');
            continue;
        }
        if c.is_ascii() {
            out.push(c as u8);
            continue;
        }
        let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if unmappable || bytes.len() != 1 {
            out.push(b'?');
        } else {
            out.push(bytes[0]);
        }
    }
    out
}

fn text_width(encoded: &[u8], face: Face, size: f32) -> f32 {
    let units: u32 = encoded.iter().map(|&b| u32::from(face.width(b))).sum();
    units as f32 * size / 1000.0
}

// ── Measurement ──────────────────────────────────────────────────────────

/// Text of one cell, split into WinAnsi-encoded lines.
fn text_lines(text: &str) -> Vec<Vec<u8>> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| to_win_ansi(line.trim_end_matches('\r')))
        .collect()
}

/// A cell after measurement.
struct Block {
    lines: Vec<Vec<u8>>,
    image: Option<ImageRef>,
}

impl Block {
    fn from_cell(cell: &LayoutCell) -> Self {
        Self {
            lines: cell.text().map(|t| text_lines(&t)).unwrap_or_default(),
            image: cell.image(),
        }
    }

    fn from_label(label: &str) -> Self {
        Self {
            lines: text_lines(label),
            image: None,
        }
    }

    fn text_height(&self, size: f32) -> f32 {
        self.lines.len() as f32 * size * LEADING
    }

    fn width(&self, face: Face, size: f32, image_pt: f32) -> f32 {
        let text = self
            .lines
            .iter()
            .map(|l| text_width(l, face, size))
            .fold(0.0, f32::max);
        if self.image.is_some() {
            text.max(image_pt)
        } else {
            text
        }
    }

    fn height(&self, size: f32, image_pt: f32) -> f32 {
        let text = self.text_height(size);
        match (self.lines.is_empty(), self.image.is_some()) {
            (_, false) => text,
            (true, true) => image_pt,
            (false, true) => text + STACK_GAP + image_pt,
        }
    }
}

struct Row {
    blocks: Vec<Block>,
    height: f32,
    header: bool,
}

impl Row {
    fn face(&self) -> Face {
        if self.header {
            Face::Bold
        } else {
            Face::Regular
        }
    }

    fn font_size(&self) -> f32 {
        if self.header {
            HEADER_FONT_SIZE
        } else {
            BODY_FONT_SIZE
        }
    }

    fn pad_bottom(&self) -> f32 {
        if self.header {
            HEADER_PAD_BOTTOM
        } else {
            PAD_BOTTOM
        }
    }
}

fn measure(layout: &Layout, image_pt: f32) -> (Vec<Row>, Vec<f32>) {
    let columns = layout
        .records
        .iter()
        .map(|r| r.len())
        .chain(std::iter::once(layout.header.len()))
        .max()
        .unwrap_or(0);

    let mut rows = Vec::with_capacity(layout.records.len() + 1);
    rows.push(Row {
        blocks: layout.header.iter().map(|h| Block::from_label(h)).collect(),
        height: 0.0,
        header: true,
    });
    for record in &layout.records {
        rows.push(Row {
            blocks: record.cells.iter().map(Block::from_cell).collect(),
            height: 0.0,
            header: false,
        });
    }

    let mut widths = vec![0.0f32; columns];
    for row in &mut rows {
        let (face, size) = (row.face(), row.font_size());
        let content = row
            .blocks
            .iter()
            .map(|b| b.height(size, image_pt))
            .fold(size * LEADING, f32::max);
        row.height = PAD_TOP + content + row.pad_bottom();
        for (i, block) in row.blocks.iter().enumerate() {
            widths[i] = widths[i].max(block.width(face, size, image_pt));
        }
    }
    for w in &mut widths {
        *w += 2.0 * PAD_X;
    }
    (rows, widths)
}

// ── Pagination ───────────────────────────────────────────────────────────

/// Split rows into pages. Returns the row indices of each page.
fn paginate(rows: &[Row], page_height: f32) -> Vec<Vec<usize>> {
    let available = page_height - 2.0 * MARGIN_PT;
    let mut pages: Vec<Vec<usize>> = vec![Vec::new()];
    let mut used = 0.0f32;
    for (i, row) in rows.iter().enumerate() {
        let current_has_rows = pages.last().is_some_and(|p| !p.is_empty());
        if current_has_rows && used + row.height > available {
            pages.push(Vec::new());
            used = 0.0;
        }
        if let Some(page) = pages.last_mut() {
            page.push(i);
        }
        used += row.height;
    }
    pages
}

// ── Drawing ──────────────────────────────────────────────────────────────

struct Geometry {
    page_width: f32,
    page_height: f32,
    table_x: f32,
    widths: Vec<f32>,
    image_pt: f32,
}

impl Geometry {
    fn column_x(&self, col: usize) -> f32 {
        self.table_x + self.widths[..col].iter().sum::<f32>()
    }

    fn table_width(&self) -> f32 {
        self.widths.iter().sum()
    }
}

fn draw_text_line(content: &mut Content, line: &[u8], face: Face, size: f32, center_x: f32, baseline: f32) {
    let x = center_x - text_width(line, face, size) / 2.0;
    content.begin_text();
    content.set_font(face.resource(), size);
    content.next_line(x, baseline);
    content.show(Str(line));
    content.end_text();
}

fn draw_page(
    content: &mut Content,
    rows: &[Row],
    indices: &[usize],
    geo: &Geometry,
    image_names: &BTreeMap<ImageRef, String>,
) {
    let table_w = geo.table_width();
    let top = geo.page_height - MARGIN_PT;
    let mut y = top;
    let mut boundaries = vec![top];

    for &i in indices {
        let row = &rows[i];
        let bottom = y - row.height;

        let fill = if row.header { HEADER_FILL } else { BODY_FILL };
        content.set_fill_rgb(fill.0, fill.1, fill.2);
        content.rect(geo.table_x, bottom, table_w, row.height);
        content.fill_nonzero();

        let (face, size) = (row.face(), row.font_size());
        let text = if row.header { HEADER_TEXT } else { (0.0, 0.0, 0.0) };
        let inner_top = y - PAD_TOP;
        let inner_bottom = bottom + row.pad_bottom();
        let mid_y = (inner_top + inner_bottom) / 2.0;

        for (col, block) in row.blocks.iter().enumerate() {
            let center_x = geo.column_x(col) + geo.widths[col] / 2.0;
            let block_top = mid_y + block.height(size, geo.image_pt) / 2.0;

            content.set_fill_rgb(text.0, text.1, text.2);
            let line_h = size * LEADING;
            for (n, line) in block.lines.iter().enumerate() {
                let baseline = block_top - line_h * n as f32 - size;
                draw_text_line(content, line, face, size, center_x, baseline);
            }

            if let Some(name) = block.image.and_then(|r| image_names.get(&r)) {
                let offset = if block.lines.is_empty() {
                    0.0
                } else {
                    block.text_height(size) + STACK_GAP
                };
                let img_top = block_top - offset;
                let s = geo.image_pt;
                content.save_state();
                content.transform([s, 0.0, 0.0, s, center_x - s / 2.0, img_top - s]);
                content.x_object(Name(name.as_bytes()));
                content.restore_state();
            }
        }

        y = bottom;
        boundaries.push(y);
    }

    // Grid
    content.set_stroke_rgb(0.0, 0.0, 0.0);
    content.set_line_width(GRID_WIDTH);
    let left = geo.table_x;
    let right = geo.table_x + table_w;
    for &by in &boundaries {
        content.move_to(left, by);
        content.line_to(right, by);
    }
    for col in 0..=geo.widths.len() {
        let x = geo.column_x(col);
        content.move_to(x, top);
        content.line_to(x, y);
    }
    content.stroke();
}

/// Render the composed layout into a PDF.
///
/// Every [`ImageRef`] in the layout must be present in `images`; a missing
/// one is a [`QrSheetError::RenderFailed`].
pub fn render_document(
    layout: &Layout,
    images: &EncodedImages,
    options: &RenderOptions,
) -> Result<RenderedDocument, QrSheetError> {
    let (page_width, page_height) = options.page_size.dimensions();
    let (rows, widths) = measure(layout, options.image_size_pt);
    let table_w: f32 = widths.iter().sum();
    if table_w > page_width - 2.0 * MARGIN_PT {
        debug!(
            "Table is {:.0}pt wide, printable width is {:.0}pt; it will overflow",
            table_w,
            page_width - 2.0 * MARGIN_PT
        );
    }

    let geo = Geometry {
        page_width,
        page_height,
        table_x: (page_width - table_w) / 2.0,
        widths,
        image_pt: options.image_size_pt,
    };
    let pages = paginate(&rows, page_height);

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();
    let regular_id = alloc();
    let bold_id = alloc();

    pdf.type1_font(regular_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.type1_font(bold_id)
        .base_font(Name(b"Helvetica-Bold"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    // Images, in key order so object numbering is stable.
    let used: BTreeSet<ImageRef> = layout
        .records
        .iter()
        .flat_map(|r| r.cells.iter().filter_map(LayoutCell::image))
        .collect();
    let mut image_names: BTreeMap<ImageRef, String> = BTreeMap::new();
    let mut image_refs: BTreeMap<String, Ref> = BTreeMap::new();
    for key in &used {
        let encoded = images.get(*key).ok_or_else(|| {
            QrSheetError::RenderFailed(format!(
                "no image for encoded column {} row {}",
                key.column, key.row
            ))
        })?;
        let gray = image::load_from_memory_with_format(&encoded.png, ImageFormat::Png)
            .map_err(|e| QrSheetError::ImageEncodeFailed {
                column: encoded.column.clone(),
                row: encoded.row,
                detail: e.to_string(),
            })?
            .to_luma8();
        let (w, h) = gray.dimensions();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(gray.as_raw(), 6);

        let id = alloc();
        let mut xobj = pdf.image_xobject(id, &compressed);
        xobj.filter(Filter::FlateDecode);
        xobj.width(w as i32);
        xobj.height(h as i32);
        xobj.color_space().device_gray();
        xobj.bits_per_component(8);
        drop(xobj);

        let name = format!("Im{}", image_names.len() + 1);
        image_refs.insert(name.clone(), id);
        image_names.insert(*key, name);
    }

    let mut page_ids = Vec::with_capacity(pages.len());
    for indices in &pages {
        let page_id = alloc();
        let content_id = alloc();
        page_ids.push(page_id);

        let mut content = Content::new();
        draw_page(&mut content, &rows, indices, &geo, &image_names);
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);

        let page_images: BTreeSet<&String> = indices
            .iter()
            .flat_map(|&i| rows[i].blocks.iter().filter_map(|b| b.image))
            .filter_map(|r| image_names.get(&r))
            .collect();

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, geo.page_width, geo.page_height))
            .parent(pages_id)
            .contents(content_id);
        let mut resources = page.resources();
        {
            let mut fonts = resources.fonts();
            fonts.pair(Face::Regular.resource(), regular_id);
            fonts.pair(Face::Bold.resource(), bold_id);
        }
        if !page_images.is_empty() {
            let mut xobjects = resources.x_objects();
            for name in page_images {
                if let Some(&id) = image_refs.get(name) {
                    xobjects.pair(Name(name.as_bytes()), id);
                }
            }
        }
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);
    pdf.document_info(info_id).producer(TextStr(PRODUCER));

    let bytes = pdf.finish();
    info!(
        "Rendered {} rows into {} page(s), {} images, {} bytes",
        layout.records.len(),
        page_ids.len(),
        image_names.len(),
        bytes.len()
    );
    Ok(RenderedDocument {
        bytes,
        pages: page_ids.len(),
    })
}
