//! Minimal paginated PDF 1.4 writer for the analysis report.
//!
//! Text uses the standard base-14 fonts with WinAnsi encoding, so no font
//! files are embedded. Chart images are decoded, flattened onto white and
//! stored as Flate-compressed RGB image XObjects.

use std::io::Write;
use std::path::Path;

use crate::error::{HotelError, Result};
use crate::report::{Block, TableBlock};
use chrono::NaiveDate;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::DynamicImage;
use log::warn;

/// Fonts every conforming PDF reader provides without embedding.
pub const BASE14_FONTS: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Symbol",
    "ZapfDingbats",
];

pub const POINTS_PER_INCH: f64 = 72.0;

const BRAND: Rgb = Rgb(0.122, 0.467, 0.706);
const GREY: Rgb = Rgb(0.5, 0.5, 0.5);
const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
const INSIGHT_FILL: Rgb = Rgb(0.941, 0.949, 0.965);
const TABLE_FILL: Rgb = Rgb(0.961, 0.961, 0.863);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb(f64, f64, f64);

impl Rgb {
    fn fill(&self) -> String {
        format!("{:.3} {:.3} {:.3} rg\n", self.0, self.1, self.2)
    }

    fn stroke(&self) -> String {
        format!("{:.3} {:.3} {:.3} RG\n", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    Letter,
    A4,
}

impl PageSize {
    /// Page dimensions in points (width, height).
    pub fn dimensions_pt(&self) -> (f64, f64) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.28, 841.89),
        }
    }
}

/// Page geometry and fonts. Every field must be usable before rendering
/// starts; see [`Layout::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub body_font: String,
    pub bold_font: String,
    pub body_size: f64,
}

impl Layout {
    pub fn new(size: PageSize) -> Self {
        let (width, height) = size.dimensions_pt();
        Self {
            width,
            height,
            margin_left: 72.0,
            margin_right: 72.0,
            margin_top: 72.0,
            margin_bottom: 18.0,
            body_font: String::from("Helvetica"),
            bold_font: String::from("Helvetica-Bold"),
            body_size: 11.0,
        }
    }

    pub fn content_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn validate(&self) -> Result<()> {
        let dims = [self.width, self.height, self.body_size];
        if dims.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(HotelError::Layout(format!(
                "page size {}x{} pt / font size {} must be positive",
                self.width, self.height, self.body_size
            )));
        }
        let margins = [
            self.margin_left,
            self.margin_right,
            self.margin_top,
            self.margin_bottom,
        ];
        if margins.iter().any(|m| !m.is_finite() || *m < 0.0)
            || self.content_width() <= 0.0
            || self.height - self.margin_top - self.margin_bottom <= 0.0
        {
            return Err(HotelError::Layout(
                "margins leave no printable area".to_string(),
            ));
        }
        for font in [&self.body_font, &self.bold_font] {
            if !BASE14_FONTS.contains(&font.as_str()) {
                return Err(HotelError::Layout(format!("font '{font}' is not available")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Decoded picture ready to be written as an image XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfImage {
    pub width: u32,
    pub height: u32,
    /// zlib-compressed 8-bit RGB samples, row-major.
    data: Vec<u8>,
}

impl PdfImage {
    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path)?;
        Self::from_image(&decoded)
    }

    /// Alpha is composited over a white page, since DeviceRGB has no transparency.
    pub fn from_image(decoded: &DynamicImage) -> Result<Self> {
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = u32::from(a);
            for c in [r, g, b] {
                let blended = (u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255;
                rgb.push(blended as u8);
            }
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&rgb)?;
        let data = encoder.finish()?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn compressed(&self) -> &[u8] {
        &self.data
    }

    fn object(&self) -> Vec<u8> {
        let mut body = format!(
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>\nstream\n",
            self.width,
            self.height,
            self.data.len()
        )
        .into_bytes();
        body.extend_from_slice(&self.data);
        body.extend_from_slice(b"\nendstream");
        body
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Body,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Body => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

/// Approximate advance width of Helvetica glyphs, as a fraction of the font size.
fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * 0.5
}

/// Escape special characters for PDF strings and fold text into WinAnsi.
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\u{2022}' | '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201c}' | '\u{201d}' => out.push('"'),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Word wrap text to fit within max characters per line.
fn word_wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.chars().count() + 1 + word.chars().count() <= max_chars {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
        }
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }
    lines
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut s: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    s.push_str("...");
    s
}

struct Composer<'a> {
    layout: &'a Layout,
    pages: Vec<String>,
    current: String,
    y: f64,
    images: Vec<PdfImage>,
}

impl<'a> Composer<'a> {
    fn new(layout: &'a Layout) -> Self {
        Self {
            layout,
            pages: Vec::new(),
            current: String::new(),
            y: layout.height - layout.margin_top,
            images: Vec::new(),
        }
    }

    fn top(&self) -> f64 {
        self.layout.height - self.layout.margin_top
    }

    fn page_is_blank(&self) -> bool {
        self.current.is_empty()
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = self.top();
    }

    /// Start a new page unless `height` still fits above the bottom margin.
    fn reserve(&mut self, height: f64) {
        if self.y - height < self.layout.margin_bottom && !self.page_is_blank() {
            self.break_page();
        }
    }

    fn text(&mut self, font: Font, size: f64, color: Rgb, align: Align, text: &str) {
        let leading = size * 1.25;
        self.reserve(leading);
        self.y -= size;
        let x = match align {
            Align::Left => self.layout.margin_left,
            Align::Center => {
                let mid = self.layout.margin_left + self.layout.content_width() / 2.0;
                (mid - text_width(text, size) / 2.0).max(self.layout.margin_left)
            }
        };
        self.put_text(font, size, color, x, self.y, text);
        self.y -= leading - size;
    }

    fn put_text(&mut self, font: Font, size: f64, color: Rgb, x: f64, y: f64, text: &str) {
        self.current.push_str(&color.fill());
        self.current.push_str(&format!(
            "BT\n/{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
            font.resource(),
            size,
            x,
            y,
            escape_pdf_string(text)
        ));
    }

    fn wrapped(&mut self, font: Font, size: f64, color: Rgb, align: Align, text: &str) {
        let max_chars = (self.layout.content_width() / (size * 0.5)) as usize;
        for line in word_wrap(text, max_chars.max(1)) {
            self.text(font, size, color, align, &line);
        }
    }

    fn space(&mut self, points: f64) {
        if self.y - points < self.layout.margin_bottom {
            if !self.page_is_blank() {
                self.break_page();
            }
        } else {
            self.y -= points;
        }
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: Option<Rgb>, stroke: Option<Rgb>) {
        let op = match (fill, stroke) {
            (Some(f), Some(s)) => {
                self.current.push_str(&f.fill());
                self.current.push_str(&s.stroke());
                "B"
            }
            (Some(f), None) => {
                self.current.push_str(&f.fill());
                "f"
            }
            (None, Some(s)) => {
                self.current.push_str(&s.stroke());
                "S"
            }
            (None, None) => return,
        };
        self.current
            .push_str(&format!("{:.2} {:.2} {:.2} {:.2} re {}\n", x, y, w, h, op));
    }

    fn rule(&mut self) {
        self.reserve(12.0);
        self.y -= 6.0;
        let x1 = self.layout.margin_left;
        let x2 = x1 + self.layout.content_width();
        self.current.push_str(&GREY.stroke());
        self.current
            .push_str(&format!("{:.2} {:.2} m {:.2} {:.2} l S\n", x1, self.y, x2, self.y));
        self.y -= 6.0;
    }

    fn callout(&mut self, title: &str, items: &[String]) {
        let size = self.layout.body_size - 1.0;
        let leading = size * 1.3;
        let pad = 10.0;
        let indent = 20.0;
        let inner_width = self.layout.content_width() - 2.0 * (indent + pad);
        let max_chars = ((inner_width / (size * 0.5)) as usize).max(1);

        let mut lines: Vec<(Font, String)> = vec![(Font::Bold, title.to_string())];
        for item in items {
            for (i, line) in word_wrap(item, max_chars.saturating_sub(2).max(1))
                .into_iter()
                .enumerate()
            {
                let prefix = if i == 0 { "- " } else { "  " };
                lines.push((Font::Body, format!("{prefix}{line}")));
            }
        }
        let height = lines.len() as f64 * leading + 2.0 * pad;
        self.space(10.0);
        self.reserve(height);

        let x = self.layout.margin_left + indent;
        let w = self.layout.content_width() - 2.0 * indent;
        self.rect(x, self.y - height, w, height, Some(INSIGHT_FILL), Some(BRAND));
        let mut y = self.y - pad;
        for (font, line) in &lines {
            y -= leading;
            self.put_text(*font, size, BLACK, x + pad, y + (leading - size), line);
        }
        self.y -= height;
        self.space(10.0);
    }

    fn table(&mut self, table: &TableBlock) {
        let size = self.layout.body_size - 1.0;
        let row_h = size * 2.0;
        let total_w: f64 = table.widths.iter().sum();
        let scale = if total_w > self.layout.content_width() {
            self.layout.content_width() / total_w
        } else {
            1.0
        };
        let widths: Vec<f64> = table.widths.iter().map(|w| w * scale).collect();
        let x0 = self.layout.margin_left + (self.layout.content_width() - total_w * scale) / 2.0;

        let draw_row = |this: &mut Self, cells: &[String], header: bool| {
            this.reserve(row_h);
            let y = this.y - row_h;
            let mut x = x0;
            for (i, w) in widths.iter().enumerate() {
                let fill = if header { BRAND } else { TABLE_FILL };
                this.rect(x, y, *w, row_h, Some(fill), Some(BLACK));
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let max_chars = ((w - 6.0) / (size * 0.5)).max(1.0) as usize;
                let text = truncate(cell, max_chars);
                let tx = x + (w - text_width(&text, size)) / 2.0;
                let (font, color) = if header {
                    (Font::Bold, WHITE)
                } else {
                    (Font::Body, BLACK)
                };
                this.put_text(font, size, color, tx.max(x + 3.0), y + row_h * 0.35, &text);
                x += w;
            }
            this.y = y;
        };
        draw_row(self, &table.header, true);
        for row in &table.rows {
            draw_row(self, row, false);
        }
        self.space(12.0);
    }

    /// Place the picture at `width_in` x `height_in`, shrunk to the content
    /// width when wider. An undecodable file is skipped with a warning.
    fn figure(&mut self, path: &Path, width_in: f64, height_in: f64) {
        let picture = match PdfImage::load(path) {
            Ok(picture) => picture,
            Err(err) => {
                warn!("Skipping figure {}: {err}", path.display());
                return;
            }
        };
        let mut w = width_in * POINTS_PER_INCH;
        let mut h = height_in * POINTS_PER_INCH;
        let max_w = self.layout.content_width();
        if w > max_w {
            h *= max_w / w;
            w = max_w;
        }
        self.space(6.0);
        self.reserve(h);
        let x = self.layout.margin_left + (max_w - w) / 2.0;
        let y = self.y - h;
        let name = format!("Im{}", self.images.len());
        self.images.push(picture);
        self.current.push_str(&format!(
            "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ\n",
            w, h, x, y, name
        ));
        self.y = y;
        self.space(6.0);
    }

    fn block(&mut self, block: &Block) {
        let body = self.layout.body_size;
        match block {
            Block::Spacer(points) => self.space(*points),
            Block::Title(text) => self.wrapped(Font::Bold, 24.0, BRAND, Align::Center, text),
            Block::Subtitle(text) => {
                self.wrapped(Font::Body, 14.0, GREY, Align::Center, text);
                self.space(14.0);
            }
            Block::Heading(text) => {
                self.space(12.0);
                self.wrapped(Font::Bold, 16.0, BRAND, Align::Left, text);
                self.space(6.0);
            }
            Block::Lead(text) => self.wrapped(Font::Bold, body, BLACK, Align::Left, text),
            Block::Paragraph(text) => {
                self.wrapped(Font::Body, body, BLACK, Align::Left, text);
                self.space(body);
            }
            Block::Callout { title, items } => self.callout(title, items),
            Block::Table(table) => self.table(table),
            Block::Figure(figure) => {
                if let Some(path) = figure.image.path() {
                    self.figure(path, figure.width_in, figure.height_in);
                }
            }
            Block::Rule => self.rule(),
            Block::Fine(text) => self.wrapped(Font::Body, body - 2.0, GREY, Align::Center, text),
            Block::PageBreak => {
                if !self.page_is_blank() {
                    self.break_page();
                }
            }
        }
    }

    fn finish(mut self) -> (Vec<String>, Vec<PdfImage>) {
        if !self.page_is_blank() || self.pages.is_empty() {
            self.break_page();
        }
        (self.pages, self.images)
    }
}

/// Lay out `blocks` and serialize the pages as a PDF document.
pub fn render(
    blocks: &[Block],
    layout: &Layout,
    title: &str,
    created: NaiveDate,
) -> Result<RenderedPdf> {
    layout.validate()?;
    let mut composer = Composer::new(layout);
    for block in blocks {
        composer.block(block);
    }
    let (pages, images) = composer.finish();

    let mut pdf = Vec::new();
    pdf.extend_from_slice(b"%PDF-1.4\n");
    pdf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n"); // Binary marker

    // Objects 1-5 are fixed; each page adds a page object and a content stream,
    // and the image XObjects follow the last page.
    let page_obj = |i: usize| 6 + 2 * i;
    let image_obj = |j: usize| page_obj(pages.len()) + j;
    let mut offsets: Vec<usize> = Vec::new();
    let mut push_obj = |pdf: &mut Vec<u8>, body: &[u8]| {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n", offsets.len()).as_bytes());
        pdf.extend_from_slice(body);
        pdf.extend_from_slice(b"\nendobj\n");
    };

    let xobjects = if images.is_empty() {
        String::new()
    } else {
        let refs: Vec<String> = (0..images.len())
            .map(|j| format!("/Im{} {} 0 R", j, image_obj(j)))
            .collect();
        format!(" /XObject << {} >>", refs.join(" "))
    };

    push_obj(&mut pdf, b"<< /Type /Catalog /Pages 2 0 R >>");
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", page_obj(i)))
        .collect();
    push_obj(
        &mut pdf,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .as_bytes(),
    );
    for font in [&layout.body_font, &layout.bold_font] {
        push_obj(
            &mut pdf,
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font
            )
            .as_bytes(),
        );
    }
    push_obj(
        &mut pdf,
        format!(
            "<< /Title ({}) /Producer (hotel_insights) /CreationDate (D:{}) >>",
            escape_pdf_string(title),
            created.format("%Y%m%d")
        )
        .as_bytes(),
    );
    for (i, content) in pages.iter().enumerate() {
        push_obj(
            &mut pdf,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] /Contents {} 0 R /Resources << /Font << /F1 3 0 R /F2 4 0 R >>{} >> >>",
                layout.width,
                layout.height,
                page_obj(i) + 1,
                xobjects
            )
            .as_bytes(),
        );
        push_obj(
            &mut pdf,
            format!(
                "<< /Length {} >>\nstream\n{}endstream",
                content.len(),
                content
            )
            .as_bytes(),
        );
    }
    for picture in &images {
        push_obj(&mut pdf, &picture.object());
    }

    let xref_start = pdf.len();
    pdf.extend_from_slice(b"xref\n");
    pdf.extend_from_slice(format!("0 {}\n", offsets.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for pos in &offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n \n", pos).as_bytes());
    }
    pdf.extend_from_slice(b"trailer\n");
    pdf.extend_from_slice(
        format!("<< /Size {} /Root 1 0 R /Info 5 0 R >>\n", offsets.len() + 1).as_bytes(),
    );
    pdf.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_start).as_bytes());

    Ok(RenderedPdf {
        bytes: pdf,
        pages: pages.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_dimensions() {
        assert_eq!(PageSize::Letter.dimensions_pt(), (612.0, 792.0));
        let (w, h) = PageSize::A4.dimensions_pt();
        assert!(w < h);
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("(a)\\b"), "\\(a\\)\\\\b");
        assert_eq!(escape_pdf_string("\u{2022} caf\u{e9}"), "- caf?");
    }

    #[test]
    fn test_word_wrap() {
        let lines = word_wrap("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
        assert!(word_wrap("   ", 10).is_empty());
    }

    #[test]
    fn test_unknown_font_is_rejected() {
        let mut layout = Layout::new(PageSize::Letter);
        layout.bold_font = String::from("Comic-Sans");
        assert!(matches!(layout.validate(), Err(HotelError::Layout(_))));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let mut layout = Layout::new(PageSize::A4);
        layout.width = 0.0;
        assert!(matches!(layout.validate(), Err(HotelError::Layout(_))));
    }

    #[test]
    fn test_page_breaks_produce_pages() {
        let layout = Layout::new(PageSize::Letter);
        let blocks = vec![
            Block::Title("One".into()),
            Block::PageBreak,
            Block::PageBreak,
            Block::Paragraph("Two".into()),
        ];
        let out = render(&blocks, &layout, "t", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        assert_eq!(out.pages, 2);
        assert!(out.bytes.starts_with(b"%PDF-1.4"));
        assert!(out.bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_transparent_pixels_flatten_to_white() {
        use flate2::read::ZlibDecoder;
        use image::{Rgba, RgbaImage};
        use std::io::Read;

        let mut pixels = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 255, 255]));
        pixels.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        let picture = PdfImage::from_image(&DynamicImage::ImageRgba8(pixels)).unwrap();
        assert_eq!((picture.width, picture.height), (2, 1));

        let mut rgb = Vec::new();
        ZlibDecoder::new(picture.compressed())
            .read_to_end(&mut rgb)
            .unwrap();
        assert_eq!(rgb, vec![0, 0, 255, 255, 255, 255]);
    }

    #[test]
    fn test_long_text_overflows_onto_new_pages() {
        let layout = Layout::new(PageSize::Letter);
        let text = "word ".repeat(4000);
        let out = render(
            &[Block::Paragraph(text)],
            &layout,
            "long",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap();
        assert!(out.pages > 1);
    }
}
