//! PDF layout of a [`Document`] on US Letter pages.

use std::fmt::Debug;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb,
};
use tracing::debug;

use super::document::{Block, Document};

// === Page geometry (millimetres) ===
const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 25.4;
const BOTTOM_MARGIN: f32 = 6.35;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const PT: f32 = 25.4 / 72.0;
const INCH: f32 = 25.4;

// Average Helvetica glyph width as a fraction of the font size
const GLYPH_WIDTH: f32 = 0.5;

const TITLE_SIZE: f32 = 24.0;
const SUBTITLE_SIZE: f32 = 14.0;
const HEADING_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 11.0;
const BODY_LEADING: f32 = 14.0;
const TABLE_HEADER_SIZE: f32 = 10.0;
const TABLE_BODY_SIZE: f32 = 9.0;

/// Column widths of the findings table, in inches.
const TABLE_COLUMNS: [f32; 5] = [1.5, 1.0, 1.5, 1.0, 1.0];

/// Approximate rendered width of `text` in millimetres.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * GLYPH_WIDTH * PT
}

/// Greedy word wrap to `width` millimetres. A single over-long word gets its own line.
pub fn wrap_text(text: &str, font_size: f32, width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, font_size) > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn pdf_error<E: Debug>(action: &'static str) -> impl FnOnce(E) -> anyhow::Error {
    move |e| anyhow!("{}: {:?}", action, e)
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, None))
}

/// Cursor-based writer that starts a new page when content would cross the bottom margin.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Baseline position, millimetres from the page bottom
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error("Failed to load Helvetica"))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error("Failed to load Helvetica-Bold"))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < BOTTOM_MARGIN {
            self.new_page();
        }
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool, color: Color) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(color);
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn centered(&mut self, text: &str, size: f32, bold: bool, color: Color) {
        let height = size * 1.2 * PT;
        self.ensure_space(height);
        self.y -= height;
        let x = MARGIN + ((CONTENT_WIDTH - text_width(text, size)) / 2.0).max(0.0);
        self.text(text, size, x, self.y, bold, color);
    }

    fn heading(&mut self, text: &str) {
        // Keep a heading together with at least two body lines
        let height = (12.0 + HEADING_SIZE * 1.2 + 12.0 + 2.0 * BODY_LEADING) * PT;
        self.ensure_space(height);
        self.y -= (12.0 + HEADING_SIZE) * PT;
        self.text(text, HEADING_SIZE, MARGIN, self.y, true, rgb(0x2c, 0x3e, 0x50));
        self.y -= 12.0 * PT;
    }

    fn paragraph(&mut self, text: &str, indent: f32) {
        for line in wrap_text(text, BODY_SIZE, CONTENT_WIDTH - indent) {
            self.ensure_space(BODY_LEADING * PT);
            self.y -= BODY_LEADING * PT;
            self.text(&line, BODY_SIZE, MARGIN + indent, self.y, false, rgb(0, 0, 0));
        }
    }

    fn bullet(&mut self, label: &str, text: &str) {
        let indent = 5.0;
        self.ensure_space(BODY_LEADING * PT);

        // Bullet dot aligned with the first line
        let dot = 1.2;
        let dot_y = self.y - BODY_LEADING * PT + BODY_SIZE * PT * 0.3;
        self.layer.set_fill_color(rgb(0, 0, 0));
        self.layer.add_rect(
            Rect::new(Mm(MARGIN + 1.0), Mm(dot_y), Mm(MARGIN + 1.0 + dot), Mm(dot_y + dot))
                .with_mode(PaintMode::Fill),
        );

        // Bold lead-in on the first line, body text wrapped after it
        let lead_width = text_width(label, BODY_SIZE) + 1.5;
        let first_width = CONTENT_WIDTH - indent - lead_width;
        let mut words = text.split_whitespace().peekable();
        let mut first = String::new();
        while let Some(word) = words.peek() {
            let candidate = if first.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", first, word)
            };
            if text_width(&candidate, BODY_SIZE) > first_width && !first.is_empty() {
                break;
            }
            first = candidate;
            words.next();
        }

        self.y -= BODY_LEADING * PT;
        self.text(label, BODY_SIZE, MARGIN + indent, self.y, true, rgb(0, 0, 0));
        self.text(&first, BODY_SIZE, MARGIN + indent + lead_width, self.y, false, rgb(0, 0, 0));

        let rest: Vec<&str> = words.collect();
        if !rest.is_empty() {
            self.paragraph(&rest.join(" "), indent);
        }
        self.y -= 0.1 * INCH;
    }

    fn table(&mut self, headers: &[String], rows: &[Vec<String>]) {
        let widths: Vec<f32> = TABLE_COLUMNS.iter().map(|w| w * INCH).collect();
        let total: f32 = widths.iter().sum();
        let left = MARGIN + ((CONTENT_WIDTH - total) / 2.0).max(0.0);

        let header_height = (TABLE_HEADER_SIZE + 6.0 + 12.0) * PT;
        let row_height = (TABLE_BODY_SIZE + 9.0) * PT;

        self.ensure_space(header_height + row_height);
        self.table_row(headers, &widths, left, header_height, TABLE_HEADER_SIZE, true);
        for row in rows {
            self.ensure_space(row_height);
            self.table_row(row, &widths, left, row_height, TABLE_BODY_SIZE, false);
        }
    }

    fn table_row(&mut self, cells: &[String], widths: &[f32], left: f32, height: f32, size: f32, header: bool) {
        let top = self.y;
        let bottom = top - height;

        let (fill, text_color) = if header {
            (rgb(128, 128, 128), rgb(245, 245, 245))
        } else {
            (rgb(245, 245, 220), rgb(0, 0, 0))
        };

        let mut x = left;
        for (i, width) in widths.iter().enumerate() {
            self.layer.set_fill_color(fill.clone());
            self.layer.add_rect(Rect::new(Mm(x), Mm(bottom), Mm(x + width), Mm(top)).with_mode(PaintMode::Fill));

            self.layer.set_outline_color(rgb(0, 0, 0));
            self.layer.set_outline_thickness(1.0);
            self.layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(x), Mm(bottom)), false),
                    (Point::new(Mm(x + width), Mm(bottom)), false),
                    (Point::new(Mm(x + width), Mm(top)), false),
                    (Point::new(Mm(x), Mm(top)), false),
                ],
                is_closed: true,
            });

            if let Some(cell) = cells.get(i) {
                let tx = x + ((width - text_width(cell, size)) / 2.0).max(0.5);
                let ty = if header {
                    bottom + 12.0 * PT
                } else {
                    bottom + (height - size * PT) / 2.0 + size * PT * 0.2
                };
                self.text(cell, size, tx, ty, header, text_color.clone());
            }
            x += width;
        }

        self.y = bottom;
    }

    fn save(self, path: &Path) -> Result<usize> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.doc
            .save(&mut writer)
            .map_err(pdf_error("Failed to write PDF"))?;
        Ok(self.pages)
    }
}

/// Lay out `document` and write it to `path`. Returns the number of pages.
pub fn render_pdf(document: &Document, path: &Path) -> Result<usize> {
    let mut writer = PageWriter::new(&document.title)?;

    for block in &document.blocks {
        match block {
            Block::Title(text) => writer.centered(text, TITLE_SIZE, true, rgb(0x1a, 0x1a, 0x1a)),
            Block::Subtitle(text) => writer.centered(text, SUBTITLE_SIZE, true, rgb(0, 0, 0)),
            Block::Heading(text) => writer.heading(text),
            Block::Paragraph(text) => writer.paragraph(text, 0.0),
            Block::Bullet { label, text } => writer.bullet(label, text),
            Block::Table { headers, rows } => writer.table(headers, rows),
            Block::Spacer(inches) => writer.y -= inches * INCH,
        }
    }

    let pages = writer.save(path)?;
    debug!(path = %path.display(), pages, "Rendered PDF");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::document::build_document;
    use crate::report::document::tests::sample_inputs;

    #[test]
    fn test_wrap_text_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let width = 60.0;
        let lines = wrap_text(&text, BODY_SIZE, width);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, BODY_SIZE) <= width, "line too wide: {}", line);
        }
        assert_eq!(lines.join(" "), text.trim_end());
    }

    #[test]
    fn test_wrap_text_long_word() {
        let word = "x".repeat(200);
        let lines = wrap_text(&format!("a {} b", word), BODY_SIZE, 50.0);
        assert_eq!(lines, vec!["a".to_string(), word, "b".to_string()]);
        assert!(wrap_text("", BODY_SIZE, 50.0).is_empty());
    }

    #[test]
    fn test_render_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");

        let pages = render_pdf(&build_document(&sample_inputs()), &path).unwrap();
        assert!(pages >= 2);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
