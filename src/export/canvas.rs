//! Minimal raster canvas for the PNG charts.
//!
//! Charts are plain RGB images: a white background, a plot area inset by fixed
//! margins, axis lines, light grid lines and bitmap text. Coordinates are signed
//! so callers can draw partly off-canvas; everything is clipped to the image.

use std::path::Path;

use anyhow::{Context, Result};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};

use crate::models::SentimentClass;

/// Common color definitions
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const GRID: Rgb<u8> = Rgb([225, 225, 225]);
    pub const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
    pub const BLUE: Rgb<u8> = Rgb([59, 76, 192]);
    pub const RED: Rgb<u8> = Rgb([180, 4, 38]);
    pub const TEAL: Rgb<u8> = Rgb([102, 194, 165]);
    pub const ORANGE: Rgb<u8> = Rgb([252, 141, 98]);
}

/// Fixed color per sentiment class, from deep red (extreme fear) to deep green.
pub fn sentiment_color(class: SentimentClass) -> Rgb<u8> {
    match class {
        SentimentClass::ExtremeFear => Rgb([165, 0, 38]),
        SentimentClass::Fear => Rgb([244, 109, 67]),
        SentimentClass::Neutral => Rgb([190, 170, 60]),
        SentimentClass::Greed => Rgb([102, 189, 99]),
        SentimentClass::ExtremeGreed => Rgb([0, 104, 55]),
    }
}

/// Interpolate between two colors
pub fn interpolate_color(c1: Rgb<u8>, c2: Rgb<u8>, t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    Rgb([
        ((1.0 - t) * c1.0[0] as f64 + t * c2.0[0] as f64) as u8,
        ((1.0 - t) * c1.0[1] as f64 + t * c2.0[1] as f64) as u8,
        ((1.0 - t) * c1.0[2] as f64 + t * c2.0[2] as f64) as u8,
    ])
}

/// Blue-white-red color for a value in [-1, 1], white at zero.
pub fn diverging_color(value: f64) -> Rgb<u8> {
    let v = value.clamp(-1.0, 1.0);
    if v < 0.0 {
        interpolate_color(colors::WHITE, colors::BLUE, -v)
    } else {
        interpolate_color(colors::WHITE, colors::RED, v)
    }
}

/// Vertical mapping from data values to the plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YScale {
    min: f64,
    max: f64,
    log: bool,
}

impl YScale {
    pub fn linear(min: f64, max: f64) -> Self {
        let (min, max) = if max > min { (min, max) } else { (min - 1.0, min + 1.0) };
        Self { min, max, log: false }
    }

    /// Linear scale covering every value and zero, with 5% headroom.
    pub fn including_zero<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let (mut min, mut max) = (0.0f64, 0.0f64);
        for v in values.into_iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
        }
        let pad = (max - min) * 0.05;
        Self::linear(if min < 0.0 { min - pad } else { min }, max + pad)
    }

    /// Base-10 log scale over the positive values; non-positive values sit on the floor.
    pub fn log<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let positive: Vec<f64> = values.into_iter().filter(|v| *v > 0.0 && v.is_finite()).collect();
        let lo = positive.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = positive.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if positive.is_empty() {
            return Self { min: 0.0, max: 1.0, log: true };
        }
        let min = lo.log10().floor();
        let max = hi.log10().ceil().max(min + 1.0);
        Self { min, max, log: true }
    }

    /// Position of `value` between the bottom (0.0) and top (1.0) of the plot.
    pub fn fraction(&self, value: f64) -> f64 {
        let v = if self.log {
            if value > 0.0 { value.log10() } else { self.min }
        } else {
            value
        };
        ((v - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    /// Values at which to draw grid lines.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        if self.log {
            let (lo, hi) = (self.min as i32, self.max as i32);
            return (lo..=hi).map(|e| 10f64.powi(e)).collect();
        }
        let count = count.max(1);
        let step = (self.max - self.min) / count as f64;
        (0..=count).map(|i| self.min + step * i as f64).collect()
    }
}

/// Pixel bounds of the plotting region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotArea {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl PlotArea {
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }
}

/// Horizontal anchoring of a text block relative to its x coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

// Glyph cell of the bitmap font, in font pixels
const GLYPH: i64 = 8;
const LINE_GAP: i64 = 2;

/// An RGB image plus the plot area charts draw into.
pub struct Canvas {
    img: RgbImage,
    plot: PlotArea,
    dpi: u32,
}

impl Canvas {
    /// A blank canvas of `width_in` x `height_in` inches at `dpi`.
    pub fn from_inches(width_in: f64, height_in: f64, dpi: u32) -> Self {
        let width = ((width_in * dpi as f64).round() as u32).max(16);
        let height = ((height_in * dpi as f64).round() as u32).max(16);
        Self::with_dpi(width, height, dpi)
    }

    fn with_dpi(width: u32, height: u32, dpi: u32) -> Self {
        let img = RgbImage::from_pixel(width, height, colors::WHITE);
        let (w, h) = (width as i64, height as i64);
        // Room for the title above and tick labels plus axis titles left and below
        let plot = PlotArea {
            left: w / 8,
            top: h / 9,
            right: w - w / 25,
            bottom: h - h / 5,
        };
        Self { img, plot, dpi }
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn plot(&self) -> PlotArea {
        self.plot
    }

    /// Stroke width proportional to the image size.
    pub fn stroke(&self) -> i64 {
        (self.img.width().min(self.img.height()) as i64 / 400).max(1)
    }

    /// Row for a data value under `scale`.
    pub fn y_of(&self, scale: &YScale, value: f64) -> i64 {
        let f = scale.fraction(value);
        self.plot.bottom - (f * self.plot.height() as f64).round() as i64
    }

    /// Column for position `t` in [0, 1] across the plot.
    pub fn x_of(&self, t: f64) -> i64 {
        self.plot.left + (t.clamp(0.0, 1.0) * self.plot.width() as f64).round() as i64
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && x < self.img.width() as i64 && y < self.img.height() as i64 {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Fill the rectangle spanning both corners (inclusive).
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        let (xa, xb) = (x0.min(x1), x0.max(x1));
        let (ya, yb) = (y0.min(y1), y0.max(y1));
        for y in ya..=yb {
            for x in xa..=xb {
                self.put(x, y, color);
            }
        }
    }

    /// Blend `color` over the rectangle with the given opacity.
    pub fn blend_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>, alpha: f64) {
        let (xa, xb) = (x0.min(x1).max(0), x0.max(x1).min(self.img.width() as i64 - 1));
        let (ya, yb) = (y0.min(y1).max(0), y0.max(y1).min(self.img.height() as i64 - 1));
        for y in ya..=yb {
            for x in xa..=xb {
                let under = *self.img.get_pixel(x as u32, y as u32);
                self.img
                    .put_pixel(x as u32, y as u32, interpolate_color(under, color, alpha));
            }
        }
    }

    pub fn hline(&mut self, y: i64, x0: i64, x1: i64, color: Rgb<u8>, thickness: i64) {
        let half = thickness / 2;
        self.fill_rect(x0, y - half, x1, y - half + thickness - 1, color);
    }

    pub fn vline(&mut self, x: i64, y0: i64, y1: i64, color: Rgb<u8>, thickness: i64) {
        let half = thickness / 2;
        self.fill_rect(x - half, y0, x - half + thickness - 1, y1, color);
    }

    /// Dashed horizontal line across the whole plot.
    pub fn dashed_hline(&mut self, y: i64, color: Rgb<u8>, thickness: i64) {
        let dash = (self.plot.width() / 80).max(4);
        let mut x = self.plot.left;
        while x < self.plot.right {
            let end = (x + dash).min(self.plot.right);
            self.hline(y, x, end, color, thickness);
            x += dash * 2;
        }
    }

    /// Straight segment with a square brush.
    pub fn line(&mut self, from: (i64, i64), to: (i64, i64), color: Rgb<u8>, thickness: i64) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        let half = thickness / 2;

        loop {
            self.fill_rect(x - half, y - half, x - half + thickness - 1, y - half + thickness - 1, color);
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Filled circular marker.
    pub fn marker(&mut self, center: (i64, i64), radius: i64, color: Rgb<u8>) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    self.put(center.0 + dx, center.1 + dy, color);
                }
            }
        }
    }

    /// Horizontal grid lines at the scale's ticks.
    pub fn grid(&mut self, scale: &YScale, ticks: usize) {
        let (left, right) = (self.plot.left, self.plot.right);
        for tick in scale.ticks(ticks) {
            let y = self.y_of(scale, tick);
            self.hline(y, left, right, colors::GRID, 1);
        }
    }

    /// Left and bottom axis lines.
    pub fn axes(&mut self) {
        let t = self.stroke();
        let p = self.plot;
        self.vline(p.left, p.top, p.bottom, colors::AXIS, t);
        self.hline(p.bottom, p.left, p.right, colors::AXIS, t);
    }

    /// Labelled color swatches stacked in the top-right corner of the plot.
    pub fn legend(&mut self, entries: &[(Rgb<u8>, String)]) {
        if entries.is_empty() {
            return;
        }
        let scale = self.font_scale(9.0);
        let size = GLYPH * scale;
        let pad = size / 2;
        let label_width = entries
            .iter()
            .map(|(_, label)| text_width(label, scale))
            .max()
            .unwrap_or(0);

        let box_right = self.plot.right - pad;
        let box_left = box_right - (pad * 3 + size + label_width);
        let box_top = self.plot.top + pad;
        let box_bottom = box_top + pad + entries.len() as i64 * (size + pad);
        self.fill_rect(box_left, box_top, box_right, box_bottom, colors::WHITE);
        self.stroke_rect(box_left, box_top, box_right, box_bottom, colors::GRID);

        let mut y = box_top + pad;
        for (color, label) in entries {
            self.fill_rect(box_left + pad, y, box_left + pad + size, y + size - 1, *color);
            self.text(box_left + pad * 2 + size, y, label, 9.0, Align::Left, colors::BLACK);
            y += size + pad;
        }
    }

    fn stroke_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        self.hline(y0, x0, x1, color, 1);
        self.hline(y1, x0, x1, color, 1);
        self.vline(x0, y0, y1, color, 1);
        self.vline(x1, y0, y1, color, 1);
    }

    // === Text ===

    /// Integer glyph magnification for a font size in points.
    pub fn font_scale(&self, points: f64) -> i64 {
        let px = points * self.dpi as f64 / 72.0;
        ((px / GLYPH as f64).round() as i64).max(1)
    }

    /// Draw `text` with its top edge at `y`; `\n` starts a new line.
    pub fn text(&mut self, x: i64, y: i64, text: &str, points: f64, align: Align, color: Rgb<u8>) {
        let scale = self.font_scale(points);
        let mut top = y;
        for line in text.lines() {
            let width = text_width(line, scale);
            let left = match align {
                Align::Left => x,
                Align::Center => x - width / 2,
                Align::Right => x - width,
            };
            for (i, ch) in line.chars().enumerate() {
                let glyph = glyph(ch);
                let gx = left + i as i64 * GLYPH * scale;
                for (row, bits) in glyph.iter().enumerate() {
                    for col in 0..GLYPH {
                        if bits & (1 << col) != 0 {
                            let px = gx + col * scale;
                            let py = top + row as i64 * scale;
                            self.fill_rect(px, py, px + scale - 1, py + scale - 1, color);
                        }
                    }
                }
            }
            top += (GLYPH + LINE_GAP) * scale;
        }
    }

    /// Single line of text rotated to read bottom-to-top, centered on `(x, y)`.
    pub fn text_vertical(&mut self, x: i64, y: i64, text: &str, points: f64, color: Rgb<u8>) {
        let scale = self.font_scale(points);
        let bottom = y + text_width(text, scale) / 2;
        let left = x - GLYPH * scale / 2;
        for (i, ch) in text.chars().enumerate() {
            let glyph = glyph(ch);
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH {
                    if bits & (1 << col) != 0 {
                        let px = left + row as i64 * scale;
                        let py = bottom - (i as i64 * GLYPH + col + 1) * scale;
                        self.fill_rect(px, py, px + scale - 1, py + scale - 1, color);
                    }
                }
            }
        }
    }

    /// Title centered above the plot and axis titles below and left of it.
    pub fn labels(&mut self, title: &str, x_label: &str, y_label: &str) {
        let (w, h) = (self.img.width() as i64, self.img.height() as i64);
        let p = self.plot;
        let title_h = GLYPH * self.font_scale(14.0);
        let label_h = GLYPH * self.font_scale(12.0);

        self.text((p.left + p.right) / 2, (p.top - title_h) / 2, title, 14.0, Align::Center, colors::BLACK);
        self.text((p.left + p.right) / 2, h - label_h - h / 40, x_label, 12.0, Align::Center, colors::BLACK);
        self.text_vertical(w / 50 + label_h / 2, (p.top + p.bottom) / 2, y_label, 12.0, colors::BLACK);
    }

    /// Value labels to the left of the plot at the scale's ticks.
    pub fn y_tick_labels(&mut self, scale: &YScale, ticks: usize) {
        let h = GLYPH * self.font_scale(8.0);
        let x = self.plot.left - self.stroke() * 4;
        for tick in scale.ticks(ticks) {
            let y = self.y_of(scale, tick);
            self.text(x, y - h / 2, &compact_number(tick), 8.0, Align::Right, colors::AXIS);
        }
    }

    /// Label centered under column position `t` in [0, 1].
    pub fn x_tick_label(&mut self, t: f64, label: &str) {
        let x = self.x_of(t);
        let y = self.plot.bottom + self.stroke() * 4;
        self.text(x, y, label, 8.0, Align::Center, colors::AXIS);
    }

    /// Encode as PNG at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.img
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("Failed to write chart: {}", path.display()))
    }
}

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Pixel width of the longest line of `text` at the given magnification.
pub fn text_width(text: &str, scale: i64) -> i64 {
    text.lines()
        .map(|line| line.chars().count() as i64)
        .max()
        .unwrap_or(0)
        * GLYPH
        * scale
}

/// Short axis label: thousands as K, millions as M, billions as B.
pub fn compact_number(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };

    let digits = if scaled.abs() >= 100.0 || scaled.fract() == 0.0 {
        0
    } else if scaled.abs() >= 10.0 {
        1
    } else {
        2
    };
    let mut out = format!("{:.*}", digits, scaled);
    if out.contains('.') {
        out = out.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    if out == "-0" {
        out = "0".to_string();
    }
    out + suffix
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Canvas {
        /// Pixel-sized canvas at 100 dpi.
        pub fn new(width: u32, height: u32) -> Self {
            Self::with_dpi(width, height, 100)
        }

        pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
            *self.img.get_pixel(x, y)
        }
    }

    #[test]
    fn test_canvas_size_from_inches() {
        let canvas = Canvas::from_inches(10.0, 6.0, 30);
        assert_eq!(canvas.width(), 300);
        assert_eq!(canvas.height(), 180);
        assert_eq!(canvas.pixel(0, 0), colors::WHITE);
    }

    #[test]
    fn test_linear_scale() {
        let scale = YScale::including_zero([10.0, 20.0]);
        assert_eq!(scale.fraction(0.0), 0.0);
        assert!(scale.fraction(20.0) < 1.0);
        assert!(scale.fraction(10.0) > 0.0);

        let negative = YScale::including_zero([-5.0, 5.0]);
        assert!((negative.fraction(0.0) - 0.5).abs() < 1e-9);

        let flat = YScale::linear(3.0, 3.0);
        assert!((flat.fraction(3.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_log_scale() {
        let scale = YScale::log([10.0, 1000.0, 0.0]);
        assert_eq!(scale.fraction(10.0), 0.0);
        assert_eq!(scale.fraction(1000.0), 1.0);
        assert!((scale.fraction(100.0) - 0.5).abs() < 1e-9);
        assert_eq!(scale.fraction(0.0), 0.0);
        assert_eq!(scale.ticks(5), vec![10.0, 100.0, 1000.0]);
    }

    #[test]
    fn test_fill_and_clip() {
        let mut canvas = Canvas::new(20, 20);
        canvas.fill_rect(-5, -5, 2, 2, colors::BLACK);
        assert_eq!(canvas.pixel(0, 0), colors::BLACK);
        assert_eq!(canvas.pixel(2, 2), colors::BLACK);
        assert_eq!(canvas.pixel(3, 3), colors::WHITE);

        canvas.blend_rect(10, 10, 30, 30, colors::BLACK, 0.5);
        assert_eq!(canvas.pixel(19, 19), Rgb([127, 127, 127]));
    }

    #[test]
    fn test_line_endpoints() {
        let mut canvas = Canvas::new(50, 50);
        canvas.line((5, 5), (40, 30), colors::RED, 1);
        assert_eq!(canvas.pixel(5, 5), colors::RED);
        assert_eq!(canvas.pixel(40, 30), colors::RED);
    }

    #[test]
    fn test_text_draws_glyph_pixels() {
        let mut canvas = Canvas::new(40, 20);
        assert_eq!(canvas.font_scale(5.76), 1);
        canvas.text(0, 0, "I", 5.76, Align::Left, colors::BLACK);

        let inked = (0..8u32)
            .flat_map(|y| (0..8u32).map(move |x| (x, y)))
            .filter(|(x, y)| canvas.pixel(*x, *y) == colors::BLACK)
            .count();
        assert!(inked > 0);
        // Nothing past the single glyph cell
        assert!((8..40u32).all(|x| canvas.pixel(x, 4) == colors::WHITE));
    }

    #[test]
    fn test_text_alignment_and_scale() {
        let canvas = Canvas::from_inches(10.0, 6.0, 300);
        // 12pt at 300 dpi is 50px, about six 8px glyph rows
        assert_eq!(canvas.font_scale(12.0), 6);
        assert_eq!(text_width("Fear", 2), 64);
        assert_eq!(text_width("Extreme\nGreed", 1), 56);

        let mut right = Canvas::new(40, 20);
        right.text(39, 0, "W", 5.76, Align::Right, colors::BLACK);
        assert!((0..31u32).all(|x| (0..8u32).all(|y| right.pixel(x, y) == colors::WHITE)));
    }

    #[test]
    fn test_vertical_text_stays_in_column() {
        let mut canvas = Canvas::new(30, 30);
        canvas.text_vertical(15, 15, "AB", 5.76, colors::BLACK);
        for y in 0..30u32 {
            for x in (0..11u32).chain(19..30) {
                assert_eq!(canvas.pixel(x, y), colors::WHITE, "ink at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_compact_number() {
        assert_eq!(compact_number(0.0), "0");
        assert_eq!(compact_number(0.25), "0.25");
        assert_eq!(compact_number(-12.5), "-12.5");
        assert_eq!(compact_number(1500.0), "1.5K");
        assert_eq!(compact_number(250_000.0), "250K");
        assert_eq!(compact_number(3_200_000.0), "3.2M");
        assert_eq!(compact_number(1e10), "10B");
    }

    #[test]
    fn test_diverging_color() {
        assert_eq!(diverging_color(0.0), colors::WHITE);
        assert_eq!(diverging_color(1.0), colors::RED);
        assert_eq!(diverging_color(-2.0), colors::BLUE);
    }
}
