//! PNG line and scatter charts of error and slope-difference series.
//!
//! Charts are drawn pixel by pixel into an `RgbImage`: a gainsboro frame, a
//! white plot area with a dashed grid and a zero line, and the series on top.
//! Title and axis labels use the 8x8 bitmap glyphs of `font8x8`; the panel
//! tag, e.g. `(a)`, sits in a grey box at the top-right of the plot area.
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use std::path::Path;
use tracing::debug;

use crate::error::Result;

pub const GAINSBORO: Rgb<u8> = Rgb([220, 220, 220]);
pub const FIREBRICK: Rgb<u8> = Rgb([178, 34, 34]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([190, 190, 190]);
const DARK_GRAY: Rgb<u8> = Rgb([169, 169, 169]);
const ZERO_LINE: Rgb<u8> = Rgb([110, 110, 110]);

/// Cluster colours, cycled when there are more clusters than entries
pub const CLUSTER_PALETTE: [Rgb<u8>; 6] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
];

const MARGIN_LEFT: u32 = 60;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 36;
const MARGIN_BOTTOM: u32 = 40;
const GRID_DIVISIONS: u32 = 4;
const GLYPH: i64 = 8;
const TEXT_SCALE: i64 = 2;
const X_LABEL: &str = "Pixel number";
const ERROR_LABEL: &str = "Error (m)";

/// Panel tag of the `index`-th region: `(a)` for 1 through `(z)` for 26.
pub fn panel_letter(index: usize) -> Option<String> {
    if (1..=26).contains(&index) {
        Some(format!("({})", (b'a' + (index - 1) as u8) as char))
    } else {
        None
    }
}

/// Text drawn around a chart. Empty strings are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartLabels {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub panel: Option<String>,
}

impl ChartLabels {
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            panel: None,
        }
    }
}

/// The four error figures written per region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPlot {
    All,
    AllFiltered,
    Sampled,
    SampledFiltered,
}

impl ErrorPlot {
    pub const ALL: [ErrorPlot; 4] = [
        ErrorPlot::All,
        ErrorPlot::AllFiltered,
        ErrorPlot::Sampled,
        ErrorPlot::SampledFiltered,
    ];

    /// File name suffix, e.g. `A_All` in `Area_01_A_All.png`
    pub fn suffix(&self) -> &'static str {
        match self {
            ErrorPlot::All => "A_All",
            ErrorPlot::AllFiltered => "B_All_Filtered",
            ErrorPlot::Sampled => "C_100",
            ErrorPlot::SampledFiltered => "D_100_filtered",
        }
    }

    /// Symmetric y-axis limit
    pub fn y_limit(&self) -> f64 {
        match self {
            ErrorPlot::All => 0.8,
            ErrorPlot::AllFiltered => 0.2,
            ErrorPlot::Sampled => 0.04,
            ErrorPlot::SampledFiltered => 0.03,
        }
    }

    pub fn color(&self) -> Rgb<u8> {
        match self {
            ErrorPlot::All | ErrorPlot::AllFiltered => FIREBRICK,
            ErrorPlot::Sampled | ErrorPlot::SampledFiltered => BLACK,
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, ErrorPlot::AllFiltered | ErrorPlot::SampledFiltered)
    }

    pub fn is_sampled(&self) -> bool {
        matches!(self, ErrorPlot::Sampled | ErrorPlot::SampledFiltered)
    }

    pub fn title(&self) -> &'static str {
        match self {
            ErrorPlot::All => "Predicted vs actual elevation DEM values",
            ErrorPlot::AllFiltered => "Predicted vs actual DEM values",
            ErrorPlot::Sampled => "Errors for 100 random samples",
            ErrorPlot::SampledFiltered => "Errors for 100 random samples after filtering",
        }
    }

    pub fn chart(&self) -> LineChart {
        LineChart::new(-self.y_limit(), self.y_limit())
            .with_color(self.color())
            .with_labels(ChartLabels::new(self.title(), X_LABEL, ERROR_LABEL))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub width: u32,
    pub height: u32,
    pub y_min: f64,
    pub y_max: f64,
    pub color: Rgb<u8>,
    pub labels: ChartLabels,
}

impl LineChart {
    pub fn new(y_min: f64, y_max: f64) -> Self {
        Self {
            width: 800,
            height: 400,
            y_min,
            y_max,
            color: FIREBRICK,
            labels: ChartLabels::default(),
        }
    }

    pub fn with_color(mut self, color: Rgb<u8>) -> Self {
        self.color = color;
        self
    }

    pub fn with_labels(mut self, labels: ChartLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_panel(mut self, panel: Option<String>) -> Self {
        self.labels.panel = panel;
        self
    }

    /// Plot area as (x0, y0, x1, y1), inclusive.
    fn plot_area(&self) -> (i64, i64, i64, i64) {
        (
            MARGIN_LEFT as i64,
            MARGIN_TOP as i64,
            (self.width - MARGIN_RIGHT - 1) as i64,
            (self.height - MARGIN_BOTTOM - 1) as i64,
        )
    }

    fn x_pixel(&self, i: usize, n: usize) -> i64 {
        let (x0, _, x1, _) = self.plot_area();
        if n <= 1 {
            return (x0 + x1) / 2;
        }
        x0 + ((i as f64 / (n - 1) as f64) * (x1 - x0) as f64).round() as i64
    }

    /// Row of `v`; values outside the y-range land on the border.
    fn y_pixel(&self, v: f64) -> i64 {
        let (_, y0, _, y1) = self.plot_area();
        let span = self.y_max - self.y_min;
        let t = if span > 0.0 { (v - self.y_min) / span } else { 0.5 };
        let t = t.clamp(0.0, 1.0);
        y1 - (t * (y1 - y0) as f64).round() as i64
    }

    fn canvas(&self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, GAINSBORO);
        let (x0, y0, x1, y1) = self.plot_area();
        for y in y0..=y1 {
            for x in x0..=x1 {
                img.put_pixel(x as u32, y as u32, WHITE);
            }
        }

        // Dashed grid
        for k in 1..GRID_DIVISIONS {
            let gx = x0 + (x1 - x0) * k as i64 / GRID_DIVISIONS as i64;
            let gy = y0 + (y1 - y0) * k as i64 / GRID_DIVISIONS as i64;
            for y in (y0..=y1).filter(|y| (y / 4) % 2 == 0) {
                img.put_pixel(gx as u32, y as u32, GRID);
            }
            for x in (x0..=x1).filter(|x| (x / 4) % 2 == 0) {
                img.put_pixel(x as u32, gy as u32, GRID);
            }
        }

        if self.y_min < 0.0 && self.y_max > 0.0 {
            let zy = self.y_pixel(0.0);
            for x in x0..=x1 {
                img.put_pixel(x as u32, zy as u32, ZERO_LINE);
            }
        }

        // Frame
        for x in x0..=x1 {
            img.put_pixel(x as u32, y0 as u32, BLACK);
            img.put_pixel(x as u32, y1 as u32, BLACK);
        }
        for y in y0..=y1 {
            img.put_pixel(x0 as u32, y as u32, BLACK);
            img.put_pixel(x1 as u32, y as u32, BLACK);
        }
        self.draw_axis_text(&mut img);
        img
    }

    /// Title centred above the plot area, x label below it, y label rotated
    /// along the left margin.
    fn draw_axis_text(&self, img: &mut RgbImage) {
        let (x0, y0, x1, y1) = self.plot_area();
        let line = GLYPH * TEXT_SCALE;
        let centre_x = (x0 + x1) / 2;

        let title = &self.labels.title;
        draw_text(img, title, centre_x - text_extent(title) / 2, (y0 - line) / 2, BLACK);

        let x_label = &self.labels.x_label;
        let below = self.height as i64 - y1 - 1;
        draw_text(img, x_label, centre_x - text_extent(x_label) / 2, y1 + 1 + (below - line) / 2, BLACK);

        let y_label = &self.labels.y_label;
        let bottom = (y0 + y1) / 2 + text_extent(y_label) / 2;
        draw_text_upward(img, y_label, (x0 - line) / 2, bottom, BLACK);
    }

    /// Panel tag in a bordered grey box inside the top-right corner.
    fn draw_panel(&self, img: &mut RgbImage) {
        let Some(panel) = self.labels.panel.as_deref() else {
            return;
        };
        let (_, y0, x1, _) = self.plot_area();
        let pad = 4;
        let (w, h) = (text_extent(panel) + 2 * pad, GLYPH * TEXT_SCALE + 2 * pad);
        let (bx0, by0) = (x1 - 6 - w, y0 + 6);
        for y in by0..by0 + h {
            for x in bx0..bx0 + w {
                let edge = x == bx0 || x == bx0 + w - 1 || y == by0 || y == by0 + h - 1;
                put_clipped(img, x, y, if edge { BLACK } else { DARK_GRAY });
            }
        }
        draw_text(img, panel, bx0 + pad, by0 + pad, BLACK);
    }

    /// Bresenham segment, clipped to the plot area.
    fn draw_line(&self, img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
        let (x0, y0, x1, y1) = self.plot_area();
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            if (x0..=x1).contains(&x) && (y0..=y1).contains(&y) {
                img.put_pixel(x as u32, y as u32, color);
            }
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

    /// Series joined by straight segments, in index order. `NaN`s break the line.
    pub fn render(&self, values: &[f64]) -> RgbImage {
        let mut img = self.canvas();
        let n = values.len();
        let mut prev: Option<(i64, i64)> = None;
        for (i, &v) in values.iter().enumerate() {
            if v.is_nan() {
                prev = None;
                continue;
            }
            let p = (self.x_pixel(i, n), self.y_pixel(v));
            self.draw_line(&mut img, prev.unwrap_or(p), p, self.color);
            prev = Some(p);
        }
        self.draw_panel(&mut img);
        img
    }

    /// One 3x3 dot per value, coloured by its label.
    pub fn render_scatter(&self, values: &[f64], labels: &[usize]) -> RgbImage {
        let mut img = self.canvas();
        let n = values.len();
        for (i, (&v, &label)) in values.iter().zip(labels).enumerate() {
            if v.is_nan() {
                continue;
            }
            let color = CLUSTER_PALETTE[label % CLUSTER_PALETTE.len()];
            let (cx, cy) = (self.x_pixel(i, n), self.y_pixel(v));
            for dy in -1..=1 {
                self.draw_line(&mut img, (cx - 1, cy + dy), (cx + 1, cy + dy), color);
            }
        }
        self.draw_panel(&mut img);
        img
    }

    pub fn save(&self, values: &[f64], path: &Path) -> Result<()> {
        save_png(&self.render(values), path)
    }
}

fn text_extent(text: &str) -> i64 {
    text.chars().count() as i64 * GLYPH * TEXT_SCALE
}

fn put_clipped(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < img.width() as i64 && y < img.height() as i64 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Set glyph cells of `ch` through `plot(column, row)`, unscaled.
fn for_each_glyph_cell(ch: char, mut plot: impl FnMut(i64, i64)) {
    let Some(glyph) = BASIC_FONTS.get(ch) else {
        return;
    };
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..GLYPH {
            if (bits >> col) & 1 == 1 {
                plot(col, row as i64);
            }
        }
    }
}

fn fill_cell(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    for dy in 0..TEXT_SCALE {
        for dx in 0..TEXT_SCALE {
            put_clipped(img, x + dx, y + dy, color);
        }
    }
}

/// Left-to-right text with its top-left corner at (`x`, `y`).
fn draw_text(img: &mut RgbImage, text: &str, x: i64, y: i64, color: Rgb<u8>) {
    for (i, ch) in text.chars().enumerate() {
        let left = x + i as i64 * GLYPH * TEXT_SCALE;
        for_each_glyph_cell(ch, |col, row| {
            fill_cell(img, left + col * TEXT_SCALE, y + row * TEXT_SCALE, color)
        });
    }
}

/// Text rotated a quarter turn counter-clockwise, read bottom to top from
/// `bottom`, with the glyph tops facing column `x`.
fn draw_text_upward(img: &mut RgbImage, text: &str, x: i64, bottom: i64, color: Rgb<u8>) {
    for (i, ch) in text.chars().enumerate() {
        let start = bottom - i as i64 * GLYPH * TEXT_SCALE;
        for_each_glyph_cell(ch, |col, row| {
            fill_cell(img, x + row * TEXT_SCALE, start - (col + 1) * TEXT_SCALE, color)
        });
    }
}

pub fn save_png(img: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    img.save(path)?;
    debug!("Saved {}x{} chart to {:?}", img.width(), img.height(), path);
    Ok(())
}
