//! Line chart rendering
//!
//! Each call draws into its own pixel buffer and encodes it as PNG; nothing
//! is shared between calls except the registered font.

use crate::data::MetricSeries;
use crate::error::{FinbotError, Result};
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// MIME type of rendered charts
pub const CHART_MIME: &str = "image/png";

const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// A rendered chart, ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
}

/// Draws a single line series per chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(1000, 600)
    }
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Render `series` as a line chart titled with `label`
    ///
    /// Months run along the x axis in series order. Gaps split the line.
    pub fn render(&self, series: &MetricSeries, label: &str) -> Result<ChartImage> {
        let months: Vec<String> = series.months().map(str::to_string).collect();
        let segments = segments(series);
        let (y_min, y_max) = value_range(series)
            .ok_or_else(|| FinbotError::Chart(format!("no values to plot for {label}")))?;
        ensure_font()?;

        let mut pixels = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (self.width, self.height))
                .into_drawing_area();
            draw(&root, &months, &segments, label, y_min..y_max)
                .map_err(|e| FinbotError::Chart(e.to_string()))?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&pixels, self.width, self.height, image::ColorType::Rgb8)
            .map_err(|e| FinbotError::Chart(format!("png encoding failed: {e}")))?;

        tracing::debug!(
            dataset = %series.dataset,
            metric = %series.metric,
            points = series.len(),
            bytes = png.len(),
            "rendered chart"
        );

        Ok(ChartImage {
            bytes: png,
            mime_type: CHART_MIME.to_string(),
            filename: chart_filename(&series.dataset, label),
        })
    }
}

/// Register the bundled font under the family every chart uses
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<std::result::Result<(), String>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| {
            register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).map_err(|_| "invalid font data".to_string())
        })
        .clone()
        .map_err(|e| FinbotError::Chart(format!("font: {e}")))
}

fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    months: &[String],
    segments: &[Vec<(usize, f64)>],
    label: &str,
    y_range: std::ops::Range<f64>,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(root)
        .caption(format!("{label} по месяцам"), (FONT_FAMILY, 26))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(0..months.len(), y_range)?;

    let month_label = |idx: &usize| months.get(*idx).cloned().unwrap_or_default();
    chart
        .configure_mesh()
        .x_labels(months.len() + 1)
        .x_label_formatter(&month_label)
        .x_desc("Месяц")
        .y_desc(label)
        .label_style((FONT_FAMILY, 14))
        .draw()?;

    for (i, segment) in segments.iter().enumerate() {
        let anno = chart.draw_series(
            LineSeries::new(segment.iter().copied(), BLUE.stroke_width(2)).point_size(4),
        )?;
        if i == 0 {
            anno.label(label)
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font((FONT_FAMILY, 14))
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()
}

/// Runs of consecutive present values
fn segments(series: &MetricSeries) -> Vec<Vec<(usize, f64)>> {
    let mut out: Vec<Vec<(usize, f64)>> = Vec::new();
    let mut current = Vec::new();
    for (idx, value) in series.values().enumerate() {
        match value {
            Some(v) => current.push((idx, v)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Y axis bounds with some headroom; `None` when nothing can be drawn
fn value_range(series: &MetricSeries) -> Option<(f64, f64)> {
    let (min, max) = series
        .values()
        .flatten()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })?;

    let pad = if (max - min).abs() < f64::EPSILON {
        min.abs().max(1.0) * 0.1
    } else {
        (max - min) * 0.05
    };
    Some((min - pad, max + pad))
}

fn chart_filename(dataset: &str, label: &str) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    };
    format!("{}_{}.png", clean(dataset), clean(label))
}
