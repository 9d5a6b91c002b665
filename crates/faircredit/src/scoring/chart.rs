//! Waterfall renderings of an [`Attribution`](super::explain::Attribution).
//!
//! Red bars push the applicant toward approval, blue bars away from it.

use std::fmt::Write as _;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters_svg::SVGBackend;

use super::explain::Waterfall;

const POSITIVE_COLOR: RGBColor = RGBColor(0xff, 0x00, 0x51);
const NEGATIVE_COLOR: RGBColor = RGBColor(0x00, 0x8b, 0xfb);
const GUIDE_COLOR: RGBColor = RGBColor(0xbb, 0xbb, 0xbb);

const WIDTH: u32 = 760;
const ROW_HEIGHT: u32 = 32;
const LABEL_AREA: u32 = 240;
const FONT: &str = "sans-serif";
const TEXT_BAR_WIDTH: usize = 24;

#[derive(Debug, thiserror::Error)]
#[error("failed to render waterfall chart: {0}")]
pub struct ChartError(String);

/// Self-contained SVG document for embedding in HTML.
pub fn render_svg(waterfall: &Waterfall) -> Result<String, ChartError> {
    let rows = waterfall.bars.len().max(1) as u32;
    let height = rows * ROW_HEIGHT + 110;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, height)).into_drawing_area();
        draw_waterfall(&root, waterfall).map_err(|err| ChartError(err.to_string()))?;
    }
    Ok(svg)
}

fn draw_waterfall(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    waterfall: &Waterfall,
) -> Result<(), DrawingAreaErrorKind<std::io::Error>> {
    root.fill(&WHITE)?;

    let rows = waterfall.bars.len().max(1) as f64;
    let (low, high) = value_range(waterfall);

    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("f(x) = {:.3}", waterfall.output_value),
            (FONT, 16).into_font(),
        )
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(LABEL_AREA)
        .build_cartesian_2d(low..high, 0f64..rows)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_label_formatter(&|_| String::new())
        .x_desc(format!("E[f(x)] = {:.3}", waterfall.base_value))
        .draw()?;

    for x in [waterfall.base_value, waterfall.output_value] {
        chart.draw_series(LineSeries::new(vec![(x, 0.0), (x, rows)], &GUIDE_COLOR))?;
    }

    for (row, bar) in waterfall.bars.iter().enumerate() {
        let y = rows - 1.0 - row as f64;
        let color = if bar.contribution >= 0.0 {
            POSITIVE_COLOR
        } else {
            NEGATIVE_COLOR
        };
        let left = bar.start.min(bar.end);
        let right = bar.start.max(bar.end);

        chart.draw_series(std::iter::once(Rectangle::new(
            [(left, y + 0.15), (right, y + 0.85)],
            color.filled(),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{:+.3}", bar.contribution),
            (right, y + 0.5),
            (FONT, 13)
                .into_font()
                .color(&color)
                .pos(Pos::new(HPos::Left, VPos::Center)),
        )))?;

        let (x, y) = chart.backend_coord(&(low, y + 0.5));
        root.draw(&Text::new(
            bar.label.clone(),
            (x - 8, y),
            (FONT, 13)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Right, VPos::Center)),
        ))?;
    }

    root.present()?;
    Ok(())
}

/// Axis span covering every bar end plus the base and output markers. The
/// right side gets extra room for the value labels.
fn value_range(waterfall: &Waterfall) -> (f64, f64) {
    let (min, max) = waterfall
        .bars
        .iter()
        .flat_map(|bar| [bar.start, bar.end])
        .chain([waterfall.base_value, waterfall.output_value])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| {
            (lo.min(value), hi.max(value))
        });

    let span = max - min;
    if span > 0.0 {
        (min - span * 0.05, max + span * 0.2)
    } else {
        (min - 0.5, max + 0.5)
    }
}

/// Plain-text waterfall for terminals.
pub fn render_text(waterfall: &Waterfall) -> String {
    let largest = waterfall
        .bars
        .iter()
        .map(|bar| bar.contribution.abs())
        .fold(0.0_f64, f64::max);

    let mut out = String::new();
    let _ = writeln!(out, "f(x) = {:.3}", waterfall.output_value);
    for bar in &waterfall.bars {
        let length = if largest > 0.0 {
            ((bar.contribution.abs() / largest) * TEXT_BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let glyph = if bar.contribution >= 0.0 { '+' } else { '-' };
        let _ = writeln!(
            out,
            "  {:+8.3}  {:<width$}  {}",
            bar.contribution,
            glyph.to_string().repeat(length.max(1)),
            bar.label,
            width = TEXT_BAR_WIDTH
        );
    }
    let _ = writeln!(out, "E[f(x)] = {:.3}", waterfall.base_value);
    out
}

/// Escapes text for inclusion in HTML or SVG markup.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
