#![cfg(feature = "web")]
//! Static PNG export of a chart specification.
//!
//! Cartesian traces are drawn on a shared x axis, with a secondary y axis
//! when any trace sits on `y2`. Map traces are drawn as a plain
//! longitude/latitude scatter since no tile layer is available offline.

use plotters::prelude::*;
use serde_json::Value;
use std::error::Error;
use std::ops::Range;
use std::path::Path;

use crate::render::{Axis, ChartSpec, DownloadOptions, Trace};

/// Default trace colours, in plotting order
const PALETTE: [RGBColor; 10] = [
    RGBColor(0x63, 0x6e, 0xfa),
    RGBColor(0xef, 0x55, 0x3b),
    RGBColor(0x00, 0xcc, 0x96),
    RGBColor(0xab, 0x63, 0xfa),
    RGBColor(0xff, 0xa1, 0x5a),
    RGBColor(0x19, 0xd3, 0xf3),
    RGBColor(0xff, 0x66, 0x92),
    RGBColor(0xb6, 0xe8, 0x80),
    RGBColor(0xff, 0x97, 0xff),
    RGBColor(0xfe, 0xcb, 0x52),
];

/// A trace reduced to drawable points
struct Series {
    name: String,
    points: Vec<(f64, f64)>,
    lines: bool,
    secondary: bool,
    color: RGBColor,
}

/// Parses `white`, `black`, `#rrggbb` and `rgb(r,g,b)` colour strings.
fn parse_color(text: &str) -> Option<RGBColor> {
    let text = text.trim();
    match text {
        "white" => return Some(WHITE),
        "black" => return Some(BLACK),
        "blue" => return Some(BLUE),
        "red" => return Some(RED),
        _ => {}
    }

    if let Some(hex) = text.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some(RGBColor(channel(0)?, channel(2)?, channel(4)?));
    }

    let inner = text.strip_prefix("rgb(")?.strip_suffix(')')?;
    let channels = inner
        .split(',')
        .map(|c| c.trim().parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;
    match channels[..] {
        [r, g, b] => Some(RGBColor(r, g, b)),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str()?.trim().parse().ok())
        .filter(|v| v.is_finite())
}

/// Pairs numeric y values with their x; non-numeric x falls back to the row index.
fn points(xs: &[Value], ys: &[Value]) -> Vec<(f64, f64)> {
    ys.iter()
        .enumerate()
        .filter_map(|(i, y)| {
            let x = xs.get(i).and_then(as_number).unwrap_or(i as f64);
            Some((x, as_number(y)?))
        })
        .collect()
}

/// Data extent padded by 5%, with any fixed bound from the axis taking precedence.
fn span(values: impl Iterator<Item = f64>, fixed: Option<[Option<f64>; 2]>) -> Range<f64> {
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo.is_finite() && hi.is_finite() {
        let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
        lo -= pad;
        hi += pad;
    } else {
        lo = 0.0;
        hi = 1.0;
    }

    if let Some([min, max]) = fixed {
        lo = min.unwrap_or(lo);
        hi = max.unwrap_or(hi);
    }
    if hi <= lo {
        hi = lo + 1.0;
    }
    lo..hi
}

fn trace_color(trace: &Trace, index: usize) -> RGBColor {
    trace
        .extra
        .get("marker")
        .and_then(|marker| marker.get("color"))
        .and_then(Value::as_str)
        .and_then(parse_color)
        .unwrap_or(PALETTE[index % PALETTE.len()])
}

fn collect_series(chart: &ChartSpec) -> Vec<Series> {
    chart
        .data
        .iter()
        .enumerate()
        .map(|(i, trace)| {
            let points = if trace.is_map() {
                points(&trace.lon, &trace.lat)
            } else {
                points(&trace.x, &trace.y)
            };
            Series {
                name: trace.name.clone().unwrap_or_else(|| format!("trace {}", i)),
                points,
                lines: trace.draws_lines(),
                secondary: trace.on_second_axis(),
                color: trace_color(trace, i),
            }
        })
        .collect()
}

fn axis_title(axis: Option<&Axis>, fallback: &str) -> String {
    axis.and_then(Axis::title_text)
        .unwrap_or(fallback)
        .to_string()
}

/// Draws `chart` into a PNG file at `path`.
///
/// # Arguments
/// * `chart` - The specification returned by the render endpoint
/// * `options` - Image width and height
/// * `path` - Where the PNG is written
///
/// # Returns
/// * `Result<(), Box<dyn Error>>` - Drawing or file errors
pub fn save_png(
    chart: &ChartSpec,
    options: &DownloadOptions,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let layout = &chart.layout;
    let background = layout.background().and_then(parse_color).unwrap_or(WHITE);
    let foreground = layout
        .template
        .as_ref()
        .and_then(|t| t.pointer("/layout/font/color"))
        .and_then(Value::as_str)
        .and_then(parse_color)
        .unwrap_or(BLACK);

    let series = collect_series(chart);
    let dual = series.iter().any(|s| s.secondary);
    let (x_desc, y_desc) = if chart.is_map() {
        ("Longitude".to_string(), "Latitude".to_string())
    } else {
        (
            axis_title(layout.xaxis.as_ref(), "x"),
            axis_title(layout.yaxis.as_ref(), "y"),
        )
    };

    let x_range = span(
        series.iter().flat_map(|s| s.points.iter().map(|p| p.0)),
        layout.xaxis.as_ref().and_then(|a| a.range),
    );
    let y_range = span(
        series
            .iter()
            .filter(|s| !s.secondary)
            .flat_map(|s| s.points.iter().map(|p| p.1)),
        layout.yaxis.as_ref().and_then(|a| a.range),
    );
    let y2_range = span(
        series
            .iter()
            .filter(|s| s.secondary)
            .flat_map(|s| s.points.iter().map(|p| p.1)),
        layout.yaxis2.as_ref().and_then(|a| a.range),
    );

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&background)?;

    let mut plot = ChartBuilder::on(&root)
        .caption(
            layout.title_text().unwrap_or_default(),
            ("sans-serif", 30).into_font().color(&foreground),
        )
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .right_y_label_area_size(if dual { 40 } else { 0 })
        .build_cartesian_2d(x_range.clone(), y_range)?
        .set_secondary_coord(x_range, y2_range);

    plot.configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_style(foreground)
        .label_style(("sans-serif", 12).into_font().color(&foreground))
        .axis_desc_style(("sans-serif", 14).into_font().color(&foreground))
        .draw()?;

    if dual {
        plot.configure_secondary_axes()
            .y_desc(axis_title(layout.yaxis2.as_ref(), "y2"))
            .axis_style(foreground)
            .label_style(("sans-serif", 12).into_font().color(&foreground))
            .axis_desc_style(("sans-serif", 14).into_font().color(&foreground))
            .draw()?;
    }

    for s in &series {
        let color = s.color;
        let markers = s.points.iter().map(|&p| Circle::new(p, 3, color.filled()));
        let legend = move |(x, y): (i32, i32)| PathElement::new(vec![(x, y), (x + 20, y)], color);

        if s.secondary {
            if s.lines {
                plot.draw_secondary_series(LineSeries::new(s.points.clone(), color.stroke_width(2)))?;
            }
            plot.draw_secondary_series(markers)?
                .label(s.name.clone())
                .legend(legend);
        } else {
            if s.lines {
                plot.draw_series(LineSeries::new(s.points.clone(), color.stroke_width(2)))?;
            }
            plot.draw_series(markers)?
                .label(s.name.clone())
                .legend(legend);
        }
    }

    if !series.is_empty() {
        plot.configure_series_labels()
            .background_style(background.mix(0.8))
            .border_style(foreground)
            .label_font(("sans-serif", 12).into_font().color(&foreground))
            .draw()?;
    }

    root.present()?;
    log::info!("chart written to {}", path.display());
    Ok(())
}
