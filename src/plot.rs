//! Plot requests and PNG rendering
//!
//! Turns raw query parameters into a validated `PlotRequest`, samples the
//! expressions over a numeric domain and rasterizes the curve to
//! in-memory PNG bytes:
//! - function:   y = f(x) over [xmin, xmax]
//! - parametric: (x(t), y(t)) with t over [xmin, xmax]
//! - polar:      r(t) over [0, 2pi], projected to Cartesian points
//!
//! Failures never produce partial output; callers get a `PlotError` and
//! decide what to do with the previous image.

use plotters::prelude::*;
use serde::Deserialize;
use std::f64::consts::PI;
use thiserror::Error;

use crate::expr::{Expr, ExprError};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// 6x4 inch figure at 120 dpi
pub const WIDTH: u32 = 720;
pub const HEIGHT: u32 = 480;

pub const DEFAULT_XMIN: f64 = -10.0;
pub const DEFAULT_XMAX: f64 = 10.0;
pub const DEFAULT_POINTS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlotError {
    #[error("invalid mode")]
    InvalidMode,
    #[error("invalid value '{value}' for {field}")]
    BadNumber { field: &'static str, value: String },
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error("failed to render plot: {0}")]
    Render(String),
}

/// Raw query parameters for the plot endpoint. Everything is optional;
/// defaulting and parsing happen in `PlotRequest::from_params`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PlotParams {
    pub mode: Option<String>,
    pub xmin: Option<String>,
    pub xmax: Option<String>,
    pub points: Option<String>,
    pub expr_x: Option<String>,
    pub expr_y: Option<String>,
    pub expr_r: Option<String>,
}

/// The three plotting modes with their expression strings
#[derive(Debug, Clone, PartialEq)]
pub enum PlotMode {
    Function { expr_x: String },
    Parametric { expr_x: String, expr_y: String },
    Polar { expr_r: String },
}

impl PlotMode {
    pub fn name(&self) -> &'static str {
        match self {
            PlotMode::Function { .. } => "function",
            PlotMode::Parametric { .. } => "parametric",
            PlotMode::Polar { .. } => "polar",
        }
    }
}

/// A validated plot request
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    pub mode: PlotMode,
    pub xmin: f64,
    pub xmax: f64,
    pub points: usize,
}

impl PlotRequest {
    /// Build a request from raw parameters.
    ///
    /// Absent or empty numeric fields take the defaults (-10, 10, 1000);
    /// present but unparsable ones are errors. A missing expression for
    /// the selected mode becomes the empty string and fails later in
    /// expression parsing. Any unrecognized or missing mode is
    /// `PlotError::InvalidMode`.
    pub fn from_params(params: &PlotParams) -> Result<Self, PlotError> {
        let xmin = parse_field("xmin", params.xmin.as_deref(), DEFAULT_XMIN)?;
        let xmax = parse_field("xmax", params.xmax.as_deref(), DEFAULT_XMAX)?;
        let points = parse_field("points", params.points.as_deref(), DEFAULT_POINTS)?;

        let mode = match params.mode.as_deref() {
            Some("function") => PlotMode::Function {
                expr_x: params.expr_x.clone().unwrap_or_default(),
            },
            Some("parametric") => PlotMode::Parametric {
                expr_x: params.expr_x.clone().unwrap_or_default(),
                expr_y: params.expr_y.clone().unwrap_or_default(),
            },
            Some("polar") => PlotMode::Polar {
                expr_r: params.expr_r.clone().unwrap_or_default(),
            },
            _ => return Err(PlotError::InvalidMode),
        };

        Ok(Self {
            mode,
            xmin,
            xmax,
            points,
        })
    }
}

fn parse_field<T: std::str::FromStr>(
    field: &'static str,
    raw: Option<&str>,
    default: T,
) -> Result<T, PlotError> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return Ok(default),
    };
    raw.parse().map_err(|_| PlotError::BadNumber {
        field,
        value: raw.to_string(),
    })
}

/// `n` evenly spaced values from `start` to `stop`, endpoints included.
/// `n = 0` is an empty grid and `n = 1` is just `start`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| start + (stop - start) * (i as f64 / last))
                .collect()
        }
    }
}

/// Sample the request's expressions into plottable `(x, y)` pairs.
pub fn build_points(req: &PlotRequest) -> Result<Vec<(f64, f64)>, PlotError> {
    match &req.mode {
        PlotMode::Function { expr_x } => {
            let f = Expr::parse(expr_x, "x")?;
            let xs = linspace(req.xmin, req.xmax, req.points);
            let ys = f.sample(&xs)?;
            Ok(xs.into_iter().zip(ys).collect())
        }
        PlotMode::Parametric { expr_x, expr_y } => {
            // The Cartesian bounds double as the parameter range for t.
            let fx = Expr::parse(expr_x, "t")?;
            let fy = Expr::parse(expr_y, "t")?;
            let ts = linspace(req.xmin, req.xmax, req.points);
            let xs = fx.sample(&ts)?;
            let ys = fy.sample(&ts)?;
            Ok(xs.into_iter().zip(ys).collect())
        }
        PlotMode::Polar { expr_r } => {
            // Always a full revolution; xmin/xmax play no part here.
            let fr = Expr::parse(expr_r, "t")?;
            let thetas = linspace(0.0, 2.0 * PI, req.points);
            let rs = fr.sample(&thetas)?;
            Ok(thetas
                .iter()
                .zip(rs)
                .map(|(&theta, r)| (r * theta.cos(), r * theta.sin()))
                .collect())
        }
    }
}

/// Sample and rasterize in one step.
pub fn render_request(req: &PlotRequest) -> Result<Vec<u8>, PlotError> {
    let points = build_points(req)?;
    render_png(&points)
}

/// Rasterize sampled points to PNG bytes: white background, grid, blue
/// line of width 2, axis ranges fitted to the finite data.
pub fn render_png(points: &[(f64, f64)]) -> Result<Vec<u8>, PlotError> {
    let mut raw = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut raw, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let x_range = padded_range(points.iter().map(|p| p.0));
        let y_range = padded_range(points.iter().map(|p| p.1));

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(x_range, y_range)
            .map_err(draw_err)?;

        chart.configure_mesh().draw().map_err(draw_err)?;

        // Non-finite samples break the curve instead of bridging it.
        for segment in finite_segments(points) {
            chart
                .draw_series(LineSeries::new(
                    segment.iter().copied(),
                    BLUE.stroke_width(2),
                ))
                .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
    }

    let mut png = Vec::new();
    let encoder = PngEncoder::new(&mut png);
    encoder
        .write_image(&raw, WIDTH, HEIGHT, ExtendedColorType::Rgb8)
        .map_err(|e| PlotError::Render(e.to_string()))?;
    Ok(png)
}

fn draw_err<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Render(e.to_string())
}

/// Min..max of the finite values, padded 5% so the curve does not touch
/// the frame. Falls back to -1..1 when there is nothing finite to fit.
fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        return -1.0..1.0;
    }
    let span = hi - lo;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        lo.abs().max(1.0) * 0.05
    };
    (lo - pad)..(hi + pad)
}

/// Split into maximal runs of finite points.
fn finite_segments(points: &[(f64, f64)]) -> Vec<&[(f64, f64)]> {
    let mut segments = Vec::new();
    let mut start = None;
    for (i, p) in points.iter().enumerate() {
        let finite = p.0.is_finite() && p.1.is_finite();
        match (finite, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                segments.push(&points[s..i]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        segments.push(&points[s..]);
    }
    segments
}
