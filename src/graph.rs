#![cfg(feature = "web")]
use crate::record::{Recommendation, ScoreKind};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::PI;
use std::io::Cursor;

/// Upper bound on rank ticks along the bar chart's x-axis
const MAX_X_LABELS: usize = 20;

/// Failures while rendering a chart
#[derive(thiserror::Error, Debug)]
pub enum ChartError {
    #[error("nothing to plot")]
    NoData,

    #[error("drawing failed: {0}")]
    Drawing(String),

    #[error("pixel buffer does not match {0}x{1}")]
    Buffer(u32, u32),

    #[error(transparent)]
    Encoding(#[from] image::ImageError),
}

fn drawing<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Drawing(e.to_string())
}

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis (unused by the radar chart)
    pub x_label: String,

    /// Label for the Y-axis (unused by the radar chart)
    pub y_label: String,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            width: 640,
            height: 420,
        }
    }
}

impl GraphOptions {
    pub fn final_scores() -> Self {
        Self {
            title: "Final score by recommendation rank".to_string(),
            x_label: "Recommendation rank".to_string(),
            y_label: "Final score".to_string(),
            ..Self::default()
        }
    }

    pub fn score_profile() -> Self {
        Self {
            title: "Score breakdown".to_string(),
            ..Self::default()
        }
    }
}

/// (rank, final score) pairs for the bar chart, skipping missing scores
pub fn final_score_bars(records: &[&Recommendation]) -> Vec<(u32, f64)> {
    records
        .iter()
        .filter_map(|rec| rec.final_score.map(|score| (rec.rank, score)))
        .collect()
}

/// Detail scores for the radar chart
///
/// Each score takes its first present value in the given (rank) order. Scores
/// that are missing on every record are left out.
pub fn score_profile(records: &[&Recommendation]) -> Vec<(ScoreKind, f64)> {
    ScoreKind::ALL
        .iter()
        .filter_map(|&kind| {
            records
                .iter()
                .find_map(|rec| rec.score(kind))
                .map(|value| (kind, value))
        })
        .collect()
}

/// Pixel positions of a radar polygon
///
/// Axis `i` of `n` points at angle `2πi/n`, clockwise from straight up, and
/// each value is its distance from `center` as a fraction of `radius`.
pub fn radar_vertices(values: &[f64], center: (i32, i32), radius: f64) -> Vec<(i32, i32)> {
    let n = values.len() as f64;
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let theta = 2.0 * PI * i as f64 / n;
            let r = radius * value;
            (
                center.0 + (r * theta.sin()).round() as i32,
                center.1 - (r * theta.cos()).round() as i32,
            )
        })
        .collect()
}

/// Interpolate along a dark-to-yellow ramp by score
fn score_color(score: f64) -> RGBColor {
    let t = score.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(lerp(68, 253), lerp(1, 231), lerp(84, 37))
}

fn closed(mut points: Vec<(i32, i32)>) -> Vec<(i32, i32)> {
    if let Some(&first) = points.first() {
        points.push(first);
    }
    points
}

/// Render the final score bar chart as PNG
///
/// # Arguments
/// * `bars` - (rank, final score) pairs, see [`final_score_bars`]
/// * `options` - Title, axis labels and image size
///
/// # Returns
/// * `Result<Vec<u8>, ChartError>` - PNG bytes, or `ChartError::NoData` when `bars` is empty
pub fn render_final_scores(bars: &[(u32, f64)], options: &GraphOptions) -> Result<Vec<u8>, ChartError> {
    if bars.is_empty() {
        return Err(ChartError::NoData);
    }

    let mut buffer = vec![0u8; options.width as usize * options.height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;

        let max_rank = bars.iter().map(|&(rank, _)| rank).max().unwrap_or(1);

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 22).into_font())
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(45)
            .build_cartesian_2d(0.5f64..max_rank as f64 + 0.5, 0f64..1f64)
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels((max_rank as usize).min(MAX_X_LABELS))
            .x_label_formatter(&|x| format!("{:.0}", x))
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()
            .map_err(drawing)?;

        chart
            .draw_series(bars.iter().map(|&(rank, score)| {
                let x = rank as f64;
                Rectangle::new(
                    [(x - 0.35, 0.0), (x + 0.35, score.clamp(0.0, 1.0))],
                    score_color(score).filled(),
                )
            }))
            .map_err(drawing)?;

        root.present().map_err(drawing)?;
    }

    encode_png(buffer, options.width, options.height)
}

/// Render the detail score radar chart as PNG
///
/// The radial axis runs from 0 at the centre to 1 at the outer ring, with
/// guide rings every 0.25.
pub fn render_score_profile(
    profile: &[(ScoreKind, f64)],
    options: &GraphOptions,
) -> Result<Vec<u8>, ChartError> {
    if profile.is_empty() {
        return Err(ChartError::NoData);
    }

    let mut buffer = vec![0u8; options.width as usize * options.height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;
        let plot = root
            .titled(&options.title, ("sans-serif", 22))
            .map_err(drawing)?;

        let (w, h) = plot.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = f64::from(w.min(h)) / 2.0 * 0.72;
        let axes = profile.len();

        for ring in [0.25, 0.5, 0.75, 1.0] {
            let points = closed(radar_vertices(&vec![ring; axes], center, radius));
            plot.draw(&PathElement::new(points, BLACK.mix(0.2)))
                .map_err(drawing)?;
        }

        let label_style = TextStyle::from(("sans-serif", 14).into_font())
            .pos(Pos::new(HPos::Center, VPos::Center));
        let tips = radar_vertices(&vec![1.0; axes], center, radius);
        let label_points = radar_vertices(&vec![1.18; axes], center, radius);
        for ((&(kind, _), &tip), &at) in profile.iter().zip(&tips).zip(&label_points) {
            plot.draw(&PathElement::new(vec![center, tip], BLACK.mix(0.3)))
                .map_err(drawing)?;
            plot.draw(&Text::new(kind.label(), at, label_style.clone()))
                .map_err(drawing)?;
        }

        let values: Vec<f64> = profile.iter().map(|&(_, v)| v.clamp(0.0, 1.0)).collect();
        let shape = radar_vertices(&values, center, radius);
        plot.draw(&Polygon::new(shape.clone(), BLUE.mix(0.3)))
            .map_err(drawing)?;
        plot.draw(&PathElement::new(closed(shape), BLUE.stroke_width(2)))
            .map_err(drawing)?;

        root.present().map_err(drawing)?;
    }

    encode_png(buffer, options.width, options.height)
}

// The bitmap backend draws into a packed RGB buffer
fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, ChartError> {
    let image = RgbImage::from_raw(width, height, buffer).ok_or(ChartError::Buffer(width, height))?;
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;
    Ok(png)
}
