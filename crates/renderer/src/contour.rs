//! Contour line (isoline) generation using marching squares algorithm.
//!
//! Contours are traced over the converted elevation matrix and written as a
//! GeoJSON FeatureCollection of LineStrings next to the raster output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use surface_common::{ElevationMatrix, RenderOptions};
use tracing::{debug, info};

use crate::{RasterError, RasterResult};

/// A point in grid coordinates (column, row)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A line segment between two points
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// A complete contour line (polyline)
#[derive(Debug, Clone)]
pub struct Contour {
    pub level: f32,
    pub points: Vec<Point>,
    pub closed: bool,
}

/// Upper bound on the number of levels traced in one run.
pub const MAX_CONTOUR_LEVELS: usize = 10_000;

/// Generate contour levels automatically based on data range and interval.
///
/// Levels are the multiples of `interval` inside `[min_value, max_value]`.
/// More than [`MAX_CONTOUR_LEVELS`] of them is an error.
pub fn generate_contour_levels(
    min_value: f32,
    max_value: f32,
    interval: f32,
) -> RasterResult<Vec<f32>> {
    if interval <= 0.0 || max_value <= min_value {
        return Ok(vec![]);
    }

    let interval = interval as f64;
    let first = (min_value as f64 / interval).ceil();
    let last = (max_value as f64 / interval).floor();
    if last < first {
        return Ok(vec![]);
    }

    let count = last - first + 1.0;
    if !count.is_finite() || count > MAX_CONTOUR_LEVELS as f64 {
        return Err(RasterError::Contour(format!(
            "interval {} over {} to {} gives more than {} levels",
            interval, min_value, max_value, MAX_CONTOUR_LEVELS
        )));
    }

    Ok((0..count as usize)
        .map(|i| ((first + i as f64) * interval) as f32)
        .collect())
}

/// Marching squares algorithm to generate contour lines
///
/// Corner and edge names follow increasing row index. Row 0 of the elevation
/// matrix is the southern edge, so `top`, `tl` and `tr` lie on the south side
/// of each cell and `bottom`, `bl` and `br` on its north side.
///
/// # Arguments
/// * `data` - Grid data in row-major order, NaN for cells without data
/// * `width` - Grid width
/// * `height` - Grid height
/// * `level` - Contour level to extract
///
/// # Returns
/// Vector of line segments representing the contour
pub fn march_squares(data: &[f32], width: usize, height: usize, level: f32) -> Vec<Segment> {
    if width < 2 || height < 2 || data.len() != width * height {
        return vec![];
    }

    let mut segments = Vec::new();

    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let tl = data[y * width + x];
            let tr = data[y * width + x + 1];
            let bl = data[(y + 1) * width + x];
            let br = data[(y + 1) * width + x + 1];

            // Skip cells touching missing data
            if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                continue;
            }

            // Calculate cell index (0-15) based on which corners are above the threshold
            let mut cell_index = 0;
            if tl >= level { cell_index |= 1; }
            if tr >= level { cell_index |= 2; }
            if br >= level { cell_index |= 4; }
            if bl >= level { cell_index |= 8; }

            segments.extend(get_cell_segments(
                cell_index,
                x as f32, y as f32,
                tl, tr, br, bl,
                level,
            ));
        }
    }

    segments
}

/// Get line segments for a marching squares cell
///
/// Uses linear interpolation to find where the contour crosses cell edges
#[allow(clippy::too_many_arguments)]
fn get_cell_segments(
    cell_index: u8,
    x: f32,
    y: f32,
    tl: f32,
    tr: f32,
    br: f32,
    bl: f32,
    level: f32,
) -> Vec<Segment> {
    let top = interpolate_edge(x, y, x + 1.0, y, tl, tr, level);
    let right = interpolate_edge(x + 1.0, y, x + 1.0, y + 1.0, tr, br, level);
    let bottom = interpolate_edge(x, y + 1.0, x + 1.0, y + 1.0, bl, br, level);
    let left = interpolate_edge(x, y, x, y + 1.0, tl, bl, level);

    match cell_index {
        0 | 15 => vec![],
        1 | 14 => vec![Segment { start: left, end: top }],
        2 | 13 => vec![Segment { start: top, end: right }],
        3 | 12 => vec![Segment { start: left, end: right }],
        4 | 11 => vec![Segment { start: right, end: bottom }],
        5 => vec![ // Saddle
            Segment { start: left, end: top },
            Segment { start: right, end: bottom },
        ],
        6 | 9 => vec![Segment { start: top, end: bottom }],
        7 | 8 => vec![Segment { start: left, end: bottom }],
        10 => vec![ // Saddle
            Segment { start: top, end: right },
            Segment { start: left, end: bottom },
        ],
        _ => vec![],
    }
}

/// Linearly interpolate between two edge points based on data values
fn interpolate_edge(
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    val1: f32,
    val2: f32,
    level: f32,
) -> Point {
    if (val2 - val1).abs() < 1e-6 {
        return Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }

    let t = ((level - val1) / (val2 - val1)).clamp(0.0, 1.0);

    Point::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

fn distance(a: Point, b: Point) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Connect line segments into continuous polylines
///
/// Takes a collection of unordered segments and tries to connect them
/// into continuous contour lines.
pub fn connect_segments(segments: &[Segment], level: f32) -> Vec<Contour> {
    let mut contours = Vec::new();
    let mut used = vec![false; segments.len()];
    let epsilon = 0.001;

    for start_idx in 0..segments.len() {
        if used[start_idx] {
            continue;
        }

        let mut points = vec![segments[start_idx].start, segments[start_idx].end];
        used[start_idx] = true;

        let mut current_end = segments[start_idx].end;
        let mut changed = true;
        while changed {
            changed = false;

            for (i, seg) in segments.iter().enumerate() {
                if used[i] {
                    continue;
                }

                let next = if distance(seg.start, current_end) < epsilon {
                    seg.end
                } else if distance(seg.end, current_end) < epsilon {
                    seg.start
                } else {
                    continue;
                };

                points.push(next);
                current_end = next;
                used[i] = true;
                changed = true;
                break;
            }
        }

        let closed = distance(points[0], current_end) < epsilon;
        contours.push(Contour {
            level,
            points,
            closed,
        });
    }

    contours
}

/// Trace every level into polylines. Returns the contours and the raw segment count.
pub fn trace_contours(data: &[f32], width: usize, height: usize, levels: &[f32]) -> (Vec<Contour>, usize) {
    let mut contours = Vec::new();
    let mut segment_count = 0;

    for &level in levels {
        let segments = march_squares(data, width, height, level);
        segment_count += segments.len();
        contours.extend(connect_segments(&segments, level));
    }

    (contours, segment_count)
}

/// Path of the contour layer for an output basename.
pub fn contour_path(output_basename: &Path) -> PathBuf {
    let stem = output_basename.with_extension("");
    let mut name = stem.into_os_string();
    name.push("_contours.geojson");
    PathBuf::from(name)
}

/// Generate the contour layer for a rendered window.
///
/// `origin_x`/`origin_y` are the west and south edges of the window; contour
/// vertices sit at cell centers. Returns the number of marching-squares
/// segments traced.
#[allow(clippy::too_many_arguments)]
pub fn generate_contours(
    width: usize,
    height: usize,
    origin_x: f64,
    origin_y: f64,
    min_z: f32,
    max_z: f32,
    matrix: &ElevationMatrix,
    output_basename: &Path,
    options: &RenderOptions,
    dx: f64,
    dy: f64,
) -> RasterResult<usize> {
    if matrix.width() != width || matrix.height() != height {
        return Err(RasterError::Contour(format!(
            "matrix is {} x {}, expected {} x {}",
            matrix.width(),
            matrix.height(),
            width,
            height
        )));
    }

    let levels = generate_contour_levels(min_z, max_z, options.contour_interval)?;

    let data: Vec<f32> = matrix
        .as_slice()
        .iter()
        .map(|&v| if matrix.is_null(v) { f32::NAN } else { v })
        .collect();

    let (contours, segment_count) = trace_contours(&data, width, height, &levels);

    debug!(
        levels = levels.len(),
        first_level = levels.first().copied().unwrap_or(0.0),
        last_level = levels.last().copied().unwrap_or(0.0),
        contours = contours.len(),
        segments = segment_count,
        "Traced contours"
    );

    let to_geo = |p: &Point| -> Value {
        json!([
            origin_x + (p.x as f64 + 0.5) * dx,
            origin_y + (p.y as f64 + 0.5) * dy,
        ])
    };

    let features: Vec<Value> = contours
        .iter()
        .map(|c| {
            json!({
                "type": "Feature",
                "properties": { "level": c.level, "closed": c.closed },
                "geometry": {
                    "type": "LineString",
                    "coordinates": c.points.iter().map(to_geo).collect::<Vec<_>>(),
                },
            })
        })
        .collect();

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });

    let path = contour_path(output_basename);
    let file = File::create(&path).map_err(|source| RasterError::Create {
        path: path.display().to_string(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;

    info!(
        path = %path.display(),
        interval = options.contour_interval,
        segments = segment_count,
        "Wrote contour layer"
    );

    Ok(segment_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_contour_levels() {
        let levels = generate_contour_levels(0.0, 20.0, 5.0).unwrap();
        assert_eq!(levels, vec![0.0, 5.0, 10.0, 15.0, 20.0]);

        let levels = generate_contour_levels(2.0, 18.0, 5.0).unwrap();
        assert_eq!(levels, vec![5.0, 10.0, 15.0]);

        let levels = generate_contour_levels(-12.0, -1.0, 5.0).unwrap();
        assert_eq!(levels, vec![-10.0, -5.0]);

        let levels = generate_contour_levels(1.0, 4.0, 5.0).unwrap();
        assert!(levels.is_empty());
    }

    #[test]
    fn test_interpolate_edge() {
        let p = interpolate_edge(0.0, 0.0, 1.0, 0.0, 0.0, 10.0, 5.0);
        assert!((p.x - 0.5).abs() < 0.01);
        assert!((p.y - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_march_squares_flat() {
        let data = vec![5.0; 9];
        let segments = march_squares(&data, 3, 3, 5.0);
        assert_eq!(segments.len(), 0);
    }

    #[test]
    fn test_march_squares_skips_missing() {
        let data = vec![
            0.0, 10.0, 0.0,
            0.0, f32::NAN, 0.0,
            0.0, 10.0, 0.0,
        ];
        assert!(march_squares(&data, 3, 3, 5.0).is_empty());
    }

    #[test]
    fn test_connect_closed_ring() {
        let data = vec![
            0.0, 0.0, 0.0,
            0.0, 10.0, 0.0,
            0.0, 0.0, 0.0,
        ];
        let segments = march_squares(&data, 3, 3, 5.0);
        assert_eq!(segments.len(), 4);

        let contours = connect_segments(&segments, 5.0);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].closed);
        assert_eq!(contours[0].points.len(), 5);
    }

    #[test]
    fn test_contour_path() {
        assert_eq!(
            contour_path(Path::new("out/survey.tif")),
            PathBuf::from("out/survey_contours.geojson")
        );
        assert_eq!(
            contour_path(Path::new("survey")),
            PathBuf::from("survey_contours.geojson")
        );
    }
}
