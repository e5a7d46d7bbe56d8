//! Hillshade illumination from a 2x2 cell neighborhood.
//!
//! The surface normal is estimated from two adjacent rows and two adjacent
//! columns, then lit with Lambertian reflectance against a sun direction given
//! as an azimuth (clockwise from north) and an elevation above the horizon.

use serde::{Deserialize, Serialize};

/// Sun position and shading controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SunParams {
    /// Degrees clockwise from north
    pub azimuth: f64,
    /// Degrees above the horizon
    pub elevation: f64,
    /// Vertical exaggeration applied to slopes
    pub exaggeration: f64,
    /// Darkest shade ever returned, in [0, 1]
    pub min_shade: f32,
}

impl Default for SunParams {
    fn default() -> Self {
        Self {
            azimuth: 30.0,
            elevation: 30.0,
            exaggeration: 1.0,
            min_shade: 0.25,
        }
    }
}

impl SunParams {
    /// Unit vector pointing at the sun in (east, north, up) coordinates.
    pub fn direction(&self) -> [f64; 3] {
        let az = self.azimuth.to_radians();
        let el = self.elevation.to_radians();
        [az.sin() * el.cos(), az.cos() * el.cos(), el.sin()]
    }
}

/// Shade computer with the sun vector and cell geometry fixed for a run.
#[derive(Debug, Clone)]
pub struct Illuminator {
    sun: SunParams,
    sun_vector: [f64; 3],
    cell_x_m: f64,
    cell_y_m: f64,
    null_value: f32,
    relief_sign: f64,
}

impl Illuminator {
    pub fn new(sun: SunParams, cell_x_m: f64, cell_y_m: f64) -> Self {
        Self {
            sun,
            sun_vector: sun.direction(),
            cell_x_m,
            cell_y_m,
            null_value: f32::INFINITY,
            relief_sign: 1.0,
        }
    }

    /// Values at or above `null_value` suppress shading.
    pub fn with_null_value(mut self, null_value: f32) -> Self {
        self.null_value = null_value;
        self
    }

    /// -1 when stored values grow downward (depths).
    pub fn with_relief_sign(mut self, relief_sign: f64) -> Self {
        self.relief_sign = relief_sign;
        self
    }

    pub fn sun(&self) -> &SunParams {
        &self.sun
    }

    /// Shade used when [`Illuminator::shade`] declines to shade a cell.
    pub fn fallback(&self) -> f32 {
        self.sun.min_shade
    }

    /// Shade factor in `[min_shade, 1]` for `column`.
    ///
    /// Returns `None` when any neighborhood cell is null or the rows are
    /// narrower than two columns. Passing the same slice for both rows yields
    /// zero north-south slope.
    pub fn shade(&self, row_north: &[f32], row_south: &[f32], column: usize) -> Option<f32> {
        let width = row_north.len().min(row_south.len());
        if width < 2 || column >= width {
            return None;
        }

        // Pair with the eastern neighbor, or the western one at the east edge.
        let (west, east) = if column + 1 < width {
            (column, column + 1)
        } else {
            (column - 1, column)
        };

        let sw = row_south[west];
        let se = row_south[east];
        let nw = row_north[west];
        let ne = row_north[east];

        if [sw, se, nw, ne].iter().any(|&z| z >= self.null_value || z.is_nan()) {
            return None;
        }

        let scale = self.sun.exaggeration * self.relief_sign;
        let dzdx = ((se - sw) as f64 + (ne - nw) as f64) / (2.0 * self.cell_x_m) * scale;
        let dzdy = ((nw - sw) as f64 + (ne - se) as f64) / (2.0 * self.cell_y_m) * scale;

        let norm = (dzdx * dzdx + dzdy * dzdy + 1.0).sqrt();
        let [sx, sy, sz] = self.sun_vector;
        let reflectance = (-dzdx * sx - dzdy * sy + sz) / norm;

        Some((reflectance as f32).clamp(self.sun.min_shade, 1.0))
    }

    /// Shade a whole row pair, substituting the fallback where shading is undefined.
    pub fn shade_row(&self, row_north: &[f32], row_south: &[f32], out: &mut Vec<f32>) {
        out.clear();
        let width = row_south.len();
        out.extend((0..width).map(|col| {
            self.shade(row_north, row_south, col)
                .unwrap_or(self.sun.min_shade)
        }));
    }
}
