//! Grid headers, cell windows and the in-memory elevation matrix.

use serde::{Deserialize, Serialize};

use crate::{GeoBounds, ValidationError};

/// Meters per degree of latitude (standard meridian approximation).
pub const METERS_PER_DEGREE: f64 = 111_120.0;

/// Format-agnostic description of a source grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridHeader {
    /// Number of columns (west to east)
    pub width: usize,
    /// Number of rows (south to north)
    pub height: usize,
    /// Geographic extent in degrees
    pub bounds: GeoBounds,
    /// Cell size along longitude, degrees
    pub x_cell_degrees: f64,
    /// Cell size along latitude, degrees
    pub y_cell_degrees: f64,
    /// Value stored in cells that carry no data
    pub null_value: f32,
}

impl GridHeader {
    /// Check the structural invariants every backend must honor.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.width == 0 || self.height == 0 {
            return Err(ValidationError::InvalidHeader(format!(
                "grid dimensions must be positive, got {} x {}",
                self.width, self.height
            )));
        }

        if !self.bounds.is_well_formed() {
            return Err(ValidationError::InvalidHeader(format!(
                "bounds {} are not ordered west<east, south<north",
                self.bounds
            )));
        }

        if !(self.x_cell_degrees > 0.0) || !(self.y_cell_degrees > 0.0) {
            return Err(ValidationError::InvalidHeader(format!(
                "cell size must be positive, got {} x {} degrees",
                self.x_cell_degrees, self.y_cell_degrees
            )));
        }

        Ok(())
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Integer cell window into a source grid, with its snapped geographic extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub x_start: usize,
    pub y_start: usize,
    pub width: usize,
    pub height: usize,
    /// Extent re-derived from the integer offsets, not the original request
    pub bounds: GeoBounds,
}

impl Window {
    /// Window covering the entire grid.
    pub fn full(header: &GridHeader) -> Self {
        Self {
            x_start: 0,
            y_start: 0,
            width: header.width,
            height: header.height,
            bounds: header.bounds,
        }
    }

    /// Number of cells in the window.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check if window is empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Physical cell size in meters, used for slope computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSizeMeters {
    pub x: f64,
    pub y: f64,
}

impl CellSizeMeters {
    /// Convert degree cell sizes at the given latitude.
    pub fn from_degrees(x_cell_degrees: f64, y_cell_degrees: f64, mid_latitude: f64) -> Self {
        let conversion = mid_latitude.to_radians().cos();
        Self {
            x: x_cell_degrees * METERS_PER_DEGREE * conversion,
            y: y_cell_degrees * METERS_PER_DEGREE,
        }
    }
}

/// Dense row-major grid of converted values for one pipeline run.
///
/// Row 0 is the southernmost row of the window.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationMatrix {
    width: usize,
    height: usize,
    null_value: f32,
    data: Vec<f32>,
}

impl ElevationMatrix {
    /// Matrix filled with the null value.
    pub fn new(width: usize, height: usize, null_value: f32) -> Self {
        Self {
            width,
            height,
            null_value,
            data: vec![null_value; width * height],
        }
    }

    /// Wrap existing row-major data. Returns `None` if the length does not match.
    pub fn from_vec(width: usize, height: usize, null_value: f32, data: Vec<f32>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            null_value,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn null_value(&self) -> f32 {
        self.null_value
    }

    /// True when `value` is at or above the null sentinel.
    #[inline]
    pub fn is_null(&self, value: f32) -> bool {
        value >= self.null_value
    }

    /// Borrow one row.
    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.width;
        &self.data[start..start + self.width]
    }

    /// Mutable access to one row, for the loader.
    pub fn row_mut(&mut self, row: usize) -> &mut [f32] {
        let start = row * self.width;
        &mut self.data[start..start + self.width]
    }

    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Min/max over the valid cells of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub min_z: f32,
    pub max_z: f32,
    pub valid_cells: usize,
}

impl RunStats {
    /// Stats seeded from a single valid value.
    pub fn first(value: f32) -> Self {
        Self {
            min_z: value,
            max_z: value,
            valid_cells: 1,
        }
    }

    /// Fold another valid value in.
    pub fn include(&mut self, value: f32) {
        self.min_z = self.min_z.min(value);
        self.max_z = self.max_z.max(value);
        self.valid_cells += 1;
    }

    /// Accumulate into an optional running value.
    pub fn accumulate(stats: &mut Option<RunStats>, value: f32) {
        match stats {
            Some(s) => s.include(value),
            None => *stats = Some(RunStats::first(value)),
        }
    }

    pub fn range(&self) -> f32 {
        self.max_z - self.min_z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> GridHeader {
        GridHeader {
            width: 10,
            height: 5,
            bounds: GeoBounds::new(-80.0, -79.0, 30.0, 30.5),
            x_cell_degrees: 0.1,
            y_cell_degrees: 0.1,
            null_value: 1.0e10,
        }
    }

    #[test]
    fn test_header_validate() {
        assert!(header().validate().is_ok());

        let mut bad = header();
        bad.width = 0;
        assert!(matches!(bad.validate(), Err(ValidationError::InvalidHeader(_))));

        let mut bad = header();
        bad.bounds = GeoBounds::new(-79.0, -80.0, 30.0, 30.5);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_cell_size_equator_and_sixty_degrees() {
        let eq = CellSizeMeters::from_degrees(1.0, 1.0, 0.0);
        assert!((eq.x - 111_120.0).abs() < 1e-6);
        assert!((eq.y - 111_120.0).abs() < 1e-6);

        let sixty = CellSizeMeters::from_degrees(1.0, 1.0, 60.0);
        assert!((sixty.x - 55_560.0).abs() < 1e-3);
    }

    #[test]
    fn test_matrix_rows() {
        let data: Vec<f32> = (0..6).map(|v| v as f32).collect();
        let m = ElevationMatrix::from_vec(3, 2, 99.0, data).unwrap();
        assert_eq!(m.row(1), &[3.0, 4.0, 5.0]);
        assert_eq!(m.get(2, 0), Some(2.0));
        assert_eq!(m.get(3, 0), None);
        assert!(m.is_null(99.0));
        assert!(!m.is_null(5.0));
    }

    #[test]
    fn test_run_stats_accumulate() {
        let mut stats = None;
        for v in [3.0, -2.0, 7.5] {
            RunStats::accumulate(&mut stats, v);
        }
        let stats = stats.unwrap();
        assert_eq!(stats.min_z, -2.0);
        assert_eq!(stats.max_z, 7.5);
        assert_eq!(stats.valid_cells, 3);
    }
}
