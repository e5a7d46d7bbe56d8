//! Synthetic surface generators.
//!
//! These generators create predictable, verifiable surfaces that can be used
//! across the test suite. All grids are row-major with row 0 at the south edge.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read/written correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a planar surface rising `step` per column from `base`.
pub fn create_slope_grid(width: usize, height: usize, base: f32, step: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            data.push(base + col as f32 * step);
        }
    }
    data
}

/// Creates a bathymetry-like basin: depths (positive down) deepest in the center.
///
/// Depth ranges from `shallow` at the corners to `deep` at the center.
pub fn create_basin_grid(width: usize, height: usize, shallow: f32, deep: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(f32::EPSILON);

    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 - cx;
            let dy = row as f32 - cy;
            let t = 1.0 - (dx * dx + dy * dy).sqrt() / max_dist;
            data.push(shallow + (deep - shallow) * t);
        }
    }
    data
}

/// Creates a grid filled with one constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Overwrites the given (col, row) positions with a null sentinel.
///
/// Positions outside the grid are ignored.
pub fn with_nulls(
    mut data: Vec<f32>,
    width: usize,
    null_value: f32,
    positions: &[(usize, usize)],
) -> Vec<f32> {
    let height = if width == 0 { 0 } else { data.len() / width };
    for &(col, row) in positions {
        if col < width && row < height {
            data[row * width + col] = null_value;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid_values() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_slope_grid() {
        let grid = create_slope_grid(4, 2, 10.0, 2.5);
        assert_eq!(&grid[..4], &[10.0, 12.5, 15.0, 17.5]);
        assert_eq!(&grid[4..], &grid[..4]);
    }

    #[test]
    fn test_basin_grid_extremes() {
        let grid = create_basin_grid(5, 5, 10.0, 50.0);
        assert!((grid[12] - 50.0).abs() < 1e-4);
        assert!((grid[0] - 10.0).abs() < 1e-4);
        assert!(grid.iter().all(|&v| (10.0..=50.0001).contains(&v)));
    }

    #[test]
    fn test_with_nulls() {
        let grid = with_nulls(create_constant_grid(3, 3, 1.0), 3, 9.0, &[(1, 1), (5, 5)]);
        assert_eq!(grid[4], 9.0);
        assert_eq!(grid.iter().filter(|&&v| v == 9.0).count(), 1);
    }
}
