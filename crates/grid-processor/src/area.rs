//! Area selection: map an area of interest onto an integer cell window.

use surface_common::{AreaOfInterest, GeoBounds, GridHeader, ValidationError, Window};
use tracing::debug;

/// Resolve the cell window to process.
///
/// Without an area the whole grid is used. Otherwise the area's edges snap to
/// the nearest cell boundary, the window is clamped to the grid, and its bounds
/// are re-derived from the integer offsets.
pub fn select_window(
    header: &GridHeader,
    area: Option<&AreaOfInterest>,
) -> Result<Window, ValidationError> {
    let Some(area) = area else {
        return Ok(Window::full(header));
    };

    let aoi = &area.bounds;
    let grid = &header.bounds;

    if !aoi.intersects(grid) {
        return Err(ValidationError::AreaOutsideGrid {
            area: aoi.to_string(),
            grid: grid.to_string(),
        });
    }

    let dx = header.x_cell_degrees;
    let dy = header.y_cell_degrees;

    let mut x_start = ((aoi.west - grid.west) / dx).round() as i64;
    let mut y_start = ((aoi.south - grid.south) / dy).round() as i64;
    let mut width = (aoi.width() / dx).round() as i64;
    let mut height = (aoi.height() / dy).round() as i64;

    x_start = x_start.max(0);
    y_start = y_start.max(0);
    if x_start + width > header.width as i64 {
        width = header.width as i64 - x_start;
    }
    if y_start + height > header.height as i64 {
        height = header.height as i64 - y_start;
    }

    if width <= 0 || height <= 0 {
        return Err(ValidationError::EmptyWindow { width, height });
    }

    let west = grid.west + x_start as f64 * dx;
    let south = grid.south + y_start as f64 * dy;
    let bounds = GeoBounds::new(
        west,
        west + width as f64 * dx,
        south,
        south + height as f64 * dy,
    );

    let window = Window {
        x_start: x_start as usize,
        y_start: y_start as usize,
        width: width as usize,
        height: height as usize,
        bounds,
    };

    debug!(
        x_start = window.x_start,
        y_start = window.y_start,
        width = window.width,
        height = window.height,
        bounds = %window.bounds,
        "Selected window"
    );

    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> GridHeader {
        GridHeader {
            width: 100,
            height: 50,
            bounds: GeoBounds::new(-80.0, -79.0, 30.0, 30.5),
            x_cell_degrees: 0.01,
            y_cell_degrees: 0.01,
            null_value: 1.0e10,
        }
    }

    #[test]
    fn test_no_area_is_full_grid() {
        let window = select_window(&header(), None).unwrap();
        assert_eq!(window, Window::full(&header()));
    }

    #[test]
    fn test_interior_area() {
        let area = AreaOfInterest::from_bounds(GeoBounds::new(-79.804, -79.5, 30.1, 30.2)).unwrap();
        let window = select_window(&header(), Some(&area)).unwrap();
        assert_eq!(window.x_start, 20);
        assert_eq!(window.y_start, 10);
        assert_eq!(window.width, 30);
        assert_eq!(window.height, 10);
        assert!((window.bounds.west - -79.8).abs() < 1e-9);
        assert!((window.bounds.east - -79.5).abs() < 1e-9);
    }

    #[test]
    fn test_area_overhanging_is_clamped() {
        let area = AreaOfInterest::from_bounds(GeoBounds::new(-79.2, -78.0, 30.4, 31.0)).unwrap();
        let window = select_window(&header(), Some(&area)).unwrap();
        assert_eq!(window.x_start, 80);
        assert_eq!(window.width, 20);
        assert_eq!(window.y_start, 40);
        assert_eq!(window.height, 10);
        assert!(window.x_start + window.width <= 100);
        assert!(window.y_start + window.height <= 50);
    }

    #[test]
    fn test_area_outside_grid() {
        let area = AreaOfInterest::from_bounds(GeoBounds::new(-70.0, -69.0, 30.0, 30.5)).unwrap();
        assert!(matches!(
            select_window(&header(), Some(&area)),
            Err(ValidationError::AreaOutsideGrid { .. })
        ));
    }

    #[test]
    fn test_area_touching_east_edge_is_empty() {
        let area = AreaOfInterest::from_bounds(GeoBounds::new(-79.0, -78.5, 30.1, 30.2)).unwrap();
        assert!(matches!(
            select_window(&header(), Some(&area)),
            Err(ValidationError::EmptyWindow { width: 0, .. })
        ));
    }
}
