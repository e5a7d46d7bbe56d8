//! File-level tests for the CHRTR and CHRTR2 backends.

use chrtr_parser::{
    open_grid, read_area_file, Chrtr2Writer, ChrtrWriter, GridCell, GridFormat, ParseError,
    CHRTR2_NULL_Z_VALUE, CHRTR_NULL,
};
use surface_common::{GeoBounds, GridHeader};
use test_utils::{assert_approx_eq, create_test_grid};

fn header(width: usize, height: usize, cell: f64, null_value: f32) -> GridHeader {
    GridHeader {
        width,
        height,
        bounds: GeoBounds::new(
            -76.0,
            -76.0 + width as f64 * cell,
            36.0,
            36.0 + height as f64 * cell,
        ),
        x_cell_degrees: cell,
        y_cell_degrees: cell,
        null_value,
    }
}

// ============================================================================
// CHRTR (fixed) tests
// ============================================================================

#[test]
fn test_chrtr_file_roundtrip_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.fin");

    let hdr = header(5, 4, 0.5 / 60.0, CHRTR_NULL);
    let mut data = create_test_grid(5, 4);
    data[7] = CHRTR_NULL;
    ChrtrWriter::write_grid(&path, &hdr, &data).unwrap();

    let mut grid = open_grid(&path).unwrap();
    assert_eq!(grid.format(), GridFormat::Chrtr);
    assert_eq!(grid.header().width, 5);
    assert_eq!(grid.header().height, 4);
    assert_approx_eq!(grid.header().x_cell_degrees, 0.5 / 60.0, 1e-12);
    assert_approx_eq!(grid.header().bounds.north, 36.0 + 4.0 * 0.5 / 60.0, 1e-9);

    let row1 = grid.read_row(1, 0, 5).unwrap();
    // create_test_grid: value = col * 1000 + row
    assert_eq!(row1[0], GridCell::valid(1.0));
    assert_eq!(row1[1], GridCell::valid(1001.0));
    assert!(!row1[2].valid);

    let partial = grid.read_row(3, 2, 3).unwrap();
    assert_eq!(partial.len(), 3);
    assert_eq!(partial[0].value, 2003.0);
}

#[test]
fn test_chrtr_row_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.fin");
    let hdr = header(3, 3, 1.0 / 60.0, CHRTR_NULL);
    ChrtrWriter::write_grid(&path, &hdr, &create_test_grid(3, 3)).unwrap();

    let mut grid = open_grid(&path).unwrap();
    assert!(matches!(
        grid.read_row(3, 0, 3),
        Err(ParseError::RowOutOfRange { row: 3, .. })
    ));
    assert!(matches!(
        grid.read_row(0, 2, 2),
        Err(ParseError::RowOutOfRange { col_end: 4, .. })
    ));
}

#[test]
fn test_open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = open_grid(dir.path().join("nope.fin"));
    assert!(matches!(result, Err(ParseError::Io(_))));
}

// ============================================================================
// CHRTR2 (flagged) tests
// ============================================================================

#[test]
fn test_chrtr2_status_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.ch2");

    let mut hdr = header(3, 2, 0.001, CHRTR2_NULL_Z_VALUE);
    hdr.y_cell_degrees = 0.002;
    hdr.bounds.north = 36.0 + 2.0 * 0.002;

    let cells = vec![
        GridCell::valid(10.5),
        GridCell::null(0.0),
        GridCell::valid(12.5),
        GridCell::valid(-3.0),
        GridCell::valid(4.0),
        GridCell::null(0.0),
    ];
    Chrtr2Writer::write_grid(&path, &hdr, &cells).unwrap();

    let mut grid = open_grid(&path).unwrap();
    assert_eq!(grid.format(), GridFormat::Chrtr2);
    assert_approx_eq!(grid.header().x_cell_degrees, 0.001, 1e-12);
    assert_approx_eq!(grid.header().y_cell_degrees, 0.002, 1e-12);
    assert_eq!(grid.header().null_value, CHRTR2_NULL_Z_VALUE);

    let row0 = grid.read_row(0, 0, 3).unwrap();
    assert_eq!(row0[0], GridCell::valid(10.5));
    assert!(!row0[1].valid);
    assert_eq!(row0[1].value, CHRTR2_NULL_Z_VALUE);

    let row1 = grid.read_row(1, 1, 2).unwrap();
    assert_eq!(row1, vec![GridCell::valid(4.0), GridCell::null(CHRTR2_NULL_Z_VALUE)]);
}

#[test]
fn test_chrtr2_truncated_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.ch2");
    std::fs::write(&path, b"[VERSION] = test\n[END OF HEADER]\n").unwrap();

    assert!(matches!(
        open_grid(&path),
        Err(ParseError::ShortRead { expected: 16384, .. })
    ));
}

#[test]
fn test_chrtr2_invalid_bounds_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.ch2");

    let mut text = String::from(
        "[WIDTH] = 2\n[HEIGHT] = 2\n[WEST LONGITUDE] = 5\n[EAST LONGITUDE] = 1\n\
         [SOUTH LATITUDE] = 0\n[NORTH LATITUDE] = 1\n[LAT GRID SIZE DEGREES] = 0.5\n\
         [LON GRID SIZE DEGREES] = 0.5\n[END OF HEADER]\n",
    )
    .into_bytes();
    text.resize(16384, 0);
    std::fs::write(&path, text).unwrap();

    assert!(matches!(open_grid(&path), Err(ParseError::Validation(_))));
}

// ============================================================================
// Area file tests
// ============================================================================

#[test]
fn test_read_area_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.are");
    std::fs::write(&path, "36.01, -75.99\n36.03, -75.99\n36.03, -75.97\n").unwrap();

    let area = read_area_file(&path).unwrap();
    assert_eq!(area.vertex_count, 3);
    assert_eq!(area.bounds, GeoBounds::new(-75.99, -75.97, 36.01, 36.03));
}
