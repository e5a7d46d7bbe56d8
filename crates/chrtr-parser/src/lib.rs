//! Readers for CHRTR-family gridded surfaces.
//!
//! Two on-disk layouts are supported behind one row-read abstraction:
//! - **CHRTR** (`.fin`): fixed square cells, null cells hold a large sentinel.
//! - **CHRTR2** (`.ch2`): tagged ASCII header, per-record status flags.
//!
//! Both expose the same [`GridHeader`] so downstream code is format-agnostic.
//! Rows are numbered from the south edge.

pub mod area;
pub mod error;
pub mod fixed;
pub mod flagged;

use std::path::Path;

use surface_common::GridHeader;

pub use area::{parse_area, read_area_file};
pub use error::{ParseError, ParseResult};
pub use fixed::{ChrtrFile, ChrtrWriter, CHRTR_NULL};
pub use flagged::{Chrtr2File, Chrtr2Writer, CHRTR2_NULL_Z_VALUE};

/// One raw cell as read from disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub value: f32,
    /// Decided by the format's own convention
    pub valid: bool,
}

impl GridCell {
    pub fn valid(value: f32) -> Self {
        Self { value, valid: true }
    }

    pub fn null(value: f32) -> Self {
        Self {
            value,
            valid: false,
        }
    }
}

/// Supported grid layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFormat {
    Chrtr,
    Chrtr2,
}

impl GridFormat {
    /// Pick the layout from the file extension (`.ch2` is CHRTR2, anything else CHRTR).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ch2") => GridFormat::Chrtr2,
            _ => GridFormat::Chrtr,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GridFormat::Chrtr => "CHRTR",
            GridFormat::Chrtr2 => "CHRTR2",
        }
    }
}

/// Uniform row access to an open grid. Dropping the source closes it.
pub trait GridSource {
    fn format(&self) -> GridFormat;

    fn header(&self) -> &GridHeader;

    /// Read `col_count` cells of `row` starting at `col_start`.
    fn read_row(
        &mut self,
        row: usize,
        col_start: usize,
        col_count: usize,
    ) -> ParseResult<Vec<GridCell>>;
}

/// Open a grid file with the backend matching its extension.
pub fn open_grid(path: impl AsRef<Path>) -> ParseResult<Box<dyn GridSource>> {
    let path = path.as_ref();
    let source: Box<dyn GridSource> = match GridFormat::from_path(path) {
        GridFormat::Chrtr => Box::new(ChrtrFile::open(path)?),
        GridFormat::Chrtr2 => Box::new(Chrtr2File::open(path)?),
    };

    tracing::info!(
        path = %path.display(),
        format = source.format().name(),
        width = source.header().width,
        height = source.header().height,
        "Opened grid"
    );

    Ok(source)
}

/// Bounds-check a row request against a header.
pub(crate) fn check_row_request(
    header: &GridHeader,
    row: usize,
    col_start: usize,
    col_count: usize,
) -> ParseResult<()> {
    let col_end = col_start.saturating_add(col_count);
    if row >= header.height || col_end > header.width {
        return Err(ParseError::RowOutOfRange {
            row,
            col_start,
            col_end,
            width: header.width,
            height: header.height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(GridFormat::from_path(Path::new("a/b/survey.ch2")), GridFormat::Chrtr2);
        assert_eq!(GridFormat::from_path(Path::new("survey.CH2")), GridFormat::Chrtr2);
        assert_eq!(GridFormat::from_path(Path::new("survey.fin")), GridFormat::Chrtr);
        assert_eq!(GridFormat::from_path(Path::new("survey")), GridFormat::Chrtr);
    }
}
