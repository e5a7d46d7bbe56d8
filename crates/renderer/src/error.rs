//! Error types for raster output.

use surface_common::{Classify, ErrorClass};
use thiserror::Error;

pub type RasterResult<T> = Result<T, RasterError>;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Unable to create output file {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TIFF encoding error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scanline {row} has {got} pixels, expected {expected}")]
    ScanlineLength {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Scanline {row} does not match the {mode} band layout")]
    BandMismatch { row: usize, mode: &'static str },

    #[error("All {height} scanlines have already been written")]
    TooManyScanlines { height: usize },

    #[error("Row {row} could not be written or blanked: {source}")]
    RowLost {
        row: usize,
        #[source]
        source: Box<RasterError>,
    },

    #[error("Invalid palette: {0}")]
    InvalidPalette(String),

    #[error("Contour output error: {0}")]
    Contour(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RasterError {
    /// True for failures tied to one scanline rather than the whole file.
    pub fn is_scanline_error(&self) -> bool {
        matches!(
            self,
            RasterError::ScanlineLength { .. }
                | RasterError::BandMismatch { .. }
                | RasterError::Tiff(_)
                | RasterError::Io(_)
        )
    }
}

impl Classify for RasterError {
    fn class(&self) -> ErrorClass {
        match self {
            RasterError::Create { .. } => ErrorClass::FatalIo,
            RasterError::InvalidPalette(_) => ErrorClass::Validation,
            RasterError::Json(_) => ErrorClass::Validation,
            RasterError::Contour(_) => ErrorClass::RecoverableIo,
            RasterError::TooManyScanlines { .. } | RasterError::RowLost { .. } => {
                ErrorClass::FatalIo
            }
            RasterError::ScanlineLength { .. }
            | RasterError::BandMismatch { .. }
            | RasterError::Tiff(_)
            | RasterError::Io(_) => ErrorClass::RecoverableIo,
        }
    }
}
