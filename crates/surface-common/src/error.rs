//! Error taxonomy shared by every stage of the pipeline.

use thiserror::Error;

/// How a failure propagates through a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Grid open/read failure, output creation failure. Aborts the run.
    FatalIo,
    /// Bad input detected before any heavy computation. Aborts the run.
    Validation,
    /// A single scanline write failed. Logged, the run continues.
    RecoverableIo,
    /// The host asked the run to stop.
    Cancelled,
}

/// Implemented by every crate-level error so the host can decide what to show.
pub trait Classify {
    fn class(&self) -> ErrorClass;

    fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::FatalIo | ErrorClass::Validation)
    }
}

/// Input problems rejected before rendering starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Specified area {area} is completely outside of the grid bounds {grid}")]
    AreaOutsideGrid { area: String, grid: String },

    #[error("Area selection produced an empty window ({width} x {height} cells)")]
    EmptyWindow { width: i64, height: i64 },

    #[error("Number of vertices ({0}) is too few for a polygon")]
    TooFewVertices(usize),

    #[error("Area coordinate lat={lat}, lon={lon} is outside the geographic range")]
    CoordinateOutOfRange { lat: f64, lon: f64 },

    #[error("Selected window contains no valid cells")]
    NoValidCells,

    #[error("Invalid grid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid option '{param}': {message}")]
    InvalidOption { param: String, message: String },
}

impl Classify for ValidationError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Validation
    }
}
