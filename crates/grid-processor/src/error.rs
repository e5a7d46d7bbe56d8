//! Error types for the rendering pipeline.

use chrtr_parser::ParseError;
use renderer::RasterError;
use surface_common::{Classify, ErrorClass, ValidationError};
use thiserror::Error;

/// Errors that end a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Failed to open or read the source grid.
    #[error("grid read failed: {0}")]
    Parse(#[from] ParseError),

    /// Failed to create, allocate or close the output.
    #[error("output failed: {0}")]
    Raster(#[from] RasterError),

    /// Input rejected before rendering.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The host asked the run to stop.
    #[error("run cancelled during {stage} at row {row}")]
    Cancelled { stage: &'static str, row: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Create a Cancelled error.
    pub fn cancelled(stage: &'static str, row: usize) -> Self {
        Self::Cancelled { stage, row }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl Classify for PipelineError {
    fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Parse(e) => e.class(),
            // Scanline failures never surface here; whatever does is fatal.
            PipelineError::Raster(RasterError::InvalidPalette(_)) => ErrorClass::Validation,
            PipelineError::Raster(_) => ErrorClass::FatalIo,
            PipelineError::Validation(_) => ErrorClass::Validation,
            PipelineError::Cancelled { .. } => ErrorClass::Cancelled,
            PipelineError::Config(_) => ErrorClass::Validation,
        }
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            PipelineError::from(ValidationError::NoValidCells).class(),
            ErrorClass::Validation
        );
        assert_eq!(PipelineError::cancelled("stats", 3).class(), ErrorClass::Cancelled);
        assert!(!PipelineError::cancelled("render", 0).is_fatal());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let parse = PipelineError::from(ParseError::Io(io));
        assert_eq!(parse.class(), ErrorClass::FatalIo);
        assert!(parse.is_fatal());
    }

    #[test]
    fn test_cancelled_message() {
        let err = PipelineError::cancelled("render", 7);
        assert_eq!(err.to_string(), "run cancelled during render at row 7");
    }
}
