//! Error types for grid and area file parsing.

use surface_common::{Classify, ErrorClass, ValidationError};
use thiserror::Error;

/// Result type for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug)]
pub enum ParseError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header is structurally unreadable
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Read request outside the grid
    #[error("Row read out of range: row {row}, columns {col_start}..{col_end} on a {width} x {height} grid")]
    RowOutOfRange {
        row: usize,
        col_start: usize,
        col_end: usize,
        width: usize,
        height: usize,
    },

    /// File ended before the expected data
    #[error("Unexpected end of data: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    /// Area file line could not be parsed
    #[error("Invalid area file line {line}: {message}")]
    InvalidAreaLine { line: usize, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Classify for ParseError {
    fn class(&self) -> ErrorClass {
        match self {
            ParseError::Validation(_) | ParseError::InvalidAreaLine { .. } => {
                ErrorClass::Validation
            }
            _ => ErrorClass::FatalIo,
        }
    }
}
