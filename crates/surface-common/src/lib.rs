//! Common types and utilities shared across the chrtr-geotiff crates.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod options;

pub use bbox::{AreaOfInterest, GeoBounds};
pub use error::{Classify, ErrorClass, ValidationError};
pub use grid::{CellSizeMeters, ElevationMatrix, GridHeader, RunStats, Window};
pub use options::{
    Compression, FathomDefinition, OutputMode, RampTopology, RenderOptions, SignConvention, Units,
};
