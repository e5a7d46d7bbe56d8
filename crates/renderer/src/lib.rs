//! Raster rendering for gridded surfaces.
//!
//! Implements the per-row rendering stages:
//! - Hillshade illumination
//! - Palette color mapping
//! - GeoTIFF scanline output
//! - Contour lines (marching squares)

pub mod contour;
pub mod error;
pub mod geotiff;
pub mod illumination;
pub mod palette;

pub use error::{RasterError, RasterResult};
pub use geotiff::{
    BandWriter, GeoReference, GeoreferencedRaster, RasterFile, RasterSpec, RasterSummary,
    Scanline, ScanlineSink,
};
pub use illumination::{Illuminator, SunParams};
pub use palette::{hue_index, PaletteMapper, PaletteRamp, Rgb, Rgba, NUMHUES, NUMSHADES};
