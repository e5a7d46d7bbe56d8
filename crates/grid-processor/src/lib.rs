//! Conversion pipeline from CHRTR surfaces to hillshaded GeoTIFF.
//!
//! # Architecture
//!
//! ```text
//! open_grid(path)
//!      │
//!      ▼
//! select_window(header, area)     snap the area of interest to whole cells
//!      │
//!      ▼
//! scan_window(...)                convert units and sign, find min/max
//!      │
//!      ▼
//! render_scanlines(...)           north to south, one strip per row
//!      │    ├─► grey:  raw values
//!      │    └─► color: hillshade ─► palette
//!      ▼
//! BandWriter::finish()  ─►  generate_contours() (optional)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{NoopHooks, PipelineConfig};
//!
//! let config = PipelineConfig::from_env();
//! let pipeline = config.build_pipeline()?;
//! let report = pipeline.run("survey.fin".as_ref(), "survey.tif".as_ref(), None, &mut NoopHooks)?;
//! println!("{} rows by {} columns", report.rows, report.columns);
//! ```

pub mod area;
pub mod config;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod runlog;
pub mod stats;

// Re-export commonly used types at crate root
pub use area::select_window;
pub use config::{PaletteConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use hooks::{NoopHooks, PipelineHooks};
pub use pipeline::{render_scanlines, Pipeline, RowRenderer, RunReport};
pub use runlog::{LogEntry, LogLevel, RunLog};
pub use stats::scan_window;
