//! Common fixtures for chrtr-geotiff tests.

use std::path::PathBuf;

/// Common bounding boxes as (west, east, south, north).
pub mod bounds {
    /// A one-degree box on the equator
    pub const EQUATOR_DEGREE: (f64, f64, f64, f64) = (0.0, 1.0, 0.0, 1.0);

    /// A box north of 60 degrees where longitude cells shrink by half
    pub const HIGH_LATITUDE: (f64, f64, f64, f64) = (10.0, 11.0, 59.5, 60.5);
}

/// Common cell sizes in degrees.
pub mod cells {
    /// One-minute cells
    pub const ONE_MINUTE: f64 = 1.0 / 60.0;

    /// Quarter-degree cells
    pub const QUARTER_DEGREE: f64 = 0.25;
}

/// A scratch directory that is deleted when dropped.
pub struct ScratchDir {
    dir: tempfile::TempDir,
}

impl ScratchDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create scratch directory"),
        }
    }

    /// Path of a file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

impl Default for ScratchDir {
    fn default() -> Self {
        Self::new()
    }
}
