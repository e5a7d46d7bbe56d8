//! Geographic bounding boxes and areas of interest.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ValidationError;

/// A geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl GeoBounds {
    /// Create bounds from the four edges.
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self {
            west,
            east,
            south,
            north,
        }
    }

    /// Smallest bounds enclosing all `(lat, lon)` vertices.
    pub fn from_vertices(vertices: &[(f64, f64)]) -> Option<Self> {
        let (&(lat0, lon0), rest) = vertices.split_first()?;
        let mut bounds = Self::new(lon0, lon0, lat0, lat0);
        for &(lat, lon) in rest {
            bounds.west = bounds.west.min(lon);
            bounds.east = bounds.east.max(lon);
            bounds.south = bounds.south.min(lat);
            bounds.north = bounds.north.max(lat);
        }
        Some(bounds)
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Latitude halfway between the south and north edges.
    pub fn mid_latitude(&self) -> f64 {
        (self.south + self.north) / 2.0
    }

    /// True when west<east and south<north.
    pub fn is_well_formed(&self) -> bool {
        self.west < self.east && self.south < self.north
    }

    /// Check if this bbox overlaps another. Shared edges count as overlap.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        !(self.south > other.north
            || self.north < other.south
            || self.west > other.east
            || self.east < other.west)
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[W {:.6}, E {:.6}, S {:.6}, N {:.6}]",
            self.west, self.east, self.south, self.north
        )
    }
}

/// An optional crop region read from an area file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    pub bounds: GeoBounds,
    pub vertex_count: usize,
}

impl AreaOfInterest {
    /// Build an area from polygon vertices given as `(lat, lon)` pairs.
    pub fn from_vertices(vertices: &[(f64, f64)]) -> Result<Self, ValidationError> {
        if vertices.len() < 3 {
            return Err(ValidationError::TooFewVertices(vertices.len()));
        }

        for &(lat, lon) in vertices {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(ValidationError::CoordinateOutOfRange { lat, lon });
            }
        }

        let bounds =
            GeoBounds::from_vertices(vertices).ok_or(ValidationError::TooFewVertices(0))?;

        Ok(Self {
            bounds,
            vertex_count: vertices.len(),
        })
    }

    /// Rectangular area from explicit edges (four implied vertices).
    pub fn from_bounds(bounds: GeoBounds) -> Result<Self, ValidationError> {
        Self::from_vertices(&[
            (bounds.south, bounds.west),
            (bounds.north, bounds.west),
            (bounds.north, bounds.east),
            (bounds.south, bounds.east),
        ])
    }
}
