//! Palette ramps and the value-to-color mapping.
//!
//! A ramp is laid out as `num_hues` blocks of `num_shades` colors. Block 0
//! holds the color for the maximum value and the last block the color for the
//! minimum. Within a block, sub-index 0 is the brightest shade.

use serde::{Deserialize, Serialize};
use surface_common::{RampTopology, RunStats};

use crate::{RasterError, RasterResult};

/// Default number of hue blocks.
pub const NUMHUES: usize = 128;

/// Default number of shades per hue block.
pub const NUMSHADES: usize = 100;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert HSV (hue in degrees, saturation and value in [0, 1]).
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);

        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        let (r, g, b) = match sector as u32 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };

        let to_u8 = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::new(to_u8(r), to_u8(g), to_u8(b))
    }
}

/// RGBA pixel as written to color output.
pub type Rgba = [u8; 4];

/// Pixel for cells with no data.
pub const BLANK: Rgba = [0, 0, 0, 0];

/// A hue-by-shade color table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteRamp {
    num_hues: usize,
    num_shades: usize,
    colors: Vec<Rgb>,
}

impl PaletteRamp {
    /// Wrap a color table of exactly `num_hues * num_shades` entries.
    pub fn with_bands(num_hues: usize, num_shades: usize, colors: Vec<Rgb>) -> RasterResult<Self> {
        let ramp = Self {
            num_hues,
            num_shades,
            colors,
        };
        ramp.validate()?;
        Ok(ramp)
    }

    /// Build a ramp sweeping hue from `start_hue` (maximum value) to `end_hue`
    /// (minimum value), darkening across each block's shades.
    pub fn from_hsv(start_hue: f64, end_hue: f64, saturation: f64, value: f64) -> Self {
        Self::build_hsv(NUMHUES, NUMSHADES, start_hue, end_hue, saturation, value)
    }

    /// Like [`PaletteRamp::from_hsv`] with explicit block counts, both of which
    /// must be positive.
    pub fn from_hsv_with_bands(
        num_hues: usize,
        num_shades: usize,
        start_hue: f64,
        end_hue: f64,
        saturation: f64,
        value: f64,
    ) -> RasterResult<Self> {
        let ramp = Self::build_hsv(num_hues, num_shades, start_hue, end_hue, saturation, value);
        ramp.validate()?;
        Ok(ramp)
    }

    fn build_hsv(
        num_hues: usize,
        num_shades: usize,
        start_hue: f64,
        end_hue: f64,
        saturation: f64,
        value: f64,
    ) -> Self {
        let mut colors = Vec::with_capacity(num_hues * num_shades);
        let hue_span = (num_hues.max(2) - 1) as f64;

        for block in 0..num_hues {
            let hue = start_hue + (end_hue - start_hue) * block as f64 / hue_span;
            for shade in 0..num_shades {
                let brightness = value * (num_shades - shade) as f64 / num_shades as f64;
                colors.push(Rgb::from_hsv(hue, saturation, brightness));
            }
        }

        Self {
            num_hues,
            num_shades,
            colors,
        }
    }

    /// Load a ramp from JSON (`{"num_hues":..,"num_shades":..,"colors":[{"r":..}]}`).
    pub fn from_json(json: &str) -> RasterResult<Self> {
        let ramp: PaletteRamp = serde_json::from_str(json)?;
        ramp.validate()?;
        Ok(ramp)
    }

    /// Load a ramp from a JSON file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> RasterResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    fn validate(&self) -> RasterResult<()> {
        if self.num_hues == 0 || self.num_shades == 0 {
            return Err(RasterError::InvalidPalette(
                "hue and shade counts must be positive".to_string(),
            ));
        }
        if self.colors.len() != self.num_hues * self.num_shades {
            return Err(RasterError::InvalidPalette(format!(
                "expected {} colors ({} hues x {} shades), got {}",
                self.num_hues * self.num_shades,
                self.num_hues,
                self.num_shades,
                self.colors.len()
            )));
        }
        Ok(())
    }

    pub fn num_hues(&self) -> usize {
        self.num_hues
    }

    pub fn num_shades(&self) -> usize {
        self.num_shades
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.colors.get(index).copied()
    }
}

impl Default for PaletteRamp {
    fn default() -> Self {
        Self::from_hsv(0.0, 315.0, 1.0, 1.0)
    }
}

/// Hue block for a valid value, counted down from `num_hues` at the minimum.
///
/// The zero-crossing rule applies only under [`RampTopology::RestartAtZero`]
/// with a negative minimum; each side of zero then spans the full hue range.
pub fn hue_index(
    value: f32,
    stats: &RunStats,
    topology: RampTopology,
    num_hues: usize,
) -> i64 {
    let hues = num_hues as f32;
    let nonzero = |r: f32| if r == 0.0 { 1.0 } else { r };

    let fraction = match topology {
        RampTopology::RestartAtZero if stats.min_z < 0.0 => {
            if value < 0.0 {
                (value - stats.min_z).abs() / nonzero(stats.min_z.abs())
            } else {
                let upper = if stats.max_z > 0.0 { stats.max_z } else { 1.0 };
                value.abs() / upper
            }
        }
        _ => (value - stats.min_z).abs() / nonzero(stats.range()),
    };

    num_hues as i64 - (fraction * hues).floor() as i64
}

/// Maps converted values and shade factors to pixels.
#[derive(Debug, Clone)]
pub struct PaletteMapper {
    ramp: PaletteRamp,
    stats: RunStats,
    topology: RampTopology,
    null_value: f32,
}

impl PaletteMapper {
    pub fn new(ramp: PaletteRamp, stats: RunStats, topology: RampTopology, null_value: f32) -> Self {
        Self {
            ramp,
            stats,
            topology,
            null_value,
        }
    }

    pub fn ramp(&self) -> &PaletteRamp {
        &self.ramp
    }

    /// Ramp index for a cell, or `None` when the cell is blank or the ramp
    /// holds no colors.
    pub fn color_index(&self, value: f32, shade: f32) -> Option<usize> {
        if value >= self.null_value || value.is_nan() {
            return None;
        }

        let last = self.ramp.len().checked_sub(1)? as i64;
        let shades = self.ramp.num_shades().max(1) as i64;
        let hue = hue_index(value, &self.stats, self.topology, self.ramp.num_hues());
        let base = hue * shades;

        let offset = ((shades as f32 * shade + 0.5).round() as i64).clamp(1, shades);

        Some((base - offset).clamp(0, last) as usize)
    }

    /// Pixel for one cell.
    pub fn map(&self, value: f32, shade: f32) -> Rgba {
        match self.color_index(value, shade).and_then(|i| self.ramp.get(i)) {
            Some(c) => [c.r, c.g, c.b, 255],
            None => BLANK,
        }
    }

    /// Map a row of values with matching shade factors into `out`.
    pub fn map_row(&self, values: &[f32], shades: &[f32], out: &mut Vec<Rgba>) {
        out.clear();
        out.extend(
            values
                .iter()
                .zip(shades.iter())
                .map(|(&value, &shade)| self.map(value, shade)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(min_z: f32, max_z: f32) -> RunStats {
        RunStats {
            min_z,
            max_z,
            valid_cells: 2,
        }
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(Rgb::from_hsv(0.0, 1.0, 1.0), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hsv(120.0, 1.0, 1.0), Rgb::new(0, 255, 0));
        assert_eq!(Rgb::from_hsv(240.0, 1.0, 1.0), Rgb::new(0, 0, 255));
        assert_eq!(Rgb::from_hsv(77.0, 0.0, 0.0), Rgb::new(0, 0, 0));
    }

    #[test]
    fn test_default_ramp_length() {
        let ramp = PaletteRamp::default();
        assert_eq!(ramp.len(), NUMHUES * NUMSHADES);
        assert_eq!(ramp.get(0), Some(Rgb::new(255, 0, 0)));
    }

    #[test]
    fn test_with_bands_rejects_wrong_length() {
        let result = PaletteRamp::with_bands(4, 4, vec![Rgb::new(1, 2, 3); 15]);
        assert!(matches!(result, Err(RasterError::InvalidPalette(_))));
    }

    #[test]
    fn test_hsv_ramp_rejects_zero_bands() {
        assert!(matches!(
            PaletteRamp::from_hsv_with_bands(0, 10, 0.0, 300.0, 1.0, 1.0),
            Err(RasterError::InvalidPalette(_))
        ));
        assert!(matches!(
            PaletteRamp::from_hsv_with_bands(8, 0, 0.0, 300.0, 1.0, 1.0),
            Err(RasterError::InvalidPalette(_))
        ));
    }

    #[test]
    fn test_empty_ramp_maps_blank() {
        let ramp: PaletteRamp =
            serde_json::from_str(r#"{"num_hues":0,"num_shades":10,"colors":[]}"#).unwrap();
        let mapper = PaletteMapper::new(ramp, stats(0.0, 100.0), RampTopology::Continuous, 1.0e10);
        assert_eq!(mapper.color_index(5.0, 0.5), None);
        assert_eq!(mapper.map(5.0, 0.5), BLANK);
    }

    #[test]
    fn test_hue_index_continuous_ends() {
        let s = stats(0.0, 100.0);
        assert_eq!(hue_index(0.0, &s, RampTopology::Continuous, 8), 8);
        assert_eq!(hue_index(100.0, &s, RampTopology::Continuous, 8), 0);
        assert_eq!(hue_index(50.0, &s, RampTopology::Continuous, 8), 4);
    }

    #[test]
    fn test_hue_index_zero_range() {
        let s = stats(5.0, 5.0);
        assert_eq!(hue_index(5.0, &s, RampTopology::Continuous, 8), 8);
    }

    #[test]
    fn test_restart_ignored_without_negative_minimum() {
        let s = stats(10.0, 110.0);
        assert_eq!(
            hue_index(60.0, &s, RampTopology::RestartAtZero, 8),
            hue_index(60.0, &s, RampTopology::Continuous, 8)
        );
    }

    #[test]
    fn test_blank_only_for_null() {
        let ramp = PaletteRamp::from_hsv_with_bands(8, 10, 0.0, 300.0, 1.0, 1.0).unwrap();
        let mapper = PaletteMapper::new(ramp, stats(0.0, 100.0), RampTopology::Continuous, 1.0e10);

        assert_eq!(mapper.map(1.0e10, 0.5), BLANK);
        assert_eq!(mapper.map(100.0, 0.5)[3], 255);
        assert_eq!(mapper.map(0.0, 1.0)[3], 255);
    }

    #[test]
    fn test_color_index_bounds() {
        let ramp = PaletteRamp::from_hsv_with_bands(8, 10, 0.0, 300.0, 1.0, 1.0).unwrap();
        let mapper = PaletteMapper::new(ramp, stats(0.0, 100.0), RampTopology::Continuous, 1.0e10);

        // Minimum value, full shade: last block, brightest shade.
        assert_eq!(mapper.color_index(0.0, 1.0), Some(70));
        // Minimum value, no shade clamps the offset to one: darkest shade.
        assert_eq!(mapper.color_index(0.0, 0.0), Some(79));
        // Maximum value clamps into the first entry.
        assert_eq!(mapper.color_index(100.0, 1.0), Some(0));
    }
}
