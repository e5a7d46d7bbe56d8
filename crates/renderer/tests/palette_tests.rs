//! Tests for palette ramps and value-to-color mapping.

use renderer::palette::{hue_index, PaletteMapper, PaletteRamp, Rgb, BLANK, NUMHUES, NUMSHADES};
use renderer::RasterError;
use surface_common::{RampTopology, RunStats};

fn stats(min_z: f32, max_z: f32) -> RunStats {
    RunStats {
        min_z,
        max_z,
        valid_cells: 10,
    }
}

fn small_ramp() -> PaletteRamp {
    PaletteRamp::from_hsv_with_bands(8, 10, 0.0, 240.0, 1.0, 1.0).unwrap()
}

// ============================================================================
// hue_index tests
// ============================================================================

#[test]
fn test_continuous_boundaries() {
    let s = stats(0.0, 100.0);
    assert_eq!(hue_index(0.0, &s, RampTopology::Continuous, 8), 8);
    assert_eq!(hue_index(100.0, &s, RampTopology::Continuous, 8), 0);
}

#[test]
fn test_continuous_is_monotonic() {
    let s = stats(-20.0, 80.0);
    let mut last = i64::MAX;
    for step in 0..=100 {
        let v = -20.0 + step as f32;
        let hue = hue_index(v, &s, RampTopology::Continuous, NUMHUES);
        assert!(hue <= last, "hue rose at {}", v);
        last = hue;
    }
}

#[test]
fn test_zero_crossing_extremes() {
    let s = stats(-50.0, 100.0);
    assert_eq!(hue_index(-50.0, &s, RampTopology::RestartAtZero, 8), 8);
    assert_eq!(hue_index(100.0, &s, RampTopology::RestartAtZero, 8), 0);
}

#[test]
fn test_zero_crossing_restarts_at_zero() {
    let s = stats(-50.0, 100.0);
    // Both sides of zero sweep the whole hue range.
    assert_eq!(hue_index(0.0, &s, RampTopology::RestartAtZero, 8), 8);
    assert_eq!(hue_index(-25.0, &s, RampTopology::RestartAtZero, 8), 4);
    assert_eq!(hue_index(50.0, &s, RampTopology::RestartAtZero, 8), 4);
}

// ============================================================================
// PaletteRamp tests
// ============================================================================

#[test]
fn test_hsv_ramp_darkens_within_block() {
    let ramp = small_ramp();
    let bright = ramp.get(0).unwrap();
    let dark = ramp.get(9).unwrap();
    assert_eq!(bright, Rgb::new(255, 0, 0));
    assert!(dark.r < bright.r);
}

#[test]
fn test_hsv_ramp_sweeps_hue_across_blocks() {
    let ramp = small_ramp();
    assert_eq!(ramp.get(0).unwrap(), Rgb::new(255, 0, 0));
    assert_eq!(ramp.get(70).unwrap(), Rgb::new(0, 0, 255));
}

#[test]
fn test_ramp_json_roundtrip() {
    let ramp = small_ramp();
    let json = serde_json::to_string(&ramp).unwrap();
    let loaded = PaletteRamp::from_json(&json).unwrap();
    assert_eq!(loaded, ramp);
}

#[test]
fn test_ramp_json_wrong_length() {
    let json = r#"{"num_hues":2,"num_shades":2,"colors":[{"r":1,"g":2,"b":3}]}"#;
    assert!(matches!(
        PaletteRamp::from_json(json),
        Err(RasterError::InvalidPalette(_))
    ));
}

#[test]
fn test_ramp_json_malformed() {
    assert!(matches!(PaletteRamp::from_json("{"), Err(RasterError::Json(_))));
}

#[test]
fn test_default_ramp_dimensions() {
    let ramp = PaletteRamp::default();
    assert_eq!(ramp.num_hues(), NUMHUES);
    assert_eq!(ramp.num_shades(), NUMSHADES);
}

// ============================================================================
// PaletteMapper tests
// ============================================================================

#[test]
fn test_null_is_blank_in_any_topology() {
    for topology in [RampTopology::Continuous, RampTopology::RestartAtZero] {
        let mapper = PaletteMapper::new(small_ramp(), stats(-10.0, 10.0), topology, 999_999.0);
        assert_eq!(mapper.map(999_999.0, 1.0), BLANK);
        assert_eq!(mapper.map(2.0e6, 0.5), BLANK);
    }
}

#[test]
fn test_valid_cells_are_opaque_at_every_shade() {
    let mapper = PaletteMapper::new(small_ramp(), stats(0.0, 100.0), RampTopology::Continuous, 1.0e10);
    for value in [0.0, 1.0, 50.0, 99.9, 100.0] {
        for shade in [0.0, 0.25, 0.5, 1.0] {
            assert_eq!(mapper.map(value, shade)[3], 255, "value {} shade {}", value, shade);
        }
    }
}

#[test]
fn test_brighter_shade_gives_brighter_color() {
    let mapper = PaletteMapper::new(small_ramp(), stats(0.0, 100.0), RampTopology::Continuous, 1.0e10);
    let dark = mapper.map(10.0, 0.2);
    let bright = mapper.map(10.0, 0.9);
    let sum = |p: [u8; 4]| p[0] as u32 + p[1] as u32 + p[2] as u32;
    assert!(sum(bright) > sum(dark));
}

#[test]
fn test_map_row() {
    let mapper = PaletteMapper::new(small_ramp(), stats(0.0, 100.0), RampTopology::Continuous, 1.0e10);
    let mut out = Vec::new();
    mapper.map_row(&[0.0, 1.0e10, 100.0], &[1.0, 1.0, 1.0], &mut out);
    assert_eq!(out.len(), 3);
    assert_eq!(out[1], BLANK);
    assert_eq!(out[0][3], 255);
}
