//! Configuration for a conversion run.
//!
//! Values layer in this order: defaults, an optional YAML file, then
//! `CHRTR_*` environment variables. Command-line flags are applied on top by
//! the service.

use std::path::{Path, PathBuf};

use chrtr_parser::read_area_file;
use renderer::{PaletteRamp, SunParams, NUMHUES, NUMSHADES};
use serde::{Deserialize, Serialize};
use surface_common::{
    AreaOfInterest, Compression, FathomDefinition, OutputMode, RampTopology, RenderOptions,
    SignConvention, Units, ValidationError,
};

use crate::error::{PipelineError, Result};
use crate::pipeline::Pipeline;

/// Full configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CHRTR (`.fin`) or CHRTR2 (`.ch2`) input grid
    pub input: Option<PathBuf>,

    /// Output GeoTIFF; the extension is forced to `.tif`
    pub output: Option<PathBuf>,

    /// Optional area-of-interest polygon file
    pub area_file: Option<PathBuf>,

    pub render: RenderOptions,

    pub sun: SunParams,

    pub palette: PaletteConfig,
}

/// How the color ramp is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Hue (degrees) at the maximum value.
    pub start_hue: f64,

    /// Hue (degrees) at the minimum value.
    pub end_hue: f64,

    pub saturation: f64,

    pub value: f64,

    pub num_hues: usize,

    pub num_shades: usize,

    /// JSON ramp file; overrides the HSV settings when present.
    pub file: Option<PathBuf>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            start_hue: 0.0,
            end_hue: 315.0,
            saturation: 1.0,
            value: 1.0,
            num_hues: NUMHUES,
            num_shades: NUMSHADES,
            file: None,
        }
    }
}

impl PaletteConfig {
    /// Build the ramp, loading the JSON file when one is configured.
    pub fn build_ramp(&self) -> Result<PaletteRamp> {
        match &self.file {
            Some(path) => Ok(PaletteRamp::from_json_file(path)?),
            None => Ok(PaletteRamp::from_hsv_with_bands(
                self.num_hues,
                self.num_shades,
                self.start_hue,
                self.end_hue,
                self.saturation,
                self.value,
            )?),
        }
    }
}

fn parse_bool(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

fn invalid(param: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidOption {
        param: param.to_string(),
        message: message.into(),
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Load a YAML file, then apply environment overrides.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::config(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_yaml(&text)?.with_env())
    }

    /// Parse YAML without consulting the environment.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `CHRTR_*` environment variables.
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());

        if let Some(val) = lookup("CHRTR_INPUT") {
            self.input = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("CHRTR_OUTPUT") {
            self.output = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("CHRTR_AREA_FILE") {
            self.area_file = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("CHRTR_OUTPUT_MODE") {
            match val.to_lowercase().as_str() {
                "grey" | "gray" => self.render.output = OutputMode::Grey,
                "color" => self.render.output = OutputMode::Color { transparent: false },
                "transparent" => self.render.output = OutputMode::Color { transparent: true },
                _ => {}
            }
        }

        if let Some(val) = lookup("CHRTR_COMPRESSION") {
            self.render.compression = Compression::from_str(&val);
        }

        if let Some(val) = lookup("CHRTR_UNITS") {
            match val.to_lowercase().as_str() {
                "meters" => self.render.units = Units::Meters,
                "fathoms" => self.render.units = Units::Fathoms(FathomDefinition::Standard),
                "legacy_fathoms" => self.render.units = Units::Fathoms(FathomDefinition::Legacy),
                _ => {}
            }
        }

        if let Some(val) = lookup("CHRTR_ELEVATION") {
            self.render.sign = if parse_bool(&val) {
                SignConvention::Elevation
            } else {
                SignConvention::Depth
            };
        }

        if let Some(val) = lookup("CHRTR_RESTART") {
            self.render.topology = if parse_bool(&val) {
                RampTopology::RestartAtZero
            } else {
                RampTopology::Continuous
            };
        }

        if let Some(v) = parsed("CHRTR_CONTOUR_INTERVAL") {
            self.render.contour_interval = v as f32;
        }

        if let Some(v) = parsed("CHRTR_SUN_AZIMUTH") {
            self.sun.azimuth = v;
        }

        if let Some(v) = parsed("CHRTR_SUN_ELEVATION") {
            self.sun.elevation = v;
        }

        if let Some(v) = parsed("CHRTR_EXAGGERATION") {
            self.sun.exaggeration = v;
        }

        if let Some(v) = parsed("CHRTR_MIN_SHADE") {
            self.sun.min_shade = v as f32;
        }

        if let Some(v) = parsed("CHRTR_START_HUE") {
            self.palette.start_hue = v;
        }

        if let Some(v) = parsed("CHRTR_END_HUE") {
            self.palette.end_hue = v;
        }

        if let Some(v) = parsed("CHRTR_SATURATION") {
            self.palette.saturation = v;
        }

        if let Some(v) = parsed("CHRTR_VALUE") {
            self.palette.value = v;
        }

        if let Some(val) = lookup("CHRTR_PALETTE_FILE") {
            self.palette.file = Some(PathBuf::from(val));
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let sun = &self.sun;
        if !(0.0..=360.0).contains(&sun.azimuth) {
            return Err(invalid("sun.azimuth", "must be 0-360 degrees"));
        }
        if !(0.0..=90.0).contains(&sun.elevation) {
            return Err(invalid("sun.elevation", "must be 0-90 degrees"));
        }
        if !(sun.exaggeration.is_finite() && sun.exaggeration > 0.0) {
            return Err(invalid("sun.exaggeration", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&sun.min_shade) {
            return Err(invalid("sun.min_shade", "must be 0-1"));
        }

        let interval = self.render.contour_interval;
        if !interval.is_finite() || interval < 0.0 {
            return Err(invalid("render.contour_interval", "must be >= 0"));
        }

        let palette = &self.palette;
        if !(0.0..=1.0).contains(&palette.saturation) {
            return Err(invalid("palette.saturation", "must be 0-1"));
        }
        if !(0.0..=1.0).contains(&palette.value) {
            return Err(invalid("palette.value", "must be 0-1"));
        }
        if palette.file.is_none() && (palette.num_hues == 0 || palette.num_shades == 0) {
            return Err(invalid("palette", "hue and shade counts must be > 0"));
        }

        Ok(())
    }

    /// Read the configured area file, if any.
    pub fn load_area(&self) -> Result<Option<AreaOfInterest>> {
        match &self.area_file {
            Some(path) => Ok(Some(read_area_file(path)?)),
            None => Ok(None),
        }
    }

    /// Validate and build a [`Pipeline`].
    pub fn build_pipeline(&self) -> Result<Pipeline> {
        self.validate()?;
        let ramp = self.palette.build_ramp()?;
        Ok(Pipeline::new(self.render.clone(), self.sun, ramp))
    }
}
