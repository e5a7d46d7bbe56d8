//! Render options consumed once at pipeline start.

use serde::{Deserialize, Serialize};

/// Meters per fathom using 6 ft/fathom.
pub const STANDARD_FATHOM_METERS: f32 = 1.8288;

/// Meters per fathom derived from a 1500 m/s sound velocity.
pub const LEGACY_FATHOM_METERS: f32 = 1.875;

/// Output band layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputMode {
    /// One 32-bit float band carrying the converted values.
    Grey,
    /// Palette-mapped 8-bit RGB, plus alpha when `transparent`.
    Color { transparent: bool },
}

impl OutputMode {
    pub fn band_count(&self) -> usize {
        match self {
            OutputMode::Grey => 1,
            OutputMode::Color { transparent: false } => 3,
            OutputMode::Color { transparent: true } => 4,
        }
    }

    pub fn is_grey(&self) -> bool {
        matches!(self, OutputMode::Grey)
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Color { transparent: false }
    }
}

/// Output compression. Neither layout is tiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Dictionary-based lossless compression.
    #[default]
    Lzw,
    /// Run-length compression readable by Caris.
    PackBits,
}

impl Compression {
    pub fn from_caris(caris: bool) -> Self {
        if caris {
            Compression::PackBits
        } else {
            Compression::Lzw
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "packbits" | "caris" => Compression::PackBits,
            _ => Compression::Lzw,
        }
    }
}

/// Which fathom the grid is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FathomDefinition {
    /// 6 ft (4800 ft/s sound velocity)
    #[default]
    Standard,
    /// 1500 m/s sound velocity
    Legacy,
}

impl FathomDefinition {
    pub fn meters(&self) -> f32 {
        match self {
            FathomDefinition::Standard => STANDARD_FATHOM_METERS,
            FathomDefinition::Legacy => LEGACY_FATHOM_METERS,
        }
    }
}

/// Units of the stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "units", content = "fathom", rename_all = "snake_case")]
pub enum Units {
    /// Native meters, no conversion.
    #[default]
    Meters,
    Fathoms(FathomDefinition),
}

impl Units {
    /// Convert a native meter value.
    #[inline]
    pub fn convert(&self, meters: f32) -> f32 {
        match self {
            Units::Meters => meters,
            Units::Fathoms(def) => meters / def.meters(),
        }
    }
}

/// Sign convention of the stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    /// Native depth, positive down.
    #[default]
    Depth,
    /// Negated depth, positive up.
    Elevation,
}

impl SignConvention {
    #[inline]
    pub fn apply(&self, value: f32) -> f32 {
        match self {
            SignConvention::Depth => value,
            SignConvention::Elevation => -value,
        }
    }

    /// +1 when stored values increase upward.
    pub fn relief_sign(&self) -> f64 {
        match self {
            SignConvention::Depth => -1.0,
            SignConvention::Elevation => 1.0,
        }
    }
}

/// Color ramp topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampTopology {
    /// One ramp from minimum to maximum.
    #[default]
    Continuous,
    /// Independent ramps below and above zero (only when the minimum is negative).
    RestartAtZero,
}

/// Immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub output: OutputMode,
    pub compression: Compression,
    pub units: Units,
    pub sign: SignConvention,
    pub topology: RampTopology,
    /// Contour interval in output units; 0 disables contouring
    pub contour_interval: f32,
}

impl RenderOptions {
    /// Combined unit conversion and sign policy for a native value.
    #[inline]
    pub fn convert(&self, native: f32) -> f32 {
        self.sign.apply(self.units.convert(native))
    }

    pub fn contours_enabled(&self) -> bool {
        self.contour_interval > 0.0
    }

    /// Human-readable check list of the chosen options.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();

        lines.push(match self.compression {
            Compression::Lzw => "LZW compressed output format".to_string(),
            Compression::PackBits => "Caris compatible (PackBits) output format".to_string(),
        });

        lines.push(match self.sign {
            SignConvention::Depth => "Data will be output as depths".to_string(),
            SignConvention::Elevation => "Data will be output as elevations".to_string(),
        });

        lines.push(match self.units {
            Units::Meters => "Units : Meters".to_string(),
            Units::Fathoms(FathomDefinition::Standard) => {
                "Units : Fathoms (4800 ft/sec)".to_string()
            }
            Units::Fathoms(FathomDefinition::Legacy) => "Units : Fathoms (1500 m/sec)".to_string(),
        });

        if self.contours_enabled() {
            lines.push(format!(
                "Contour file will be generated with a contour interval of {:.2}",
                self.contour_interval
            ));
        }

        match self.output {
            OutputMode::Grey => {
                lines.push("Output is 32 bit floating point elevations".to_string());
            }
            OutputMode::Color { transparent } => {
                lines.push(if transparent {
                    "Empty cells are transparent".to_string()
                } else {
                    "Empty cells are blank".to_string()
                });
                lines.push(match self.topology {
                    RampTopology::Continuous => {
                        "Color map is continuous from minimum to maximum".to_string()
                    }
                    RampTopology::RestartAtZero => {
                        "Color map starts over at zero boundary".to_string()
                    }
                });
            }
        }

        lines
    }
}
