//! CHRTR to GeoTIFF converter.
//!
//! Reads a CHRTR (`.fin`) or CHRTR2 (`.ch2`) surface, optionally clipped to an
//! area file, and writes a georeferenced GeoTIFF with optional contours.

mod progress;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use grid_processor::PipelineConfig;
use surface_common::{
    Compression, FathomDefinition, OutputMode, RampTopology, SignConvention, Units,
};

use progress::ProgressHooks;

#[derive(Parser, Debug)]
#[command(name = "chrtr-geotiff")]
#[command(about = "Convert CHRTR/CHRTR2 grids into hillshaded GeoTIFF")]
struct Args {
    /// Input grid (.fin or .ch2)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output GeoTIFF (.tif is appended when missing)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Area-of-interest file, one `lat, lon` vertex per line
    #[arg(short, long)]
    area: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long, env = "CHRTR_CONFIG")]
    config: Option<PathBuf>,

    /// Write 32-bit float values instead of a color image
    #[arg(long, conflicts_with = "transparent")]
    grey: bool,

    /// Add an alpha band so empty cells are transparent
    #[arg(long)]
    transparent: bool,

    /// PackBits compression for Caris compatibility
    #[arg(long)]
    caris: bool,

    /// Convert meters to fathoms (6 ft per fathom)
    #[arg(long, conflicts_with = "legacy_fathoms")]
    fathoms: bool,

    /// Convert meters to fathoms at 1500 m/s sound velocity
    #[arg(long)]
    legacy_fathoms: bool,

    /// Output elevations (positive up) instead of depths
    #[arg(long)]
    elevation: bool,

    /// Restart the color ramp at zero
    #[arg(long)]
    restart: bool,

    /// Contour interval in output units (0 disables contours)
    #[arg(long)]
    contour_interval: Option<f32>,

    /// Sun azimuth in degrees clockwise from north
    #[arg(long)]
    azimuth: Option<f64>,

    /// Sun elevation in degrees above the horizon
    #[arg(long)]
    sun_elevation: Option<f64>,

    /// Vertical exaggeration for shading
    #[arg(long)]
    exaggeration: Option<f64>,

    /// Darkest shade factor (0-1)
    #[arg(long)]
    min_shade: Option<f32>,

    /// Hue at the maximum value, in degrees
    #[arg(long)]
    start_hue: Option<f64>,

    /// Hue at the minimum value, in degrees
    #[arg(long)]
    end_hue: Option<f64>,

    /// Palette saturation (0-1)
    #[arg(long)]
    saturation: Option<f64>,

    /// Palette brightness (0-1)
    #[arg(long)]
    value: Option<f64>,

    /// JSON palette ramp, overrides the hue settings
    #[arg(long)]
    palette: Option<PathBuf>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Flags override whatever the config file and environment set.
    fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(input) = &self.input {
            config.input = Some(input.clone());
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if let Some(area) = &self.area {
            config.area_file = Some(area.clone());
        }

        let render = &mut config.render;
        if self.grey {
            render.output = OutputMode::Grey;
        } else if self.transparent {
            render.output = OutputMode::Color { transparent: true };
        }
        if self.caris {
            render.compression = Compression::PackBits;
        }
        if self.fathoms {
            render.units = Units::Fathoms(FathomDefinition::Standard);
        } else if self.legacy_fathoms {
            render.units = Units::Fathoms(FathomDefinition::Legacy);
        }
        if self.elevation {
            render.sign = SignConvention::Elevation;
        }
        if self.restart {
            render.topology = RampTopology::RestartAtZero;
        }
        if let Some(interval) = self.contour_interval {
            render.contour_interval = interval;
        }

        let sun = &mut config.sun;
        if let Some(v) = self.azimuth {
            sun.azimuth = v;
        }
        if let Some(v) = self.sun_elevation {
            sun.elevation = v;
        }
        if let Some(v) = self.exaggeration {
            sun.exaggeration = v;
        }
        if let Some(v) = self.min_shade {
            sun.min_shade = v;
        }

        let palette = &mut config.palette;
        if let Some(v) = self.start_hue {
            palette.start_hue = v;
        }
        if let Some(v) = self.end_hue {
            palette.end_hue = v;
        }
        if let Some(v) = self.saturation {
            palette.saturation = v;
        }
        if let Some(v) = self.value {
            palette.value = v;
        }
        if let Some(path) = &self.palette {
            palette.file = Some(path.clone());
        }

        config
    }
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    let config = match &args.config {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::from_env(),
    };
    let config = args.apply(config);

    let Some(input) = config.input.clone() else {
        bail!("no input grid given (--input or CHRTR_INPUT)");
    };
    let output = config
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension("tif"));

    info!(input = %input.display(), output = %output.display(), "Starting conversion");

    let area = config.load_area().context("reading area file")?;
    let pipeline = config.build_pipeline().context("invalid configuration")?;

    let mut hooks = ProgressHooks::new();
    let report = pipeline
        .run(&input, &output, area.as_ref(), &mut hooks)
        .with_context(|| format!("converting {}", input.display()))?;

    for entry in report.log.entries() {
        println!("{}", entry.message);
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Wrote run report");
    }

    if !report.failed_rows.is_empty() {
        tracing::warn!(failed = report.failed_rows.len(), "Some scanlines were written blank");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "chrtr-geotiff",
            "--input",
            "survey.ch2",
            "--grey",
            "--legacy-fathoms",
            "--restart",
            "--contour-interval",
            "5",
            "--sun-elevation",
            "60",
        ]);
        let config = args.apply(PipelineConfig::default());

        assert_eq!(config.input, Some(PathBuf::from("survey.ch2")));
        assert_eq!(config.render.output, OutputMode::Grey);
        assert_eq!(config.render.units, Units::Fathoms(FathomDefinition::Legacy));
        assert_eq!(config.render.topology, RampTopology::RestartAtZero);
        assert_eq!(config.render.contour_interval, 5.0);
        assert_eq!(config.sun.elevation, 60.0);
        assert_eq!(config.render.sign, SignConvention::Depth);
    }

    #[test]
    fn test_grey_conflicts_with_transparent() {
        let result = Args::try_parse_from(["chrtr-geotiff", "--grey", "--transparent"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let mut base = PipelineConfig::default();
        base.render.compression = Compression::PackBits;
        base.sun.azimuth = 200.0;

        let args = Args::parse_from(["chrtr-geotiff"]);
        let config = args.apply(base.clone());
        assert_eq!(config, base);
    }
}
