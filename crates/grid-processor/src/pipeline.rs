//! Window → statistics → scanlines → raster → contours.
//!
//! The run loads the snapped window into memory once, then streams output
//! rows north to south. Each color row is shaded against the row above it, so
//! only the previous row reference is carried between iterations.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrtr_parser::{open_grid, GridSource};
use renderer::contour::generate_contours;
use renderer::{
    GeoReference, GeoreferencedRaster, Illuminator, PaletteMapper, PaletteRamp, RasterFile,
    RasterSpec, RasterSummary, Rgba, Scanline, ScanlineSink, SunParams,
};
use serde::Serialize;
use surface_common::{
    AreaOfInterest, CellSizeMeters, ElevationMatrix, GridHeader, OutputMode, RenderOptions,
    RunStats, Window,
};
use tracing::{debug, error, info, warn};

use crate::area::select_window;
use crate::error::{PipelineError, Result};
use crate::hooks::PipelineHooks;
use crate::runlog::RunLog;
use crate::stats::scan_window;

/// How one output row is produced from its matrix row.
#[derive(Debug, Clone)]
enum RowStyle {
    Grey,
    Color {
        illuminator: Illuminator,
        mapper: PaletteMapper,
    },
}

/// Turns matrix rows into scanlines, reusing its buffers between rows.
#[derive(Debug, Clone)]
pub struct RowRenderer {
    style: RowStyle,
    shades: Vec<f32>,
    pixels: Vec<Rgba>,
}

impl RowRenderer {
    /// Rows pass through unchanged as float values.
    pub fn grey() -> Self {
        Self {
            style: RowStyle::Grey,
            shades: Vec::new(),
            pixels: Vec::new(),
        }
    }

    /// Rows are shaded then mapped through the palette.
    pub fn color(illuminator: Illuminator, mapper: PaletteMapper) -> Self {
        Self {
            style: RowStyle::Color {
                illuminator,
                mapper,
            },
            shades: Vec::new(),
            pixels: Vec::new(),
        }
    }

    /// Render `current`, using `north` as the neighbor row for shading.
    pub fn render<'a>(&'a mut self, north: &[f32], current: &'a [f32]) -> Scanline<'a> {
        match &self.style {
            RowStyle::Grey => Scanline::Grey(current),
            RowStyle::Color {
                illuminator,
                mapper,
            } => {
                illuminator.shade_row(north, current, &mut self.shades);
                mapper.map_row(current, &self.shades, &mut self.pixels);
                Scanline::Color(&self.pixels)
            }
        }
    }
}

/// Stream every matrix row into `sink`, northernmost first.
///
/// The first output row is shaded against itself. A rejected scanline is
/// logged and counted and the loop moves on. Cancellation, or a sink that
/// could not keep the row slot, stops it. Returns the output rows that failed.
pub fn render_scanlines<S: ScanlineSink + ?Sized>(
    matrix: &ElevationMatrix,
    renderer: &mut RowRenderer,
    sink: &mut S,
    hooks: &mut dyn PipelineHooks,
    log: &mut RunLog,
) -> Result<Vec<usize>> {
    let height = matrix.height();
    let mut failed = Vec::new();
    let mut north: Option<&[f32]> = None;

    for (k, i) in (0..height).rev().enumerate() {
        if hooks.is_cancelled() {
            return Err(PipelineError::cancelled("render", k));
        }

        let current = matrix.row(i);
        let line = renderer.render(north.unwrap_or(current), current);

        if let Err(e) = sink.write_scanline(line) {
            if !e.is_scanline_error() {
                return Err(e.into());
            }
            warn!(row = k, error = %e, "Scanline write failed");
            metrics::counter!("chrtr_scanline_failures_total").increment(1);
            log.failure(Some(k), format!("Failed a TIFF scanline write - row {}", k), &e);
            failed.push(k);
        }

        north = Some(current);
        hooks.on_scanline(k + 1, height);
    }

    metrics::counter!("chrtr_scanlines_total").increment(height as u64);

    Ok(failed)
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contour_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contour_segments: Option<usize>,
    pub window: Window,
    pub stats: RunStats,
    pub rows: usize,
    pub columns: usize,
    /// Output rows whose scanline write failed
    pub failed_rows: Vec<usize>,
    pub log: RunLog,
}

/// A configured conversion, reusable across inputs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: RenderOptions,
    sun: SunParams,
    ramp: PaletteRamp,
}

impl Pipeline {
    pub fn new(options: RenderOptions, sun: SunParams, ramp: PaletteRamp) -> Self {
        Self { options, sun, ramp }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn sun(&self) -> &SunParams {
        &self.sun
    }

    pub fn ramp(&self) -> &PaletteRamp {
        &self.ramp
    }

    /// Convert the grid at `input` into a GeoTIFF at `output`.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        area: Option<&AreaOfInterest>,
        hooks: &mut dyn PipelineHooks,
    ) -> Result<RunReport> {
        info!(input = %input.display(), "Opening grid");
        let mut source = open_grid(input)?;
        self.run_source(source.as_mut(), output, area, hooks)
    }

    /// Convert from an already opened source.
    pub fn run_source(
        &self,
        source: &mut dyn GridSource,
        output: &Path,
        area: Option<&AreaOfInterest>,
        hooks: &mut dyn PipelineHooks,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let result = self.execute(source, output, area, hooks);

        let outcome = match &result {
            Ok(_) => "ok",
            Err(PipelineError::Cancelled { .. }) => "cancelled",
            Err(_) => "error",
        };
        metrics::counter!("chrtr_runs_total", "outcome" => outcome).increment(1);
        metrics::histogram!("chrtr_run_duration_seconds").record(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            error!(error = %e, outcome, "Conversion failed");
        }
        result
    }

    fn execute(
        &self,
        source: &mut dyn GridSource,
        output: &Path,
        area: Option<&AreaOfInterest>,
        hooks: &mut dyn PipelineHooks,
    ) -> Result<RunReport> {
        let mut log = RunLog::new();
        for line in self.options.describe() {
            log.info(line);
        }

        let header = source.header().clone();
        info!(
            format = source.format().name(),
            width = header.width,
            height = header.height,
            bounds = %header.bounds,
            "Grid header read"
        );

        let window = select_window(&header, area)?;

        let (matrix, stats) = scan_window(source, &window, &self.options, hooks)?;
        log.info(format!(
            "Minimum value {}, maximum value {} ({} valid cells)",
            stats.min_z, stats.max_z, stats.valid_cells
        ));

        let mut renderer = self.row_renderer(&header, &window, stats);

        let spec = RasterSpec {
            width: window.width,
            height: window.height,
            mode: self.options.output,
            compression: self.options.compression,
            null_value: header.null_value,
        };
        let geo = GeoReference {
            bounds: window.bounds,
            x_cell_degrees: header.x_cell_degrees,
            y_cell_degrees: header.y_cell_degrees,
        };

        let mut raster = RasterFile::create(output, spec)?.set_georeference(geo);
        let output_path = raster.path().to_path_buf();

        let rendered = stream_raster(&mut raster, &matrix, &mut renderer, hooks, &mut log);
        drop(raster);

        let (summary, failed_rows) = match rendered {
            Ok(done) => done,
            Err(e) => {
                discard_partial(&output_path);
                return Err(e);
            }
        };

        log.info(format!("Created TIFF file {}", summary.path.display()));
        log.info(format!("{} rows by {} columns", summary.height, summary.width));

        let (contour_path, contour_segments) = if self.options.contours_enabled() {
            self.write_contours(&matrix, &window, &header, &stats, &summary.path, &mut log)
        } else {
            (None, None)
        };

        info!(
            path = %summary.path.display(),
            rows = summary.height,
            columns = summary.width,
            failed = failed_rows.len(),
            "Conversion complete"
        );
        log.info("Conversion complete");

        Ok(RunReport {
            output_path: summary.path,
            contour_path,
            contour_segments,
            window,
            stats,
            rows: summary.height,
            columns: summary.width,
            failed_rows,
            log,
        })
    }

    fn row_renderer(
        &self,
        header: &GridHeader,
        window: &Window,
        stats: RunStats,
    ) -> RowRenderer {
        match self.options.output {
            OutputMode::Grey => RowRenderer::grey(),
            OutputMode::Color { .. } => {
                let cell = CellSizeMeters::from_degrees(
                    header.x_cell_degrees,
                    header.y_cell_degrees,
                    window.bounds.mid_latitude(),
                );
                debug!(x_m = cell.x, y_m = cell.y, "Cell size for shading");

                let illuminator = Illuminator::new(self.sun, cell.x, cell.y)
                    .with_null_value(header.null_value)
                    .with_relief_sign(self.options.sign.relief_sign());
                let mapper = PaletteMapper::new(
                    self.ramp.clone(),
                    stats,
                    self.options.topology,
                    header.null_value,
                );
                RowRenderer::color(illuminator, mapper)
            }
        }
    }

    /// Contour failures are logged; the raster is already complete.
    fn write_contours(
        &self,
        matrix: &ElevationMatrix,
        window: &Window,
        header: &GridHeader,
        stats: &RunStats,
        raster_path: &Path,
        log: &mut RunLog,
    ) -> (Option<PathBuf>, Option<usize>) {
        let result = generate_contours(
            window.width,
            window.height,
            window.bounds.west,
            window.bounds.south,
            stats.min_z,
            stats.max_z,
            matrix,
            raster_path,
            &self.options,
            header.x_cell_degrees,
            header.y_cell_degrees,
        );

        match result {
            Ok(segments) => {
                log.info(format!("Generated {} contour segments", segments));
                (
                    Some(renderer::contour::contour_path(raster_path)),
                    Some(segments),
                )
            }
            Err(e) => {
                warn!(error = %e, "Contour generation failed");
                log.failure(None, "Contour generation failed", &e);
                (None, None)
            }
        }
    }
}

/// Allocate bands, stream every row and close the image.
fn stream_raster(
    raster: &mut GeoreferencedRaster,
    matrix: &ElevationMatrix,
    renderer: &mut RowRenderer,
    hooks: &mut dyn PipelineHooks,
    log: &mut RunLog,
) -> Result<(RasterSummary, Vec<usize>)> {
    let mut bands = raster.allocate_bands()?;
    let failed = render_scanlines(matrix, renderer, &mut bands, hooks, log)?;
    let summary = bands.finish()?;
    Ok((summary, failed))
}

fn discard_partial(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Could not remove partial output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopHooks;
    use renderer::{RasterError, RasterResult};

    /// Collects scanlines, rejects the rows listed in `reject` and loses the
    /// slot of the row in `lose`.
    #[derive(Default)]
    struct RecordingSink {
        reject: Vec<usize>,
        lose: Option<usize>,
        grey: Vec<Vec<f32>>,
        color: Vec<Vec<Rgba>>,
        slots: usize,
    }

    impl ScanlineSink for RecordingSink {
        fn write_scanline(&mut self, line: Scanline<'_>) -> RasterResult<()> {
            let row = self.slots;
            if self.lose == Some(row) {
                return Err(RasterError::RowLost {
                    row,
                    source: Box::new(RasterError::Contour("disk gone".to_string())),
                });
            }
            self.slots += 1;
            if self.reject.contains(&row) {
                return Err(RasterError::ScanlineLength {
                    row,
                    expected: 0,
                    got: line.len(),
                });
            }
            match line {
                Scanline::Grey(values) => self.grey.push(values.to_vec()),
                Scanline::Color(pixels) => self.color.push(pixels.to_vec()),
            }
            Ok(())
        }

        fn rows_written(&self) -> usize {
            self.slots
        }
    }

    fn matrix() -> ElevationMatrix {
        // Row 0 is south.
        ElevationMatrix::from_vec(2, 3, 1.0e10, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap()
    }

    #[test]
    fn test_grey_rows_north_first() {
        let mut sink = RecordingSink::default();
        let mut log = RunLog::new();
        let failed = render_scanlines(
            &matrix(),
            &mut RowRenderer::grey(),
            &mut sink,
            &mut NoopHooks,
            &mut log,
        )
        .unwrap();

        assert!(failed.is_empty());
        assert_eq!(sink.grey, vec![vec![5.0, 6.0], vec![3.0, 4.0], vec![1.0, 2.0]]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_failed_row_logged_and_loop_continues() {
        let mut sink = RecordingSink {
            reject: vec![1],
            ..Default::default()
        };
        let mut log = RunLog::new();
        let failed = render_scanlines(
            &matrix(),
            &mut RowRenderer::grey(),
            &mut sink,
            &mut NoopHooks,
            &mut log,
        )
        .unwrap();

        assert_eq!(failed, vec![1]);
        assert_eq!(sink.slots, 3);
        assert_eq!(sink.grey, vec![vec![5.0, 6.0], vec![1.0, 2.0]]);
        assert!(log
            .messages()
            .any(|m| m.starts_with("Failed a TIFF scanline write - row 1")));
    }

    #[test]
    fn test_lost_row_slot_stops_loop() {
        let mut sink = RecordingSink {
            lose: Some(1),
            ..Default::default()
        };
        let mut log = RunLog::new();
        let result = render_scanlines(
            &matrix(),
            &mut RowRenderer::grey(),
            &mut sink,
            &mut NoopHooks,
            &mut log,
        );

        assert!(matches!(
            result,
            Err(PipelineError::Raster(RasterError::RowLost { row: 1, .. }))
        ));
        assert_eq!(sink.grey, vec![vec![5.0, 6.0]]);
    }

    #[test]
    fn test_color_row_uses_previous_row_as_north() {
        let sun = SunParams {
            azimuth: 0.0,
            elevation: 45.0,
            exaggeration: 1.0,
            min_shade: 0.0,
        };
        let stats = RunStats {
            min_z: 1.0,
            max_z: 6.0,
            valid_cells: 6,
        };
        let ramp = PaletteRamp::from_hsv_with_bands(4, 10, 0.0, 240.0, 1.0, 1.0).unwrap();
        let illuminator = Illuminator::new(sun, 1.0, 1.0);
        let mapper = PaletteMapper::new(ramp, stats, Default::default(), 1.0e10);
        let mut renderer = RowRenderer::color(illuminator.clone(), mapper.clone());

        let m = matrix();
        let mut sink = RecordingSink::default();
        render_scanlines(&m, &mut renderer, &mut sink, &mut NoopHooks, &mut RunLog::new()).unwrap();

        let mut shades = Vec::new();
        let mut expected = Vec::new();
        illuminator.shade_row(m.row(2), m.row(1), &mut shades);
        mapper.map_row(m.row(1), &shades, &mut expected);
        assert_eq!(sink.color[1], expected);

        illuminator.shade_row(m.row(2), m.row(2), &mut shades);
        mapper.map_row(m.row(2), &shades, &mut expected);
        assert_eq!(sink.color[0], expected);
    }
}
