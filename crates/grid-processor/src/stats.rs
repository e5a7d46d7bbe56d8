//! Statistics pass: load the window into memory with conversions applied.

use chrtr_parser::GridSource;
use surface_common::{ElevationMatrix, RenderOptions, RunStats, ValidationError, Window};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::hooks::PipelineHooks;

/// Read every window row (south first) into an [`ElevationMatrix`].
///
/// Valid cells get unit conversion then the sign policy; null cells store the
/// source's null sentinel. Min/max cover valid cells only.
pub fn scan_window(
    source: &mut dyn GridSource,
    window: &Window,
    options: &RenderOptions,
    hooks: &mut dyn PipelineHooks,
) -> Result<(ElevationMatrix, RunStats)> {
    let null_value = source.header().null_value;
    let mut matrix = ElevationMatrix::new(window.width, window.height, null_value);
    let mut stats: Option<RunStats> = None;

    for i in 0..window.height {
        if hooks.is_cancelled() {
            return Err(PipelineError::cancelled("stats", i));
        }

        let cells = source.read_row(window.y_start + i, window.x_start, window.width)?;
        let row = matrix.row_mut(i);

        for (slot, cell) in row.iter_mut().zip(cells.iter()) {
            if cell.valid {
                let z = options.convert(cell.value);
                *slot = z;
                RunStats::accumulate(&mut stats, z);
            } else {
                *slot = null_value;
            }
        }

        metrics::counter!("chrtr_rows_scanned_total").increment(1);
        hooks.on_stats_row(i + 1, window.height);
    }

    let stats = stats.ok_or(ValidationError::NoValidCells)?;

    info!(
        min_z = stats.min_z,
        max_z = stats.max_z,
        valid_cells = stats.valid_cells,
        rows = window.height,
        "Statistics pass complete"
    );
    debug!(null_value, "Null cells carry the source sentinel");

    hooks.on_stats_complete(&stats);

    Ok((matrix, stats))
}
