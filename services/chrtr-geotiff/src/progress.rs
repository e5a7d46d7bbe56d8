//! Progress reporting for the command-line run.

use grid_processor::PipelineHooks;
use surface_common::RunStats;
use tracing::{debug, info};

/// Logs each pass at every tenth of its rows.
#[derive(Debug, Default)]
pub struct ProgressHooks {
    last_stats_decile: usize,
    last_scanline_decile: usize,
}

impl ProgressHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

fn decile(done: usize, total: usize) -> usize {
    if total == 0 {
        10
    } else {
        done * 10 / total
    }
}

impl PipelineHooks for ProgressHooks {
    fn on_stats_row(&mut self, done: usize, total: usize) {
        let d = decile(done, total);
        if d > self.last_stats_decile {
            self.last_stats_decile = d;
            debug!(percent = d * 10, rows = done, total, "Reading grid");
        }
    }

    fn on_stats_complete(&mut self, stats: &RunStats) {
        info!(
            min_z = stats.min_z,
            max_z = stats.max_z,
            valid_cells = stats.valid_cells,
            "Grid statistics"
        );
    }

    fn on_scanline(&mut self, done: usize, total: usize) {
        let d = decile(done, total);
        if d > self.last_scanline_decile {
            self.last_scanline_decile = d;
            debug!(percent = d * 10, rows = done, total, "Writing scanlines");
        }
    }
}
