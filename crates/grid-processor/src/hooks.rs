//! Host callbacks invoked at row boundaries.

use surface_common::RunStats;

/// Progress and cancellation seam between the pipeline and its host.
///
/// Every method has a no-op default. The pipeline checks `is_cancelled`
/// before each row of both the statistics pass and the render loop.
pub trait PipelineHooks {
    fn is_cancelled(&self) -> bool {
        false
    }

    /// `done` of `total` rows scanned.
    fn on_stats_row(&mut self, _done: usize, _total: usize) {}

    fn on_stats_complete(&mut self, _stats: &RunStats) {}

    /// `done` of `total` scanlines written.
    fn on_scanline(&mut self, _done: usize, _total: usize) {}
}

/// Hooks that never cancel and ignore progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl PipelineHooks for NoopHooks {}
