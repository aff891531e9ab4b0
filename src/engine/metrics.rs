//! Engine run metrics.
//!
//! Returned by [`Pipeline::run_with_metrics`](crate::engine::Pipeline::run_with_metrics)
//! for profiling and for inspecting what each stage did. The plain
//! [`Pipeline::run`](crate::engine::Pipeline::run) path collects the same
//! numbers; they are cheap counters and clock reads.

use std::time::Duration;

use super::resolve::ResolveCounts;

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Total elapsed time for the run.
    pub total: Duration,
    /// Raw candidates produced by the extraction rules.
    pub extract: StageMetrics,
    /// Containment and negative-pattern pruning.
    pub prune: StageMetrics,
    /// Phrase merging.
    pub merge: StageMetrics,
    /// Range detection.
    pub ranges: StageMetrics,
    /// Verb assignment and semantic resolution.
    pub resolve: StageMetrics,
    pub counts: ResolveCounts,
}

/// Timing and counts for a single stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageMetrics {
    pub duration: Duration,
    /// Candidates created by the stage.
    pub produced: usize,
    /// Candidates detached by the stage.
    pub removed: usize,
}

impl RunMetrics {
    /// Stages in pipeline order, labelled for reports.
    pub fn stages(&self) -> [(&'static str, &StageMetrics); 5] {
        [
            ("extract", &self.extract),
            ("prune", &self.prune),
            ("merge", &self.merge),
            ("ranges", &self.ranges),
            ("resolve", &self.resolve),
        ]
    }
}
