//! Extraction and resolution engine.
//!
//! This module is the *entry point* for running a [`RuleSet`] over a
//! [`Document`]. The work is split into focused submodules under
//! `src/engine/`, one per stage.
//!
//! ## How the parts work together
//!
//! ```text
//! rules ── RuleSet::builder().build()   (rules/mod.rs)
//!            compiles every pattern into an Automaton (automaton.rs)
//!                               │
//! tokens ── Document::new ──────┤  compound split, flags, numeral phrases
//!                               v
//!                     extract (extract.rs)
//!                       - scan sentences token by token
//!                       - bind captures, apply filters
//!                               │
//!                               v
//!                     prune (prune.rs)
//!                       - drop contained candidates
//!                       - negative patterns
//!                               │
//!                               v
//!                     merge_phrases (merge.rs)
//!                       - adjacent runs, tag links, range integrity
//!                               │
//!                               v
//!                     merge_ranges (ranges.rs)
//!                       - pivots, sides, split points
//!                               │
//!                               v
//!                     Resolver::run (resolve.rs)
//!                       - nearest verbs, anchors, fold, split
//!                               │
//!                               v
//!                   candidates with TemporalObject values
//! ```
//!
//! Candidates live in the document's arena; stages detach the ones they
//! discard, so "what survives" is always "what the tokens still list".
//!
//! ## Debugging
//!
//! Every stage logs through `tracing` with a `[stage]` prefix. The CLI reads
//! its filter from `AJAMUSTER_LOG`, e.g. `AJAMUSTER_LOG=ajamuster=trace`.

use std::time::Instant;

use tracing::debug;

use crate::document::Document;
use crate::error::Result;
use crate::reference::ReferenceTime;
use crate::rules::RuleSet;

#[path = "engine/automaton.rs"]
pub(crate) mod automaton;
#[path = "engine/extract.rs"]
mod extract;
#[path = "engine/merge.rs"]
mod merge;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/prune.rs"]
mod prune;
#[path = "engine/ranges.rs"]
mod ranges;
#[path = "engine/resolve.rs"]
mod resolve;
#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use metrics::{RunMetrics, StageMetrics};
pub use resolve::ResolveCounts;

/// Runs one rule set over documents.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'r> {
    rules: &'r RuleSet,
}

impl<'r> Pipeline<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Pipeline { rules }
    }

    pub fn rules(&self) -> &'r RuleSet {
        self.rules
    }

    /// Extract, merge and resolve every temporal expression of `document`.
    pub fn run(&self, document: &mut Document, reference: &ReferenceTime, models: &[String]) -> Result<()> {
        self.run_with_metrics(document, reference, models).map(|_| ())
    }

    pub fn run_with_metrics(
        &self,
        document: &mut Document,
        reference: &ReferenceTime,
        models: &[String],
    ) -> Result<RunMetrics> {
        let started = Instant::now();
        // Fails before any work when no model is selected.
        let resolver = resolve::Resolver::new(reference, models)?;
        let mut metrics = RunMetrics::default();

        let t = Instant::now();
        metrics.extract.produced = extract::extract(document, self.rules);
        metrics.extract.duration = t.elapsed();

        let t = Instant::now();
        metrics.prune.removed =
            prune::remove_contained(document) + prune::apply_negative_patterns(document, self.rules);
        metrics.prune.duration = t.elapsed();

        let t = Instant::now();
        let before = document.top_level().len();
        metrics.merge.produced = merge::merge_phrases(document, self.rules.merges());
        metrics.merge.removed = (before + metrics.merge.produced).saturating_sub(document.top_level().len());
        metrics.merge.duration = t.elapsed();

        let t = Instant::now();
        metrics.ranges.produced = ranges::merge_ranges(document);
        metrics.ranges.duration = t.elapsed();

        let t = Instant::now();
        resolve::assign_verbs(document);
        metrics.counts = resolver.run(document);
        metrics.resolve.produced = metrics.counts.splits * 2;
        metrics.resolve.duration = t.elapsed();

        metrics.total = started.elapsed();
        debug!("run finished in {:?}: {} top-level candidates", metrics.total, document.top_level().len());
        Ok(metrics)
    }
}
