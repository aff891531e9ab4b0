//! Candidate temporal expressions.
//!
//! Candidates live in an arena owned by the [`Document`](crate::Document) and
//! refer to each other by [`CandidateId`]. Parent/child edges form a forest;
//! the anchor link is a plain lookup into the same arena and never implies
//! ownership or traversal order.
//!
//! ```text
//!             MergedAsRange #7 (split after token 2, inclusive)
//!               /                      \
//!   PatternExtracted #3          PatternExtracted #5
//!   "kella üheksast"             "kümneni"
//! ```

use crate::rules::RuleId;
use crate::semantics::{SemanticDefinition, TemporalObject};
use std::fmt;

/// Index of a candidate in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateId(pub usize);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inclusive range of inner token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start after end");
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, token: usize) -> bool {
        self.start <= token && token <= self.end
    }

    pub fn covers(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// `self` lies inside `other` and is smaller.
    pub fn is_proper_subset_of(&self, other: &Span) -> bool {
        other.covers(self) && self != other
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// `other` starts right after `self` ends.
    pub fn is_followed_by(&self, other: &Span) -> bool {
        self.end + 1 == other.start
    }

    pub fn tokens(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// How far a candidate has progressed through the merge stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Produced directly by an extraction rule.
    PatternExtracted,
    /// Concatenation of adjacent candidates.
    MergedAsPhrase,
    /// Two candidates (or a candidate and a bare numeral) read as interval endpoints.
    MergedAsRange,
}

/// Where a merged range is cut back into two annotated sub-spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPoint {
    pub token: usize,
    /// The split token belongs to the left half.
    pub inclusive: bool,
}

impl SplitPoint {
    /// Partition `span` into its left and right halves.
    pub fn halves(&self, span: Span) -> Option<(Span, Span)> {
        let left_end = if self.inclusive { self.token } else { self.token.checked_sub(1)? };
        let right_start = left_end + 1;
        if left_end < span.start || right_start > span.end {
            return None;
        }
        Some((Span::new(span.start, left_end), Span::new(right_start, span.end)))
    }
}

/// Where a candidate's anchor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorLink {
    /// Another candidate in the document.
    Candidate(CandidateId),
    /// The externally supplied reference time.
    ReferenceTime,
}

/// A tentative temporal expression.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: CandidateId,
    pub span: Span,
    pub stage: Stage,
    /// Rule that extracted this candidate (pattern-extracted only).
    pub rule: Option<RuleId>,
    /// Pattern tag; dash-joined member tags for merged phrases.
    pub tag: String,
    pub children: Vec<CandidateId>,
    pub parent: Option<CandidateId>,
    pub definitions: Vec<SemanticDefinition>,
    pub anchor: Option<AnchorLink>,
    /// Nearest verb, used to infer the direction of SEEK instructions.
    pub verb: Option<usize>,
    pub value: Option<TemporalObject>,
    /// False when the candidate may only surface inside a larger phrase.
    pub standalone: bool,
    pub split: Option<SplitPoint>,
    /// A range side consisting of bare numerals only.
    pub bare_numeral: bool,
}

impl Candidate {
    pub(crate) fn new(id: CandidateId, span: Span, stage: Stage, tag: String) -> Self {
        Candidate {
            id,
            span,
            stage,
            rule: None,
            tag,
            children: Vec::new(),
            parent: None,
            definitions: Vec::new(),
            anchor: None,
            verb: None,
            value: None,
            standalone: true,
            split: None,
            bare_numeral: false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    /// True when any definition is an anchoring instruction.
    pub fn has_anchoring(&self) -> bool {
        self.definitions.iter().any(|d| d.operation.is_anchoring())
    }
}
