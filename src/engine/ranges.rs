//! Range detection: two sides around a pivot become one `MergedAsRange`.
//!
//! Pivots are tokens with a range-start case suffix (`üheksast`, split after
//! the pivot), tokens with a range-end suffix (`kümneni`, split before the
//! side it closes) and connectors (`kuni`, `-`, split before the connector).
//! Each side is one adjacent top-level candidate, a run of numeral-phrase
//! tokens, or a run of plain digit tokens.
//!
//! ```text
//!   kella üheksast kümneni        kella 9 - 10
//!   [left.........][right]        [left..] ^ [right]
//!               ^ pivot                  connector
//! ```

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::candidate::{CandidateId, Span, SplitPoint, Stage};
use crate::document::Document;
use crate::token::{Token, TokenFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Candidate(CandidateId),
    /// Numeral tokens not covered by any candidate.
    Numerals(Span),
}

impl Side {
    fn span(&self, document: &Document) -> Span {
        match self {
            Side::Candidate(id) => document.candidate(*id).span,
            Side::Numerals(span) => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    NumeralPhrase,
    Digits,
}

fn class_of(token: &Token) -> Option<Class> {
    if token.flags.intersects(TokenFlags::NUMERAL_PHRASE) {
        Some(Class::NumeralPhrase)
    } else if token.flags.contains(TokenFlags::DIGITS) {
        Some(Class::Digits)
    } else {
        None
    }
}

/// The top-level candidate that starts (or ends) exactly at `token`.
fn candidate_edge(document: &Document, token: usize, at_end: bool) -> Option<CandidateId> {
    document.token(token).candidates().iter().map(|(id, _)| *id).find(|id| {
        let c = document.candidate(*id);
        c.parent.is_none() && if at_end { c.span.end == token } else { c.span.start == token }
    })
}

/// Collect one side beginning at `from` and growing away from the pivot.
fn side(document: &Document, from: usize, leftwards: bool, claimed: &HashSet<usize>, sentence: Span) -> Option<Side> {
    if !sentence.contains(from) || claimed.contains(&from) {
        return None;
    }
    if let Some(id) = candidate_edge(document, from, leftwards) {
        let span = document.candidate(id).span;
        if span.tokens().any(|t| claimed.contains(&t)) {
            return None;
        }
        return Some(Side::Candidate(id));
    }
    if !document.token(from).candidates().is_empty() {
        return None;
    }

    let class = class_of(document.token(from))?;
    let mut far = from;
    loop {
        let next = if leftwards { far.checked_sub(1) } else { Some(far + 1) };
        let Some(next) = next else {
            break;
        };
        if !sentence.contains(next) || claimed.contains(&next) {
            break;
        }
        let token = document.token(next);
        if class_of(token) != Some(class) || !token.candidates().is_empty() {
            break;
        }
        if class == Class::NumeralPhrase {
            // A phrase ends where the next one starts.
            let boundary = if leftwards {
                document.token(far).flags.contains(TokenFlags::NUMERAL_PHRASE_START)
            } else {
                token.flags.contains(TokenFlags::NUMERAL_PHRASE_START)
            };
            if boundary {
                break;
            }
        }
        far = next;
    }
    let span = if leftwards { Span::new(far, from) } else { Span::new(from, far) };
    Some(Side::Numerals(span))
}

/// Turn a numeral side into a definition-less leaf candidate.
fn materialize(document: &mut Document, side: Side, tag: &str) -> CandidateId {
    match side {
        Side::Candidate(id) => id,
        Side::Numerals(span) => {
            let id = document.create(span, Stage::PatternExtracted, tag.to_string());
            document.candidate_mut(id).bare_numeral = true;
            id
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pivot {
    Connector,
    /// Closes the left side.
    Start,
    /// Closes the right side.
    End,
}

fn pivot_of(token: &Token) -> Option<Pivot> {
    if token.is_range_connector() {
        Some(Pivot::Connector)
    } else if token.is_range_start() {
        Some(Pivot::Start)
    } else if token.is_range_end() {
        Some(Pivot::End)
    } else {
        None
    }
}

fn try_range(document: &mut Document, pivot: usize, kind: Pivot, claimed: &mut HashSet<usize>) -> Option<CandidateId> {
    let sentence = document.sentence_span(pivot);
    let (left, right, split) = match kind {
        Pivot::Connector => {
            let left = side(document, pivot.checked_sub(1)?, true, claimed, sentence)?;
            let right = side(document, pivot + 1, false, claimed, sentence)?;
            (left, right, SplitPoint { token: pivot, inclusive: false })
        }
        Pivot::Start => {
            let left = side(document, pivot, true, claimed, sentence)?;
            let right = side(document, pivot + 1, false, claimed, sentence)?;
            if left.span(document).end != pivot || !document.token(right.span(document).end).is_range_end() {
                return None;
            }
            (left, right, SplitPoint { token: pivot, inclusive: true })
        }
        Pivot::End => {
            let right = side(document, pivot, true, claimed, sentence)?;
            let boundary = right.span(document).start.checked_sub(1)?;
            let left = side(document, boundary, true, claimed, sentence)?;
            (left, right, SplitPoint { token: boundary, inclusive: true })
        }
    };
    if matches!((left, right), (Side::Numerals(_), Side::Numerals(_))) {
        return None;
    }
    let left_span = left.span(document);
    let right_span = right.span(document);

    let tag_of = |side: Side, document: &Document| match side {
        Side::Candidate(id) => Some(document.candidate(id).tag.clone()),
        Side::Numerals(_) => None,
    };
    let left_tag = tag_of(left, document);
    let right_tag = tag_of(right, document);
    let sibling_tag = left_tag.clone().or_else(|| right_tag.clone()).unwrap_or_default();
    let tag =
        format!("{}..{}", left_tag.unwrap_or_else(|| sibling_tag.clone()), right_tag.unwrap_or(sibling_tag.clone()));

    let left_id = materialize(document, left, &sibling_tag);
    let right_id = materialize(document, right, &sibling_tag);
    let span = Span::new(left_span.start, right_span.end);
    let range = document.create(span, Stage::MergedAsRange, tag);
    document.candidate_mut(range).split = Some(split);
    document.adopt(range, &[left_id, right_id]);
    claimed.extend(span.tokens());
    Some(range)
}

/// Detect ranges around every unclaimed pivot. Returns the number created.
pub(crate) fn merge_ranges(document: &mut Document) -> usize {
    let mut claimed: HashSet<usize> = HashSet::new();
    let mut created = 0;
    for pivot in 0..document.len() {
        if claimed.contains(&pivot) {
            continue;
        }
        let Some(kind) = pivot_of(document.token(pivot)) else {
            continue;
        };
        if let Some(range) = try_range(document, pivot, kind, &mut claimed) {
            trace!("[range] {} '{}'", range, document.text(document.candidate(range).span));
            created += 1;
        }
    }
    debug!("[range] {} ranges", created);
    created
}
