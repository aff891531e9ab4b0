//! Phrase merging: adjacent pattern-extracted candidates whose tags are
//! linked by merge rules become one `MergedAsPhrase` candidate.
//!
//! ```text
//!   [kell 12]  [hommikul]  [homme]        maximal run of 3
//!      A           B          C
//!
//!   sequences: A-B, B-C, A-B-C           every sub-run of length >= 2
//!   filters:   tags -> range integrity -> overlap (start asc, len desc)
//! ```

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::candidate::{CandidateId, Span, Stage};
use crate::document::Document;
use crate::rules::MergeRule;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Sequence {
    /// Index into the run of the first member.
    first: usize,
    members: Vec<CandidateId>,
    span: Span,
}

/// Maximal runs of exactly adjacent top-level pattern-extracted candidates.
/// A run never crosses a sentence boundary.
fn maximal_runs(document: &Document) -> Vec<Vec<CandidateId>> {
    let pool: Vec<CandidateId> = document
        .top_level()
        .into_iter()
        .filter(|id| document.candidate(*id).stage == Stage::PatternExtracted)
        .collect();

    let successor = |id: CandidateId| -> Option<CandidateId> {
        let span = document.candidate(id).span;
        pool.iter().copied().find(|next| {
            let next_span = document.candidate(*next).span;
            span.is_followed_by(&next_span) && document.same_sentence(span.end, next_span.start)
        })
    };
    let has_predecessor = |id: CandidateId| pool.iter().any(|prev| successor(*prev) == Some(id));

    let mut runs = Vec::new();
    for &start in pool.iter().filter(|id| !has_predecessor(**id)) {
        let mut run = vec![start];
        let mut current = start;
        while let Some(next) = successor(current) {
            run.push(next);
            current = next;
        }
        runs.push(run);
    }
    runs
}

fn sequences(document: &Document, run: &[CandidateId]) -> Vec<Sequence> {
    let mut out = Vec::new();
    for first in 0..run.len() {
        for last in first + 1..run.len() {
            let members = run[first..=last].to_vec();
            let span = Span::new(
                document.candidate(members[0]).span.start,
                document.candidate(members[members.len() - 1]).span.end,
            );
            out.push(Sequence { first, members, span });
        }
    }
    out
}

/// Every boundary must be spanned by a link and every member must take part
/// in one. A tag, once used by one member, may not be used by another member
/// in a different link.
fn tags_compatible(tags: &[&str], rules: &[MergeRule]) -> bool {
    let n = tags.len();
    let mut links: Vec<(usize, usize)> = Vec::new();
    let mut owner: HashMap<&str, usize> = HashMap::new();

    let mut try_link = |a: usize, b: usize, links: &mut Vec<(usize, usize)>| {
        let free = |tag: &str, member: usize, owner: &HashMap<&str, usize>| owner.get(tag).is_none_or(|m| *m == member);
        if !free(tags[a], a, &owner) || !free(tags[b], b, &owner) {
            return;
        }
        owner.insert(tags[a], a);
        owner.entry(tags[b]).or_insert(b);
        links.push((a, b));
    };

    for i in 0..n.saturating_sub(1) {
        if rules.iter().any(|r| !r.gapped && r.links(tags[i], tags[i + 1])) {
            try_link(i, i + 1, &mut links);
        }
    }
    for i in 0..n.saturating_sub(2) {
        let middle_differs = tags[i + 1] != tags[i] && tags[i + 1] != tags[i + 2];
        if middle_differs && rules.iter().any(|r| r.gapped && r.links(tags[i], tags[i + 2])) {
            try_link(i, i + 2, &mut links);
        }
    }

    let boundaries_spanned =
        (0..n.saturating_sub(1)).all(|boundary| links.iter().any(|(a, b)| *a <= boundary && boundary < *b));
    let members_linked = (0..n).all(|m| links.iter().any(|(a, b)| *a == m || *b == m));
    boundaries_spanned && members_linked
}

/// Pairs of run positions (start member, end member) holding a potential
/// range start before a potential range end.
fn range_pairs(document: &Document, run: &[CandidateId]) -> Vec<(usize, usize)> {
    let has = |id: CandidateId, test: fn(&crate::token::Token) -> bool| {
        document.candidate(id).span.tokens().any(|t| test(document.token(t)))
    };
    let starts: Vec<usize> = (0..run.len()).filter(|i| has(run[*i], |t| t.is_range_start())).collect();
    let ends: Vec<usize> = (0..run.len()).filter(|i| has(run[*i], |t| t.is_range_end())).collect();
    let mut pairs = Vec::new();
    for &s in &starts {
        for &e in ends.iter().filter(|e| **e > s) {
            pairs.push((s, e));
        }
    }
    pairs
}

/// A sequence survives a range pair only when it lies wholly at or before the
/// start member, or wholly at or after the end member.
fn range_intact(sequence: &Sequence, pairs: &[(usize, usize)]) -> bool {
    let first = sequence.first;
    let last = sequence.first + sequence.members.len() - 1;
    pairs.iter().all(|(s, e)| last <= *s || first >= *e)
}

fn without_overlaps(mut candidates: Vec<Sequence>) -> Vec<Sequence> {
    candidates.sort_by_key(|s| (s.span.start, std::cmp::Reverse(s.span.len()), std::cmp::Reverse(s.members.len())));
    let mut kept: Vec<Sequence> = Vec::new();
    for sequence in candidates {
        if kept.iter().all(|k| !k.span.overlaps(&sequence.span)) {
            kept.push(sequence);
        }
    }
    kept
}

/// Merge adjacent candidates into phrases and drop the leftovers that may
/// not stand alone. Returns the number of phrases created.
pub(crate) fn merge_phrases(document: &mut Document, rules: &[MergeRule]) -> usize {
    let mut survivors = Vec::new();
    for run in maximal_runs(document) {
        if run.len() < 2 {
            continue;
        }
        let pairs = range_pairs(document, &run);
        for sequence in sequences(document, &run) {
            let tags: Vec<&str> = sequence.members.iter().map(|id| document.candidate(*id).tag.as_str()).collect();
            if !tags_compatible(&tags, rules) {
                continue;
            }
            if !range_intact(&sequence, &pairs) {
                trace!("[merge] {} breaks a range", tags.join("-"));
                continue;
            }
            survivors.push(sequence);
        }
    }

    let kept = without_overlaps(survivors);
    let mut phrases = Vec::with_capacity(kept.len());
    for sequence in &kept {
        let tag = sequence.members.iter().map(|id| document.candidate(*id).tag.clone()).collect::<Vec<_>>().join("-");
        let phrase = document.create(sequence.span, Stage::MergedAsPhrase, tag);
        document.adopt(phrase, &sequence.members);
        trace!("[merge] phrase {} '{}' tag {}", phrase, document.text(sequence.span), document.candidate(phrase).tag);
        phrases.push(phrase);
    }

    for id in document.top_level() {
        let candidate = document.candidate(id);
        if candidate.stage != Stage::PatternExtracted {
            continue;
        }
        let engulfed = phrases.iter().any(|p| document.candidate(*p).span.covers(&candidate.span));
        if !candidate.standalone || engulfed {
            trace!("[merge] drop leftover {} '{}'", id, document.text(candidate.span));
            document.detach(id);
        }
    }

    debug!("[merge] {} phrases", phrases.len());
    phrases.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    fn document(words: &[&str], spans: &[(usize, usize, &str)]) -> (Document, Vec<CandidateId>) {
        let tokens = words
            .iter()
            .map(|w| match *w {
                "üheksast" => Token::new(w).with_analysis("üheksa", "st", "N", "sg el"),
                "kümneni" => Token::new(w).with_analysis("kümme", "ni", "N", "sg ter"),
                _ => Token::new(w),
            })
            .collect();
        let mut doc = Document::new(tokens);
        let ids = spans
            .iter()
            .map(|(s, e, tag)| {
                let id = doc.create(Span::new(*s, *e), Stage::PatternExtracted, tag.to_string());
                doc.attach(id);
                id
            })
            .collect();
        (doc, ids)
    }

    #[test]
    fn tag_links_must_span_every_boundary() {
        let rules = [MergeRule::exact("A", "B"), MergeRule::exact("B", "C")];
        assert!(tags_compatible(&["A", "B"], &rules));
        assert!(tags_compatible(&["A", "B", "C"], &rules));
        assert!(!tags_compatible(&["B", "A"], &rules));
        assert!(!tags_compatible(&["A", "C"], &rules));

        let free = [MergeRule::exact("A", "B").free()];
        assert!(tags_compatible(&["B", "A"], &free));
    }

    #[test]
    fn gapped_links_need_a_different_middle_tag() {
        let rules = [MergeRule::gapped("A", "C"), MergeRule::exact("A", "B")];
        assert!(tags_compatible(&["A", "B", "C"], &rules));
        assert!(!tags_compatible(&["A", "A", "C"], &rules));
    }

    #[test]
    fn a_tag_belongs_to_one_member() {
        // The second A would reuse a tag already taken by the first member.
        let rules = [MergeRule::exact("A", "B"), MergeRule::exact("B", "A")];
        assert!(!tags_compatible(&["A", "B", "A"], &rules));
    }

    #[test]
    fn adjacent_linked_candidates_merge() {
        let (mut doc, ids) = document(&["kell", "12", "hommikul"], &[(0, 1, "A"), (2, 2, "B")]);
        assert_eq!(merge_phrases(&mut doc, &[MergeRule::exact("A", "B")]), 1);
        let top = doc.top_level();
        assert_eq!(top.len(), 1);
        let phrase = doc.candidate(top[0]);
        assert_eq!(phrase.stage, Stage::MergedAsPhrase);
        assert_eq!(phrase.tag, "A-B");
        assert_eq!(phrase.span, Span::new(0, 2));
        assert_eq!(phrase.children, ids);
    }

    #[test]
    fn longest_sequence_wins() {
        let rules = [MergeRule::exact("A", "B"), MergeRule::exact("B", "C")];
        let (mut doc, _) = document(&["a", "b", "c"], &[(0, 0, "A"), (1, 1, "B"), (2, 2, "C")]);
        assert_eq!(merge_phrases(&mut doc, &rules), 1);
        assert_eq!(doc.candidate(doc.top_level()[0]).tag, "A-B-C");
    }

    #[test]
    fn range_endpoints_are_not_merged_into_a_phrase() {
        let rules = [MergeRule::exact("X", "X")];
        let (mut doc, ids) = document(&["üheksast", "kümneni"], &[(0, 0, "X"), (1, 1, "X")]);
        assert_eq!(merge_phrases(&mut doc, &rules), 0);
        assert_eq!(doc.top_level(), ids);
    }

    #[test]
    fn leftovers_that_cannot_stand_alone_are_dropped() {
        let (mut doc, ids) = document(&["x", "y"], &[(0, 0, "A"), (1, 1, "B")]);
        doc.candidate_mut(ids[1]).standalone = false;
        assert_eq!(merge_phrases(&mut doc, &[]), 0);
        assert_eq!(doc.top_level(), vec![ids[0]]);
    }

    #[test]
    fn merging_is_idempotent() {
        let rules = [MergeRule::exact("A", "B")];
        let (mut doc, _) = document(&["kell", "12", "hommikul", "x"], &[(0, 1, "A"), (2, 2, "B"), (3, 3, "C")]);
        assert_eq!(merge_phrases(&mut doc, &rules), 1);
        let before = doc.top_level();
        assert_eq!(merge_phrases(&mut doc, &rules), 0);
        assert_eq!(doc.top_level(), before);
    }
}
