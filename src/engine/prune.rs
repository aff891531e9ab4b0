//! Pruning of raw candidates: containment and negative patterns.

use tracing::{debug, trace};

use super::automaton;
use crate::candidate::{CandidateId, Span};
use crate::document::Document;
use crate::rules::RuleSet;

/// Delete candidates whose span lies strictly inside another attached
/// candidate's span; of two candidates with the same span the later one
/// goes. Partial overlaps survive. Returns the number deleted.
pub(crate) fn remove_contained(document: &mut Document) -> usize {
    let live = document.top_level();
    let mut doomed: Vec<CandidateId> = Vec::new();

    for &a in &live {
        let span_a = document.candidate(a).span;
        let swallowed = live.iter().any(|&b| {
            if a == b {
                return false;
            }
            let span_b = document.candidate(b).span;
            span_a.is_proper_subset_of(&span_b) || (span_a == span_b && b.0 < a.0)
        });
        if swallowed {
            doomed.push(a);
        }
    }

    for id in &doomed {
        trace!("[prune] contained {} '{}'", id, document.text(document.candidate(*id).span));
        document.detach(*id);
    }
    debug!("[prune] {} contained candidates removed", doomed.len());
    doomed.len()
}

/// Apply every rule's negative patterns. A negative match overlapping a
/// candidate deletes it together with the other candidates of the same rule
/// that lie entirely inside the negative match.
pub(crate) fn apply_negative_patterns(document: &mut Document, rules: &RuleSet) -> usize {
    let mut removed = 0;

    for id in document.top_level() {
        if !document.is_attached(id) {
            continue;
        }
        let candidate = document.candidate(id);
        let Some(rule_id) = candidate.rule else {
            continue;
        };
        let span = candidate.span;
        let sentence = document.sentence_span(span.start);

        for (negative, reach) in &rules.rule(rule_id).negatives {
            let window =
                Span::new(span.start.saturating_sub(*reach).max(sentence.start), (span.end + reach).min(sentence.end));
            let matches = automaton::scan(&[negative], rules.classes(), document.tokens(), window);
            let Some(hit) = matches.iter().map(|m| m.consumed).find(|consumed| consumed.overlaps(&span)) else {
                continue;
            };

            trace!("[prune] negative pattern '{}' vetoes {}", document.text(hit), id);
            let same_rule: Vec<CandidateId> = document
                .top_level()
                .into_iter()
                .filter(|other| {
                    let c = document.candidate(*other);
                    *other == id || (c.rule == Some(rule_id) && hit.covers(&c.span))
                })
                .collect();
            for doomed in same_rule {
                document.detach(doomed);
                removed += 1;
            }
            break;
        }
    }
    debug!("[prune] {} candidates removed by negative patterns", removed);
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Stage;
    use crate::token::Token;

    fn document_with(spans: &[(usize, usize)]) -> (Document, Vec<CandidateId>) {
        let mut doc = Document::new((0..6).map(|i| Token::new(&format!("w{i}"))).collect());
        let ids = spans
            .iter()
            .map(|(s, e)| {
                let id = doc.create(Span::new(*s, *e), Stage::PatternExtracted, "T".into());
                doc.attach(id);
                id
            })
            .collect();
        (doc, ids)
    }

    #[test]
    fn contained_and_duplicate_spans_are_removed() {
        let (mut doc, ids) = document_with(&[(0, 2), (1, 1), (2, 3), (0, 2), (4, 5)]);
        assert_eq!(remove_contained(&mut doc), 2);
        assert!(doc.is_attached(ids[0]));
        assert!(!doc.is_attached(ids[1]));
        // Partial overlap survives.
        assert!(doc.is_attached(ids[2]));
        assert!(!doc.is_attached(ids[3]));
        assert!(doc.is_attached(ids[4]));
    }

    #[test]
    fn no_full_containment_remains() {
        let (mut doc, _) = document_with(&[(0, 5), (0, 0), (1, 3), (2, 2), (3, 5), (5, 5)]);
        remove_contained(&mut doc);
        let live = doc.top_level();
        for a in &live {
            for b in &live {
                if a != b {
                    assert!(!doc.candidate(*a).span.is_proper_subset_of(&doc.candidate(*b).span));
                    assert_ne!(doc.candidate(*a).span, doc.candidate(*b).span);
                }
            }
        }
        assert_eq!(live.len(), 1);
    }
}
