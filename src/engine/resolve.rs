//! Semantic resolution of the candidate forest.
//!
//! Every top-level candidate is resolved post-order, in document order, so
//! an anchoring instruction always sees the values of earlier expressions.
//!
//! ```text
//! leaf    ──▶ interpret(definitions, seed | anchor)
//! phrase  ──▶ children sorted (anchored first, coarsest first)
//!             ├─ fold into one Evaluation      (one value on the phrase)
//!             └─ diverging: resolve each child (values stay on the children)
//! range   ──▶ resolve both sides ─▶ synthesize a bare numeral side
//!             ─▶ explicit interval ─▶ split at the recorded split point
//! ```
//!
//! Anchors are plain arena lookups; they never change the traversal order.

use std::cmp::Reverse;

use tracing::{debug, trace, warn};

use crate::candidate::{AnchorLink, CandidateId, Stage};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::granularity::GranularitySet;
use crate::reference::ReferenceTime;
use crate::rules::estonian::numerals;
use crate::semantics::definition::touched_granularities;
use crate::semantics::timex::TimexType;
use crate::semantics::{
    AnchorLookup, AnchorRef, AnchorResolver, AnchorScope, Attribute, Direction, Evaluation, IdAllocator, Operation,
    SemValue, SemanticDefinition, Surroundings, TemporalObject, TimePoint, TimexId, interpret,
};
use crate::token::Tense;

/// What the resolution pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveCounts {
    pub resolved: usize,
    pub unresolved: usize,
    pub folded: usize,
    pub splits: usize,
}

/// Attach the nearest verb of the sentence to every candidate tree. Ties go
/// to the verb on the left.
pub(crate) fn assign_verbs(document: &mut Document) {
    for id in document.top_level() {
        let span = document.candidate(id).span;
        let sentence = document.sentence_span(span.start);
        let verb = sentence
            .tokens()
            .filter(|t| !span.contains(*t) && document.token(*t).is_verb())
            .min_by_key(|t| if *t < span.start { (span.start - t, 0) } else { (t - span.end, 1) });
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let candidate = document.candidate_mut(node);
            candidate.verb = verb;
            stack.extend(candidate.children.iter().copied());
        }
    }
}

/// Finds anchors among the candidates preceding `subject`.
struct DocumentAnchors<'d> {
    document: &'d Document,
    subject: CandidateId,
    found: Option<AnchorLink>,
}

impl<'d> DocumentAnchors<'d> {
    fn new(document: &'d Document, subject: CandidateId) -> Self {
        DocumentAnchors { document, subject, found: None }
    }

    fn is_ancestor(&self, id: CandidateId) -> bool {
        let mut current = self.document.candidate(self.subject).parent;
        while let Some(parent) = current {
            if parent == id {
                return true;
            }
            current = self.document.candidate(parent).parent;
        }
        false
    }
}

/// The latest value within `id`'s tree that ends before `limit`; the node's
/// own value wins over its children's.
fn latest_value(document: &Document, id: CandidateId, limit: usize) -> Option<(CandidateId, &TemporalObject)> {
    let candidate = document.candidate(id);
    if candidate.span.end < limit {
        if let Some(value) = &candidate.value {
            return Some((id, value));
        }
    }
    candidate.children.iter().rev().find_map(|child| latest_value(document, *child, limit))
}

/// The point an anchored expression starts from: the value itself, or the
/// end point of an interval.
fn anchor_point(object: &TemporalObject) -> Option<(TimePoint, TimexId)> {
    if let Some(point) = object.point() {
        return Some((point.clone(), object.id));
    }
    let end = if object.is_explicit_interval() {
        object.explicit.get(1)
    } else {
        object.implicit.iter().find(|o| Some(o.id) == object.end_point)
    };
    end.and_then(|e| e.point().map(|p| (p.clone(), e.id)))
}

impl AnchorResolver for DocumentAnchors<'_> {
    fn lookup(&mut self, scope: AnchorScope) -> AnchorLookup {
        let document = self.document;
        let start = document.candidate(self.subject).span.start;
        let floor = match scope {
            AnchorScope::Sentence => document.sentence_span(start).start,
            AnchorScope::Document => 0,
        };

        for id in document.top_level().into_iter().rev() {
            let span = document.candidate(id).span;
            if span.start >= start || span.start < floor {
                continue;
            }
            let ancestor = self.is_ancestor(id);
            if !ancestor && span.end >= start {
                continue;
            }
            match latest_value(document, id, start) {
                Some((holder, value)) => {
                    let Some((point, timex)) = anchor_point(value) else {
                        continue;
                    };
                    self.found = Some(AnchorLink::Candidate(holder));
                    return AnchorLookup::Found { point, id: AnchorRef::Timex(timex) };
                }
                None if ancestor => continue,
                None => {
                    self.found = Some(AnchorLink::Candidate(id));
                    return AnchorLookup::Unresolved;
                }
            }
        }
        AnchorLookup::NotFound
    }
}

/// Definitions of every leaf below `id`, in document order.
fn leaf_definitions(document: &Document, id: CandidateId) -> Vec<&SemanticDefinition> {
    let candidate = document.candidate(id);
    let mut out: Vec<&SemanticDefinition> = candidate.definitions.iter().collect();
    for child in &candidate.children {
        out.extend(leaf_definitions(document, *child));
    }
    out
}

fn surroundings(document: &Document, id: CandidateId) -> Surroundings {
    let candidate = document.candidate(id);
    let mut around = Surroundings::default();
    if let Some(parent) = candidate.parent {
        for sibling in document.candidate(parent).children.iter().filter(|c| **c != id) {
            around.sibling_granularities |= touched_granularities(leaf_definitions(document, *sibling));
            around.sibling_tags.push(document.candidate(*sibling).tag.clone());
        }
    }
    around.direction = candidate.verb.map(|verb| match document.token(verb).tense() {
        Tense::Past => Direction::Backward,
        Tense::Present => Direction::Forward,
    });
    around
}

/// Value kind a candidate asks for through a `type` attribute.
fn declared_kind(definitions: &[SemanticDefinition]) -> Option<TimexType> {
    definitions.iter().find_map(|d| match (d.operation, &d.value) {
        (Operation::SetAttribute(Attribute::Type), Some(SemValue::Literal(text))) => match text.parse::<TimexType>() {
            Ok(TimexType::Time) => Some(TimexType::Date),
            other => other.ok(),
        },
        _ => None,
    })
}

/// Children that cannot share one evaluation.
fn diverges(document: &Document, children: &[CandidateId]) -> bool {
    let definitions: Vec<&[SemanticDefinition]> =
        children.iter().map(|c| document.candidate(*c).definitions.as_slice()).collect();

    let explicit_interval = definitions.iter().flat_map(|d| d.iter()).any(|d| {
        matches!(d.operation, Operation::CreateBeginPoint | Operation::CreateEndPoint) && d.explicit == Some(true)
    });
    let anchoring = children.iter().filter(|c| document.candidate(**c).has_anchoring()).count();

    let kinds: Vec<TimexType> = definitions.iter().filter_map(|d| declared_kind(d)).collect();
    let kind_conflict = kinds.windows(2).any(|w| w[0] != w[1]);

    let mut set_fields = GranularitySet::empty();
    let mut conflicting_sets = false;
    for defs in &definitions {
        let mut own = GranularitySet::empty();
        for d in defs.iter().filter(|d| d.operation == Operation::Set && d.condition.is_none()) {
            if let Some(g) = d.granularity {
                own.insert_granularity(g);
            }
        }
        conflicting_sets |= set_fields.intersects(own);
        set_fields |= own;
    }

    explicit_interval || anchoring > 1 || kind_conflict || conflicting_sets
}

/// Resolves candidate trees against a reference time.
pub(crate) struct Resolver<'a> {
    models: &'a [String],
    seed: TimePoint,
    ids: IdAllocator,
    counts: ResolveCounts,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(reference: &ReferenceTime, models: &'a [String]) -> Result<Self> {
        if models.is_empty() {
            return Err(Error::MissingModel);
        }
        Ok(Resolver {
            models,
            seed: TimePoint::new(reference.datetime, reference.unknown),
            ids: IdAllocator::new(),
            counts: ResolveCounts::default(),
        })
    }

    /// Resolve every top-level candidate in document order.
    pub(crate) fn run(mut self, document: &mut Document) -> ResolveCounts {
        for id in document.top_level() {
            self.node(document, id);
        }
        debug!(
            "[resolve] {} resolved, {} unresolved, {} folded phrases, {} splits",
            self.counts.resolved, self.counts.unresolved, self.counts.folded, self.counts.splits
        );
        self.counts
    }

    fn node(&mut self, document: &mut Document, id: CandidateId) {
        let (stage, is_leaf) = {
            let candidate = document.candidate(id);
            (candidate.stage, candidate.is_leaf())
        };
        match stage {
            _ if is_leaf => self.leaf(document, id),
            Stage::MergedAsRange => self.range(document, id),
            Stage::MergedAsPhrase | Stage::PatternExtracted => self.phrase(document, id),
        }
    }

    fn store(
        &mut self,
        document: &mut Document,
        id: CandidateId,
        value: Option<TemporalObject>,
        anchor: Option<AnchorLink>,
    ) {
        let candidate = document.candidate_mut(id);
        match &value {
            Some(object) => {
                self.counts.resolved += 1;
                candidate.anchor = anchor.or_else(|| match object.anchor {
                    Some(AnchorRef::ReferenceTime) => Some(AnchorLink::ReferenceTime),
                    _ => None,
                });
                trace!("[resolve] {} = {}", id, object.value_string());
            }
            None => {
                self.counts.unresolved += 1;
                candidate.anchor = anchor;
                trace!("[resolve] {} unresolved", id);
            }
        }
        candidate.value = value;
    }

    fn evaluate(
        &mut self,
        document: &Document,
        id: CandidateId,
        definitions: &[SemanticDefinition],
    ) -> (Option<TemporalObject>, Option<AnchorLink>) {
        if definitions.is_empty() {
            return (None, None);
        }
        let around = surroundings(document, id);
        let mut anchors = DocumentAnchors::new(document, id);
        let value = interpret(definitions, self.seed.clone(), self.models, &around, &mut anchors, &mut self.ids);
        (value, anchors.found)
    }

    fn leaf(&mut self, document: &mut Document, id: CandidateId) {
        let definitions = document.candidate(id).definitions.clone();
        let (value, anchor) = self.evaluate(document, id, &definitions);
        self.store(document, id, value, anchor);
    }

    fn phrase(&mut self, document: &mut Document, id: CandidateId) {
        let mut order = document.candidate(id).children.clone();
        order.sort_by_key(|child| {
            let candidate = document.candidate(*child);
            let coarsest = touched_granularities(&candidate.definitions).coarsest().map(|g| g.rank()).unwrap_or(0);
            (!candidate.has_anchoring(), Reverse(coarsest))
        });

        if diverges(document, &order) {
            trace!("[resolve] {} diverges, children keep their own values", id);
            let children = document.candidate(id).children.clone();
            for child in children {
                self.node(document, child);
            }
            return;
        }

        let mut evaluation = Some(Evaluation::seeded(self.seed.clone()));
        let mut anchors = DocumentAnchors::new(document, id);
        for child in &order {
            let Some(mut current) = evaluation.take() else {
                break;
            };
            let definitions = &document.candidate(*child).definitions;
            let around = surroundings(document, *child);
            current.anchor(definitions, self.models, &around, &mut anchors);
            evaluation = current.apply(definitions, self.models, &around);
        }
        let anchor = anchors.found;
        let value = evaluation.map(|e| e.finish(&mut self.ids));
        if value.is_some() {
            self.counts.folded += 1;
        }
        self.store(document, id, value, anchor);
        for child in order {
            document.candidate_mut(child).value = None;
        }
    }

    fn range(&mut self, document: &mut Document, id: CandidateId) {
        let children = document.candidate(id).children.clone();
        let [left, right] = children.as_slice() else {
            warn!("[resolve] range {} does not have two sides", id);
            return;
        };
        let (left, right) = (*left, *right);
        for side in [left, right] {
            if !document.candidate(side).bare_numeral {
                self.node(document, side);
            }
        }
        for (side, sibling) in [(left, right), (right, left)] {
            if document.candidate(side).bare_numeral {
                let value = self.synthesize(document, side, sibling);
                self.store(document, side, value, None);
            }
        }

        let (Some(begin), Some(end)) = (document.candidate(left).value.clone(), document.candidate(right).value.clone())
        else {
            self.counts.unresolved += 1;
            return;
        };
        let interval = TemporalObject::interval(self.ids.fresh(), begin, end);
        trace!("[resolve] range {} = {}", id, interval.value_string());
        document.candidate_mut(left).value = None;
        document.candidate_mut(right).value = None;
        self.store(document, id, Some(interval), None);
        self.split(document, id);
    }

    /// Value of a bare numeral side: the sibling's leaf semantics with the
    /// nearest numeral of a compatible form replaced by this side's number.
    fn synthesize(&mut self, document: &Document, bare: CandidateId, sibling: CandidateId) -> Option<TemporalObject> {
        let span = document.candidate(bare).span;
        let tokens: Vec<_> = span.tokens().map(|t| document.token(t)).collect();
        let value = match tokens.as_slice() {
            [single] => single.numeral_value()?,
            many => {
                let lemmas: Vec<&str> = many
                    .iter()
                    .map(|t| {
                        t.analyses.iter().find(|a| numerals::lemma_value(&a.lemma).is_some()).map(|a| a.lemma.as_str())
                    })
                    .collect::<Option<_>>()?;
                numerals::phrase_value(&lemmas)?
            }
        };
        let form = tokens.first()?.numeral_form();

        let definitions: Vec<SemanticDefinition> = leaf_definitions(document, sibling).into_iter().cloned().collect();
        let distance =
            |token: usize| if token < span.start { span.start - token } else { token.saturating_sub(span.end) };
        let numeral_slots = definitions.iter().enumerate().filter_map(|(idx, d)| match d.value {
            Some(SemValue::Numeral { form: f, token, .. }) => Some((idx, f, token)),
            _ => None,
        });
        let (slot, _, _) = numeral_slots.min_by_key(|(_, f, token)| (f.digits != form.digits, distance(*token)))?;

        let overlay = SemanticDefinition {
            value: Some(SemValue::Numeral { value, form, token: span.start }),
            ..SemanticDefinition::new(definitions[slot].operation)
        };
        let mut specialised = definitions;
        specialised[slot] = specialised[slot].merged_with(&overlay);
        trace!("[resolve] bare numeral {} borrows {} semantics from {}", bare, specialised.len(), sibling);
        self.evaluate(document, bare, &specialised).0
    }

    /// Cut a resolved range at its split point into two leaves that inherit
    /// one endpoint each.
    fn split(&mut self, document: &mut Document, id: CandidateId) {
        let range = document.candidate(id);
        let Some(split) = range.split else {
            return;
        };
        let Some(value) = range.value.as_ref().filter(|v| v.is_explicit_interval()) else {
            return;
        };
        let Some((left_span, right_span)) = split.halves(range.span) else {
            warn!("[resolve] split point of {} lies outside its span", id);
            return;
        };
        let endpoints = [value.explicit[0].clone(), value.explicit[1].clone()];
        let tags: Vec<String> = range.children.iter().map(|c| document.candidate(*c).tag.clone()).collect();
        let verb = range.verb;

        let mut halves = Vec::with_capacity(2);
        for ((span, endpoint), tag) in [left_span, right_span].into_iter().zip(endpoints).zip(tags) {
            let half = document.create(span, Stage::PatternExtracted, tag);
            let candidate = document.candidate_mut(half);
            candidate.parent = Some(id);
            candidate.verb = verb;
            candidate.value = Some(endpoint);
            halves.push(half);
        }
        let range = document.candidate_mut(id);
        range.children = halves;
        range.value = None;
        self.counts.splits += 1;
        trace!("[resolve] split {} at token {}", id, split.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Span, SplitPoint};
    use crate::granularity::Granularity;
    use crate::semantics::definition::{add, anchor, attribute, begin_point, end_point, set};
    use crate::token::{NumeralForm, Token};
    use chrono::NaiveDate;

    fn reference() -> ReferenceTime {
        ReferenceTime::from_datetime(NaiveDate::from_ymd_opt(2009, 7, 23).unwrap().and_hms_opt(10, 30, 0).unwrap())
    }

    fn models() -> Vec<String> {
        vec!["ajavt".to_string()]
    }

    fn leaf(doc: &mut Document, span: (usize, usize), definitions: Vec<SemanticDefinition>) -> CandidateId {
        let id = doc.create(Span::new(span.0, span.1), Stage::PatternExtracted, "T".into());
        doc.candidate_mut(id).definitions = definitions;
        doc.attach(id);
        id
    }

    fn words(n: usize) -> Document {
        Document::new((0..n).map(|i| Token::new(&format!("w{i}"))).collect())
    }

    fn numeral(value: i64, token: usize) -> SemValue {
        SemValue::Numeral { value, form: NumeralForm { digits: true, ordinal: false }, token }
    }

    #[test]
    fn missing_models_are_fatal() {
        assert!(matches!(Resolver::new(&reference(), &[]), Err(Error::MissingModel)));
    }

    #[test]
    fn anchor_value_seeds_the_dependent_expression() {
        let mut doc = words(4);
        let date = leaf(
            &mut doc,
            (0, 1),
            vec![set(Granularity::Month).literal("3"), set(Granularity::DayOfMonth).literal("2")],
        );
        let next =
            leaf(&mut doc, (3, 3), vec![anchor(AnchorScope::Sentence), add(Granularity::DayOfMonth).literal("1")]);
        let models = models();
        Resolver::new(&reference(), &models).unwrap().run(&mut doc);

        let anchor_value = doc.candidate(date).value.clone().unwrap();
        let dependent = doc.candidate(next).value.clone().unwrap();
        assert_eq!(dependent.value_string(), "2009-03-03");
        assert_eq!(dependent.anchor, Some(AnchorRef::Timex(anchor_value.id)));
        assert_eq!(doc.candidate(next).anchor, Some(AnchorLink::Candidate(date)));
    }

    #[test]
    fn unresolved_anchor_is_reported_not_raised() {
        let mut doc = words(3);
        let broken = leaf(
            &mut doc,
            (0, 0),
            vec![set(Granularity::Month).literal("2"), set(Granularity::DayOfMonth).literal("31")],
        );
        let next =
            leaf(&mut doc, (2, 2), vec![anchor(AnchorScope::Sentence), set(Granularity::HourOfDay).literal("9")]);
        let models = models();
        let counts = Resolver::new(&reference(), &models).unwrap().run(&mut doc);

        assert!(doc.candidate(broken).value.is_none());
        assert_eq!(doc.candidate(next).value.as_ref().unwrap().anchor, Some(AnchorRef::Unresolved));
        assert_eq!(counts.unresolved, 1);
    }

    #[test]
    fn phrase_children_fold_into_one_value() {
        let mut doc = words(2);
        let hour = doc.create(Span::new(0, 0), Stage::PatternExtracted, "A".into());
        doc.candidate_mut(hour).definitions = vec![set(Granularity::HourOfDay).literal("12")];
        let day = doc.create(Span::new(1, 1), Stage::PatternExtracted, "B".into());
        doc.candidate_mut(day).definitions = vec![add(Granularity::DayOfMonth).literal("1")];
        doc.attach(hour);
        doc.attach(day);
        let phrase = doc.create(Span::new(0, 1), Stage::MergedAsPhrase, "A-B".into());
        doc.adopt(phrase, &[hour, day]);

        let models = models();
        let counts = Resolver::new(&reference(), &models).unwrap().run(&mut doc);
        assert_eq!(counts.folded, 1);
        assert_eq!(doc.candidate(phrase).value.as_ref().unwrap().value_string(), "2009-07-24T12:30");
        assert!(doc.candidate(hour).value.is_none());
    }

    #[test]
    fn conflicting_sets_keep_children_apart() {
        let mut doc = words(2);
        let a = doc.create(Span::new(0, 0), Stage::PatternExtracted, "A".into());
        doc.candidate_mut(a).definitions = vec![set(Granularity::Month).literal("5")];
        let b = doc.create(Span::new(1, 1), Stage::PatternExtracted, "B".into());
        doc.candidate_mut(b).definitions = vec![set(Granularity::Month).literal("6")];
        doc.attach(a);
        doc.attach(b);
        let phrase = doc.create(Span::new(0, 1), Stage::MergedAsPhrase, "A-B".into());
        doc.adopt(phrase, &[a, b]);

        let models = models();
        Resolver::new(&reference(), &models).unwrap().run(&mut doc);
        assert!(doc.candidate(phrase).value.is_none());
        assert_eq!(doc.candidate(a).value.as_ref().unwrap().value_string(), "2009-05");
        assert_eq!(doc.candidate(b).value.as_ref().unwrap().value_string(), "2009-06");
    }

    #[test]
    fn explicit_endpoints_keep_children_apart() {
        let mut doc = words(2);
        let last = doc.create(Span::new(0, 0), Stage::PatternExtracted, "LAST".into());
        doc.candidate_mut(last).definitions = vec![
            attribute(Attribute::Type).literal("DURATION"),
            set(Granularity::DayOfMonth).literal("3"),
            begin_point(Granularity::DayOfMonth).literal("3").explicit(),
            end_point(Granularity::DayOfMonth).explicit(),
        ];
        let hour = doc.create(Span::new(1, 1), Stage::PatternExtracted, "TIME".into());
        doc.candidate_mut(hour).definitions = vec![set(Granularity::HourOfDay).literal("9")];
        doc.attach(last);
        doc.attach(hour);
        let phrase = doc.create(Span::new(0, 1), Stage::MergedAsPhrase, "LAST-TIME".into());
        doc.adopt(phrase, &[last, hour]);

        let models = models();
        let counts = Resolver::new(&reference(), &models).unwrap().run(&mut doc);
        assert_eq!(counts.folded, 0);
        assert!(doc.candidate(phrase).value.is_none());
        let interval = doc.candidate(last).value.clone().unwrap();
        assert!(interval.is_explicit_interval());
        assert_eq!(interval.explicit[0].value_string(), "2009-07-20");
        assert!(doc.candidate(hour).value.is_some());
    }

    #[test]
    fn ranges_split_into_their_endpoints() {
        let mut doc = Document::new(["kell", "9", "-", "10"].iter().map(|w| Token::new(w)).collect());
        let left = doc.create(Span::new(0, 1), Stage::PatternExtracted, "TIME".into());
        doc.candidate_mut(left).definitions =
            vec![set(Granularity::HourOfDay).capture(0), set(Granularity::Minute).literal("0")];
        doc.candidate_mut(left).definitions[0].value = Some(numeral(9, 1));
        let bare = doc.create(Span::new(3, 3), Stage::PatternExtracted, "TIME".into());
        doc.candidate_mut(bare).bare_numeral = true;
        doc.attach(left);
        let range = doc.create(Span::new(0, 3), Stage::MergedAsRange, "TIME..TIME".into());
        doc.candidate_mut(range).split = Some(SplitPoint { token: 2, inclusive: false });
        doc.adopt(range, &[left, bare]);

        let models = models();
        let counts = Resolver::new(&reference(), &models).unwrap().run(&mut doc);
        assert_eq!(counts.splits, 1);
        // Left side, synthesized bare side and the range itself; nothing failed.
        assert_eq!((counts.resolved, counts.unresolved), (3, 0));

        let node = doc.candidate(range);
        assert!(node.value.is_none());
        let halves: Vec<_> = node.children.iter().map(|c| doc.candidate(*c)).collect();
        assert_eq!(halves[0].span, Span::new(0, 1));
        assert_eq!(halves[1].span, Span::new(2, 3));
        assert_eq!(halves[0].value.as_ref().unwrap().value_string(), "2009-07-23T09:00");
        assert_eq!(halves[1].value.as_ref().unwrap().value_string(), "2009-07-23T10:00");
    }
}
