//! Candidate extraction: run every rule's automaton over each sentence and
//! turn matches into `PatternExtracted` candidates.

use tracing::{debug, trace};

use super::automaton::{self, Automaton, ElementMatch, Match};
use crate::candidate::{CandidateId, Stage};
use crate::document::Document;
use crate::rules::{CompiledRule, RuleId, RuleSet};
use crate::semantics::{SemValue, SemanticDefinition};
use crate::token::Token;

/// Extract candidates for every sentence. Returns the number created.
pub(crate) fn extract(document: &mut Document, rules: &RuleSet) -> usize {
    let automata: Vec<&Automaton> = rules.rules().map(|(_, r)| &r.automaton).collect();
    let sentences = document.sentences().to_vec();
    let mut created = 0;

    for sentence in sentences {
        let matches = automaton::scan(&automata, rules.classes(), document.tokens(), sentence);
        for m in matches {
            let id = RuleId(m.automaton);
            if let Some(candidate) = build(document, id, rules.rule(id), &m) {
                created += 1;
                trace!(
                    "[extract] {} '{}' -> {}",
                    rules.rule(id).rule.name,
                    document.text(document.candidate(candidate).span),
                    candidate
                );
            }
        }
    }
    debug!("[extract] {} candidates", created);
    created
}

fn build(document: &mut Document, id: RuleId, compiled: &CompiledRule, m: &Match) -> Option<CandidateId> {
    let span = m.span(&compiled.automaton)?;
    let rule = &compiled.rule;
    let matched = m.matched();

    let mut definitions: Vec<SemanticDefinition> =
        rule.definitions.iter().filter_map(|d| bind(d, &m.elements, document.tokens())).collect();
    let mut tag = rule.tag.clone();
    let mut standalone = rule.standalone;

    for filter in rule.filters.iter().filter(|f| f.applies(&matched)) {
        for definition in &filter.definitions {
            let Some(bound) = bind(definition, &m.elements, document.tokens()) else {
                continue;
            };
            match definitions.iter_mut().find(|d| d.overlaps(&bound)) {
                Some(existing) => *existing = existing.merged_with(&bound),
                None => definitions.push(bound),
            }
        }
        if let Some(t) = &filter.tag {
            tag = t.clone();
        }
        if let Some(s) = filter.standalone {
            standalone = s;
        }
    }

    let candidate = document.create(span, Stage::PatternExtracted, tag);
    {
        let c = document.candidate_mut(candidate);
        c.rule = Some(id);
        c.definitions = definitions;
        c.standalone = standalone;
    }
    document.attach(candidate);
    Some(candidate)
}

/// Replace a capture with the value of the element it names. A capture of
/// an element that did not take part in the match drops the definition.
fn bind(
    definition: &SemanticDefinition,
    elements: &[Option<ElementMatch>],
    tokens: &[Token],
) -> Option<SemanticDefinition> {
    let Some(SemValue::Capture(index)) = definition.value else {
        return Some(definition.clone());
    };
    let element = elements.get(index)?.as_ref()?;
    let value = match &element.value {
        Some(value) => value.clone(),
        None => SemValue::Literal(tokens[element.token].lower()),
    };
    let mut bound = definition.clone();
    bound.value = Some(value);
    Some(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::granularity::Granularity;
    use crate::rules::{Filter, NumeralTemplate, PatternElement, WordClass, WordTemplate};
    use crate::semantics::definition::set;

    fn rules() -> RuleSet {
        RuleSet::builder()
            .class(WordClass::new("PAEV_NR").with(WordTemplate::numeral(NumeralTemplate::between(1, 31).ordinal(true))))
            .class(WordClass::new("KUU").valued_lemmas(&[("juuli", "7")]))
            .class(WordClass::new("AASTA_NR").with(WordTemplate::numeral(NumeralTemplate::between(1000, 2100))))
            .rule(extraction_rule! {
                name: "kuupäev",
                tag: "DATE",
                pattern: [
                    PatternElement::required(&["PAEV_NR"]),
                    PatternElement::required(&["KUU"]),
                    PatternElement::optional(&["AASTA_NR"]),
                ],
                semantics: [set(Granularity::Month).capture(1), set(Granularity::DayOfMonth).capture(0)],
                filters: [
                    Filter::new().requires(2).define(set(Granularity::Year).capture(2)).tag("FULL_DATE"),
                    Filter::new().forbids(2).standalone(false),
                ],
            })
            .build()
            .unwrap()
    }

    fn doc(words: &[(&str, &str)]) -> Document {
        Document::new(words.iter().map(|(s, l)| Token::new(s).with_analysis(l, "", "S", "sg ad")).collect())
    }

    #[test]
    fn captures_are_bound_to_element_values() {
        let rules = rules();
        let mut document = doc(&[("23.", "23."), ("juulil", "juuli"), ("2009", "2009")]);
        assert_eq!(extract(&mut document, &rules), 1);
        let candidate = &document.candidates()[0];
        assert_eq!(candidate.tag, "FULL_DATE");
        assert!(candidate.standalone);
        assert_eq!(candidate.definitions.len(), 3);
        assert_eq!(candidate.definitions[0].value, Some(SemValue::Literal("7".into())));
        assert!(matches!(candidate.definitions[1].value, Some(SemValue::Numeral { value: 23, .. })));
        assert!(matches!(candidate.definitions[2].value, Some(SemValue::Numeral { value: 2009, .. })));
    }

    #[test]
    fn filters_apply_to_the_shape_of_the_match() {
        let rules = rules();
        let mut document = doc(&[("23.", "23."), ("juulil", "juuli"), ("ja", "ja")]);
        extract(&mut document, &rules);
        let candidate = &document.candidates()[0];
        assert_eq!(candidate.tag, "DATE");
        assert!(!candidate.standalone);
        assert_eq!(candidate.definitions.len(), 2);
        assert_eq!(document.token(0).candidates().len(), 1);
        assert_eq!(document.token(2).candidates().len(), 0);
    }
}
