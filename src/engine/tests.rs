use super::{Pipeline, merge};
use crate::candidate::{Span, SplitPoint, Stage};
use crate::document::Document;
use crate::granularity::Granularity;
use crate::output::{self, DANGLING};
use crate::reference::ReferenceTime;
use crate::rules::{MergeRule, NegativePattern, NumeralTemplate, PatternElement, RuleSet, WordClass, WordTemplate};
use crate::semantics::definition::set;
use crate::token::Token;

fn reference() -> ReferenceTime {
    "2009-07-23T10:30".parse().unwrap()
}

fn models() -> Vec<String> {
    vec!["ajavt".to_string()]
}

type Word<'a> = (&'a str, &'a str, &'a str, &'a str);

/// `(surface, lemma, pos, form)`; the last word closes the sentence.
fn analyzed(words: &[Word]) -> Document {
    sentences(&[words])
}

fn sentences(parts: &[&[Word]]) -> Document {
    let mut tokens = Vec::new();
    for words in parts {
        let mut sentence: Vec<Token> = words
            .iter()
            .map(|(surface, lemma, pos, form)| Token::new(surface).with_analysis(lemma, "", pos, form))
            .collect();
        if let Some(last) = sentence.pop() {
            sentence.push(last.ending_sentence());
        }
        tokens.extend(sentence);
    }
    Document::new(tokens)
}

fn run(rules: &RuleSet, document: &mut Document) {
    Pipeline::new(rules).run(document, &reference(), &models()).unwrap();
}

fn estonian(words: &[Word]) -> (Document, Vec<output::Annotation>) {
    estonian_sentences(&[words])
}

fn estonian_sentences(parts: &[&[Word]]) -> (Document, Vec<output::Annotation>) {
    let rules = RuleSet::estonian().unwrap();
    let mut document = sentences(parts);
    run(&rules, &mut document);
    let annotations = output::annotate(&document);
    (document, annotations)
}

fn values(annotations: &[output::Annotation]) -> Vec<String> {
    annotations.iter().filter_map(|a| a.timex.value.clone()).collect()
}

fn clock_rules() -> RuleSet {
    RuleSet::builder()
        .class(WordClass::new("KELL").lemmas(&["kell"]))
        .class(WordClass::new("TUND").with(WordTemplate::numeral(NumeralTemplate::between(0, 24))))
        .rule(extraction_rule! {
            name: "tund",
            tag: "X",
            pattern: [PatternElement::optional(&["KELL"]), PatternElement::required(&["TUND"])],
            semantics: [set(Granularity::HourOfDay).capture(1), set(Granularity::Minute).literal("0")],
        })
        .build()
        .unwrap()
}

// --- Scenarios ----------------------------------------------------------------

#[test]
fn adjacent_tagged_candidates_merge_into_one_phrase() {
    let rules = RuleSet::builder()
        .class(WordClass::new("KELL").lemmas(&["kell"]))
        .class(WordClass::new("TUND").with(WordTemplate::numeral(NumeralTemplate::between(0, 24))))
        .class(WordClass::new("POD").valued_lemmas(&[("hommik", "MO")]))
        .rule(extraction_rule! {
            name: "kell",
            tag: "A",
            pattern: [PatternElement::required(&["KELL"]), PatternElement::required(&["TUND"])],
            semantics: [set(Granularity::HourOfDay).capture(1)],
        })
        .rule(extraction_rule! {
            name: "hommik",
            tag: "B",
            pattern: [PatternElement::required(&["POD"])],
            semantics: [set(Granularity::TimeOfDay).capture(0)],
        })
        .merge(MergeRule::exact("A", "B"))
        .build()
        .unwrap();
    let mut doc =
        analyzed(&[("kell", "kell", "S", "sg n"), ("12", "12", "N", ""), ("hommikul", "hommik", "S", "sg ad")]);
    run(&rules, &mut doc);

    let top = doc.top_level();
    assert_eq!(top.len(), 1);
    let phrase = doc.candidate(top[0]);
    assert_eq!(phrase.stage, Stage::MergedAsPhrase);
    assert_eq!(phrase.span, Span::new(0, 2));
    assert_eq!(phrase.tag, "A-B");
    assert!(phrase.value.is_some());
}

#[test]
fn range_markers_join_two_candidates() {
    let rules = clock_rules();
    let mut doc = analyzed(&[
        ("kella", "kell", "S", "sg g"),
        ("üheksast", "üheksa", "N", "sg el"),
        ("kümneni", "kümme", "N", "sg ter"),
    ]);
    run(&rules, &mut doc);

    let top = doc.top_level();
    assert_eq!(top.len(), 1);
    let range = doc.candidate(top[0]);
    assert_eq!(range.stage, Stage::MergedAsRange);
    assert_eq!(range.tag, "X..X");
    assert_eq!(range.split, Some(SplitPoint { token: 1, inclusive: true }));
    assert_eq!(range.children.len(), 2);
}

#[test]
fn negative_pattern_removes_the_candidate_everywhere() {
    let rules = RuleSet::builder()
        .class(WordClass::new("ARV").with(WordTemplate::numeral(NumeralTemplate::between(1, 200))))
        .class(WordClass::new("AASTA").lemmas(&["aasta"]))
        .class(WordClass::new("VANA").lemmas(&["vana"]))
        .rule(extraction_rule! {
            name: "aastad",
            tag: "DURATION",
            pattern: [PatternElement::required(&["ARV"]), PatternElement::required(&["AASTA"])],
            semantics: [set(Granularity::Year).capture(0)],
            negatives: [NegativePattern::new(
                vec![PatternElement::required(&["AASTA"]), PatternElement::required(&["VANA"])],
                1,
            )],
        })
        .build()
        .unwrap();

    let mut doc = analyzed(&[
        ("ta", "tema", "P", "sg n"),
        ("on", "olema", "V", "b"),
        ("viis", "viis", "N", "sg n"),
        ("aastat", "aasta", "S", "sg p"),
        ("vana", "vana", "A", "sg n"),
    ]);
    run(&rules, &mut doc);
    assert!(doc.top_level().is_empty());
    assert!(doc.tokens().iter().all(|t| t.candidates().is_empty()));

    let mut doc =
        analyzed(&[("viis", "viis", "N", "sg n"), ("aastat", "aasta", "S", "sg p"), ("tagasi", "tagasi", "D", "")]);
    run(&rules, &mut doc);
    assert_eq!(doc.top_level().len(), 1);
}

#[test]
fn unresolvable_anchor_is_rendered_as_dangling() {
    let (doc, annotations) = estonian(&[
        ("31.", "31.", "O", ""),
        ("veebruaril", "veebruar", "S", "sg ad"),
        ("ja", "ja", "J", ""),
        ("samal", "sama", "P", "sg ad"),
        ("päeval", "päev", "S", "sg ad"),
    ]);
    assert_eq!(doc.top_level().len(), 2);
    assert_eq!(annotations.len(), 1);
    let timex = &annotations[0].timex;
    assert_eq!(annotations[0].span, Some(Span::new(3, 4)));
    assert_eq!(timex.tid, "t1");
    assert_eq!(timex.anchor_time_id.as_deref(), Some(DANGLING));
}

// --- Properties ---------------------------------------------------------------

#[test]
fn no_candidate_is_contained_in_another_after_a_run() {
    let (doc, _) = estonian(&[
        ("23.", "23.", "O", ""),
        ("juulil", "juuli", "S", "sg ad"),
        ("2009.", "2009.", "O", ""),
        ("aastal", "aasta", "S", "sg ad"),
        ("kell", "kell", "S", "sg n"),
        ("12", "12", "N", ""),
        ("ja", "ja", "J", ""),
        ("kolm", "kolm", "N", "sg n"),
        ("päeva", "päev", "S", "sg p"),
        ("tagasi", "tagasi", "D", ""),
    ]);
    for token in doc.tokens() {
        for (a, _) in token.candidates() {
            for (b, _) in token.candidates() {
                let (a, b) = (doc.candidate(*a).span, doc.candidate(*b).span);
                assert!(!a.is_proper_subset_of(&b), "{a:?} inside {b:?}");
            }
        }
    }
}

#[test]
fn merging_twice_changes_nothing() {
    let rules = RuleSet::estonian().unwrap();
    let mut doc = analyzed(&[
        ("homme", "homme", "D", ""),
        ("hommikul", "hommik", "S", "sg ad"),
        ("kell", "kell", "S", "sg n"),
        ("9", "9", "N", ""),
        ("ja", "ja", "J", ""),
        ("eile", "eile", "D", ""),
    ]);
    run(&rules, &mut doc);
    let before = doc.top_level();
    assert_eq!(merge::merge_phrases(&mut doc, rules.merges()), 0);
    assert_eq!(doc.top_level(), before);
}

#[test]
fn identifiers_are_contiguous_from_t1() {
    let (_, annotations) = estonian(&[
        ("eile", "eile", "D", ""),
        ("õhtul", "õhtu", "S", "sg ad"),
        ("ja", "ja", "J", ""),
        ("viimased", "viimane", "A", "pl n"),
        ("kolm", "kolm", "N", "sg n"),
        ("päeva", "päev", "S", "sg p"),
        ("ning", "ning", "J", ""),
        ("praegu", "praegu", "D", ""),
    ]);
    let tids: Vec<&str> = annotations.iter().map(|a| a.timex.tid.as_str()).collect();
    assert_eq!(tids, ["t1", "t2", "t3", "t4", "t5"]);
    assert!(annotations.iter().filter_map(|a| a.timex.anchor_time_id.as_deref()).all(|id| id == "t0"));

    let last = &annotations[1].timex;
    assert_eq!(last.value.as_deref(), Some("P3D"));
    assert_eq!(last.begin_point.as_deref(), Some("t3"));
    assert_eq!(last.end_point.as_deref(), Some("t4"));
    assert_eq!(annotations[2].span, None);
    assert_eq!(annotations[3].span, None);
}

#[test]
fn ranges_split_into_their_endpoint_values() {
    let (doc, annotations) = estonian(&[
        ("kella", "kell", "S", "sg g"),
        ("üheksast", "üheksa", "N", "sg el"),
        ("kümneni", "kümme", "N", "sg ter"),
    ]);
    let range = doc.candidate(doc.top_level()[0]);
    assert_eq!(range.stage, Stage::MergedAsRange);
    assert!(range.value.is_none());

    let halves: Vec<Span> = range.children.iter().map(|c| doc.candidate(*c).span).collect();
    assert_eq!(halves, [Span::new(0, 1), Span::new(2, 2)]);
    assert_eq!(values(&annotations), ["2009-07-23T09:00", "2009-07-23T10:00"]);
}

#[test]
fn resolved_anchor_wins_over_the_reference_time() {
    let (_, annotations) = estonian(&[
        ("23.", "23.", "O", ""),
        ("juulil", "juuli", "S", "sg ad"),
        ("2008", "2008", "N", ""),
        ("ja", "ja", "J", ""),
        ("järgmisel", "järgmine", "A", "sg ad"),
        ("päeval", "päev", "S", "sg ad"),
    ]);
    assert_eq!(values(&annotations), ["2008-07-23", "2008-07-24"]);
    assert_eq!(annotations[1].timex.anchor_time_id.as_deref(), Some("t1"));
    assert!(annotations[1].timex.temporal_function);
    assert!(!annotations[0].timex.temporal_function);
}

const JULY_23_2008: &[Word<'static>] = &[
    ("23.", "23.", "O", ""),
    ("juulil", "juuli", "S", "sg ad"),
    ("2008", "2008", "N", ""),
    (".", ".", "Z", ""),
];

#[test]
fn document_anchors_cross_sentence_boundaries() {
    let next_day: &[Word] =
        &[("Järgmisel", "järgmine", "A", "sg ad"), ("päeval", "päev", "S", "sg ad"), (".", ".", "Z", "")];
    let (_, annotations) = estonian_sentences(&[JULY_23_2008, next_day]);
    assert_eq!(values(&annotations), ["2008-07-23", "2008-07-24"]);
    assert_eq!(annotations[1].timex.anchor_time_id.as_deref(), Some("t1"));
}

#[test]
fn sentence_anchors_stay_in_their_sentence() {
    let same_day: &[Word] = &[("Samal", "sama", "P", "sg ad"), ("päeval", "päev", "S", "sg ad"), (".", ".", "Z", "")];
    let (_, annotations) = estonian_sentences(&[JULY_23_2008, same_day]);
    assert_eq!(values(&annotations), ["2008-07-23", "2009-07-23"]);
    assert_eq!(annotations[1].timex.anchor_time_id.as_deref(), Some("t0"));
}

// --- Built-in rules -----------------------------------------------------------

#[test]
fn estonian_expressions_resolve() {
    // Reference: Thursday 2009-07-23 10:30.
    let cases: Vec<(&str, Vec<(&str, &str, &str, &str)>)> = vec![
        ("2009-07-23", vec![("23.", "23.", "O", ""), ("juulil", "juuli", "S", "sg ad"), ("2009", "2009", "N", "")]),
        ("2009-07", vec![("juulis", "juuli", "S", "sg in")]),
        ("2009", vec![("2009.", "2009.", "O", ""), ("aastal", "aasta", "S", "sg ad")]),
        ("2009-07-22TEV", vec![("eile", "eile", "D", ""), ("õhtul", "õhtu", "S", "sg ad")]),
        ("2009-07-24T12:00", vec![("homme", "homme", "D", ""), ("kell", "kell", "S", "sg n"), ("12", "12", "N", "")]),
        (
            "2009-07-20",
            vec![("kolm", "kolm", "N", "sg n"), ("päeva", "päev", "S", "sg p"), ("tagasi", "tagasi", "D", "")],
        ),
        ("P3D", vec![("kolm", "kolm", "N", "sg n"), ("päeva", "päev", "S", "sg p")]),
        ("2009-W31", vec![("järgmisel", "järgmine", "A", "sg ad"), ("nädalal", "nädal", "S", "sg ad")]),
        ("2008", vec![("eelmisel", "eelmine", "A", "sg ad"), ("aastal", "aasta", "S", "sg ad")]),
        ("2009-07-27", vec![("järgmisel", "järgmine", "A", "sg ad"), ("esmaspäeval", "esmaspäev", "S", "sg ad")]),
        ("PRESENT_REF", vec![("praegu", "praegu", "D", "")]),
    ];
    for (expected, words) in cases {
        let (_, annotations) = estonian(&words);
        let surface: Vec<&str> = words.iter().map(|w| w.0).collect();
        assert_eq!(values(&annotations), [expected], "for {surface:?}");
    }
}

#[test]
fn recurrences_carry_their_quantifier() {
    let (_, annotations) = estonian(&[("iga", "iga", "P", "sg n"), ("päev", "päev", "S", "sg n")]);
    assert_eq!(annotations.len(), 1);
    let timex = &annotations[0].timex;
    assert_eq!(timex.timex_type.as_deref(), Some("SET"));
    assert_eq!(timex.value.as_deref(), Some("P1D"));
    assert_eq!(timex.quant.as_deref(), Some("EACH"));
}

#[test]
fn ages_are_not_durations() {
    let (doc, annotations) =
        estonian(&[("viis", "viis", "N", "sg n"), ("aastat", "aasta", "S", "sg p"), ("vana", "vana", "A", "sg n")]);
    assert!(doc.top_level().is_empty());
    assert!(annotations.is_empty());
}
