//! Built-in Estonian rules.
//!
//! Covers the everyday core of Estonian temporal expressions:
//!
//! | tag            | example                         | value                |
//! |----------------|---------------------------------|----------------------|
//! | `DATE`         | `23. juulil 2009`               | `2009-07-23`         |
//! | `MONTH`        | `juulis`                        | `2009-07`            |
//! | `YEAR`         | `2009. aastal`                  | `2009`               |
//! | `TIME`         | `kell 12`                       | `....T12:00`         |
//! | `POD`          | `hommikul`                      | `....TMO`            |
//! | `REL_DAY`      | `homme`                         | reference + 1 day    |
//! | `WEEKDAY`      | `järgmisel esmaspäeval`         | Monday of next week  |
//! | `REL_UNIT`     | `eelmisel aastal`               | reference - 1 year   |
//! | `DURATION`     | `kolm päeva`                    | `P3D`                |
//! | `AGO`/`LATER`  | `3 päeva tagasi`                | reference - 3 days   |
//! | `LAST`         | `viimased 3 päeva`              | `P3D` + endpoints    |
//! | `SET`          | `iga päev`                      | `P1D`, quant `EACH`  |
//! | `ANCHORED_DAY` | `samal päeval`                  | anchor's day         |
//! | `PRESENT`      | `praegu`                        | `PRESENT_REF`        |
//!
//! Word classes carry the values (`juuli` → `7`); rules only say which field
//! a captured value goes to.

pub mod numerals;

use crate::error::Result;
use crate::granularity::Granularity;
use crate::rules::{
    Filter, MergeRule, NegativePattern, NumeralTemplate, PatternElement, RuleSet, RuleSetBuilder, WordClass,
    WordTemplate,
};
use crate::semantics::definition::{add, anchor, attribute, begin_point, end_point, seek_in, set, subtract};
use crate::semantics::{AnchorScope, Attribute};

/// Computation model the built-in rules are written for.
pub const DEFAULT_MODEL: &str = "ajavt";

const MONTHS: [(&str, &str); 12] = [
    ("jaanuar", "1"),
    ("veebruar", "2"),
    ("märts", "3"),
    ("aprill", "4"),
    ("mai", "5"),
    ("juuni", "6"),
    ("juuli", "7"),
    ("august", "8"),
    ("september", "9"),
    ("oktoober", "10"),
    ("november", "11"),
    ("detsember", "12"),
];

const WEEKDAYS: [(&str, &str); 7] = [
    ("esmaspäev", "1"),
    ("teisipäev", "2"),
    ("kolmapäev", "3"),
    ("neljapäev", "4"),
    ("reede", "5"),
    ("laupäev", "6"),
    ("pühapäev", "7"),
];

/// Unit lemma, word class and the field it counts.
const UNITS: [(&str, &str, Granularity); 6] = [
    ("minut", "U_MINUT", Granularity::Minute),
    ("tund", "U_TUND", Granularity::HourOfDay),
    ("päev", "U_PAEV", Granularity::DayOfMonth),
    ("nädal", "U_NADAL", Granularity::WeekOfYear),
    ("kuu", "U_KUU", Granularity::Month),
    ("aasta", "U_AASTA", Granularity::Year),
];

fn classes(builder: RuleSetBuilder) -> RuleSetBuilder {
    let mut builder = builder
        .class(WordClass::new("KUUNIMI").valued_lemmas(&MONTHS))
        .class(WordClass::new("NADALAPAEV").valued_lemmas(&WEEKDAYS))
        .class(WordClass::new("PAEV_NR").with(WordTemplate::numeral(NumeralTemplate::between(1, 31).ordinal(true))))
        .class(
            WordClass::new("AASTA_NR").with(WordTemplate::numeral(NumeralTemplate::between(1000, 2100).digits(true))),
        )
        .class(WordClass::new("AASTA").lemmas(&["aasta"]))
        .class(WordClass::new("KELL").lemmas(&["kell"]))
        .class(WordClass::new("TUND_NR").with(WordTemplate::numeral(NumeralTemplate::between(0, 24).ordinal(false))))
        .class(WordClass::new("ARV").with(WordTemplate::numeral(NumeralTemplate::between(1, 1000).ordinal(false))))
        .class(WordClass::new("OSA_PAEVAST").valued_lemmas(&[
            ("hommik", "MO"),
            ("keskpäev", "MI"),
            ("pärastlõuna", "AF"),
            ("õhtu", "EV"),
            ("öö", "NI"),
        ]))
        .class(WordClass::new("SUHTELINE_PAEV").valued_lemmas(&[
            ("üleeile", "-2"),
            ("eile", "-1"),
            ("täna", "0"),
            ("homme", "1"),
            ("ülehomme", "2"),
        ]))
        .class(WordClass::new("MUUTJA").valued_lemmas(&[
            ("eelmine", "-1"),
            ("möödunud", "-1"),
            ("järgmine", "1"),
            ("tulev", "1"),
            ("käesolev", "0"),
            ("see", "0"),
        ]))
        .class(WordClass::new("SAMA").lemmas(&["sama"]))
        .class(WordClass::new("TAGASI").lemmas(&["tagasi"]))
        .class(WordClass::new("HILJEM").lemmas(&["hiljem", "pärast"]))
        .class(WordClass::new("VIIMANE").lemmas(&["viimane"]))
        .class(WordClass::new("IGA").lemmas(&["iga"]))
        .class(WordClass::new("PRAEGU").lemmas(&["praegu", "nüüd"]))
        .class(WordClass::new("VANA").lemmas(&["vana"]));
    for (lemma, class, _) in UNITS {
        builder = builder.class(WordClass::new(class).lemmas(&[lemma]));
    }
    builder
}

fn calendar_rules(builder: RuleSetBuilder) -> RuleSetBuilder {
    builder
        .rule(extraction_rule! {
            name: "kuupäev",
            tag: "DATE",
            pattern: [
                PatternElement::required(&["PAEV_NR"]),
                PatternElement::required(&["KUUNIMI"]),
                PatternElement::optional(&["AASTA_NR"]),
                PatternElement::optional(&["AASTA"]),
            ],
            semantics: [set(Granularity::Month).capture(1), set(Granularity::DayOfMonth).capture(0)],
            filters: [Filter::new().requires(2).define(set(Granularity::Year).capture(2).priority(0))],
        })
        .rule(extraction_rule! {
            name: "kuu",
            tag: "MONTH",
            pattern: [PatternElement::required(&["KUUNIMI"]), PatternElement::optional(&["AASTA_NR"])],
            semantics: [set(Granularity::Month).capture(0)],
            filters: [Filter::new().requires(1).define(set(Granularity::Year).capture(1).priority(0))],
        })
        .rule(extraction_rule! {
            name: "aasta",
            tag: "YEAR",
            pattern: [PatternElement::required(&["AASTA_NR"]), PatternElement::required(&["AASTA"])],
            semantics: [set(Granularity::Year).capture(0)],
        })
        .rule(extraction_rule! {
            name: "kellaaeg",
            tag: "TIME",
            pattern: [PatternElement::required(&["KELL"]), PatternElement::required(&["TUND_NR"])],
            semantics: [set(Granularity::HourOfDay).capture(1), set(Granularity::Minute).literal("0")],
        })
        .rule(extraction_rule! {
            name: "osa päevast",
            tag: "POD",
            pattern: [PatternElement::required(&["OSA_PAEVAST"])],
            semantics: [set(Granularity::TimeOfDay).capture(0)],
        })
        .rule(extraction_rule! {
            name: "suhteline päev",
            tag: "REL_DAY",
            pattern: [PatternElement::required(&["SUHTELINE_PAEV"])],
            semantics: [add(Granularity::DayOfMonth).capture(0)],
        })
        .rule(extraction_rule! {
            name: "nädalapäev",
            tag: "WEEKDAY",
            pattern: [PatternElement::optional(&["MUUTJA"]), PatternElement::required(&["NADALAPAEV"])],
            filters: [
                Filter::new()
                    .requires(0)
                    .define(add(Granularity::WeekOfYear).capture(0))
                    .define(set(Granularity::DayOfWeek).capture(1).priority(2)),
                Filter::new().forbids(0).define(seek_in(Granularity::DayOfWeek).capture(1)),
            ],
        })
        .rule(extraction_rule! {
            name: "praegu",
            tag: "PRESENT",
            pattern: [PatternElement::required(&["PRAEGU"])],
            semantics: [attribute(Attribute::Type).literal("DATE"), attribute(Attribute::Value).literal("PRESENT_REF")],
        })
        .rule(extraction_rule! {
            name: "samal päeval",
            tag: "ANCHORED_DAY",
            pattern: [PatternElement::required(&["SAMA"]), PatternElement::required(&["U_PAEV"])],
            semantics: [anchor(AnchorScope::Sentence), add(Granularity::DayOfMonth).literal("0")],
        })
        .rule(extraction_rule! {
            name: "järgmisel päeval",
            tag: "ANCHORED_DAY",
            pattern: [PatternElement::required(&["MUUTJA"]), PatternElement::required(&["U_PAEV"])],
            semantics: [anchor(AnchorScope::Document), add(Granularity::DayOfMonth).capture(0)],
        })
}

fn unit_rules(mut builder: RuleSetBuilder) -> RuleSetBuilder {
    for (lemma, class, granularity) in UNITS {
        let mut duration = extraction_rule! {
            name: format!("kestus {lemma}"),
            tag: "DURATION",
            pattern: [PatternElement::required(&["ARV"]), PatternElement::required(&[class])],
            semantics: [attribute(Attribute::Type).literal("DURATION"), set(granularity).capture(0)],
        };
        if granularity == Granularity::Year {
            // "viis aastat vana" is an age, not a duration.
            duration.negatives.push(NegativePattern::new(
                vec![PatternElement::required(&[class]), PatternElement::required(&["VANA"])],
                1,
            ));
        }

        builder = builder
            .rule(duration)
            .rule(extraction_rule! {
                name: format!("{lemma} tagasi"),
                tag: "AGO",
                pattern: [
                    PatternElement::required(&["ARV"]),
                    PatternElement::required(&[class]),
                    PatternElement::required(&["TAGASI"]),
                ],
                semantics: [subtract(granularity).capture(0)],
            })
            .rule(extraction_rule! {
                name: format!("{lemma} hiljem"),
                tag: "LATER",
                pattern: [
                    PatternElement::required(&["ARV"]),
                    PatternElement::required(&[class]),
                    PatternElement::required(&["HILJEM"]),
                ],
                semantics: [add(granularity).capture(0)],
            })
            .rule(extraction_rule! {
                name: format!("viimased {lemma}"),
                tag: "LAST",
                pattern: [
                    PatternElement::required(&["VIIMANE"]),
                    PatternElement::required(&["ARV"]),
                    PatternElement::required(&[class]),
                ],
                semantics: [
                    attribute(Attribute::Type).literal("DURATION"),
                    set(granularity).capture(1),
                    begin_point(granularity).capture(1),
                    end_point(granularity),
                ],
            })
            .rule(extraction_rule! {
                name: format!("iga {lemma}"),
                tag: "SET",
                pattern: [PatternElement::required(&["IGA"]), PatternElement::required(&[class])],
                semantics: [
                    attribute(Attribute::Type).literal("SET"),
                    set(granularity).literal("1"),
                    attribute(Attribute::Quant).literal("EACH"),
                ],
            });

        if granularity != Granularity::DayOfMonth {
            builder = builder.rule(extraction_rule! {
                name: format!("suhteline {lemma}"),
                tag: "REL_UNIT",
                pattern: [PatternElement::required(&["MUUTJA"]), PatternElement::required(&[class])],
                semantics: [add(granularity).capture(0)],
            });
        }
    }
    builder
}

fn merge_rules(builder: RuleSetBuilder) -> RuleSetBuilder {
    let mut builder = builder;
    for (first, second) in [
        ("DATE", "TIME"),
        ("DATE", "POD"),
        ("TIME", "POD"),
        ("REL_DAY", "TIME"),
        ("REL_DAY", "POD"),
        ("WEEKDAY", "TIME"),
        ("WEEKDAY", "POD"),
        ("ANCHORED_DAY", "TIME"),
        ("ANCHORED_DAY", "POD"),
    ] {
        builder = builder.merge(MergeRule::exact(first, second).free());
    }
    builder
        .merge(MergeRule::exact("WEEKDAY", "DATE"))
        .merge(MergeRule::exact("REL_UNIT", "WEEKDAY"))
        .merge(MergeRule::gapped("WEEKDAY", "TIME"))
}

/// The built-in Estonian rule set.
pub fn rule_set() -> Result<RuleSet> {
    merge_rules(unit_rules(calendar_rules(classes(RuleSet::builder())))).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_rules_compile() {
        let rules = rule_set().unwrap();
        // 10 calendar rules, 5 per unit and 5 relative-unit rules.
        assert_eq!(rules.len(), 10 + 5 * UNITS.len() + 5);
        assert!(rules.classes().iter().any(|c| c.name == "KUUNIMI"));
        assert_eq!(rules.merges().len(), 12);
    }

    #[test]
    fn only_the_year_duration_has_a_negative_pattern() {
        let rules = rule_set().unwrap();
        let with_negatives: Vec<&str> =
            rules.rules().filter(|(_, r)| !r.negatives.is_empty()).map(|(_, r)| r.rule.name.as_str()).collect();
        assert_eq!(with_negatives, ["kestus aasta"]);
    }
}
