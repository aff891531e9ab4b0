//! Rule sets: word classes, extraction rules and merge rules.
//!
//! A [`RuleSet`] is built once through [`RuleSetBuilder`], which resolves word
//! class names and compiles every pattern into an automaton. The result is
//! immutable and can be shared between threads.

use std::collections::HashMap;
use std::fmt;

use crate::engine::automaton::{Automaton, ClassId};
use crate::error::{Error, Result};
use crate::semantics::SemValue;

pub mod estonian;
pub mod extraction;
pub mod merge;
pub mod word_class;

pub use extraction::{ExtractionRule, Filter, NegativePattern, Occurrence, PatternElement, Requirement};
pub use merge::MergeRule;
pub use word_class::{NumeralTemplate, Template, WordClass, WordTemplate};

/// Index of an extraction rule in its rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub usize);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// An extraction rule with its compiled automata.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: ExtractionRule,
    pub(crate) automaton: Automaton,
    /// Negative patterns with their reach.
    pub(crate) negatives: Vec<(Automaton, usize)>,
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    classes: Vec<WordClass>,
    rules: Vec<CompiledRule>,
    merges: Vec<MergeRule>,
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// The built-in Estonian rules.
    pub fn estonian() -> Result<RuleSet> {
        estonian::rule_set()
    }

    pub fn classes(&self) -> &[WordClass] {
        &self.classes
    }

    pub fn rule(&self, id: RuleId) -> &CompiledRule {
        &self.rules[id.0]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &CompiledRule)> {
        self.rules.iter().enumerate().map(|(idx, r)| (RuleId(idx), r))
    }

    pub fn merges(&self) -> &[MergeRule] {
        &self.merges
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    classes: Vec<WordClass>,
    rules: Vec<ExtractionRule>,
    merges: Vec<MergeRule>,
}

impl RuleSetBuilder {
    pub fn class(mut self, class: WordClass) -> Self {
        self.classes.push(class);
        self
    }

    pub fn rule(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn merge(mut self, merge: MergeRule) -> Self {
        self.merges.push(merge);
        self
    }

    pub fn build(self) -> Result<RuleSet> {
        let mut index: HashMap<String, ClassId> = HashMap::new();
        for (idx, class) in self.classes.iter().enumerate() {
            if index.insert(class.name.clone(), ClassId(idx)).is_some() {
                return Err(Error::rule(&class.name, "word class defined twice"));
            }
        }

        let mut rules = Vec::with_capacity(self.rules.len());
        for rule in self.rules {
            validate_indices(&rule)?;
            let automaton = Automaton::compile(&rule.name, &rule.elements, &index)?;
            let negatives = rule
                .negatives
                .iter()
                .map(|n| Ok((Automaton::compile(&rule.name, &n.elements, &index)?, n.reach)))
                .collect::<Result<Vec<_>>>()?;
            rules.push(CompiledRule { rule, automaton, negatives });
        }

        Ok(RuleSet { classes: self.classes, rules, merges: self.merges })
    }
}

/// Captures and filter requirements must point at existing elements.
fn validate_indices(rule: &ExtractionRule) -> Result<()> {
    let n = rule.elements.len();
    let definitions = rule.definitions.iter().chain(rule.filters.iter().flat_map(|f| f.definitions.iter()));
    for definition in definitions {
        if let Some(SemValue::Capture(element)) = definition.value {
            if element >= n {
                return Err(Error::rule(&rule.name, format!("capture of missing element {element}")));
            }
        }
    }
    for filter in &rule.filters {
        if let Some(r) = filter.requirements.iter().find(|r| r.element >= n) {
            return Err(Error::rule(&rule.name, format!("filter on missing element {}", r.element)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::granularity::Granularity;
    use crate::semantics::definition::set;

    fn month_class() -> WordClass {
        WordClass::new("KUU").valued_lemmas(&[("mai", "5")])
    }

    #[test]
    fn builder_rejects_unknown_classes() {
        let result = RuleSet::builder()
            .class(month_class())
            .rule(extraction_rule! { name: "päev", tag: "DATE", pattern: [PatternElement::required(&["PAEV"])] })
            .build();
        assert!(matches!(result, Err(Error::Rule { rule, .. }) if rule == "päev"));
    }

    #[test]
    fn builder_rejects_duplicate_classes_and_bad_captures() {
        assert!(RuleSet::builder().class(month_class()).class(month_class()).build().is_err());

        let bad_capture = extraction_rule! {
            name: "kuu",
            tag: "DATE",
            pattern: [PatternElement::required(&["KUU"])],
            semantics: [set(Granularity::Month).capture(3)],
        };
        assert!(RuleSet::builder().class(month_class()).rule(bad_capture).build().is_err());
    }

    #[test]
    fn rule_sets_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuleSet>();
    }
}
