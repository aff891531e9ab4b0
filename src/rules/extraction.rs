//! Extraction rules: a pattern over word classes plus the semantics of a match.

use crate::semantics::SemanticDefinition;

/// How a pattern element takes part in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    Required,
    Optional,
    /// Must match, but the token is left out of the candidate's span.
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternElement {
    /// Word classes accepted at this position.
    pub classes: Vec<String>,
    pub occurrence: Occurrence,
}

impl PatternElement {
    pub fn new(classes: &[&str], occurrence: Occurrence) -> Self {
        PatternElement { classes: classes.iter().map(|c| c.to_string()).collect(), occurrence }
    }

    pub fn required(classes: &[&str]) -> Self {
        Self::new(classes, Occurrence::Required)
    }

    pub fn optional(classes: &[&str]) -> Self {
        Self::new(classes, Occurrence::Optional)
    }

    pub fn discard(classes: &[&str]) -> Self {
        Self::new(classes, Occurrence::Discard)
    }
}

/// Presence or absence of a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub element: usize,
    pub present: bool,
}

/// Extra semantics that apply only to some shapes of a match, e.g. when the
/// optional year element was found.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub requirements: Vec<Requirement>,
    pub definitions: Vec<SemanticDefinition>,
    pub tag: Option<String>,
    pub standalone: Option<bool>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn requires(mut self, element: usize) -> Self {
        self.requirements.push(Requirement { element, present: true });
        self
    }

    pub fn forbids(mut self, element: usize) -> Self {
        self.requirements.push(Requirement { element, present: false });
        self
    }

    pub fn define(mut self, definition: SemanticDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn standalone(mut self, standalone: bool) -> Self {
        self.standalone = Some(standalone);
        self
    }

    /// `matched[i]` tells whether element `i` took part in the match.
    pub fn applies(&self, matched: &[bool]) -> bool {
        self.requirements.iter().all(|r| matched.get(r.element).copied().unwrap_or(false) == r.present)
    }
}

/// A pattern whose match around a candidate vetoes it ("5 aastat vana" is an
/// age, not a duration).
#[derive(Debug, Clone)]
pub struct NegativePattern {
    pub elements: Vec<PatternElement>,
    /// Tokens on each side of the candidate the pattern may reach into.
    pub reach: usize,
}

impl NegativePattern {
    pub fn new(elements: Vec<PatternElement>, reach: usize) -> Self {
        NegativePattern { elements, reach }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub name: String,
    pub tag: String,
    pub elements: Vec<PatternElement>,
    pub definitions: Vec<SemanticDefinition>,
    pub filters: Vec<Filter>,
    pub negatives: Vec<NegativePattern>,
    /// False when matches may only appear inside a merged phrase.
    pub standalone: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_check_presence_and_absence() {
        let with_year = Filter::new().requires(2);
        let without_year = Filter::new().forbids(2);
        let matched = [true, true, false];
        assert!(!with_year.applies(&matched));
        assert!(without_year.applies(&matched));
        assert!(Filter::new().applies(&matched));
    }

    #[test]
    fn rule_macro_fills_optional_sections() {
        let rule = extraction_rule! {
            name: "kuu nimi",
            tag: "MONTH",
            pattern: [PatternElement::required(&["KUU"])],
        };
        assert!(rule.standalone);
        assert!(rule.filters.is_empty());

        let rule = extraction_rule! {
            name: "kell",
            tag: "TIME",
            pattern: [PatternElement::discard(&["KELL"]), PatternElement::required(&["TUND"])],
            standalone: false,
        };
        assert!(!rule.standalone);
        assert_eq!(rule.elements[0].occurrence, Occurrence::Discard);
    }
}
