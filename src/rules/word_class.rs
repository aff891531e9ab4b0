//! Word classes: named sets of word templates.
//!
//! A pattern element never tests a token directly; it names one or more word
//! classes, and a class matches when any of its templates does. Templates can
//! carry a semantic value which becomes the element's capture when it matches
//! (`"jaanuar"` → `1`).

use regex::Regex;

use crate::error::{Error, Result};
use crate::semantics::SemValue;
use crate::token::{Token, TokenFlags};

/// Constraints for numeral templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumeralTemplate {
    pub min: i64,
    pub max: i64,
    /// `Some(true)` accepts ordinals only, `Some(false)` cardinals only.
    pub ordinal: Option<bool>,
    /// `Some(true)` accepts digit tokens only, `Some(false)` numeral words only.
    pub digits: Option<bool>,
}

impl NumeralTemplate {
    pub fn between(min: i64, max: i64) -> Self {
        NumeralTemplate { min, max, ordinal: None, digits: None }
    }

    pub fn ordinal(mut self, ordinal: bool) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    pub fn digits(mut self, digits: bool) -> Self {
        self.digits = Some(digits);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Template {
    /// Any analysis with this lemma, optionally with a form matching the regex.
    Lemma { lemma: String, form: Option<Regex> },
    /// Regex over the surface form.
    Surface(Regex),
    /// Case-insensitive literal surface form.
    Literal(String),
    Numeral(NumeralTemplate),
}

/// A template plus the value it contributes when it matches.
#[derive(Debug, Clone)]
pub struct WordTemplate {
    pub template: Template,
    pub value: Option<String>,
}

impl WordTemplate {
    pub fn lemma(lemma: &str) -> Self {
        WordTemplate { template: Template::Lemma { lemma: lemma.to_lowercase(), form: None }, value: None }
    }

    pub fn lemma_in_form(lemma: &str, form: &str) -> Result<Self> {
        let form = Regex::new(form).map_err(|e| Error::rule(lemma, e.to_string()))?;
        Ok(WordTemplate { template: Template::Lemma { lemma: lemma.to_lowercase(), form: Some(form) }, value: None })
    }

    pub fn surface(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::rule(pattern, e.to_string()))?;
        Ok(WordTemplate { template: Template::Surface(regex), value: None })
    }

    pub fn literal(text: &str) -> Self {
        WordTemplate { template: Template::Literal(text.to_lowercase()), value: None }
    }

    pub fn numeral(numeral: NumeralTemplate) -> Self {
        WordTemplate { template: Template::Numeral(numeral), value: None }
    }

    /// Attach the value captured when this template matches.
    pub fn valued(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    /// Test the template against the token at `index`. `Some(value)` on a
    /// match, where `value` is what a capture of this element yields.
    pub fn test(&self, token: &Token, index: usize) -> Option<Option<SemValue>> {
        let matched = match &self.template {
            Template::Lemma { lemma, form } => token.analyses.iter().any(|a| {
                a.lemma.to_lowercase() == *lemma && form.as_ref().is_none_or(|re| re.is_match(&a.form))
            }),
            Template::Surface(regex) => regex.is_match(&token.surface),
            Template::Literal(text) => token.lower() == *text,
            Template::Numeral(numeral) => return self.test_numeral(numeral, token, index),
        };
        if !matched {
            return None;
        }
        Some(self.value.as_ref().map(|v| SemValue::Literal(v.clone())))
    }

    fn test_numeral(&self, numeral: &NumeralTemplate, token: &Token, index: usize) -> Option<Option<SemValue>> {
        if !token.flags.intersects(TokenFlags::DIGITS | TokenFlags::NUMERAL_WORD) {
            return None;
        }
        let value = token.numeral_value()?;
        let form = token.numeral_form();
        if value < numeral.min || value > numeral.max {
            return None;
        }
        if numeral.ordinal.is_some_and(|o| o != form.ordinal) || numeral.digits.is_some_and(|d| d != form.digits) {
            return None;
        }
        let captured = match &self.value {
            Some(v) => SemValue::Literal(v.clone()),
            None => SemValue::Numeral { value, form, token: index },
        };
        Some(Some(captured))
    }
}

/// A named set of templates.
#[derive(Debug, Clone)]
pub struct WordClass {
    pub name: String,
    pub templates: Vec<WordTemplate>,
}

impl WordClass {
    pub fn new(name: &str) -> Self {
        WordClass { name: name.to_string(), templates: Vec::new() }
    }

    pub fn with(mut self, template: WordTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Lemmas mapped to values, the common shape of month and weekday classes.
    pub fn valued_lemmas(mut self, pairs: &[(&str, &str)]) -> Self {
        for (lemma, value) in pairs {
            self.templates.push(WordTemplate::lemma(lemma).valued(value));
        }
        self
    }

    pub fn lemmas(mut self, lemmas: &[&str]) -> Self {
        for lemma in lemmas {
            self.templates.push(WordTemplate::lemma(lemma));
        }
        self
    }

    /// First matching template decides the captured value.
    pub fn test(&self, token: &Token, index: usize) -> Option<Option<SemValue>> {
        self.templates.iter().find_map(|t| t.test(token, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(surface: &str, lemma: &str, pos: &str, form: &str) -> Token {
        let mut t = Token::new(surface).with_analysis(lemma, "", pos, form);
        t.derive_flags();
        t
    }

    #[test]
    fn lemma_templates_respect_forms() {
        let template = WordTemplate::lemma_in_form("kell", "^sg [gn]$").unwrap();
        assert!(template.test(&token("kella", "kell", "S", "sg g"), 0).is_some());
        assert!(template.test(&token("kellast", "kell", "S", "sg el"), 0).is_none());
    }

    #[test]
    fn valued_lemma_captures_its_value() {
        let months = WordClass::new("KUU").valued_lemmas(&[("jaanuar", "1"), ("mai", "5")]);
        let captured = months.test(&token("mail", "mai", "S", "sg ad"), 2);
        assert_eq!(captured, Some(Some(SemValue::Literal("5".into()))));
        assert_eq!(months.test(&token("juunis", "juuni", "S", "sg in"), 2), None);
    }

    #[test]
    fn numeral_templates_check_range_and_form() {
        let day = WordTemplate::numeral(NumeralTemplate::between(1, 31).ordinal(true));
        let captured = day.test(&token("12.", "12.", "O", ""), 4).unwrap();
        assert!(matches!(captured, Some(SemValue::Numeral { value: 12, token: 4, .. })));
        assert!(day.test(&token("12", "12", "N", ""), 4).is_none());
        assert!(day.test(&token("32.", "32.", "O", ""), 4).is_none());

        let words_only = WordTemplate::numeral(NumeralTemplate::between(1, 24).digits(false));
        assert!(words_only.test(&token("üheksa", "üheksa", "N", "sg n"), 0).is_some());
        assert!(words_only.test(&token("9", "9", "N", ""), 0).is_none());
    }

    #[test]
    fn literals_ignore_case() {
        let template = WordTemplate::literal("Kell");
        assert!(template.test(&Token::new("KELL"), 0).is_some());
        let surface = WordTemplate::surface(r"^\d{4}$").unwrap();
        assert!(surface.test(&Token::new("2009"), 0).is_some());
        assert!(WordTemplate::surface("(").is_err());
    }
}
