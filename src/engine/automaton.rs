//! Incremental word-class automata.
//!
//! A pattern of `n` elements compiles to states `0..=n`, where state `s`
//! means "the first `s` elements are settled". Optional elements give epsilon
//! moves, so every state carries its closure:
//!
//! ```text
//! pattern: [KELL?] [TUND] [MINUT?]
//!
//!   state 0 ──KELL──> 1 ──TUND──> 2 ──MINUT──> 3
//!   closure(0) = {0, 1}     closure(2) = {2, 3}  (accepting)
//! ```
//!
//! [`Scanner`] drives many automata over one sentence, one token at a time.
//! Partial matches live in a table keyed by (automaton, state, start); each
//! token memoizes its word-class tests so a class shared by several rules is
//! tested once.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::candidate::Span;
use crate::error::{Error, Result};
use crate::rules::extraction::{Occurrence, PatternElement};
use crate::rules::word_class::WordClass;
use crate::semantics::SemValue;
use crate::token::Token;

/// Index of a word class in the rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone)]
struct CompiledElement {
    classes: Vec<ClassId>,
    occurrence: Occurrence,
}

#[derive(Debug, Clone)]
pub struct Automaton {
    elements: Vec<CompiledElement>,
    /// `closures[s]`: states reachable from `s` by skipping optional elements.
    closures: Vec<Vec<usize>>,
}

impl Automaton {
    pub fn compile(rule: &str, elements: &[PatternElement], classes: &HashMap<String, ClassId>) -> Result<Self> {
        if !elements.iter().any(|e| e.occurrence == Occurrence::Required) {
            return Err(Error::rule(rule, "pattern has no required element"));
        }
        let mut compiled = Vec::with_capacity(elements.len());
        for element in elements {
            if element.classes.is_empty() {
                return Err(Error::rule(rule, "pattern element names no word class"));
            }
            let mut ids = Vec::with_capacity(element.classes.len());
            for name in &element.classes {
                let id = classes.get(name).ok_or_else(|| Error::rule(rule, format!("unknown word class '{name}'")))?;
                ids.push(*id);
            }
            compiled.push(CompiledElement { classes: ids, occurrence: element.occurrence });
        }

        let n = compiled.len();
        let closures = (0..=n)
            .map(|state| {
                let mut closure = vec![state];
                let mut s = state;
                while s < n && compiled[s].occurrence == Occurrence::Optional {
                    s += 1;
                    closure.push(s);
                }
                closure
            })
            .collect();

        Ok(Automaton { elements: compiled, closures })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_accepting(&self, state: usize) -> bool {
        self.closures[state].contains(&self.elements.len())
    }

    pub fn is_discard(&self, element: usize) -> bool {
        self.elements[element].occurrence == Occurrence::Discard
    }

    /// Transitions out of `state` on a token, as (next state, element, capture).
    fn advance(
        &self,
        state: usize,
        mut test: impl FnMut(ClassId) -> Option<Option<SemValue>>,
    ) -> Vec<(usize, usize, Option<SemValue>)> {
        let mut out = Vec::new();
        for &s in &self.closures[state] {
            if s == self.elements.len() {
                continue;
            }
            let captured = self.elements[s].classes.iter().find_map(|c| test(*c));
            if let Some(value) = captured {
                out.push((s + 1, s, value));
            }
        }
        out
    }
}

/// One element's share of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementMatch {
    pub token: usize,
    pub value: Option<SemValue>,
}

/// A complete match of one automaton.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Index of the automaton in the slice given to the scanner.
    pub automaton: usize,
    /// First and last consumed tokens, discarded ones included.
    pub consumed: Span,
    /// Per pattern element; `None` for skipped optional elements.
    pub elements: Vec<Option<ElementMatch>>,
}

impl Match {
    /// Span without the discarded elements.
    pub fn span(&self, automaton: &Automaton) -> Option<Span> {
        let mut kept = self
            .elements
            .iter()
            .enumerate()
            .filter(|(idx, _)| !automaton.is_discard(*idx))
            .filter_map(|(_, m)| m.as_ref().map(|m| m.token));
        let first = kept.next()?;
        let last = kept.last().unwrap_or(first);
        Some(Span::new(first, last))
    }

    pub fn matched(&self) -> Vec<bool> {
        self.elements.iter().map(|m| m.is_some()).collect()
    }
}

#[derive(Debug, Clone)]
struct Partial {
    automaton: usize,
    state: usize,
    start: usize,
    elements: Vec<Option<ElementMatch>>,
    /// Most recent accepting configuration on this path.
    accepted: Option<Match>,
}

/// Drives automata over a token stream.
pub struct Scanner<'a> {
    automata: &'a [&'a Automaton],
    classes: &'a [WordClass],
    partials: Vec<Partial>,
    /// Longest match per (automaton, start).
    emitted: BTreeMap<(usize, usize), Match>,
}

impl<'a> Scanner<'a> {
    pub fn new(automata: &'a [&'a Automaton], classes: &'a [WordClass]) -> Self {
        Scanner { automata, classes, partials: Vec::new(), emitted: BTreeMap::new() }
    }

    fn emit(&mut self, m: Match) {
        let key = (m.automaton, m.consumed.start);
        match self.emitted.get(&key) {
            Some(existing) if existing.consumed.end >= m.consumed.end => {}
            _ => {
                self.emitted.insert(key, m);
            }
        }
    }

    /// Feed one token; `None` is the empty token that closes a sentence.
    pub fn feed(&mut self, token: Option<(usize, &Token)>) {
        let Some((index, token)) = token else {
            for partial in std::mem::take(&mut self.partials) {
                if let Some(m) = partial.accepted {
                    self.emit(m);
                }
            }
            return;
        };

        for (automaton, compiled) in self.automata.iter().enumerate() {
            self.partials.push(Partial {
                automaton,
                state: 0,
                start: index,
                elements: vec![None; compiled.len()],
                accepted: None,
            });
        }

        let mut memo: HashMap<ClassId, Option<Option<SemValue>>> = HashMap::new();
        let classes = self.classes;
        let mut seen: HashSet<(usize, usize, usize)> = HashSet::new();
        let mut next = Vec::new();
        let mut finished = Vec::new();

        for partial in std::mem::take(&mut self.partials) {
            let automaton = self.automata[partial.automaton];
            let steps = automaton.advance(partial.state, |class| {
                memo.entry(class).or_insert_with(|| classes[class.0].test(token, index)).clone()
            });
            if steps.is_empty() {
                if let Some(m) = partial.accepted {
                    finished.push(m);
                }
                continue;
            }
            for (state, element, value) in steps {
                if !seen.insert((partial.automaton, state, partial.start)) {
                    continue;
                }
                let mut elements = partial.elements.clone();
                elements[element] = Some(ElementMatch { token: index, value });
                let accepted = if automaton.is_accepting(state) {
                    Some(Match {
                        automaton: partial.automaton,
                        consumed: Span::new(partial.start, index),
                        elements: elements.clone(),
                    })
                } else {
                    partial.accepted.clone()
                };
                next.push(Partial { automaton: partial.automaton, state, start: partial.start, elements, accepted });
            }
        }

        self.partials = next;
        for m in finished {
            self.emit(m);
        }
    }

    /// Emitted matches ordered by start, then automaton.
    pub fn finish(mut self) -> Vec<Match> {
        self.feed(None);
        let mut matches: Vec<Match> = self.emitted.into_values().collect();
        matches.sort_by_key(|m| (m.consumed.start, m.automaton));
        matches
    }
}

/// Scan a window of tokens that must not cross a sentence boundary.
pub fn scan(automata: &[&Automaton], classes: &[WordClass], tokens: &[Token], window: Span) -> Vec<Match> {
    let mut scanner = Scanner::new(automata, classes);
    for index in window.tokens() {
        scanner.feed(Some((index, &tokens[index])));
    }
    scanner.finish()
}
