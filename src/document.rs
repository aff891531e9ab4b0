//! A document: the inner token stream plus the candidate arena built on it.
//!
//! Candidates are never removed from the arena. "Deleting" a candidate
//! detaches it from every token it covers; merged children are detached the
//! same way once their parent takes over the tokens. A candidate is
//! *attached* when its first token lists it.

use serde::Deserialize;

use crate::candidate::{Candidate, CandidateId, Span, Stage};
use crate::token::{self, MorphAnalysis, PhraseRole, Token};

/// A token as delivered by an analyzer, before splitting.
#[derive(Debug, Clone, Deserialize)]
pub struct InputToken {
    #[serde(alias = "text", alias = "word")]
    pub surface: String,
    #[serde(default)]
    pub analyses: Vec<MorphAnalysis>,
    #[serde(default)]
    pub sentence_end: bool,
    #[serde(default)]
    pub clause_boundary: bool,
}

impl From<InputToken> for Token {
    fn from(input: InputToken) -> Self {
        let mut token = Token::new(&input.surface);
        token.analyses = input.analyses;
        token.sentence_end = input.sentence_end;
        token.clause_boundary_definite = input.clause_boundary;
        token
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    tokens: Vec<Token>,
    candidates: Vec<Candidate>,
    /// Sentence index of every inner token.
    sentence_of: Vec<usize>,
    /// Inclusive token span of every sentence.
    sentences: Vec<Span>,
}

/// `dd.mm.yyyy` written as one token.
fn split_compound_date(surface: &str) -> Option<[String; 3]> {
    let caps = regex!(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").captures(surface)?;
    Some([format!("{}.", &caps[1]), format!("{}.", &caps[2]), caps[3].to_string()])
}

impl Document {
    /// Build the inner token stream. Tokens keep their input index as
    /// `original_position`; compound dates are split into three inner tokens
    /// sharing it.
    pub fn new(input: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = Vec::with_capacity(input.len());
        for (original, token) in input.into_iter().enumerate() {
            match split_compound_date(&token.surface) {
                Some(parts) => {
                    let last = parts.len() - 1;
                    for (idx, part) in parts.iter().enumerate() {
                        let mut fragment = Token::new(part);
                        fragment.original_position = original;
                        if idx == last {
                            fragment.sentence_end = token.sentence_end;
                            fragment.clause_boundary_definite = token.clause_boundary_definite;
                        }
                        tokens.push(fragment);
                    }
                }
                None => {
                    let mut token = token;
                    token.original_position = original;
                    tokens.push(token);
                }
            }
        }

        for (inner, token) in tokens.iter_mut().enumerate() {
            token.inner_position = inner;
            token.derive_flags();
        }
        token::mark_numeral_phrases(&mut tokens);

        let mut sentence_of = Vec::with_capacity(tokens.len());
        let mut sentences = Vec::new();
        let mut start = 0;
        for (idx, token) in tokens.iter().enumerate() {
            sentence_of.push(sentences.len());
            if token.sentence_end || idx + 1 == tokens.len() {
                sentences.push(Span::new(start, idx));
                start = idx + 1;
            }
        }

        Document { tokens, candidates: Vec::new(), sentence_of, sentences }
    }

    pub fn from_input(input: Vec<InputToken>) -> Self {
        Self::new(input.into_iter().map(Token::from).collect())
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn sentences(&self) -> &[Span] {
        &self.sentences
    }

    pub fn sentence_of(&self, token: usize) -> usize {
        self.sentence_of[token]
    }

    pub fn sentence_span(&self, token: usize) -> Span {
        self.sentences[self.sentence_of[token]]
    }

    pub fn same_sentence(&self, a: usize, b: usize) -> bool {
        self.sentence_of[a] == self.sentence_of[b]
    }

    pub fn candidate(&self, id: CandidateId) -> &Candidate {
        &self.candidates[id.0]
    }

    pub(crate) fn candidate_mut(&mut self, id: CandidateId) -> &mut Candidate {
        &mut self.candidates[id.0]
    }

    /// Every candidate ever created, attached or not.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Allocate a candidate without attaching it.
    pub(crate) fn create(&mut self, span: Span, stage: Stage, tag: String) -> CandidateId {
        let id = CandidateId(self.candidates.len());
        self.candidates.push(Candidate::new(id, span, stage, tag));
        id
    }

    /// Link the candidate to every token of its span, with its phrase role.
    pub(crate) fn attach(&mut self, id: CandidateId) {
        let span = self.candidates[id.0].span;
        for (offset, index) in span.tokens().enumerate() {
            self.tokens[index].attach(id, PhraseRole::at(offset, span.len()));
        }
    }

    pub(crate) fn detach(&mut self, id: CandidateId) {
        let span = self.candidates[id.0].span;
        for index in span.tokens() {
            self.tokens[index].detach(id);
        }
    }

    pub fn is_attached(&self, id: CandidateId) -> bool {
        let span = self.candidates[id.0].span;
        self.tokens[span.start].candidates().iter().any(|(c, _)| *c == id)
    }

    /// Attached candidates without a parent, in document order.
    pub fn top_level(&self) -> Vec<CandidateId> {
        let mut ids: Vec<CandidateId> = self
            .candidates
            .iter()
            .filter(|c| c.parent.is_none() && self.is_attached(c.id))
            .map(|c| c.id)
            .collect();
        ids.sort_by_key(|id| {
            let span = self.candidates[id.0].span;
            (span.start, std::cmp::Reverse(span.len()), id.0)
        });
        ids
    }

    /// Make `children` the ordered children of `parent` and hand their tokens
    /// over to the parent.
    pub(crate) fn adopt(&mut self, parent: CandidateId, children: &[CandidateId]) {
        for child in children {
            self.detach(*child);
            self.candidates[child.0].parent = Some(parent);
        }
        self.candidates[parent.0].children = children.to_vec();
        self.attach(parent);
    }

    /// Surface text of a span joined with spaces.
    pub fn text(&self, span: Span) -> String {
        self.tokens[span.start..=span.end].iter().map(|t| t.surface.as_str()).collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_dates_are_split_into_inner_tokens() {
        let doc =
            Document::new(vec![Token::new("Sündmus"), Token::new("23.07.2009").ending_sentence(), Token::new("Siis")]);
        let surfaces: Vec<&str> = doc.tokens().iter().map(|t| t.surface.as_str()).collect();
        assert_eq!(surfaces, ["Sündmus", "23.", "07.", "2009", "Siis"]);
        assert_eq!(doc.token(2).original_position, 1);
        assert_eq!(doc.token(3).original_position, 1);
        assert_eq!(doc.token(4).original_position, 2);
        assert_eq!(doc.token(4).inner_position, 4);
        assert!(doc.token(3).sentence_end);
        assert!(!doc.token(1).sentence_end);
        assert_eq!(doc.sentences().len(), 2);
        assert!(doc.token(1).numeral_form().ordinal);
    }

    #[test]
    fn attach_and_detach_maintain_token_links() {
        let mut doc = Document::new(vec![Token::new("eile"), Token::new("õhtul")]);
        let id = doc.create(Span::new(0, 1), Stage::PatternExtracted, "A".into());
        doc.attach(id);
        assert_eq!(doc.token(0).candidates(), &[(id, PhraseRole::Start)]);
        assert_eq!(doc.token(1).candidates(), &[(id, PhraseRole::End)]);
        assert_eq!(doc.top_level(), vec![id]);
        doc.detach(id);
        assert!(doc.token(0).candidates().is_empty());
        assert!(doc.top_level().is_empty());
    }

    #[test]
    fn adopt_moves_tokens_to_the_parent() {
        let mut doc = Document::new(vec![Token::new("eile"), Token::new("õhtul")]);
        let a = doc.create(Span::new(0, 0), Stage::PatternExtracted, "A".into());
        let b = doc.create(Span::new(1, 1), Stage::PatternExtracted, "B".into());
        doc.attach(a);
        doc.attach(b);
        let phrase = doc.create(Span::new(0, 1), Stage::MergedAsPhrase, "A-B".into());
        doc.adopt(phrase, &[a, b]);
        assert_eq!(doc.top_level(), vec![phrase]);
        assert_eq!(doc.candidate(a).parent, Some(phrase));
        assert_eq!(doc.candidate(phrase).children, vec![a, b]);
    }
}
