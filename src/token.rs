//! Analyzed input tokens.
//!
//! A [`Token`] is one word of the input as delivered by the morphological
//! analyzer, plus the bookkeeping the pipeline hangs on it: derived flags
//! (verb, tense, numeral-phrase role, range hints) and the ordered list of
//! candidates the token currently belongs to.
//!
//! ```text
//! "kella üheksast kümneni"
//!   kella     lemma=kell    pos=S  form="sg g"
//!   üheksast  lemma=üheksa  pos=N  form="sg el"   -> RANGE_START, NUMERAL_PHRASE_*
//!   kümneni   lemma=kümme   pos=N  form="sg ter"  -> RANGE_END,   NUMERAL_PHRASE_*
//! ```

use crate::candidate::CandidateId;
use crate::rules::estonian::numerals;
use serde::Deserialize;

/// One morphological reading of a word.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MorphAnalysis {
    pub lemma: String,
    #[serde(default)]
    pub ending: String,
    /// Part-of-speech tag (`S`, `V`, `A`, `N`, `O`, `D`, `K`, `Z`, ...).
    #[serde(default, alias = "partofspeech")]
    pub pos: String,
    /// Space separated grammatical form, e.g. `"sg el"` or `"s"`.
    #[serde(default)]
    pub form: String,
}

impl MorphAnalysis {
    pub fn new(lemma: &str, ending: &str, pos: &str, form: &str) -> Self {
        MorphAnalysis {
            lemma: lemma.to_string(),
            ending: ending.to_string(),
            pos: pos.to_string(),
            form: form.to_string(),
        }
    }

    fn has_form(&self, code: &str) -> bool {
        self.form.split_whitespace().any(|f| f == code)
    }
}

/// Position of a token inside the phrase of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhraseRole {
    OnlyWord,
    Start,
    Middle,
    End,
}

impl PhraseRole {
    /// Role of the `index`-th member of a phrase with `len` members.
    pub fn at(index: usize, len: usize) -> Self {
        if len <= 1 {
            PhraseRole::OnlyWord
        } else if index == 0 {
            PhraseRole::Start
        } else if index + 1 == len {
            PhraseRole::End
        } else {
            PhraseRole::Middle
        }
    }
}

bitflags::bitflags! {
    /// Flags derived from morphology and from pattern matching.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TokenFlags: u16 {
        const VERB                  = 1 << 0;
        const ADJECTIVE             = 1 << 1;
        const PAST_TENSE            = 1 << 2;
        /// Written with digits (`12`, `12.`, `9-st`).
        const DIGITS                = 1 << 3;
        /// Numeral word (`üheksa`, `kümnendal`).
        const NUMERAL_WORD          = 1 << 4;
        const NUMERAL_PHRASE_START  = 1 << 5;
        const NUMERAL_PHRASE_MIDDLE = 1 << 6;
        const NUMERAL_PHRASE_END    = 1 << 7;
        const RANGE_START           = 1 << 8;
        const RANGE_END             = 1 << 9;
        const RANGE_CONNECTOR       = 1 << 10;
    }
}

impl TokenFlags {
    pub const NUMERAL_PHRASE: TokenFlags = TokenFlags::NUMERAL_PHRASE_START
        .union(TokenFlags::NUMERAL_PHRASE_MIDDLE)
        .union(TokenFlags::NUMERAL_PHRASE_END);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tense {
    Present,
    Past,
}

/// How a numeral is written; used when a missing range endpoint borrows the
/// semantics of its sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumeralForm {
    pub digits: bool,
    pub ordinal: bool,
}

const PAST_FORMS: &[&str] = &["s", "sid", "sin", "sime", "site", "nud", "tud", "ti", "i"];
const RANGE_CONNECTORS: &[&str] = &["kuni", "-", "–", "—"];

/// One analyzed word of the input.
#[derive(Debug, Clone)]
pub struct Token {
    pub surface: String,
    pub analyses: Vec<MorphAnalysis>,
    /// The token closes a sentence.
    pub sentence_end: bool,
    /// A clause boundary after this token is certain.
    pub clause_boundary_definite: bool,
    /// Index of the external (input) token this token came from.
    pub original_position: usize,
    /// Index in the internal token stream.
    pub inner_position: usize,
    pub flags: TokenFlags,
    candidates: Vec<(CandidateId, PhraseRole)>,
}

impl Token {
    pub fn new(surface: &str) -> Self {
        Token {
            surface: surface.to_string(),
            analyses: Vec::new(),
            sentence_end: false,
            clause_boundary_definite: false,
            original_position: 0,
            inner_position: 0,
            flags: TokenFlags::empty(),
            candidates: Vec::new(),
        }
    }

    pub fn with_analysis(mut self, lemma: &str, ending: &str, pos: &str, form: &str) -> Self {
        self.analyses.push(MorphAnalysis::new(lemma, ending, pos, form));
        self
    }

    pub fn ending_sentence(mut self) -> Self {
        self.sentence_end = true;
        self
    }

    pub fn with_clause_boundary(mut self) -> Self {
        self.clause_boundary_definite = true;
        self
    }

    pub fn lower(&self) -> String {
        self.surface.to_lowercase()
    }

    pub fn has_lemma(&self, lemma: &str) -> bool {
        self.analyses.iter().any(|a| a.lemma.eq_ignore_ascii_case(lemma) || a.lemma == lemma)
    }

    pub fn is_verb(&self) -> bool {
        self.flags.contains(TokenFlags::VERB)
    }

    pub fn tense(&self) -> Tense {
        if self.flags.contains(TokenFlags::PAST_TENSE) { Tense::Past } else { Tense::Present }
    }

    pub fn is_numeral(&self) -> bool {
        self.flags.intersects(TokenFlags::DIGITS | TokenFlags::NUMERAL_WORD)
    }

    pub fn is_range_start(&self) -> bool {
        self.flags.contains(TokenFlags::RANGE_START)
    }

    pub fn is_range_end(&self) -> bool {
        self.flags.contains(TokenFlags::RANGE_END)
    }

    pub fn is_range_connector(&self) -> bool {
        self.flags.contains(TokenFlags::RANGE_CONNECTOR)
    }

    /// Numeric value of a single numeral token (`"12."` → 12, `"üheksast"` → 9).
    pub fn numeral_value(&self) -> Option<i64> {
        if let Some(value) = numerals::digits_value(&self.surface) {
            return Some(value);
        }
        self.analyses.iter().find_map(|a| numerals::lemma_value(&a.lemma))
    }

    pub fn numeral_form(&self) -> NumeralForm {
        let digits = self.flags.contains(TokenFlags::DIGITS);
        let ordinal = if digits {
            numerals::digits_are_ordinal(&self.surface)
        } else {
            self.analyses.iter().any(|a| a.pos == "O")
        };
        NumeralForm { digits, ordinal }
    }

    /// Candidates containing this token, in attachment order.
    pub fn candidates(&self) -> &[(CandidateId, PhraseRole)] {
        &self.candidates
    }

    pub(crate) fn attach(&mut self, id: CandidateId, role: PhraseRole) {
        if !self.candidates.iter().any(|(c, _)| *c == id) {
            self.candidates.push((id, role));
        }
    }

    pub(crate) fn detach(&mut self, id: CandidateId) {
        self.candidates.retain(|(c, _)| *c != id);
    }

    /// Recompute the morphology-derived flags. Numeral-phrase roles are
    /// assigned separately because they depend on the neighbours.
    pub fn derive_flags(&mut self) {
        let mut flags = TokenFlags::empty();
        let lower = self.lower();

        if self.analyses.iter().any(|a| a.pos == "V") {
            flags |= TokenFlags::VERB;
            let past = self.analyses.iter().filter(|a| a.pos == "V").any(|a| PAST_FORMS.iter().any(|f| a.has_form(f)));
            if past {
                flags |= TokenFlags::PAST_TENSE;
            }
        }
        if self.analyses.iter().any(|a| a.pos == "A" || a.pos == "C" || a.pos == "U") {
            flags |= TokenFlags::ADJECTIVE;
        }
        if numerals::digits_value(&self.surface).is_some() {
            flags |= TokenFlags::DIGITS;
        } else if self
            .analyses
            .iter()
            .any(|a| (a.pos == "N" || a.pos == "O") && numerals::lemma_value(&a.lemma).is_some())
        {
            flags |= TokenFlags::NUMERAL_WORD;
        }
        if RANGE_CONNECTORS.contains(&lower.as_str()) {
            flags |= TokenFlags::RANGE_CONNECTOR;
        }
        if self.analyses.iter().any(|a| a.has_form("el")) || numerals::digits_with_suffix(&lower, "st") {
            flags |= TokenFlags::RANGE_START;
        }
        if self.analyses.iter().any(|a| a.has_form("ter")) || numerals::digits_with_suffix(&lower, "ni") {
            flags |= TokenFlags::RANGE_END;
        }

        let kept = self.flags & TokenFlags::NUMERAL_PHRASE;
        self.flags = flags | kept;
    }
}

/// Mark maximal runs of numeral words inside a sentence as numeral phrases.
pub(crate) fn mark_numeral_phrases(tokens: &mut [Token]) {
    let mut i = 0;
    while i < tokens.len() {
        tokens[i].flags.remove(TokenFlags::NUMERAL_PHRASE);
        if !tokens[i].flags.contains(TokenFlags::NUMERAL_WORD) {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i;
        while end + 1 < tokens.len()
            && !tokens[end].sentence_end
            && tokens[end + 1].flags.contains(TokenFlags::NUMERAL_WORD)
        {
            end += 1;
        }
        for (offset, token) in tokens[start..=end].iter_mut().enumerate() {
            token.flags.remove(TokenFlags::NUMERAL_PHRASE);
            let role = PhraseRole::at(offset, end - start + 1);
            token.flags |= match role {
                PhraseRole::OnlyWord => TokenFlags::NUMERAL_PHRASE_START | TokenFlags::NUMERAL_PHRASE_END,
                PhraseRole::Start => TokenFlags::NUMERAL_PHRASE_START,
                PhraseRole::Middle => TokenFlags::NUMERAL_PHRASE_MIDDLE,
                PhraseRole::End => TokenFlags::NUMERAL_PHRASE_END,
            };
        }
        i = end + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derived(token: Token) -> Token {
        let mut token = token;
        token.derive_flags();
        token
    }

    #[test]
    fn past_tense_verbs_are_flagged() {
        let verb = derived(Token::new("tuli").with_analysis("tule", "i", "V", "s"));
        assert!(verb.is_verb());
        assert_eq!(verb.tense(), Tense::Past);

        let present = derived(Token::new("tuleb").with_analysis("tule", "b", "V", "b"));
        assert_eq!(present.tense(), Tense::Present);
    }

    #[test]
    fn case_endings_mark_range_hints() {
        let from = derived(Token::new("üheksast").with_analysis("üheksa", "st", "N", "sg el"));
        let to = derived(Token::new("kümneni").with_analysis("kümme", "ni", "N", "sg ter"));
        assert!(from.is_range_start());
        assert!(to.is_range_end());
        assert_eq!(from.numeral_value(), Some(9));
        assert_eq!(to.numeral_value(), Some(10));

        let digits = derived(Token::new("9-st"));
        assert!(digits.is_range_start());
        assert_eq!(digits.numeral_value(), Some(9));
    }

    #[test]
    fn connectors_are_flagged() {
        assert!(derived(Token::new("kuni")).is_range_connector());
        assert!(derived(Token::new("-")).is_range_connector());
        assert!(!derived(Token::new("ja")).is_range_connector());
    }

    #[test]
    fn numeral_words_form_phrases() {
        let mut tokens = vec![
            derived(Token::new("kell").with_analysis("kell", "0", "S", "sg n")),
            derived(Token::new("kaks").with_analysis("kaks", "0", "N", "sg n")),
            derived(Token::new("kümmend").with_analysis("kümmend", "0", "N", "sg n")),
            derived(Token::new("viis").with_analysis("viis", "0", "N", "sg n")),
        ];
        mark_numeral_phrases(&mut tokens);
        assert!(!tokens[0].flags.intersects(TokenFlags::NUMERAL_PHRASE));
        assert!(tokens[1].flags.contains(TokenFlags::NUMERAL_PHRASE_START));
        assert!(tokens[2].flags.contains(TokenFlags::NUMERAL_PHRASE_MIDDLE));
        assert!(tokens[3].flags.contains(TokenFlags::NUMERAL_PHRASE_END));
    }

    #[test]
    fn attach_keeps_insertion_order_without_duplicates() {
        let mut token = Token::new("mai");
        token.attach(CandidateId(3), PhraseRole::End);
        token.attach(CandidateId(1), PhraseRole::OnlyWord);
        token.attach(CandidateId(3), PhraseRole::Start);
        assert_eq!(token.candidates(), &[(CandidateId(3), PhraseRole::End), (CandidateId(1), PhraseRole::OnlyWord)]);
        token.detach(CandidateId(3));
        assert_eq!(token.candidates(), &[(CandidateId(1), PhraseRole::OnlyWord)]);
    }
}
