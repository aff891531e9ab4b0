//! Token positions in the original text and in external segmentations.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::candidate::Span;
use crate::document::Document;
use crate::error::{Error, Result};

/// Byte range of one inner token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub start: usize,
    pub end: usize,
    /// The surface was not found; `start == end` marks where it should be.
    pub approximate: bool,
}

/// Align every inner token of `document` with `text`.
///
/// Tokens are searched left to right from the end of the previous match.
/// A token that cannot be found gets a zero-width position at the cursor
/// instead of failing the document.
pub fn align(text: &str, document: &Document) -> Vec<Alignment> {
    let mut cursor = 0;
    document
        .tokens()
        .iter()
        .enumerate()
        .map(|(index, token)| match text[cursor..].find(token.surface.as_str()) {
            Some(offset) if !token.surface.is_empty() => {
                let start = cursor + offset;
                cursor = start + token.surface.len();
                Alignment { start, end: cursor, approximate: false }
            }
            _ => {
                if token.candidates().is_empty() {
                    trace!("[align] token {} '{}' not found", index, token.surface);
                } else {
                    warn!("[align] token {} '{}' not found, using position {}", index, token.surface, cursor);
                }
                Alignment { start: cursor, end: cursor, approximate: true }
            }
        })
        .collect()
}

/// Byte range covered by an inclusive token span.
pub fn byte_range(alignments: &[Alignment], span: Span) -> (usize, usize) {
    let start = alignments.get(span.start).map_or(0, |a| a.start);
    let end = alignments.get(span.end).map_or(start, |a| a.end);
    (start, end.max(start))
}

/// Map every inner token to its index in an external token list.
///
/// `external` holds the original positions an outside segmentation kept, in
/// its own order. Every inner token must find its original position there.
pub fn external_positions(document: &Document, external: &[usize]) -> Result<Vec<usize>> {
    let index: HashMap<usize, usize> = external.iter().enumerate().map(|(i, original)| (*original, i)).collect();
    document
        .tokens()
        .iter()
        .enumerate()
        .map(|(token, t)| {
            index
                .get(&t.original_position)
                .copied()
                .ok_or_else(|| Error::Unmapped { token, surface: t.surface.clone() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Stage;
    use crate::token::Token;

    fn document(words: &[&str]) -> Document {
        Document::new(words.iter().map(|w| Token::new(w)).collect())
    }

    #[test]
    fn compound_dates_align_piecewise() {
        let doc = document(&["Kohtume", "23.07.2009", "kell", "12"]);
        let text = "Kohtume 23.07.2009 kell 12";
        let aligned = align(text, &doc);
        assert_eq!(aligned.len(), 6);
        let pieces: Vec<&str> = aligned.iter().map(|a| &text[a.start..a.end]).collect();
        assert_eq!(pieces, ["Kohtume", "23.", "07.", "2009", "kell", "12"]);
        assert!(aligned.iter().all(|a| !a.approximate));
        assert_eq!(byte_range(&aligned, Span::new(1, 3)), (8, 18));
    }

    #[test]
    fn missing_tokens_fall_back_to_zero_width() {
        let mut doc = document(&["eile", "õhtul", "kell", "8"]);
        let id = doc.create(Span::new(1, 1), Stage::PatternExtracted, "POD".into());
        doc.attach(id);
        let aligned = align("eile ohtul kell 8", &doc);
        assert_eq!(aligned[1], Alignment { start: 4, end: 4, approximate: true });
        // The cursor does not move past a missing token.
        assert_eq!(aligned[2], Alignment { start: 11, end: 15, approximate: false });
    }

    #[test]
    fn unmapped_tokens_are_reported() {
        let doc = document(&["täna", "ja", "homme"]);
        assert_eq!(external_positions(&doc, &[0, 1, 2]).unwrap(), [0, 1, 2]);
        match external_positions(&doc, &[2, 0]) {
            Err(Error::Unmapped { token, surface }) => {
                assert_eq!(token, 1);
                assert_eq!(surface, "ja");
            }
            other => panic!("expected an unmapped token, got {other:?}"),
        }
    }
}
