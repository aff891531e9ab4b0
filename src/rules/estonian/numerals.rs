//! Estonian numerals: digit strings with case suffixes and numeral lemmas.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Cardinal lemmas and the genitive stems used inside compound lemmas
/// (`kahe_kümne` in `kahekümnes`).
static CARDINALS: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    HashMap::from([
        ("null", 0),
        ("üks", 1),
        ("ühe", 1),
        ("kaks", 2),
        ("kahe", 2),
        ("kolm", 3),
        ("kolme", 3),
        ("neli", 4),
        ("nelja", 4),
        ("viis", 5),
        ("viie", 5),
        ("kuus", 6),
        ("kuue", 6),
        ("seitse", 7),
        ("seitsme", 7),
        ("kaheksa", 8),
        ("üheksa", 9),
        ("kümme", 10),
        ("kümne", 10),
        ("teist", 10),
        ("kümmend", 10),
        ("sada", 100),
        ("saja", 100),
        ("tuhat", 1000),
        ("tuhande", 1000),
    ])
});

/// Ordinal lemmas.
static ORDINALS: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    HashMap::from([
        ("esimene", 1),
        ("teine", 2),
        ("kolmas", 3),
        ("neljas", 4),
        ("viies", 5),
        ("kuues", 6),
        ("seitsmes", 7),
        ("kaheksas", 8),
        ("üheksas", 9),
        ("kümnes", 10),
        ("teistkümnes", 10),
        ("sajas", 100),
        ("tuhandes", 1000),
    ])
});

/// Parts that multiply what precedes them instead of adding to it.
fn is_multiplier(part: &str) -> bool {
    matches!(part, "kümmend" | "kümne" | "kümnes" | "sada" | "saja" | "sajas" | "tuhat" | "tuhande" | "tuhandes")
}

/// Combine the values of consecutive numeral parts:
/// `[2, 10(kümmend), 5]` is 25, `[2, 100, 2]` is 202.
pub fn combine(parts: &[(i64, bool)]) -> Option<i64> {
    if parts.is_empty() {
        return None;
    }
    let mut total = 0i64;
    let mut group = 0i64;
    for (value, multiplier) in parts {
        if *multiplier {
            group = group.max(1).checked_mul(*value)?;
            if *value >= 100 {
                total += group;
                group = 0;
            }
        } else {
            group += value;
        }
    }
    Some(total + group)
}

/// Value of a numeral lemma, including compound lemmas joined with `_` or `=`.
pub fn lemma_value(lemma: &str) -> Option<i64> {
    let lower = lemma.to_lowercase();
    let parts: Vec<&str> = lower.split(['_', '=']).filter(|p| !p.is_empty()).collect();
    if parts.len() == 1 {
        return single_value(parts[0]);
    }
    let mut values = Vec::with_capacity(parts.len());
    for (idx, part) in parts.iter().enumerate() {
        // "üks_teist" / "kolme_teistkümnes": the teens.
        if (*part == "teist" || *part == "teistkümnes") && idx > 0 {
            values.push((10, false));
            continue;
        }
        values.push((single_value(part)?, is_multiplier(part)));
    }
    combine(&values)
}

fn single_value(word: &str) -> Option<i64> {
    if let Some(v) = CARDINALS.get(word).or_else(|| ORDINALS.get(word)) {
        return Some(*v);
    }
    // Written as one word without compound markers: "kaksteist", "kakskümmend".
    for (suffix, base, multiply) in [("teist", 10, false), ("kümmend", 10, true), ("sada", 100, true)] {
        if let Some(head) = word.strip_suffix(suffix) {
            let head = CARDINALS.get(head)?;
            return Some(if multiply { head * base } else { head + base });
        }
    }
    None
}

/// Value of a run of numeral words read as one number:
/// `kaks tuhat üheksa` is 2009.
pub fn phrase_value(lemmas: &[&str]) -> Option<i64> {
    let mut parts = Vec::with_capacity(lemmas.len());
    for lemma in lemmas {
        let lower = lemma.to_lowercase();
        parts.push((lemma_value(&lower)?, is_multiplier(&lower)));
    }
    combine(&parts)
}

pub fn lemma_is_ordinal(lemma: &str) -> bool {
    let lower = lemma.to_lowercase();
    lower.split(['_', '=']).last().is_some_and(|last| ORDINALS.contains_key(last))
}

/// Value of a token written with digits: `12`, `12.`, `9-st`, `10ni`.
/// Compound dates (`23.07.2009`) and decimals are not single numerals.
pub fn digits_value(surface: &str) -> Option<i64> {
    let caps = regex!(r"^(\d{1,4})\.?(?:-?\p{Alphabetic}+)?$").captures(surface)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Digits with a trailing period are ordinals in Estonian (`12.` = 12th).
pub fn digits_are_ordinal(surface: &str) -> bool {
    regex!(r"^\d{1,4}\.").is_match(surface)
}

/// Digit token carrying the case suffix `suffix`, with or without a hyphen.
pub fn digits_with_suffix(lower: &str, suffix: &str) -> bool {
    match lower.strip_suffix(suffix) {
        Some(head) => regex!(r"^\d{1,4}\.?-?$").is_match(head),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeral_lemmas() {
        let cases: Vec<(i64, &str)> = vec![
            (1, "üks"),
            (2, "kaks"),
            (9, "üheksa"),
            (10, "kümme"),
            (12, "kaksteist"),
            (12, "kaks_teist"),
            (20, "kakskümmend"),
            (25, "kaks_kümmend_viis"),
            (1, "esimene"),
            (21, "kahe_kümne_esimene"),
            (100, "sada"),
            (300, "kolm_sada"),
        ];
        for (expected, lemma) in cases {
            assert_eq!(lemma_value(lemma), Some(expected), "lemma {lemma}");
        }
        assert_eq!(lemma_value("kell"), None);
    }

    #[test]
    fn digit_tokens() {
        assert_eq!(digits_value("12"), Some(12));
        assert_eq!(digits_value("12."), Some(12));
        assert_eq!(digits_value("9-st"), Some(9));
        assert_eq!(digits_value("10ni"), Some(10));
        assert_eq!(digits_value("23.07.2009"), None);
        assert_eq!(digits_value("1,5"), None);
        assert!(digits_are_ordinal("12."));
        assert!(!digits_are_ordinal("12"));
        assert!(digits_with_suffix("9-st", "st"));
        assert!(digits_with_suffix("10ni", "ni"));
        assert!(!digits_with_suffix("kuni", "ni"));
    }

    #[test]
    fn numeral_phrases_combine_their_words() {
        assert_eq!(phrase_value(&["kaks", "tuhat", "üheksa"]), Some(2009));
        assert_eq!(phrase_value(&["kaks", "kümmend", "viis"]), Some(25));
        assert_eq!(phrase_value(&["kümme"]), Some(10));
        assert_eq!(phrase_value(&["kaks", "kell"]), None);
    }

    #[test]
    fn ordinal_detection() {
        assert!(lemma_is_ordinal("kolmas"));
        assert!(lemma_is_ordinal("kahe_kümne_esimene"));
        assert!(!lemma_is_ordinal("kolm"));
    }
}
