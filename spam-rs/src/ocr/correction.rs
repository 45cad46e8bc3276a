//! OCR error correction tuned for spam vocabulary
//!
//! Tesseract tends to confuse letters and digits (`0`/`O`, `1`/`l`, `8`/`B`)
//! and to split or merge strokes (`rn`/`m`, `vv`/`w`). Spam screenshots are
//! full of the same few words, so whole-word repairs come first and the
//! generic character table only applies when no word matched.

use regex::Regex;

/// Whole-word misreads, matched against the uppercased token
const WORD_FIXES: &[(&str, &str)] = &[
    ("FR33", "FREE"),
    ("FR3E", "FREE"),
    ("FREB", "FREE"),
    ("W1N", "WIN"),
    ("W!N", "WIN"),
    ("0FFER", "OFFER"),
    ("CFFER", "OFFER"),
    ("0FF3R", "OFFER"),
    ("CL1CK", "CLICK"),
    ("CL!CK", "CLICK"),
    ("URG3NT", "URGENT"),
    ("URG!NT", "URGENT"),
    ("LIMI7ED", "LIMITED"),
    ("-IMITED", "LIMITED"),
    ("L1MITED", "LIMITED"),
    ("M0NEY", "MONEY"),
    ("MON3Y", "MONEY"),
    ("PRIZB", "PRIZE"),
    ("PR1ZE", "PRIZE"),
    ("WINNBR", "WINNER"),
    ("W1NNER", "WINNER"),
];

/// Character-level substitutions, applied in this order
const CHAR_FIXES: &[(&str, &str)] = &[
    ("0", "o"),
    ("1", "l"),
    ("5", "s"),
    ("8", "B"),
    ("6", "G"),
    ("rn", "m"),
    ("vv", "w"),
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Punctuation kept by the final artifact filter
const ALLOWED_PUNCTUATION: &[char] = &['.', ',', '!', '?', '@', '$', '%', '(', ')', '-'];

/// Pattern-driven corrector for OCR output
pub struct OcrCorrector {
    money_leading_l: Regex,
    money_thousands: Regex,
    phone_prefix: Regex,
}

impl OcrCorrector {
    pub fn new() -> Self {
        Self {
            money_leading_l: Regex::new(r"\$[lI](\d)").expect("valid regex"),
            money_thousands: Regex::new(r"\$(\d+)\.(\d{3})").expect("valid regex"),
            phone_prefix: Regex::new(r"^[lI1]-[B8]00").expect("valid regex"),
        }
    }

    /// Repair OCR misreads word by word. Never fails; empty in, empty out.
    pub fn correct(&self, text: &str) -> String {
        let words: Vec<String> = text
            .split_whitespace()
            .map(strip_artifacts)
            .filter(|word| !word.is_empty())
            .map(|word| self.correct_word(&word))
            .collect();

        strip_artifacts(&words.join(" "))
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn correct_word(&self, word: &str) -> String {
        if let Some(fixed) = lookup_word_fix(word) {
            return fixed.to_string();
        }

        if self.phone_prefix.is_match(word) {
            return self.phone_prefix.replace(word, "1-800").into_owned();
        }

        // amounts only get the money repairs, never the char table
        if word.contains('$') {
            return self.fix_money(word);
        }

        let fixed = apply_char_fixes(word);
        match lookup_word_fix(&fixed) {
            Some(canonical) => canonical.to_string(),
            None => fixed,
        }
    }

    fn fix_money(&self, word: &str) -> String {
        let word = self.money_leading_l.replace_all(word, "$$1$1");
        self.money_thousands
            .replace_all(&word, "$$$1,$2")
            .into_owned()
    }
}

impl Default for OcrCorrector {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup_word_fix(word: &str) -> Option<&'static str> {
    let upper = word.to_uppercase();
    WORD_FIXES
        .iter()
        .find(|(wrong, _)| *wrong == upper)
        .map(|(_, right)| *right)
}

fn apply_char_fixes(word: &str) -> String {
    let mut word = word.to_string();
    if word.chars().count() <= 2 {
        return word;
    }

    let numeric = is_numeric(&word);
    for (wrong, right) in CHAR_FIXES {
        if !word.contains(wrong) {
            continue;
        }
        let is_digit_fix = wrong.chars().all(|c| c.is_ascii_digit());
        if is_digit_fix && numeric {
            continue;
        }
        if *wrong == "0" && protects_zero(&word) {
            continue;
        }
        word = word.replace(wrong, right);
    }
    word
}

/// Digits plus number punctuation only, e.g. `2024`, `1-800-555-0199`, `99.5%`
fn is_numeric(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_digit())
        && word
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '%' | '(' | ')'))
}

/// A zero next to a currency symbol or other digits is part of an amount
fn protects_zero(word: &str) -> bool {
    word.contains(CURRENCY_SYMBOLS)
        || word.chars().any(|c| c.is_ascii_digit() && c != '0')
}

fn strip_artifacts(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(c))
        .collect()
}
