//! Text normalization applied before every classification

/// Collapse whitespace runs to one space, trim the ends and drop
/// non-whitespace control characters left behind by copy/paste or OCR.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
