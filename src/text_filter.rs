//! Turns raw OCR output into a lookup key.
//!
//! In-game item names are rendered in all caps, while flavour text and stats around them are
//! mixed case. Each OCR line is reduced to its all-caps words, stray single-letter noise in front
//! of the first real word is dropped (bullets and icons are often misread as `I`, `A`, `E`), and
//! the surviving words of all lines are joined into one space-separated key.

/// Punctuation that may appear inside item names and survives cleaning.
const KEPT_PUNCTUATION: [char; 3] = ['-', '\'', ' '];

/// Line boundaries. Tesseract separates pages with a form feed and some engines emit a lone `\r`.
const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\u{b}', '\u{c}', '\u{1c}', '\u{1d}', '\u{1e}', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Extracts the candidate item name from OCR text. Returns an empty string when no line
/// contains an all-caps word.
pub fn filter_capitalized_words(text: &str) -> String {
    text.split(LINE_BREAKS)
        .filter_map(filter_line)
        .collect::<Vec<_>>()
        .join(" ")
}

fn filter_line(line: &str) -> Option<String> {
    let words: Vec<String> = line
        .split_whitespace()
        .map(clean_word)
        .filter(|word| is_all_caps(word))
        .collect();

    let start = words
        .iter()
        .position(|word| word.chars().count() > 1)?;

    Some(words[start..].join(" "))
}

fn clean_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric() || KEPT_PUNCTUATION.contains(c))
        .collect()
}

/// A word counts as all caps when it has at least one uppercase letter and uppercasing it is a
/// no-op. Digit- or punctuation-only words are rejected.
fn is_all_caps(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && word.to_uppercase() == word
}
