use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Collapse every run of whitespace (including newlines) to a single space
/// and trim the ends. Punctuation and case are left untouched; the coarse
/// locator deliberately searches case- and punctuation-sensitively.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Normalize a single word for positional comparison: strip punctuation,
/// lowercase.
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Split a sentence into normalized words, dropping tokens that are pure
/// punctuation.
pub fn normalize_words(sentence: &str) -> Vec<String> {
    sentence
        .split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_and_newlines() {
        assert_eq!(
            collapse_whitespace("  wie \n geht\tes\r\n dir "),
            "wie geht es dir"
        );
    }

    #[test]
    fn keeps_case_and_punctuation() {
        assert_eq!(collapse_whitespace("Hallo, Welt!"), "Hallo, Welt!");
    }

    #[test]
    fn word_normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_word("Geht's"), "gehts");
        assert_eq!(normalize_word("dir?"), "dir");
        assert_eq!(normalize_word("..."), "");
    }

    #[test]
    fn sentence_splits_into_clean_words() {
        assert_eq!(
            normalize_words("Wie geht's  dir, heute?"),
            vec!["wie", "gehts", "dir", "heute"]
        );
        assert!(normalize_words(" ... !! ").is_empty());
    }
}
