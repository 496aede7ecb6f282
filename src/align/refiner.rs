use super::normalize::{normalize_word, normalize_words};
use super::{AlignError, Span};
use crate::transcript::WordToken;

/// Minimum fraction of positionally matching words for a window to be
/// accepted. Hard cutoff: the best window below this is still a miss.
pub const MATCH_THRESHOLD: f64 = 0.7;

/// Symmetric buffer applied around an accepted window, in seconds.
pub const REFINE_BUFFER_SECONDS: f64 = 0.5;

/// Find a tight span for `sentence` inside a word-level transcription of a
/// rough clip.
///
/// A window of width equal to the sentence's word count slides over the
/// tokens; each window is scored by the fraction of words that match at the
/// same position (strict positional equality, not bag-of-words and not edit
/// distance). The earliest best-scoring window wins, and only if its score
/// reaches [`MATCH_THRESHOLD`].
///
/// The returned span is **local to the transcribed clip**. Callers cutting
/// from the rough clip use it as-is; callers needing recording time add the
/// rough clip's absolute start via [`Span::offset_by`].
pub fn refine(sentence: &str, tokens: &[WordToken]) -> Result<Option<Span>, AlignError> {
    let target_words = normalize_words(sentence);
    if target_words.is_empty() {
        return Err(AlignError::EmptySentence);
    }

    let window = target_words.len();
    if tokens.len() < window {
        return Ok(None);
    }

    let token_words: Vec<String> = tokens.iter().map(|t| normalize_word(&t.text)).collect();

    let mut best: Option<(usize, f64)> = None;
    for i in 0..=tokens.len() - window {
        let matching = target_words
            .iter()
            .zip(&token_words[i..i + window])
            .filter(|(target, candidate)| *target == *candidate)
            .count();
        let score = matching as f64 / window as f64;

        // Strictly greater keeps the earliest window on ties.
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((i, score));
        }
    }

    let Some((start_idx, score)) = best else {
        return Ok(None);
    };
    if score < MATCH_THRESHOLD {
        return Ok(None);
    }

    let first = &tokens[start_idx];
    let last = &tokens[start_idx + window - 1];
    let span = Span::new(first.start_ms as f64 / 1000.0, last.end_ms as f64 / 1000.0)
        .with_margin(REFINE_BUFFER_SECONDS);
    Ok(Some(span))
}
