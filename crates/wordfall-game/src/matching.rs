//! Typing-candidate selection.
//!
//! The typed buffer must bind to exactly one on-screen word, even when
//! the player makes typos. Words sharing the buffer's first character are
//! searched first; if none of them is a convincing match the search
//! widens to every word, which covers a typo on the first letter.

use std::collections::HashMap;

use wordfall_protocol::Word;

/// Score at or above `typed_len * STRONG_MATCH_FACTOR` keeps the
/// first-character bucket's winner.
const STRONG_MATCH_FACTOR: f64 = 1.5;

/// Scores how well `typed` matches `text`.
///
/// +2 for every position where the characters agree, -1 where they
/// differ (up to the shorter length), minus the difference in length.
pub fn match_score(typed: &str, text: &str) -> i64 {
    let positional: i64 = typed
        .chars()
        .zip(text.chars())
        .map(|(a, b)| if a == b { 2 } else { -1 })
        .sum();
    let typed_len = typed.chars().count() as i64;
    let text_len = text.chars().count() as i64;
    positional - (typed_len - text_len).abs()
}

/// Returns the index in `words` of the word the buffer is aimed at, or
/// `None` when the buffer is empty.
///
/// Ties go to the word that comes first in `words`.
pub fn select_candidate(words: &[Word], typed: &str) -> Option<usize> {
    let first = typed.chars().next()?;

    let mut by_first: HashMap<char, Vec<usize>> = HashMap::new();
    for (i, word) in words.iter().enumerate() {
        if let Some(c) = word.text.chars().next() {
            by_first.entry(c).or_default().push(i);
        }
    }

    let bucket = by_first.get(&first).map(Vec::as_slice).unwrap_or_default();
    let threshold = typed.chars().count() as f64 * STRONG_MATCH_FACTOR;

    match best_of(words, bucket.iter().copied(), typed) {
        Some((i, score)) if score as f64 >= threshold => Some(i),
        _ => best_of(words, 0..words.len(), typed).map(|(i, _)| i),
    }
}

fn best_of(
    words: &[Word],
    indices: impl Iterator<Item = usize>,
    typed: &str,
) -> Option<(usize, i64)> {
    let mut best: Option<(usize, i64)> = None;
    for i in indices {
        let score = match_score(typed, &words[i].text);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((i, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use wordfall_protocol::WordId;

    use super::*;

    fn words(texts: &[&str]) -> Vec<Word> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Word::new(WordId(i as u64), *t, 1))
            .collect()
    }

    #[test]
    fn test_match_score() {
        assert_eq!(match_score("cat", "cat"), 6);
        assert_eq!(match_score("ca", "cat"), 3);
        assert_eq!(match_score("cot", "cat"), 3);
        assert_eq!(match_score("xyz", "cat"), -3);
        assert_eq!(match_score("", "cat"), -3);
    }

    #[test]
    fn test_empty_buffer_has_no_candidate() {
        assert_eq!(select_candidate(&words(&["cat", "dog"]), ""), None);
    }

    #[test]
    fn test_no_words_has_no_candidate() {
        assert_eq!(select_candidate(&[], "c"), None);
    }

    #[test]
    fn test_prefix_stays_in_first_char_bucket() {
        let ws = words(&["cat", "car", "dog"]);
        let pick = select_candidate(&ws, "ca").unwrap();
        assert!(ws[pick].text == "cat" || ws[pick].text == "car");
    }

    #[test]
    fn test_ties_go_to_first_word() {
        let ws = words(&["cat", "car", "dog"]);
        assert_eq!(select_candidate(&ws, "ca"), Some(0));
    }

    #[test]
    fn test_longer_match_wins_in_bucket() {
        let ws = words(&["car", "carpet"]);
        assert_eq!(select_candidate(&ws, "carp"), Some(1));
    }

    #[test]
    fn test_first_letter_typo_falls_back_to_all_words() {
        // "xog" shares no first letter with anything; "dog" is the best overall.
        let ws = words(&["cat", "dog", "bird"]);
        assert_eq!(select_candidate(&ws, "xog"), Some(1));
    }

    #[test]
    fn test_weak_bucket_match_falls_back() {
        // "dbcde" shares a first letter with "dog" only, but is one
        // keystroke away from "abcde".
        let ws = words(&["dog", "abcde"]);
        assert_eq!(select_candidate(&ws, "dbcde"), Some(1));

        // Bucket winner "dig" scores 3 for "dag", under the 4.5 bar, and
        // nothing outside the bucket beats it.
        let ws = words(&["dig", "cat"]);
        assert_eq!(select_candidate(&ws, "dag"), Some(0));
    }
}
