//! Word frequencies over article titles.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_STOP_WORDS: [&str; 4] = ["the", "a", "is", "in"];

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r##"["#$%&()*+,./:;<=>?@\[\\\]^_`{|}~]"##).unwrap());

/// Applied after stop-word filtering, so `isnt` still counts as `is`.
const CONTRACTIONS: [(&str, &str); 5] = [
    ("whats", "what"),
    ("cant", "can"),
    ("dont", "do"),
    ("doesnt", "does"),
    ("isnt", "is"),
];

/// Occurrences per normalised word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WordCounts(HashMap<String, usize>);

impl WordCounts {
    pub fn get(&self, word: &str) -> usize {
        self.0.get(word).copied().unwrap_or(0)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains_key(word)
    }

    /// Distinct words.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum over all words.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// The `n` most frequent words; equal counts are ordered alphabetically.
    pub fn top_words(&self, n: usize) -> Vec<(String, usize)> {
        self.0
            .iter()
            .sorted_by(|(a_word, a_count), (b_word, b_count)| {
                b_count.cmp(a_count).then_with(|| a_word.cmp(b_word))
            })
            .take(n)
            .map(|(word, count)| (word.clone(), *count))
            .collect()
    }
}

/// Join `titles` with newlines and count their words.
///
/// Words are lowercased, stripped of apostrophes (straight and curly) and
/// split on whitespace and on punctuation other than `!` and `-`. Stop words
/// are dropped before contractions such as `dont` are folded to their stem.
///
/// # Arguments
///
/// * `titles` - Article titles, in any order
/// * `stop_words` - Words to ignore; `None` means [`DEFAULT_STOP_WORDS`]
///
/// # Returns
///
/// The joined (unmodified) text and the word counts. Empty input yields an
/// empty string and no counts.
///
/// # Examples
///
/// ```
/// use tech_trends_scraper::analyzer::process_titles;
///
/// let (text, counts) = process_titles(&["Rust in Production", "Why Rust?"], None);
/// assert_eq!(text, "Rust in Production\nWhy Rust?");
/// assert_eq!(counts.get("rust"), 2);
/// assert!(!counts.contains("in"));
/// ```
pub fn process_titles<S: AsRef<str>>(
    titles: &[S],
    stop_words: Option<&HashSet<String>>,
) -> (String, WordCounts) {
    if titles.is_empty() {
        return (String::new(), WordCounts::default());
    }

    let defaults: HashSet<String>;
    let stop_words = match stop_words {
        Some(words) => words,
        None => {
            defaults = DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect();
            &defaults
        }
    };

    let combined = titles.iter().map(|t| t.as_ref()).join("\n");

    let lowered = combined
        .to_lowercase()
        .replace(['\u{2019}', '\u{2018}'], "'")
        .replace('\'', "");
    let cleaned = PUNCTUATION.replace_all(&lowered, " ");

    let counts = cleaned
        .split_whitespace()
        .filter(|word| !stop_words.contains(*word))
        .map(|word| {
            CONTRACTIONS
                .iter()
                .find(|(from, _)| *from == word)
                .map_or(word, |(_, to)| *to)
                .to_string()
        })
        .counts();

    (combined, WordCounts(counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_text_and_counts() {
        let titles = ["apple banana", "apple cherry", "apple"];
        let (text, counts) = process_titles(&titles, None);
        assert_eq!(text, "apple banana\napple cherry\napple");
        assert_eq!(counts.get("apple"), 3);
        assert_eq!(counts.get("banana"), 1);
        assert_eq!(counts.get("cherry"), 1);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn test_punctuation_and_contractions() {
        let titles = [
            "What\u{2019}s new?",
            "It's great!",
            "Don't stop.",
            "Isn't it?",
        ];
        let (_, counts) = process_titles(&titles, None);
        assert!(counts.contains("what"));
        assert!(counts.contains("new"));
        assert!(counts.contains("great!"));
        assert!(counts.contains("do"));
        assert!(counts.contains("its"));
        assert_eq!(counts.get("is"), 1);
        assert!(!counts.contains("whats"));
    }

    #[test]
    fn test_default_and_custom_stop_words() {
        let titles = ["The Quick Brown Fox", "A Fox in the Box"];
        let (_, counts) = process_titles(&titles, None);
        assert!(!counts.contains("the"));
        assert!(!counts.contains("a"));
        assert!(!counts.contains("in"));
        assert_eq!(counts.get("fox"), 2);

        let custom: HashSet<String> = ["fox".to_string()].into_iter().collect();
        let (_, counts) = process_titles(&titles, Some(&custom));
        assert!(!counts.contains("fox"));
        assert_eq!(counts.get("the"), 2);
    }

    #[test]
    fn test_empty_titles() {
        let titles: [&str; 0] = [];
        let (text, counts) = process_titles(&titles, None);
        assert!(text.is_empty());
        assert!(counts.is_empty());
    }

    #[test]
    fn test_top_words_breaks_ties_alphabetically() {
        let titles = ["rust python rust", "python go zig", "rust"];
        let (_, counts) = process_titles(&titles, None);
        assert_eq!(
            counts.top_words(3),
            vec![
                ("rust".to_string(), 3),
                ("python".to_string(), 2),
                ("go".to_string(), 1),
            ]
        );
        assert_eq!(counts.top_words(100).len(), counts.len());
    }
}
