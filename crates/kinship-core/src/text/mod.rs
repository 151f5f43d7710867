//! Text processing utilities for tokenization and keyword extraction

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Common English stop words, dropped when extracting cluster keywords
static STOP_WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// Porter stemmer for English text
static STEMMER: OnceLock<Stemmer> = OnceLock::new();

fn get_stop_words() -> &'static HashSet<&'static str> {
    STOP_WORDS.get_or_init(|| {
        [
            "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have",
            "i", "if", "in", "into", "is", "it", "its", "my", "no", "not", "of", "on", "or", "our",
            "so", "such", "that", "the", "their", "then", "there", "these", "they", "this", "to",
            "was", "we", "were", "will", "with", "you", "your",
        ]
        .iter()
        .copied()
        .collect()
    })
}

fn get_stemmer() -> &'static Stemmer {
    STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

/// Split text into lowercase tokens on whitespace and punctuation
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Tokenize text with optional Porter stemming
///
/// When `stem` is true, "graph" and "graphs" produce the same token.
pub fn tokenize_with_stemming(text: &str, stem: bool) -> Vec<String> {
    let tokens = tokenize(text);
    if !stem {
        return tokens;
    }

    let stemmer = get_stemmer();
    tokens.iter().map(|t| stemmer.stem(t).to_string()).collect()
}

/// Tokens worth surfacing as keywords: no stop words, no bare numbers, at least 3 chars
pub fn keyword_tokens(text: &str) -> Vec<String> {
    let stop_words = get_stop_words();
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() >= 3)
        .filter(|t| !t.chars().all(|c| c.is_numeric()))
        .filter(|t| !stop_words.contains(t.as_str()))
        .collect()
}
