//! Text similarity: normalised edit distance blended with term-frequency cosine

use std::collections::BTreeMap;

use crate::config::TextConfig;
use crate::text::tokenize_with_stemming;

/// Scores a pair of texts in [0, 1]
#[derive(Debug, Clone, Copy)]
pub struct TextScorer {
    edit_weight: f64,
    cosine_weight: f64,
    stemming: bool,
}

impl TextScorer {
    pub fn new(config: &TextConfig) -> Self {
        TextScorer {
            edit_weight: config.edit_weight,
            cosine_weight: config.cosine_weight,
            stemming: config.stemming,
        }
    }

    /// Combined text score.
    ///
    /// Both texts empty scores 1.0; exactly one empty scores 0.0. Edit
    /// similarity compares the texts exactly as given, while the cosine term
    /// sees lowercased tokens.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return 1.0,
            (true, false) | (false, true) => return 0.0,
            (false, false) => {}
        }
        // Identical inputs; skips float rounding in the cosine norms
        if a == b {
            return 1.0;
        }

        let edit = edit_similarity(a, b);
        let cosine = self.cosine(a, b);
        let total = self.edit_weight + self.cosine_weight;

        ((self.edit_weight * edit + self.cosine_weight * cosine) / total).clamp(0.0, 1.0)
    }

    fn cosine(&self, a: &str, b: &str) -> f64 {
        let vec_a = term_frequencies(&tokenize_with_stemming(a, self.stemming));
        let vec_b = term_frequencies(&tokenize_with_stemming(b, self.stemming));

        // Punctuation-only texts have no terms; fall back to exact match
        if vec_a.is_empty() && vec_b.is_empty() {
            return if a == b { 1.0 } else { 0.0 };
        }

        cosine_similarity(&vec_a, &vec_b)
    }
}

impl Default for TextScorer {
    fn default() -> Self {
        TextScorer::new(&TextConfig::default())
    }
}

/// Lowercase and collapse whitespace runs to a single space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Levenshtein distance over Unicode scalar values
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Keep the shorter string on the inner axis so the rows stay small
    let (outer, inner) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };

    let mut prev: Vec<usize> = (0..=inner.len()).collect();
    let mut curr: Vec<usize> = vec![0; inner.len() + 1];

    for (i, oc) in outer.iter().enumerate() {
        curr[0] = i + 1;
        for (j, ic) in inner.iter().enumerate() {
            let substitution = prev[j] + usize::from(oc != ic);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[inner.len()]
}

/// `1 - levenshtein(a, b) / max(len(a), len(b), 1)`
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count()).max(1);
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Term-frequency vector; ordered so that dot products sum in a fixed order
pub fn term_frequencies(tokens: &[String]) -> BTreeMap<String, f64> {
    let mut freqs = BTreeMap::new();
    for token in tokens {
        *freqs.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    freqs
}

/// Cosine similarity of two sparse term vectors, clamped to [0, 1]
pub fn cosine_similarity(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    let norm_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
        .sum();

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
