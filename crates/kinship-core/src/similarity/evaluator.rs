//! Pairwise similarity: text, image and tag signals combined into one score

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use dashmap::DashMap;
use serde::Serialize;

use crate::config::{EngineConfig, SignalWeights};
use crate::note::NoteRecord;
use crate::similarity::image::{compare, PerceptualFingerprint};
use crate::similarity::tags::{has_tag_signal, tag_similarity};
use crate::similarity::text::TextScorer;

/// Per-signal scores behind a [`SimilarityScore`].
///
/// `image` is `None` when either note lacks a usable image; `tag` is `None`
/// when neither note is tagged. Missing signals are left out of the
/// weighted combination rather than counted as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub text: f64,
    pub image: Option<f64>,
    pub tag: Option<f64>,
}

impl ScoreBreakdown {
    /// Image score with "unavailable" reported as 0
    pub fn image_score(&self) -> f64 {
        self.image.unwrap_or(0.0)
    }

    /// Tag score with "unavailable" reported as 0
    pub fn tag_score(&self) -> f64 {
        self.tag.unwrap_or(0.0)
    }
}

/// Similarity of an unordered note pair; `a` is always the smaller id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityScore {
    pub a: String,
    pub b: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl SimilarityScore {
    /// The id on the other side of the pair from `id`
    pub fn other(&self, id: &str) -> Option<&str> {
        if self.a == id {
            Some(&self.b)
        } else if self.b == id {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// A note with everything the evaluator needs precomputed for one run
#[derive(Debug, Clone)]
pub struct PreparedNote<'a> {
    pub note: &'a NoteRecord,
    pub fingerprint: Option<PerceptualFingerprint>,
    /// Digest of every input the score depends on; part of the cache key
    pub revision: u64,
}

impl<'a> PreparedNote<'a> {
    pub fn new(note: &'a NoteRecord, fingerprint: Option<PerceptualFingerprint>) -> Self {
        let mut hasher = DefaultHasher::new();
        note.text_content.hash(&mut hasher);
        note.tags.hash(&mut hasher);
        fingerprint.map(|fp| fp.bits()).hash(&mut hasher);
        PreparedNote {
            note,
            fingerprint,
            revision: hasher.finish(),
        }
    }

    pub fn id(&self) -> &str {
        &self.note.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey {
    a: String,
    b: String,
    rev_a: u64,
    rev_b: u64,
}

/// Append-only cache of pair scores.
///
/// Keyed by the ordered id pair plus both notes' revisions, so an edited note
/// never reuses a stale score. Concurrent first writers race to the same
/// deterministic value.
#[derive(Debug, Default)]
pub struct ScoreCache {
    entries: DashMap<PairKey, SimilarityScore>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &PairKey) -> Option<SimilarityScore> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: PairKey, score: SimilarityScore) -> SimilarityScore {
        self.entries.entry(key).or_insert(score).value().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Combines the text, image and tag signals of a note pair
#[derive(Debug, Clone, Copy)]
pub struct PairwiseEvaluator {
    weights: SignalWeights,
    text: TextScorer,
}

impl PairwiseEvaluator {
    pub fn new(config: &EngineConfig) -> Self {
        PairwiseEvaluator {
            weights: config.weights,
            text: TextScorer::new(&config.text),
        }
    }

    pub fn text_scorer(&self) -> &TextScorer {
        &self.text
    }

    /// Score a prepared pair. Pure: the result depends only on the two notes
    /// and their fingerprints, and is identical for either argument order.
    pub fn evaluate(&self, x: &PreparedNote<'_>, y: &PreparedNote<'_>) -> SimilarityScore {
        let (first, second) = if x.id() <= y.id() { (x, y) } else { (y, x) };
        let a = first.note;
        let b = second.note;

        let text = self.text.score(&a.text_content, &b.text_content);
        let image = match (&first.fingerprint, &second.fingerprint) {
            (Some(fa), Some(fb)) => Some(compare(fa, fb)),
            _ => None,
        };
        let tag = has_tag_signal(&a.tags, &b.tags).then(|| tag_similarity(&a.tags, &b.tags));

        let breakdown = ScoreBreakdown { text, image, tag };
        SimilarityScore {
            a: a.id.clone(),
            b: b.id.clone(),
            score: self.combine(&breakdown),
            breakdown,
        }
    }

    /// Score a pair through `cache`; returns the score and whether it was a hit
    pub fn evaluate_cached(
        &self,
        x: &PreparedNote<'_>,
        y: &PreparedNote<'_>,
        cache: &ScoreCache,
    ) -> (SimilarityScore, bool) {
        let key = if x.id() <= y.id() {
            PairKey {
                a: x.id().to_string(),
                b: y.id().to_string(),
                rev_a: x.revision,
                rev_b: y.revision,
            }
        } else {
            PairKey {
                a: y.id().to_string(),
                b: x.id().to_string(),
                rev_a: y.revision,
                rev_b: x.revision,
            }
        };

        if let Some(hit) = cache.get(&key) {
            return (hit, true);
        }
        (cache.insert(key, self.evaluate(x, y)), false)
    }

    /// Weighted mean over the available signals
    fn combine(&self, breakdown: &ScoreBreakdown) -> f64 {
        let mut weight_sum = self.weights.text;
        let mut total = self.weights.text * breakdown.text;

        if let Some(image) = breakdown.image {
            weight_sum += self.weights.image;
            total += self.weights.image * image;
        }
        if let Some(tag) = breakdown.tag {
            weight_sum += self.weights.tag;
            total += self.weights.tag * tag;
        }

        if weight_sum <= 0.0 {
            // Only a zero-weighted text signal is available
            return breakdown.text;
        }
        (total / weight_sum).clamp(0.0, 1.0)
    }
}
