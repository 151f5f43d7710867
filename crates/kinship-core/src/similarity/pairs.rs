//! The shared pairwise pass behind duplicate scanning and graph building

use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::cancel::CancellationToken;
use crate::error::{KinshipError, Result};
use crate::logging::ResourceMetrics;
use crate::note::NoteRecord;
use crate::similarity::candidates::CandidatePairs;
use crate::similarity::evaluator::{PairwiseEvaluator, PreparedNote, ScoreCache, SimilarityScore};
use crate::similarity::image::{ImageHasher, PerceptualFingerprint};
use crate::trace_time;

/// Candidate pairs scored per rayon task
const CHUNK_SIZE: usize = 256;

/// Which pairs a pass evaluates
#[derive(Debug, Clone, Copy)]
pub enum PairPlan<'a> {
    /// Every unordered pair
    All,
    /// Only the listed index pairs
    Candidates(&'a CandidatePairs),
}

impl PairPlan<'_> {
    pub fn pair_count(&self, note_count: usize) -> usize {
        match self {
            PairPlan::All => note_count * note_count.saturating_sub(1) / 2,
            PairPlan::Candidates(pairs) => pairs.len(),
        }
    }
}

/// Shared state for one pairwise pass
pub struct PairContext<'a> {
    pub evaluator: &'a PairwiseEvaluator,
    pub cache: &'a ScoreCache,
    pub metrics: &'a ResourceMetrics,
    pub cancel: &'a CancellationToken,
}

/// Fingerprint a note's image, or `None` if it has no usable one.
///
/// Decode failures are logged and counted, never propagated.
pub fn fingerprint_note(
    note: &NoteRecord,
    hasher: &ImageHasher,
    metrics: &ResourceMetrics,
) -> Option<PerceptualFingerprint> {
    let image_ref = note.image_ref.as_deref().filter(|_| note.has_image())?;
    match hasher.hash_with_metrics(image_ref, Some(metrics)) {
        Ok(fp) => Some(fp),
        Err(e) => {
            metrics.record_image_failure();
            tracing::warn!(
                note_id = %note.id,
                error = %e,
                "image unusable, scoring without image signal"
            );
            None
        }
    }
}

/// Fingerprint every note's image on `pool`.
///
/// A note whose image cannot be resolved or decoded gets no fingerprint and
/// is scored on text and tags only. Output order matches `notes`.
pub fn prepare<'a>(
    notes: &'a [NoteRecord],
    hasher: &ImageHasher,
    pool: &ThreadPool,
    metrics: &ResourceMetrics,
    cancel: &CancellationToken,
) -> Result<Vec<PreparedNote<'a>>> {
    let start = Instant::now();
    let prepared = pool.install(|| {
        notes
            .par_iter()
            .map(|note| {
                if cancel.is_cancelled() {
                    return Err(KinshipError::cancelled("image fingerprinting"));
                }
                let fingerprint = fingerprint_note(note, hasher, metrics);
                Ok(PreparedNote::new(note, fingerprint))
            })
            .collect::<Result<Vec<_>>>()
    })?;
    trace_time!(start, "prepare_notes", notes = notes.len());
    Ok(prepared)
}

/// Score the pairs selected by `plan`, keeping those at or above `min_score`.
///
/// Results are sorted by `(a, b)` so the output never depends on worker
/// scheduling. A fired cancellation token discards all work.
pub fn evaluate_pairs(
    prepared: &[PreparedNote<'_>],
    plan: PairPlan<'_>,
    min_score: f64,
    ctx: &PairContext<'_>,
    pool: &ThreadPool,
) -> Result<Vec<SimilarityScore>> {
    let start = Instant::now();
    let score_pair = |i: usize, j: usize| -> Option<SimilarityScore> {
        let (score, hit) = ctx
            .evaluator
            .evaluate_cached(&prepared[i], &prepared[j], ctx.cache);
        if hit {
            ctx.metrics.record_score_hit();
        } else {
            ctx.metrics.record_score_miss();
        }
        (score.score >= min_score).then_some(score)
    };

    let batches: Vec<Vec<SimilarityScore>> = pool.install(|| match plan {
        PairPlan::All => (0..prepared.len())
            .into_par_iter()
            .map(|i| {
                if ctx.cancel.is_cancelled() {
                    return Err(KinshipError::cancelled("pairwise evaluation"));
                }
                Ok(((i + 1)..prepared.len())
                    .filter_map(|j| score_pair(i, j))
                    .collect())
            })
            .collect::<Result<Vec<_>>>(),
        PairPlan::Candidates(pairs) => pairs
            .par_chunks(CHUNK_SIZE)
            .map(|chunk| {
                if ctx.cancel.is_cancelled() {
                    return Err(KinshipError::cancelled("pairwise evaluation"));
                }
                Ok(chunk.iter().filter_map(|&(i, j)| score_pair(i, j)).collect())
            })
            .collect::<Result<Vec<_>>>(),
    })?;

    let mut scores: Vec<SimilarityScore> = batches.into_iter().flatten().collect();
    scores.sort_by(|x, y| x.a.cmp(&y.a).then_with(|| x.b.cmp(&y.b)));
    trace_time!(
        start,
        "evaluate_pairs",
        pairs = plan.pair_count(prepared.len()),
        kept = scores.len()
    );
    Ok(scores)
}
