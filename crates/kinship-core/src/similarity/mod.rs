//! Similarity signals and the pairwise evaluator built on them

pub mod candidates;
pub mod evaluator;
pub mod image;
pub mod pairs;
pub mod tags;
pub mod text;

pub use candidates::{candidate_pairs, CandidatePairs};
pub use evaluator::{PairwiseEvaluator, PreparedNote, ScoreBreakdown, ScoreCache, SimilarityScore};
pub use image::{compare, FingerprintCache, ImageHasher, PerceptualFingerprint};
pub use pairs::{evaluate_pairs, fingerprint_note, prepare, PairContext, PairPlan};
pub use tags::tag_similarity;
pub use text::TextScorer;
